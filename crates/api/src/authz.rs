//! API-side authorization guard for commands.
//!
//! Enforces authorization at the command boundary (before dispatch), keeping
//! the domain aggregates and infra auth-agnostic.

use peerfund_auth::{AuthzError, CommandAuthorization, Permission, Principal, authorize};

use crate::context::CallerContext;

/// Check authorization for a command in the current request context.
///
/// Intended to be called **before** dispatching a command.
pub fn authorize_command<C: CommandAuthorization>(
    caller: &CallerContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = Principal {
        principal_id: caller.principal_id(),
        roles: caller.roles().to_vec(),
        permissions: permissions_from_roles(caller.roles()),
    };

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

/// Minimal role→permission mapping.
///
/// Convention: the `admin` role grants all permissions; regular users hold no
/// admin-side permissions (their routes are scoped to their own records by
/// construction).
fn permissions_from_roles(roles: &[peerfund_auth::Role]) -> Vec<Permission> {
    if roles.iter().any(|r| r.as_str() == "admin") {
        return vec![Permission::new("*")];
    }

    Vec::new()
}
