use peerfund_auth::{PrincipalId, Role};
use peerfund_core::UserId;

/// Caller context for a request (authenticated identity + roles).
///
/// Installed by the auth middleware; must be present for all protected
/// routes. User-scoped handlers take the acting user from here, never from
/// the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
}

impl CallerContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self { principal_id, roles }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// The caller as a platform user (user-scoped routes).
    pub fn user_id(&self) -> UserId {
        self.principal_id.into()
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
