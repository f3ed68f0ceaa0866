use std::sync::Arc;

use chrono::{Duration, Utc};

use peerfund_auth::{Hs256Jwt, JwtClaims, JwtValidator, PrincipalId, Role, TokenValidationError};
use peerfund_core::{Aggregate, UserId};
use peerfund_directory::UserProfile;
use peerfund_events::{EventBus, EventEnvelope, InMemoryEventBus};
use peerfund_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    directory::{DirectoryError, DirectoryStore, InMemoryDirectoryStore},
    event_store::{EventStore, InMemoryEventStore, StoredEvent},
    mailer::{Mailer, TracingMailer},
};
use peerfund_ledger::{LedgerAccount, LedgerCommand, OpenAccount};

use super::AppConfig;

/// Stream type identifier for the per-user balance ledger.
pub const LEDGER_STREAM: &str = "ledger.account";

/// Validity window for issued bearer tokens.
const TOKEN_TTL_HOURS: i64 = 24;

type LedgerDispatcher =
    CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>>;

/// Application services shared by all handlers.
pub struct AppServices {
    dispatcher: LedgerDispatcher,
    event_store: Arc<InMemoryEventStore>,
    directory: Arc<InMemoryDirectoryStore>,
    mailer: Arc<dyn Mailer>,
    jwt: Arc<Hs256Jwt>,
    admin_email: String,
    admin_password: String,
    base_url: String,
}

pub fn build_services(config: AppConfig) -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());
    let directory = Arc::new(InMemoryDirectoryStore::new());
    let mailer: Arc<dyn Mailer> = Arc::new(TracingMailer::new());
    let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes()));

    // Background subscriber: bus -> audit log. Every committed ledger event
    // ends up as a structured log line.
    {
        let sub = bus.subscribe();
        tokio::task::spawn_blocking(move || {
            loop {
                match sub.recv() {
                    Ok(env) => {
                        tracing::info!(
                            user_id = %env.user_id(),
                            stream_type = env.stream_type(),
                            sequence_number = env.sequence_number(),
                            "ledger event committed"
                        );
                    }
                    Err(_) => break,
                }
            }
        });
    }

    let dispatcher = CommandDispatcher::new(store.clone(), bus);
    AppServices {
        dispatcher,
        event_store: store,
        directory,
        mailer,
        jwt,
        admin_email: config.admin_email,
        admin_password: config.admin_password,
        base_url: config.base_url,
    }
}

impl AppServices {
    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt.clone()
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectoryStore> {
        &self.directory
    }

    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.mailer
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the configured admin credentials.
    pub fn admin_credentials_match(&self, email: &str, password: &str) -> bool {
        email == self.admin_email && password == self.admin_password
    }

    /// Issue a bearer token for a principal.
    pub fn issue_token(
        &self,
        principal_id: PrincipalId,
        roles: Vec<Role>,
    ) -> Result<String, TokenValidationError> {
        let now = Utc::now();
        self.jwt.sign(&JwtClaims {
            sub: principal_id,
            roles,
            issued_at: now,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        })
    }

    /// Dispatch a command against a user's ledger stream.
    pub fn dispatch_ledger(
        &self,
        user_id: UserId,
        command: LedgerCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch::<LedgerAccount>(user_id, LEDGER_STREAM, command, LedgerAccount::empty)
    }

    /// Load a user's ledger by replaying their stream.
    ///
    /// `None` when the stream does not exist (never registered, or deleted).
    pub fn load_ledger(&self, user_id: UserId) -> Result<Option<LedgerAccount>, DispatchError> {
        let history = self.event_store.load_stream(user_id)?;
        if history.is_empty() {
            return Ok(None);
        }

        let mut account = LedgerAccount::empty(user_id);
        for stored in history {
            let ev = serde_json::from_value(stored.payload)
                .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
            account.apply(&ev);
        }
        Ok(Some(account))
    }

    /// Register a user: directory profile + ledger stream, both keyed on the
    /// same fresh id.
    pub fn register_user(&self, profile: UserProfile) -> Result<(), RegistrationError> {
        let user_id = profile.user_id;
        self.directory.create_user(profile)?;

        if let Err(e) = self.dispatch_ledger(
            user_id,
            LedgerCommand::Open(OpenAccount { user_id, occurred_at: Utc::now() }),
        ) {
            // Roll the profile back so a failed registration leaves nothing.
            let _ = self.directory.delete_user_data(user_id);
            return Err(RegistrationError::Ledger(e));
        }
        Ok(())
    }

    /// Remove the user and everything keyed on them: directory records and
    /// the ledger stream.
    pub fn delete_user(&self, user_id: UserId) -> Result<(), DirectoryError> {
        self.directory.delete_user_data(user_id)?;
        self.event_store
            .purge_stream(user_id)
            .map_err(|_| DirectoryError::Unavailable)?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum RegistrationError {
    Directory(DirectoryError),
    Ledger(DispatchError),
}

impl From<DirectoryError> for RegistrationError {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}
