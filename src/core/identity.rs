//! Identity provider seam and a database-backed implementation.
//!
//! The storefront never owns sessions itself: it consumes sign-in, sign-up,
//! sign-out and session-change notifications from an [`IdentityProvider`].
//! [`LocalIdentityProvider`] keeps argon2-hashed credentials next to the catalog
//! and writes the matching user profile on registration.

use crate::{
    core::user,
    entities::{Credential, credential},
    errors::{Error, Result},
    models::Session,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, Set, SqlErr, prelude::*};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, error, info, instrument, warn};

/// Callback invoked with the new session (or `None`) on every change.
pub type SessionListener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

/// Handle returned by [`IdentityProvider::subscribe`].
///
/// Call [`Subscription::unsubscribe`] to stop notifications; dropping the handle
/// has the same effect.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wraps the teardown action for one registration.
    pub fn new(teardown: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Stops notifications for this registration.
    pub fn unsubscribe(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// Operations the storefront consumes from its identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in with an email/password credential.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Registers a new account and signs it in.
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Session>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<()>;

    /// The session as the provider currently sees it.
    fn current(&self) -> Option<Session>;

    /// Registers `listener` for session changes. The listener is called once
    /// right away with the current session.
    fn subscribe(&self, listener: SessionListener) -> Subscription;
}

/// Hashes a plain-text password with Argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Argon2 password hashing failed: {e}");
            Error::Identity {
                message: "Could not register the account. Please try again.".to_string(),
            }
        })
}

/// Checks `password` against a stored Argon2 hash.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash is malformed: {e}");
        Error::Identity {
            message: "Could not sign in. Please try again.".to_string(),
        }
    })?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!("Argon2 password verification failed: {e}");
            Err(Error::Identity {
                message: "Could not sign in. Please try again.".to_string(),
            })
        }
    }
}

const MIN_PASSWORD_LEN: usize = 6;

/// Trims and lowercases an email the way accounts are stored.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_in_use() -> Error {
    Error::Identity {
        message: "The email address is already in use by another account.".to_string(),
    }
}

fn invalid_credentials() -> Error {
    Error::Identity {
        message: "Invalid email or password.".to_string(),
    }
}

#[derive(Default)]
struct ListenerState {
    current: Option<Session>,
    listeners: Vec<(u64, SessionListener)>,
    next_id: u64,
}

/// Identity provider backed by the `credentials` and `users` collections.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    db: DatabaseConnection,
    admin_email: String,
    state: Arc<Mutex<ListenerState>>,
}

impl LocalIdentityProvider {
    /// `admin_email` decides which registrations get the `admin` profile role.
    pub fn new(db: DatabaseConnection, admin_email: impl Into<String>) -> Self {
        Self {
            db,
            admin_email: normalize_email(&admin_email.into()),
            state: Arc::new(Mutex::new(ListenerState::default())),
        }
    }

    fn set_session(&self, session: Option<Session>) {
        let listeners: Vec<SessionListener> = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.current.clone_from(&session);
            state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        debug!(listeners = listeners.len(), "Notifying session listeners");
        for listener in listeners {
            listener(session.as_ref());
        }
    }

    /// Inserts the credential row. A concurrent registration of the same email
    /// trips the unique index and is reported like any duplicate.
    async fn insert_credential(
        &self,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<credential::Model> {
        credential::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            display_name: Set(display_name.to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                warn!("Duplicate registration lost the race");
                email_in_use()
            }
            _ => Error::from(e),
        })
    }

    async fn find_credential(&self, email: &str) -> Result<Option<credential::Model>> {
        Credential::find()
            .filter(credential::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }
}

impl std::fmt::Debug for LocalIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentityProvider")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let Some(record) = self.find_credential(&email).await? else {
            warn!("Sign-in for unknown account");
            return Err(invalid_credentials());
        };
        if !verify_password(&record.password_hash, password)? {
            warn!("Sign-in with wrong password");
            return Err(invalid_credentials());
        }

        let session = Session {
            uid: record.id,
            email: record.email,
            display_name: Some(record.display_name).filter(|n| !n.is_empty()),
        };
        info!(uid = session.uid, "Signed in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Session> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Identity {
                message: "The email address is badly formatted.".to_string(),
            });
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Identity {
                message: format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            });
        }
        if self.find_credential(&email).await?.is_some() {
            return Err(email_in_use());
        }

        let record = self
            .insert_credential(&email, &hash_password(password)?, display_name.trim())
            .await?;

        // The account exists even if the profile write fails.
        let role = if email == self.admin_email {
            user::ROLE_ADMIN
        } else {
            user::ROLE_USER
        };
        if let Err(e) =
            user::create_profile(&self.db, record.id, &email, &record.display_name, role).await
        {
            error!(uid = record.id, "Error creating user profile: {e}");
        }

        let session = Session {
            uid: record.id,
            email,
            display_name: Some(record.display_name).filter(|n| !n.is_empty()),
        };
        info!(uid = session.uid, "Registered new account");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        info!("Signed out");
        self.set_session(None);
        Ok(())
    }

    fn current(&self) -> Option<Session> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        let (id, current) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.push((id, Arc::clone(&listener)));
            (id, state.current.clone())
        };
        listener(current.as_ref());

        let weak: Weak<Mutex<ListenerState>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .retain(|(lid, _)| *lid != id);
            }
        })
    }
}
