//! Session mirror.
//!
//! A cloneable handle holding the last session reported by the identity provider.
//! Every consumer reads the same value; only the provider subscription writes it.

use crate::{
    core::identity::{IdentityProvider, Subscription},
    models::Session,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};

/// Mirrored identity shared by checkout and the admin panel.
#[derive(Clone, Debug)]
pub struct SessionMirror {
    tx: Arc<watch::Sender<Option<Session>>>,
    subscription: Arc<Mutex<Option<Subscription>>>,
}

impl Default for SessionMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMirror {
    /// A detached mirror with no session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribes to `provider` once. Returns `false` if already attached.
    pub fn attach(&self, provider: &dyn IdentityProvider) -> bool {
        let mut slot = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            debug!("Session mirror already attached");
            return false;
        }

        let tx = Arc::clone(&self.tx);
        *slot = Some(provider.subscribe(Arc::new(move |session: Option<&Session>| {
            tx.send_replace(session.cloned());
        })));
        info!("Session mirror attached");
        true
    }

    /// Tears the subscription down. Returns `false` if nothing was attached.
    pub fn detach(&self) -> bool {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(subscription) = subscription else {
            return false;
        };
        subscription.unsubscribe();
        info!("Session mirror detached");
        true
    }

    /// The mirrored session, if any
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Whether someone is signed in
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Waits for the next session change and returns the new value.
    pub async fn changed(&self) -> Option<Session> {
        let mut rx = self.tx.subscribe();
        if rx.changed().await.is_err() {
            return self.current();
        }
        let session = rx.borrow_and_update().clone();
        session
    }
}
