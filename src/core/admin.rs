//! Admin access gate and management panel.
//!
//! Access is decided in two steps: is anyone signed in, and is it the configured
//! administrator email. [`AdminPanel`] repeats that check before every call, so a
//! panel handed out earlier stops working as soon as the session changes.

use crate::{
    core::{
        identity::{IdentityProvider, normalize_email},
        order,
        product::{self, NewProduct, ProductPatch},
        session::SessionMirror,
        user::{self, UserWithStats},
    },
    entities::{order as order_entity, product as product_entity},
    errors::{Error, Result},
    models::Session,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of presenting a session to the gate.
#[derive(Debug)]
pub enum AdminAccess {
    /// Nobody is signed in; show the login form
    LoginRequired,
    /// Signed in as someone other than the administrator
    Denied {
        /// Email of the current session
        email: String,
    },
    /// The administrator is signed in
    Admitted(AdminPanel),
}

impl AdminAccess {
    /// Whether the panel was granted
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }
}

/// Checks `session` against the administrator email.
fn authorize(session: Option<Session>, admin_email: &str) -> Result<Session> {
    match session {
        None => Err(Error::LoginRequired),
        Some(session) if session.email == admin_email => Ok(session),
        Some(session) => Err(Error::AccessDenied {
            email: session.email,
        }),
    }
}

/// Entry point to the admin panel, including its login form.
#[derive(Clone)]
pub struct AdminGate {
    db: DatabaseConnection,
    identity: Arc<dyn IdentityProvider>,
    session: SessionMirror,
    admin_email: String,
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl AdminGate {
    /// Creates a gate for `admin_email`.
    pub fn new(
        db: DatabaseConnection,
        identity: Arc<dyn IdentityProvider>,
        session: SessionMirror,
        admin_email: impl Into<String>,
    ) -> Self {
        Self {
            db,
            identity,
            session,
            admin_email: normalize_email(&admin_email.into()),
        }
    }

    /// Evaluates the mirrored session.
    #[must_use]
    pub fn admit(&self) -> AdminAccess {
        match authorize(self.session.current(), &self.admin_email) {
            Ok(session) => {
                info!(email = %session.email, "Admin panel opened");
                AdminAccess::Admitted(AdminPanel {
                    db: self.db.clone(),
                    session: self.session.clone(),
                    admin_email: self.admin_email.clone(),
                })
            }
            Err(Error::AccessDenied { email }) => {
                warn!(email = %email, "Admin panel refused");
                AdminAccess::Denied { email }
            }
            Err(_) => AdminAccess::LoginRequired,
        }
    }

    /// Login form: signs in, then evaluates the new session.
    ///
    /// # Errors
    /// Identity errors are returned unchanged for display.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AdminAccess> {
        self.identity.sign_in(email, password).await?;
        Ok(self.admit())
    }

    /// Login form, registration mode.
    ///
    /// # Errors
    /// Identity errors are returned unchanged for display.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AdminAccess> {
        self.identity.sign_up(email, password, display_name).await?;
        Ok(self.admit())
    }

    /// The only action offered on the access-denied view.
    ///
    /// # Errors
    /// Returns the provider's error if sign-out fails.
    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await
    }
}

/// Privileged operations over products, orders and users.
#[derive(Clone)]
pub struct AdminPanel {
    db: DatabaseConnection,
    session: SessionMirror,
    admin_email: String,
}

impl std::fmt::Debug for AdminPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPanel")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl AdminPanel {
    /// Re-checks that the administrator is still signed in.
    ///
    /// # Errors
    /// `Error::LoginRequired` or `Error::AccessDenied`.
    pub fn ensure_admin(&self) -> Result<Session> {
        authorize(self.session.current(), &self.admin_email)
    }

    /// All products, for the products tab.
    pub async fn products(&self) -> Result<Vec<product_entity::Model>> {
        self.ensure_admin()?;
        product::get_all_products(&self.db).await
    }

    /// Creates a product.
    ///
    /// # Errors
    /// Access errors, or the validation errors of [`product::create_product`].
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, new: NewProduct) -> Result<product_entity::Model> {
        self.ensure_admin()?;
        product::create_product(&self.db, new).await
    }

    /// Applies `patch` to a product.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        product_id: i64,
        patch: ProductPatch,
    ) -> Result<product_entity::Model> {
        self.ensure_admin()?;
        product::update_product(&self.db, product_id, patch).await
    }

    /// Deletes a product if `confirm` agrees. Returns whether it was deleted.
    ///
    /// # Errors
    /// Access errors, or `Error::ProductNotFound`.
    #[instrument(skip(self, confirm))]
    pub async fn delete_product<F>(&self, product_id: i64, confirm: F) -> Result<bool>
    where
        F: FnOnce(&product_entity::Model) -> bool + Send,
    {
        self.ensure_admin()?;
        let target = product::get_product_by_id(&self.db, product_id)
            .await?
            .ok_or(Error::ProductNotFound { id: product_id })?;
        if !confirm(&target) {
            info!(product_id, "Deletion cancelled");
            return Ok(false);
        }

        self.ensure_admin()?;
        product::delete_product(&self.db, product_id).await?;
        Ok(true)
    }

    /// Orders awaiting a decision, newest first.
    pub async fn pending_orders(&self) -> Result<Vec<order_entity::Model>> {
        self.ensure_admin()?;
        order::get_pending_orders(&self.db).await
    }

    /// Number of pending orders, shown on the orders tab.
    pub async fn pending_count(&self) -> Result<u64> {
        self.ensure_admin()?;
        order::count_pending_orders(&self.db).await
    }

    /// Approves an order and decrements stock for its lines.
    pub async fn approve_order(&self, order_id: i64) -> Result<order_entity::Model> {
        self.ensure_admin()?;
        order::approve_order(&self.db, order_id).await
    }

    /// Rejects an order.
    pub async fn reject_order(&self, order_id: i64) -> Result<order_entity::Model> {
        self.ensure_admin()?;
        order::reject_order(&self.db, order_id).await
    }

    /// Profiles with their order count and last order date.
    pub async fn users_with_stats(&self) -> Result<Vec<UserWithStats>> {
        self.ensure_admin()?;
        user::get_users_with_stats(&self.db).await
    }
}
