//! Order submission workflow.
//!
//! One attempt runs Gate, Build, Persist, Cleanup and then Handoff. Nothing
//! before Persist writes anything, and a failed Persist leaves the cart as it was.

use crate::{
    config::settings::Settings,
    core::{
        cart::CartStore,
        handoff::{self, MessagingHandoff},
        order::{self, NewOrder},
        session::SessionMirror,
    },
    entities::order as order_entity,
    errors::{Error, Result},
    models::{OrderLine, Product, Session},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// The stored order
    pub order: order_entity::Model,
    /// The link that was handed off
    pub handoff_url: Url,
}

/// Turns a cart or a single product into a stored order and a chat handoff.
#[derive(Clone)]
pub struct CheckoutWorkflow {
    db: DatabaseConnection,
    session: SessionMirror,
    handoff: Arc<dyn MessagingHandoff>,
    settings: Arc<Settings>,
}

impl std::fmt::Debug for CheckoutWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutWorkflow")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CheckoutWorkflow {
    /// Creates a workflow over the shared session mirror.
    pub fn new(
        db: DatabaseConnection,
        session: SessionMirror,
        handoff: Arc<dyn MessagingHandoff>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            db,
            session,
            handoff,
            settings,
        }
    }

    fn require_session(&self) -> Result<Session> {
        self.session.current().ok_or_else(|| {
            warn!("Checkout attempted without a session");
            Error::LoginRequired
        })
    }

    async fn persist(&self, session: &Session, lines: Vec<OrderLine>) -> Result<order_entity::Model> {
        order::create_order(
            &self.db,
            NewOrder {
                user_email: session.email.clone(),
                user_name: session.display_name.clone(),
                lines,
                discount: 0.0,
            },
        )
        .await
        .inspect_err(|e| error!("Error creating order: {e}"))
    }

    /// Waits out the confirmation delay, opens the link and flags the order.
    async fn hand_off(&self, mut order: order_entity::Model, link: Url) -> CheckoutReceipt {
        if !self.settings.handoff_delay.is_zero() {
            tokio::time::sleep(self.settings.handoff_delay).await;
        }
        self.handoff.open(&link);

        match order::mark_handoff_sent(&self.db, order.id).await {
            Ok(()) => order.handoff_sent = true,
            Err(e) => warn!(order_id = order.id, "Failed to flag handoff as sent: {e}"),
        }

        CheckoutReceipt {
            order,
            handoff_url: link,
        }
    }

    /// Submits the whole cart and clears it once the order is stored.
    ///
    /// # Errors
    /// Returns `Error::LoginRequired` without writing anything when nobody is
    /// signed in, `Error::Validation` for an empty cart, and the underlying error
    /// if the order cannot be stored.
    #[instrument(skip(self, cart), fields(items = cart.item_count()))]
    pub async fn checkout_cart(&self, cart: &mut CartStore) -> Result<CheckoutReceipt> {
        let session = self.require_session()?;
        if cart.is_empty() {
            return Err(Error::Validation {
                message: "Your cart is empty".to_string(),
            });
        }

        let lines: Vec<OrderLine> = cart.items().iter().map(OrderLine::from).collect();
        let message = handoff::cart_message(&self.settings, &session.email, cart.items());
        let link = handoff::build_link(
            &self.settings.messaging_base_url,
            &self.settings.fallback_contact,
            &message,
        )?;

        let order = self.persist(&session, lines).await?;
        info!(order_id = order.id, "Cart order submitted");

        if let Err(e) = cart.clear_cart() {
            warn!("Order stored but the cart could not be cleared: {e}");
        }

        Ok(self.hand_off(order, link).await)
    }

    /// Submits one unit of `product`. The cart is not touched.
    ///
    /// # Errors
    /// Same as [`CheckoutWorkflow::checkout_cart`], with `Error::Validation` for an
    /// out-of-stock product instead of the empty-cart case.
    #[instrument(skip(self, product), fields(product_id = product.id))]
    pub async fn buy_now(&self, product: &Product) -> Result<CheckoutReceipt> {
        let session = self.require_session()?;
        product.ensure_in_stock()?;

        let contact = if product.contact_number.trim().is_empty() {
            self.settings.fallback_contact.as_str()
        } else {
            product.contact_number.as_str()
        };
        let message = handoff::product_message(&self.settings, product);
        let link = handoff::build_link(&self.settings.messaging_base_url, contact, &message)?;

        let order = self
            .persist(&session, vec![OrderLine::for_product(product, 1)])
            .await?;
        info!(order_id = order.id, "Single product order submitted");

        Ok(self.hand_off(order, link).await)
    }
}
