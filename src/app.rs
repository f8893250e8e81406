//! Application context.
//!
//! Owns one instance of each stateful component and hands them to callers
//! explicitly. The session subscription is opened in [`Storefront::start`] and
//! torn down in [`Storefront::shutdown`].

use crate::{
    config::settings::{CART_STORAGE_KEY, Settings},
    core::{
        admin::AdminGate,
        cart::CartStore,
        catalog::CatalogLoader,
        checkout::{CheckoutReceipt, CheckoutWorkflow},
        handoff::MessagingHandoff,
        identity::IdentityProvider,
        session::SessionMirror,
        storage::CartStorage,
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::info;

/// Everything a storefront front end needs, wired together.
pub struct Storefront {
    settings: Arc<Settings>,
    db: DatabaseConnection,
    identity: Arc<dyn IdentityProvider>,
    session: SessionMirror,
    cart: CartStore,
    catalog: CatalogLoader,
    checkout: CheckoutWorkflow,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("settings", &self.settings)
            .field("session", &self.session)
            .field("cart", &self.cart)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Attaches the session mirror, restores the cart and loads the catalog.
    pub async fn start(
        settings: Settings,
        db: DatabaseConnection,
        identity: Arc<dyn IdentityProvider>,
        cart_storage: Box<dyn CartStorage>,
        handoff: Arc<dyn MessagingHandoff>,
    ) -> Self {
        let settings = Arc::new(settings);
        let session = SessionMirror::new();
        session.attach(identity.as_ref());

        let cart = CartStore::open(cart_storage, CART_STORAGE_KEY);
        let catalog = CatalogLoader::mount(db.clone()).await;
        let checkout = CheckoutWorkflow::new(
            db.clone(),
            session.clone(),
            handoff,
            Arc::clone(&settings),
        );

        info!(
            products = catalog.products().len(),
            cart_items = cart.item_count(),
            "Storefront started"
        );
        Self {
            settings,
            db,
            identity,
            session,
            cart,
            catalog,
            checkout,
        }
    }

    /// Active settings
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Identity provider, for sign-in and sign-up forms
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Mirrored session
    #[must_use]
    pub const fn session(&self) -> &SessionMirror {
        &self.session
    }

    /// The shopper's cart
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Mutable access for the cart view
    pub const fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    /// Catalog state
    #[must_use]
    pub const fn catalog(&self) -> &CatalogLoader {
        &self.catalog
    }

    /// Mutable access for refreshing the catalog
    pub const fn catalog_mut(&mut self) -> &mut CatalogLoader {
        &mut self.catalog
    }

    /// Adds one unit of a catalog product to the cart.
    ///
    /// # Errors
    /// `Error::ProductNotFound` if the product is not in the loaded catalog and
    /// `Error::Validation` if it is out of stock.
    pub fn add_to_cart(&mut self, product_id: i64) -> Result<()> {
        let product = self
            .catalog
            .find(product_id)
            .ok_or(Error::ProductNotFound { id: product_id })?;
        product.ensure_in_stock()?;
        self.cart.add_item(product)
    }

    /// Submits the cart.
    pub async fn checkout_cart(&mut self) -> Result<CheckoutReceipt> {
        self.checkout.checkout_cart(&mut self.cart).await
    }

    /// Submits one unit of a catalog product.
    ///
    /// # Errors
    /// `Error::ProductNotFound` if the product is not in the loaded catalog, plus
    /// the errors of [`CheckoutWorkflow::buy_now`].
    pub async fn buy_now(&self, product_id: i64) -> Result<CheckoutReceipt> {
        let product = self
            .catalog
            .find(product_id)
            .ok_or(Error::ProductNotFound { id: product_id })?;
        self.checkout.buy_now(product).await
    }

    /// Gate for the admin panel.
    #[must_use]
    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(
            self.db.clone(),
            Arc::clone(&self.identity),
            self.session.clone(),
            self.settings.admin_email.clone(),
        )
    }

    /// Tears down the session subscription.
    pub fn shutdown(&self) {
        if self.session.detach() {
            info!("Storefront stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        handoff::RecordingHandoff, identity::LocalIdentityProvider, order,
        storage::MemoryCartStorage,
    };
    use crate::test_utils::*;
    use std::time::Duration;

    async fn start(db: &DatabaseConnection, storage: MemoryCartStorage) -> Storefront {
        let settings = Settings {
            handoff_delay: Duration::ZERO,
            ..Settings::default()
        };
        let identity = Arc::new(LocalIdentityProvider::new(db.clone(), "admin@admin.com"));
        Storefront::start(
            settings,
            db.clone(),
            identity,
            Box::new(storage),
            Arc::new(RecordingHandoff::new()),
        )
        .await
    }

    #[tokio::test]
    async fn test_shopping_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let mug = create_test_product(&db, "Mug", 12.0, 3).await?;
        let sold_out = create_test_product(&db, "Poster", 5.0, 0).await?;
        let mut store = start(&db, MemoryCartStorage::new()).await;

        assert!(!store.catalog().is_loading());
        assert_eq!(store.catalog().products().len(), 2);

        store.add_to_cart(mug.id)?;
        store.add_to_cart(mug.id)?;
        assert!(matches!(
            store.add_to_cart(sold_out.id).unwrap_err(),
            Error::Validation { message: _ }
        ));
        assert!(matches!(
            store.add_to_cart(99).unwrap_err(),
            Error::ProductNotFound { id: 99 }
        ));
        assert_eq!(store.cart().total(), 24.0);

        assert!(matches!(
            store.checkout_cart().await.unwrap_err(),
            Error::LoginRequired
        ));

        store.identity().sign_up("a@b.com", "secret1", "A").await?;
        let receipt = store.checkout_cart().await?;
        assert_eq!(receipt.order.total, 24.0);
        assert!(store.cart().is_empty());
        assert_eq!(order::get_pending_orders(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_buy_now_refuses_sold_out_product() -> Result<()> {
        let db = setup_test_db().await?;
        let sold_out = create_test_product(&db, "Poster", 5.0, 0).await?;
        let store = start(&db, MemoryCartStorage::new()).await;
        store.identity().sign_up("a@b.com", "secret1", "A").await?;

        let err = store.buy_now(sold_out.id).await.unwrap_err();
        assert!(matches!(err, Error::Validation { message: _ }));
        assert!(order::get_all_orders(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cart_survives_restart() -> Result<()> {
        let db = setup_test_db().await?;
        let mug = create_test_product(&db, "Mug", 12.0, 3).await?;
        let storage = MemoryCartStorage::new();

        let mut store = start(&db, storage.clone()).await;
        store.add_to_cart(mug.id)?;
        store.shutdown();

        let store = start(&db, storage).await;
        assert_eq!(store.cart().item_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_stops_session_updates() -> Result<()> {
        let db = setup_test_db().await?;
        let store = start(&db, MemoryCartStorage::new()).await;
        let gate = store.admin_gate();

        store.shutdown();
        store.identity().sign_up("admin@admin.com", "secret1", "Admin").await?;
        assert!(!store.session().is_signed_in());
        assert!(!gate.admit().is_admitted());
        Ok(())
    }
}
