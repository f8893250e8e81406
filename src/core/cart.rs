//! Persistent cart store.
//!
//! Holds the shopper's unsubmitted selection. Every mutation is written through to
//! a [`CartStorage`] under one fixed key so the cart survives a restart. The store
//! itself never clamps quantities; [`CartStore::increment`] and
//! [`CartStore::decrement`] apply the `[1, stock]` clamp the cart view uses.

use crate::{
    core::storage::CartStorage,
    errors::Result,
    models::{CartItem, Product},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Shape written to storage
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCart {
    items: Vec<CartItem>,
}

/// The shopper's cart
pub struct CartStore {
    items: Vec<CartItem>,
    storage: Box<dyn CartStorage>,
    key: String,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Clamps a requested quantity into `[1, stock]`.
///
/// The lower bound wins when stock is below 1, so an existing line never drops to zero.
#[must_use]
pub fn clamp_quantity(requested: i64, stock: i64) -> u32 {
    u32::try_from(requested.min(stock).max(1)).unwrap_or(u32::MAX)
}

impl CartStore {
    /// Opens the cart persisted under `key`.
    ///
    /// A missing payload yields an empty cart. An unreadable or undecodable payload
    /// is logged and also yields an empty cart; there is no migration path.
    pub fn open(storage: Box<dyn CartStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = match storage.load(&key) {
            Ok(Some(payload)) => match serde_json::from_str::<PersistedCart>(&payload) {
                Ok(persisted) => persisted.items,
                Err(e) => {
                    warn!(key = %key, "Discarding unreadable cart payload: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %key, "Failed to load persisted cart: {e}");
                Vec::new()
            }
        };
        debug!(key = %key, items = items.len(), "Cart opened");
        Self {
            items,
            storage,
            key,
        }
    }

    /// Line items in insertion order
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct products in the cart
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the product card allows adding this product
    #[must_use]
    pub const fn can_add(product: &Product) -> bool {
        product.in_stock()
    }

    /// Adds one unit of `product`, merging with an existing line for the same id.
    ///
    /// No stock check happens here.
    pub fn add_item(&mut self, product: &Product) -> Result<()> {
        self.apply(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.product.id == product.id) {
                item.quantity = item.quantity.saturating_add(1);
            } else {
                items.push(CartItem {
                    product: product.clone(),
                    quantity: 1,
                });
            }
        })
    }

    /// Removes the line for `product_id`; no-op if absent.
    pub fn remove_item(&mut self, product_id: i64) -> Result<()> {
        self.apply(|items| items.retain(|i| i.product.id != product_id))
    }

    /// Sets the quantity of the line for `product_id` as given.
    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) -> Result<()> {
        self.apply(|items| {
            for item in items.iter_mut().filter(|i| i.product.id == product_id) {
                item.quantity = quantity;
            }
        })
    }

    /// One more unit, capped at the product's stock.
    pub fn increment(&mut self, product_id: i64) -> Result<()> {
        let Some(next) = self.clamped(product_id, 1) else {
            return Ok(());
        };
        self.update_quantity(product_id, next)
    }

    /// One less unit, never below 1.
    pub fn decrement(&mut self, product_id: i64) -> Result<()> {
        let Some(next) = self.clamped(product_id, -1) else {
            return Ok(());
        };
        self.update_quantity(product_id, next)
    }

    fn clamped(&self, product_id: i64, delta: i64) -> Option<u32> {
        self.items
            .iter()
            .find(|i| i.product.id == product_id)
            .map(|i| clamp_quantity(i64::from(i.quantity) + delta, i.product.stock))
    }

    /// Empties the cart.
    pub fn clear_cart(&mut self) -> Result<()> {
        self.apply(Vec::clear)
    }

    /// Sum of price x quantity over all lines, computed on every call.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Runs `change` and persists. If the write fails the previous items are
    /// restored, so memory never disagrees with storage.
    fn apply<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<CartItem>),
    {
        let previous = self.items.clone();
        change(&mut self.items);
        if let Err(e) = self.persist() {
            self.items = previous;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let payload = serde_json::to_string(&PersistedCart {
            items: self.items.clone(),
        })?;
        self.storage.save(&self.key, &payload).inspect_err(|e| {
            warn!(key = %self.key, "Failed to persist cart: {e}");
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::storage::{FileCartStorage, MemoryCartStorage};
    use crate::test_utils::sample_product;

    /// Reads fine, refuses every write.
    struct ReadOnlyStorage;

    impl CartStorage for ReadOnlyStorage {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn save(&self, _key: &str, _payload: &str) -> Result<()> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn test_failed_write_keeps_previous_items() {
        let mut cart = CartStore::open(Box::new(ReadOnlyStorage), "test-cart");
        let product = sample_product(1, 10.0, 5);

        assert!(cart.add_item(&product).is_err());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0.0);
    }

    fn empty_cart() -> (CartStore, MemoryCartStorage) {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::open(Box::new(storage.clone()), "test-cart");
        (cart, storage)
    }

    #[test]
    fn test_add_same_product_twice_merges() -> Result<()> {
        let (mut cart, _) = empty_cart();
        let product = sample_product(1, 1000.0, 5);

        cart.add_item(&product)?;
        cart.add_item(&product)?;

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        Ok(())
    }

    #[test]
    fn test_total_over_distinct_products() -> Result<()> {
        let (mut cart, _) = empty_cart();
        let prices = [3.5, 10.0, 0.25, 99.99];
        for (id, price) in (1..).zip(prices) {
            cart.add_item(&sample_product(id, price, 10))?;
        }
        let expected: f64 = cart.items().iter().map(|i| i.product.price * f64::from(i.quantity)).sum();
        assert_eq!(cart.total(), expected);
        assert_eq!(cart.item_count(), prices.len());
        Ok(())
    }

    #[test]
    fn test_total_scenario() -> Result<()> {
        let (mut cart, _) = empty_cart();
        let p1 = sample_product(1, 1000.0, 10);
        let p2 = sample_product(2, 500.0, 10);
        cart.add_item(&p1)?;
        cart.add_item(&p1)?;
        cart.add_item(&p2)?;
        assert_eq!(cart.total(), 2500.0);
        Ok(())
    }

    #[test]
    fn test_update_quantity_reflects_immediately() -> Result<()> {
        let (mut cart, _) = empty_cart();
        cart.add_item(&sample_product(1, 20.0, 10))?;
        cart.update_quantity(1, 7)?;
        assert_eq!(cart.total(), 140.0);
        Ok(())
    }

    #[test]
    fn test_update_quantity_does_not_clamp() -> Result<()> {
        let (mut cart, _) = empty_cart();
        cart.add_item(&sample_product(1, 1.0, 2))?;
        cart.update_quantity(1, 50)?;
        assert_eq!(cart.items()[0].quantity, 50);
        Ok(())
    }

    #[test]
    fn test_clear_cart_resets_total() -> Result<()> {
        let (mut cart, _) = empty_cart();
        cart.add_item(&sample_product(1, 15.0, 3))?;
        cart.add_item(&sample_product(2, 5.0, 3))?;
        cart.clear_cart()?;
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0.0);
        Ok(())
    }

    #[test]
    fn test_remove_item_absent_is_noop() -> Result<()> {
        let (mut cart, _) = empty_cart();
        cart.add_item(&sample_product(1, 15.0, 3))?;
        cart.remove_item(42)?;
        assert_eq!(cart.item_count(), 1);
        cart.remove_item(1)?;
        assert!(cart.is_empty());
        Ok(())
    }

    #[test]
    fn test_increment_and_decrement_clamp_to_stock() -> Result<()> {
        let (mut cart, _) = empty_cart();
        cart.add_item(&sample_product(1, 10.0, 2))?;

        cart.increment(1)?;
        cart.increment(1)?;
        assert_eq!(cart.items()[0].quantity, 2);

        cart.decrement(1)?;
        cart.decrement(1)?;
        assert_eq!(cart.items()[0].quantity, 1);
        Ok(())
    }

    #[test]
    fn test_can_add_requires_stock() {
        assert!(CartStore::can_add(&sample_product(1, 10.0, 1)));
        assert!(!CartStore::can_add(&sample_product(1, 10.0, 0)));
    }

    #[test]
    fn test_cart_survives_reopen() -> Result<()> {
        let (mut cart, storage) = empty_cart();
        cart.add_item(&sample_product(1, 12.0, 4))?;
        cart.add_item(&sample_product(1, 12.0, 4))?;
        drop(cart);

        let reopened = CartStore::open(Box::new(storage), "test-cart");
        assert_eq!(reopened.item_count(), 1);
        assert_eq!(reopened.items()[0].quantity, 2);
        assert_eq!(reopened.total(), 24.0);
        Ok(())
    }

    #[test]
    fn test_cart_survives_reopen_from_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        {
            let mut cart = CartStore::open(Box::new(FileCartStorage::new(dir.path())), "cart");
            cart.add_item(&sample_product(3, 7.5, 4))?;
        }
        let reopened = CartStore::open(Box::new(FileCartStorage::new(dir.path())), "cart");
        assert_eq!(reopened.items()[0].product.id, 3);
        Ok(())
    }

    #[test]
    fn test_corrupt_payload_opens_empty() -> Result<()> {
        let storage = MemoryCartStorage::new();
        storage.save("cart", "not json")?;
        let cart = CartStore::open(Box::new(storage), "cart");
        assert!(cart.is_empty());
        Ok(())
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(0, 5), 1);
        assert_eq!(clamp_quantity(6, 5), 5);
        assert_eq!(clamp_quantity(3, 5), 3);
        assert_eq!(clamp_quantity(2, 0), 1);
    }
}
