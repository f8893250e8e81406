//! Catalog loader.
//!
//! Fetches the product list once on mount and on every manual refresh, exposing
//! loading and error state alongside the products. Failures are logged and kept
//! in `error`; nothing is retried automatically.

use crate::{core::product, errors::Result, models::Product};
use sea_orm::DatabaseConnection;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

/// Catalog state for browsing views
#[derive(Debug)]
pub struct CatalogLoader {
    db: DatabaseConnection,
    products: Vec<Product>,
    loading: bool,
    error: Option<String>,
}

impl CatalogLoader {
    /// A loader that has not fetched anything yet. `loading` starts as `true`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            products: Vec::new(),
            loading: true,
            error: None,
        }
    }

    /// Creates the loader and issues the initial list query.
    pub async fn mount(db: DatabaseConnection) -> Self {
        let mut loader = Self::new(db);
        if let Err(e) = loader.refresh().await {
            debug!("Catalog mounted without products: {e}");
        }
        loader
    }

    /// Repeats the list query.
    ///
    /// On success the products are replaced and `error` is cleared. On failure the
    /// previous products are kept and `error` holds the message. `loading` is
    /// cleared either way.
    pub async fn refresh(&mut self) -> Result<()> {
        self.loading = true;
        let result = product::get_all_products(&self.db).await;
        self.loading = false;

        match result {
            Ok(models) => {
                self.products = models.into_iter().map(Product::from).collect();
                self.error = None;
                info!(count = self.products.len(), "Catalog loaded");
                Ok(())
            }
            Err(e) => {
                error!("Error loading products: {e}");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Products from the last successful load
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Whether a query is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed load, if any
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Looks a product up by id.
    #[must_use]
    pub fn find(&self, product_id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Distinct non-empty category labels, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.products
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Products carrying the given category label.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Product> {
        self.products.iter().filter(move |p| p.category == category)
    }

    /// Free-text search over name, description and category.
    ///
    /// Case-insensitive substring match; an empty term matches every product.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let needle = term.to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{
        create_custom_product, create_test_product, new_product, setup_empty_db, setup_test_db,
    };
    use sea_orm::ConnectionTrait;

    #[tokio::test]
    async fn test_mount_loads_products() -> Result<()> {
        let db = setup_test_db().await?;
        create_custom_product(&db, "Steam", 50.0, 3, "games").await?;
        create_custom_product(&db, "Netflix", 35.0, 2, "streaming").await?;
        create_custom_product(&db, "Xbox", 40.0, 1, "games").await?;

        let catalog = CatalogLoader::mount(db).await;
        assert!(!catalog.is_loading());
        assert!(catalog.error().is_none());
        assert_eq!(catalog.products().len(), 3);
        assert_eq!(catalog.categories(), vec!["games", "streaming"]);
        assert_eq!(catalog.in_category("games").count(), 2);

        let first = &catalog.products()[0];
        assert_eq!(catalog.find(first.id).unwrap().name, "Steam");
        assert!(catalog.find(999).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_search_matches_name_description_and_category() -> Result<()> {
        let db = setup_test_db().await?;
        create_custom_product(&db, "Steam Card", 50.0, 3, "Games").await?;
        create_custom_product(&db, "Netflix", 35.0, 2, "streaming").await?;
        let mut described = new_product("Spotify");
        described.description = "Premium MUSIC plan".to_string();
        described.category = "streaming".to_string();
        product::create_product(&db, described).await?;

        let catalog = CatalogLoader::mount(db).await;
        assert_eq!(catalog.search("").len(), 3);

        let names = |term: &str| -> Vec<String> {
            catalog.search(term).into_iter().map(|p| p.name.clone()).collect()
        };
        assert_eq!(names("steam"), vec!["Steam Card"]);
        assert_eq!(names("games"), vec!["Steam Card"]);
        assert_eq!(names("music"), vec!["Spotify"]);
        assert_eq!(names("STREAM"), vec!["Netflix", "Spotify"]);
        assert!(names("xbox").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_first_load_leaves_empty_products() -> Result<()> {
        // No tables, so the list query fails
        let db = setup_empty_db().await?;

        let catalog = CatalogLoader::mount(db).await;
        assert!(!catalog.is_loading());
        assert!(catalog.error().unwrap().contains("products"));
        assert!(catalog.products().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_products() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_product(&db, "Kept", 10.0, 1).await?;

        let mut catalog = CatalogLoader::mount(db).await;
        assert_eq!(catalog.products().len(), 1);

        catalog.db.execute_unprepared("DROP TABLE products").await?;
        assert!(catalog.refresh().await.is_err());
        assert!(!catalog.is_loading());
        assert!(catalog.error().is_some());
        assert_eq!(catalog.products()[0].name, "Kept");
        Ok(())
    }

    #[tokio::test]
    async fn test_successful_refresh_clears_error() -> Result<()> {
        let db = setup_test_db().await?;
        let mut catalog = CatalogLoader::new(db);
        catalog.error = Some("previous failure".to_string());

        catalog.refresh().await?;
        assert!(catalog.error().is_none());
        Ok(())
    }
}
