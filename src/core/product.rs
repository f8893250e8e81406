//! Product business logic - Handles all product-related database operations.
//!
//! This module provides functions for listing, creating, patching and deleting catalog
//! products, plus the stock decrement used by order approval. All functions are async
//! and return Result types for proper error handling throughout the system.

use crate::{
    config::catalog::ProductSeed,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

/// Fields for a new product.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    /// Display name (required)
    pub name: String,
    /// Description
    pub description: String,
    /// Unit price (required, positive)
    pub price: f64,
    /// Initial stock
    pub stock: i64,
    /// Image reference
    pub image_url: String,
    /// Category label
    pub category: String,
    /// Messaging contact number (required)
    pub contact_number: String,
}

/// Arbitrary field patch; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New price
    pub price: Option<f64>,
    /// New stock
    pub stock: Option<i64>,
    /// New image reference
    pub image_url: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New contact number
    pub contact_number: Option<String>,
}

/// Retrieves every product in creation order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Number of products in the catalog.
pub async fn count_products(db: &DatabaseConnection) -> Result<u64> {
    Product::find().count(db).await.map_err(Into::into)
}

/// Creates a product after checking the required fields.
///
/// # Errors
/// Returns an error if:
/// - The name or contact number is empty or whitespace-only
/// - The price is zero, negative or not finite (NaN, infinity)
/// - The stock is negative
/// - The database insert operation fails
#[instrument(skip(db))]
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    if new.name.trim().is_empty() || new.contact_number.trim().is_empty() {
        return Err(Error::Validation {
            message: "Name, price and contact number are required".to_string(),
        });
    }

    if !new.price.is_finite() || new.price <= 0.0 {
        return Err(Error::InvalidAmount { amount: new.price });
    }

    if new.stock < 0 {
        return Err(Error::Validation {
            message: "Stock cannot be negative".to_string(),
        });
    }

    let product = product::ActiveModel {
        name: Set(new.name.trim().to_string()),
        description: Set(new.description),
        price: Set(new.price),
        stock: Set(new.stock),
        image_url: Set(new.image_url),
        category: Set(new.category.trim().to_string()),
        contact_number: Set(new.contact_number.trim().to_string()),
        created_at: Set(Some(chrono::Utc::now())),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!(product_id = created.id, "Product created");
    Ok(created)
}

/// Applies `patch` to an existing product. Patched values are stored as given.
///
/// # Errors
/// Returns an error if the product does not exist or the update fails.
#[instrument(skip(db))]
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    patch: ProductPatch,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    if let Some(name) = patch.name {
        product.name = Set(name);
    }
    if let Some(description) = patch.description {
        product.description = Set(description);
    }
    if let Some(price) = patch.price {
        product.price = Set(price);
    }
    if let Some(stock) = patch.stock {
        product.stock = Set(stock);
    }
    if let Some(image_url) = patch.image_url {
        product.image_url = Set(image_url);
    }
    if let Some(category) = patch.category {
        product.category = Set(category);
    }
    if let Some(contact_number) = patch.contact_number {
        product.contact_number = Set(contact_number);
    }

    product.update(db).await.map_err(Into::into)
}

/// Removes a product from the catalog. Orders keep their own snapshots.
///
/// # Errors
/// Returns an error if the product does not exist or the delete fails.
#[instrument(skip(db))]
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let result = Product::delete_by_id(product_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::ProductNotFound { id: product_id });
    }
    info!(product_id, "Product deleted");
    Ok(())
}

/// Subtracts `quantity` from a product's stock in a single UPDATE statement.
///
/// Runs as `UPDATE products SET stock = stock - ? WHERE id = ?`, so concurrent
/// decrements cannot overwrite each other. Returns the updated product, or `None`
/// if the product no longer exists. Stock is allowed to go below zero.
pub async fn decrement_stock_atomic<C>(
    db: &C,
    product_id: i64,
    quantity: i64,
) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }

    let updated = Product::find_by_id(product_id).one(db).await?;
    if let Some(product) = &updated {
        if product.stock < 0 {
            warn!(product_id, stock = product.stock, "Stock went negative");
        }
    }
    Ok(updated)
}

/// Inserts `seeds` when the catalog is empty. Returns how many were inserted.
pub async fn seed_products(db: &DatabaseConnection, seeds: &[ProductSeed]) -> Result<usize> {
    if count_products(db).await? > 0 {
        info!("Catalog already populated, skipping seed");
        return Ok(0);
    }

    for seed in seeds {
        create_product(
            db,
            NewProduct {
                name: seed.name.clone(),
                description: seed.description.clone(),
                price: seed.price,
                stock: seed.stock,
                image_url: seed.image_url.clone(),
                category: seed.category.clone(),
                contact_number: seed.contact_number.clone(),
            },
        )
        .await?;
    }
    info!(count = seeds.len(), "Seeded catalog");
    Ok(seeds.len())
}
