//! Shared test utilities for the storefront.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        identity::{IdentityProvider, LocalIdentityProvider},
        order::{self, NewOrder},
        product::{self, NewProduct},
        session::SessionMirror,
    },
    entities,
    errors::Result,
    models::{OrderLine, Product},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an in-memory `SQLite` database without any tables.
/// Every query against it fails, which exercises the error paths.
pub async fn setup_empty_db() -> Result<DatabaseConnection> {
    sea_orm::Database::connect("sqlite::memory:")
        .await
        .map_err(Into::into)
}

/// Builds an in-memory product without touching the database.
///
/// # Defaults
/// * `name`: "Product <id>"
/// * `category`: "General"
/// * `contact_number`: "51900000000"
pub fn sample_product(id: i64, price: f64, stock: i64) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        description: String::new(),
        price,
        stock,
        image_url: String::new(),
        category: "General".to_string(),
        contact_number: "51900000000".to_string(),
        created_at: Utc::now(),
    }
}

/// Fields for a valid product called `name`.
pub fn new_product(name: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        price: 10.0,
        stock: 5,
        category: "General".to_string(),
        contact_number: "51900000000".to_string(),
        ..Default::default()
    }
}

/// Creates a test product in the "General" category.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    stock: i64,
) -> Result<entities::product::Model> {
    create_custom_product(db, name, price, stock, "General").await
}

/// Creates a test product with a custom category.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    stock: i64,
    category: &str,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            price,
            stock,
            category: category.to_string(),
            ..new_product(name)
        },
    )
    .await
}

/// Creates a pending order for `quantity` units of one product.
pub async fn create_test_order(
    db: &DatabaseConnection,
    email: &str,
    product: &entities::product::Model,
    quantity: u32,
) -> Result<entities::order::Model> {
    let product = Product::from(product.clone());
    order::create_order(
        db,
        NewOrder {
            user_email: email.to_string(),
            user_name: None,
            lines: vec![OrderLine::for_product(&product, quantity)],
            discount: 0.0,
        },
    )
    .await
}

/// Registers `email` with a local provider and returns a mirror attached to it.
pub async fn signed_in_session(
    db: &DatabaseConnection,
    email: &str,
) -> Result<(LocalIdentityProvider, SessionMirror)> {
    let provider = LocalIdentityProvider::new(db.clone(), "admin@admin.com");
    let session = SessionMirror::new();
    session.attach(&provider);
    provider.sign_up(email, "secret1", "Shopper").await?;
    Ok((provider, session))
}
