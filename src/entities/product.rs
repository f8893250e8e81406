//! Product entity - Represents an item in the catalog.
//!
//! Products are created, patched and deleted from the admin panel. The only other
//! writer is order approval, which decrements `stock`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Netflix Gift Card")
    pub name: String,
    /// Free-form description shown on the product card
    pub description: String,
    /// Unit price in currency units
    pub price: f64,
    /// Units available; decremented when an order is approved
    pub stock: i64,
    /// Image reference (URL or data URI)
    pub image_url: String,
    /// Category label used for browsing
    pub category: String,
    /// Messaging contact number that receives purchase requests for this product
    pub contact_number: String,
    /// When the product was created; older records may not carry one
    pub created_at: Option<DateTimeUtc>,
}

/// Products are referenced by order snapshots only, never by foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
