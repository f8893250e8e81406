//! Order entity - A submitted purchase request awaiting administrator disposition.
//!
//! Line items are stored as a JSON snapshot of the cart at submission time, so
//! later product edits never change what an order says was bought.

use crate::models::OrderLine;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Email of the purchasing session
    pub user_email: String,
    /// Display name of the purchaser, when the identity carries one
    pub user_name: Option<String>,
    /// JSON array of [`OrderLine`] snapshots
    pub items: Json,
    /// Sum of price x quantity over all lines
    pub total: f64,
    /// Discount applied to the total
    pub discount: f64,
    /// `total - discount`
    pub final_total: f64,
    /// `"pending"`, `"approved"` or `"rejected"`
    pub status: String,
    /// Whether the messaging handoff was opened for this order
    pub handoff_sent: bool,
    /// When the order was submitted
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Decodes the line item snapshot.
    pub fn lines(&self) -> crate::errors::Result<Vec<OrderLine>> {
        serde_json::from_value(self.items.clone()).map_err(Into::into)
    }
}

/// Orders are standalone documents
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
