//! Framework-agnostic domain types shared by the catalog, cart, checkout and admin layers.

use crate::{
    entities::product,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A catalog product as the storefront sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Description shown on the card
    pub description: String,
    /// Unit price in currency units
    pub price: f64,
    /// Units available when the catalog was loaded
    pub stock: i64,
    /// Image reference
    pub image_url: String,
    /// Category label
    pub category: String,
    /// Contact number that receives purchase requests
    pub contact_number: String,
    /// Creation time, "now" for records stored without one
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be put in a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Refuses products with no stock left, before any cart or order write.
    ///
    /// # Errors
    /// `Error::Validation` when the product is out of stock.
    pub fn ensure_in_stock(&self) -> Result<()> {
        if self.in_stock() {
            Ok(())
        } else {
            Err(Error::Validation {
                message: format!("{} is out of stock", self.name),
            })
        }
    }
}

impl From<product::Model> for Product {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            image_url: model.image_url,
            category: model.category,
            contact_number: model.contact_number,
            created_at: model.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// A product in the cart together with the chosen quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product snapshot taken when it was added
    #[serde(flatten)]
    pub product: Product,
    /// Units in the cart, at least 1
    pub quantity: u32,
}

impl CartItem {
    /// price x quantity
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

/// Line item snapshot stored inside an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Referenced product
    pub product_id: i64,
    /// Name at submission time
    pub name: String,
    /// Unit price at submission time
    pub price: f64,
    /// Units ordered
    pub quantity: u32,
    /// Image reference at submission time
    pub image_url: String,
    /// Category at submission time
    pub category: String,
}

impl OrderLine {
    /// price x quantity
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    /// Builds a line for `quantity` units of `product`.
    #[must_use]
    pub fn for_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity,
            image_url: product.image_url.clone(),
            category: product.category.clone(),
        }
    }
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self::for_product(&item.product, item.quantity)
    }
}

/// Lifecycle of an order. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Submitted, waiting for an administrator
    Pending,
    /// Accepted; stock has been decremented
    Approved,
    /// Declined
    Rejected,
}

impl OrderStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Only `pending -> approved` and `pending -> rejected` are allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::Validation {
                message: format!("Unknown order status '{other}'"),
            }),
        }
    }
}

/// The signed-in identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Provider uid
    pub uid: i64,
    /// Account email
    pub email: String,
    /// Display name, if the account has one
    pub display_name: Option<String>,
}
