//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants follow
//! the failure classes a shopper or administrator can run into: identity errors
//! from the provider, database failures, validation problems caught before any
//! write, and workflow gating (login required, access denied).

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Missing or malformed configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Input rejected before any write was attempted
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A price or quantity that is negative, zero where not allowed, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected value
        amount: f64,
    },

    /// No product with this id exists
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product id
        id: i64,
    },

    /// No order with this id exists
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Requested order id
        id: i64,
    },

    /// The order is not in a state that allows the requested transition
    #[error("Order {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Order id
        id: i64,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The operation needs a signed-in session
    #[error("You must sign in to continue")]
    LoginRequired,

    /// The signed-in account is not allowed into the admin panel
    #[error("Access denied for {email}")]
    AccessDenied {
        /// Email of the rejected session
        email: String,
    },

    /// Error text reported by the identity provider, kept verbatim
    #[error("{message}")]
    Identity {
        /// Provider message
        message: String,
    },

    /// Local cart storage could not be read or written
    #[error("Cart storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A persisted payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A handoff link could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Text shown to the user in a blocking alert.
    ///
    /// Identity, validation and gating errors are shown as they are; database and
    /// storage failures collapse into one generic message with no error code.
    #[must_use]
    pub fn alert_text(&self) -> String {
        match self {
            Self::Identity { message } | Self::Validation { message } => message.clone(),
            Self::LoginRequired
            | Self::AccessDenied { .. }
            | Self::InvalidAmount { .. }
            | Self::ProductNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::InvalidStatusTransition { .. } => self.to_string(),
            Self::Database(_)
            | Self::Config { .. }
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::Url(_) => {
                "Something went wrong while processing your request. Please try again.".to_string()
            }
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
