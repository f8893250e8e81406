//! Runtime settings loaded from environment variables.
//!
//! Every value has a default so the storefront starts with an empty environment.
//! Service credentials for external collaborators are not handled here.

use crate::config::{catalog::DEFAULT_CATALOG_PATH, database::DEFAULT_DATABASE_URL};
use crate::errors::{Error, Result};
use std::{path::PathBuf, time::Duration};
use tracing::info;

/// Fixed storage key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "shopfront-cart";

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Database connection string
    pub database_url: String,
    /// The single email admitted to the admin panel
    pub admin_email: String,
    /// Directory holding the persisted cart
    pub cart_storage_dir: PathBuf,
    /// Base URL of the messaging service (e.g. `https://wa.me`)
    pub messaging_base_url: String,
    /// Contact used for cart checkouts and products without their own number
    pub fallback_contact: String,
    /// Pause between a successful order write and the handoff
    pub handoff_delay: Duration,
    /// Prefix used when formatting prices
    pub currency_symbol: String,
    /// Store name used in checkout messages
    pub store_name: String,
    /// Seed catalog file
    pub catalog_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_email: "admin@admin.com".to_string(),
            cart_storage_dir: PathBuf::from("data"),
            messaging_base_url: "https://wa.me".to_string(),
            fallback_contact: "51937074085".to_string(),
            handoff_delay: Duration::from_millis(2000),
            currency_symbol: "S/".to_string(),
            store_name: "Shopfront".to_string(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

impl Settings {
    /// Reads settings from the environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns `Error::Config` if `HANDOFF_DELAY_MS` is set but is not a number.
    pub fn from_env() -> Result<Self> {
        let settings = Self::from_lookup(|key| std::env::var(key).ok())?;
        info!(admin_email = %settings.admin_email, "Settings loaded");
        Ok(settings)
    }

    /// Builds settings from any key lookup. Blank values count as unset.
    ///
    /// # Errors
    /// Returns `Error::Config` if `HANDOFF_DELAY_MS` is set but is not a number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let handoff_delay = match var("HANDOFF_DELAY_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|e| {
                Error::Config {
                    message: format!("Invalid HANDOFF_DELAY_MS '{raw}': {e}"),
                }
            })?),
            None => defaults.handoff_delay,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            admin_email: var("ADMIN_EMAIL")
                .map_or(defaults.admin_email, |email| email.trim().to_lowercase()),
            cart_storage_dir: var("CART_STORAGE_DIR")
                .map_or(defaults.cart_storage_dir, PathBuf::from),
            messaging_base_url: var("MESSAGING_BASE_URL").unwrap_or(defaults.messaging_base_url),
            fallback_contact: var("FALLBACK_CONTACT").unwrap_or(defaults.fallback_contact),
            handoff_delay,
            currency_symbol: var("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            store_name: var("STORE_NAME").unwrap_or(defaults.store_name),
            catalog_path: var("CATALOG_SEED_PATH").map_or(defaults.catalog_path, PathBuf::from),
        })
    }

    /// Formats an amount the way prices are shown to shoppers.
    #[must_use]
    pub fn format_price(&self, amount: f64) -> String {
        format!("{} {amount:.2}", self.currency_symbol)
    }
}
