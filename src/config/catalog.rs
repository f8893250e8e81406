//! Seed catalog loading from catalog.toml
//!
//! The products listed here are inserted on startup when the products collection
//! is still empty, so a fresh install has something to browse.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default seed file location
pub const DEFAULT_CATALOG_PATH: &str = "catalog.toml";

/// The whole catalog.toml file
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// Products to seed
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// One seed product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    /// Product name
    pub name: String,
    /// Description shown on the card
    #[serde(default)]
    pub description: String,
    /// Unit price
    pub price: f64,
    /// Initial stock
    #[serde(default)]
    pub stock: i64,
    /// Image reference
    #[serde(default)]
    pub image_url: String,
    /// Category label
    #[serde(default)]
    pub category: String,
    /// Contact number that receives purchase requests
    pub contact_number: String,
}

/// Loads the seed catalog from a TOML file.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog file: {e}"),
    })
}
