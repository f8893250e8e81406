//! Messaging handoff - Builds pre-filled chat links and hands them off.
//!
//! The storefront never waits for or reads a reply; opening the link is the end of
//! its involvement.

use crate::{
    config::settings::Settings,
    errors::{Error, Result},
    models::{CartItem, Product},
};
use std::sync::{Mutex, PoisonError};
use tracing::info;
use url::{Url, form_urlencoded};

/// Where a finished checkout sends the shopper.
pub trait MessagingHandoff: Send + Sync {
    /// Opens `link`. Fire-and-forget.
    fn open(&self, link: &Url);
}

/// Logs the link instead of opening anything. Used by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandoff;

impl MessagingHandoff for LoggingHandoff {
    fn open(&self, link: &Url) {
        info!(link = %link, "Messaging handoff ready");
    }
}

/// Keeps every opened link so a caller can render or assert on it.
#[derive(Debug, Default)]
pub struct RecordingHandoff {
    opened: Mutex<Vec<Url>>,
}

impl RecordingHandoff {
    /// An empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links opened so far, oldest first
    #[must_use]
    pub fn opened(&self) -> Vec<Url> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MessagingHandoff for RecordingHandoff {
    fn open(&self, link: &Url) {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(link.clone());
    }
}

/// Percent-encodes `text` for a query value, spaces as `%20`.
fn encode_component(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Builds `<base>/<contact>?text=<message>`.
///
/// Only the digits of `contact` are kept, so `+51 937 074 085` and
/// `51937074085` produce the same link.
///
/// # Errors
/// Returns `Error::Validation` if `contact` has no digits and `Error::Url` if
/// `base` is not a valid URL.
pub fn build_link(base: &str, contact: &str, message: &str) -> Result<Url> {
    let digits: String = contact.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(Error::Validation {
            message: format!("Contact number '{contact}' has no digits"),
        });
    }

    let mut link = Url::parse(&format!("{}/{digits}", base.trim_end_matches('/')))?;
    link.set_query(Some(&format!("text={}", encode_component(message))));
    Ok(link)
}

/// Message for a whole-cart checkout.
#[must_use]
pub fn cart_message(settings: &Settings, customer_email: &str, items: &[CartItem]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "- {} x{} = {}",
                item.product.name,
                item.quantity,
                settings.format_price(item.subtotal())
            )
        })
        .collect();
    let total: f64 = items.iter().map(CartItem::subtotal).sum();

    format!(
        "*New order {}*\n\nCustomer: {customer_email}\nItems:\n{}\n\n*Total: {}*",
        settings.store_name,
        lines.join("\n"),
        settings.format_price(total)
    )
}

/// Message for a single-product purchase.
#[must_use]
pub fn product_message(settings: &Settings, product: &Product) -> String {
    format!(
        "Hello, I'm interested in buying: {} for {}",
        product.name,
        settings.format_price(product.price)
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::sample_product;

    #[test]
    fn test_build_link_encodes_message() {
        let link = build_link("https://wa.me/", "+51 937 074 085", "Hi there\nTotal: 5").unwrap();
        assert_eq!(
            link.as_str(),
            "https://wa.me/51937074085?text=Hi%20there%0ATotal%3A%205"
        );
    }

    #[test]
    fn test_build_link_requires_contact_digits() {
        let err = build_link("https://wa.me", "n/a", "hi").unwrap_err();
        assert!(matches!(err, Error::Validation { message: _ }));
    }

    #[test]
    fn test_build_link_rejects_bad_base() {
        let err = build_link("not a url", "123", "hi").unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_cart_message_lists_items_and_total() {
        let settings = Settings::default();
        let items = vec![
            CartItem {
                product: sample_product(1, 1000.0, 5),
                quantity: 2,
            },
            CartItem {
                product: sample_product(2, 500.0, 5),
                quantity: 1,
            },
        ];

        let message = cart_message(&settings, "a@b.com", &items);
        assert!(message.starts_with("*New order Shopfront*"));
        assert!(message.contains("Customer: a@b.com"));
        assert!(message.contains("x2 = S/ 2000.00"));
        assert!(message.ends_with("*Total: S/ 2500.00*"));
    }

    #[test]
    fn test_product_message() {
        let settings = Settings::default();
        let mut product = sample_product(1, 25.5, 5);
        product.name = "Lamp".to_string();
        assert_eq!(
            product_message(&settings, &product),
            "Hello, I'm interested in buying: Lamp for S/ 25.50"
        );
    }

    #[test]
    fn test_recording_handoff_keeps_links() {
        let handoff = RecordingHandoff::new();
        let link = build_link("https://wa.me", "1", "a").unwrap();
        handoff.open(&link);
        assert_eq!(handoff.opened(), vec![link]);
    }
}
