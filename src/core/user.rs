//! User profiles and per-user order statistics.
//!
//! Statistics are derived at read time. Instead of filtering the full order list
//! once per user, [`OrderStatsIndex`] walks the orders once and keys the result
//! by email.

use crate::{
    entities::{Order, User, order, user},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashMap;
use tracing::instrument;

/// Role stored for ordinary shoppers
pub const ROLE_USER: &str = "user";
/// Role stored for the configured administrator account
pub const ROLE_ADMIN: &str = "admin";

/// Writes the profile document for a newly registered account.
#[instrument(skip(db))]
pub async fn create_profile(
    db: &DatabaseConnection,
    uid: i64,
    email: &str,
    display_name: &str,
    role: &str,
) -> Result<user::Model> {
    user::ActiveModel {
        id: Set(uid),
        email: Set(email.to_string()),
        display_name: Set(display_name.to_string()),
        role: Set(role.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Retrieves every profile, oldest first.
pub async fn get_all_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Order statistics for one email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    /// Orders submitted with this email, in any status
    pub order_count: usize,
    /// Creation time of the most recent of those orders
    pub last_order: Option<DateTime<Utc>>,
}

/// Email -> [`OrderStats`], built in one pass over the orders.
#[derive(Debug, Default)]
pub struct OrderStatsIndex {
    by_email: HashMap<String, OrderStats>,
}

impl OrderStatsIndex {
    /// Indexes `orders` by purchaser email.
    #[must_use]
    pub fn build(orders: &[order::Model]) -> Self {
        let mut by_email: HashMap<String, OrderStats> = HashMap::new();
        for order in orders {
            let stats = by_email.entry(order.user_email.clone()).or_default();
            stats.order_count += 1;
            if stats.last_order.is_none_or(|last| order.created_at > last) {
                stats.last_order = Some(order.created_at);
            }
        }
        Self { by_email }
    }

    /// Stats for `email`; zero orders if it never ordered.
    #[must_use]
    pub fn get(&self, email: &str) -> OrderStats {
        self.by_email.get(email).copied().unwrap_or_default()
    }
}

/// A profile joined with its order statistics.
#[derive(Debug, Clone)]
pub struct UserWithStats {
    /// Stored profile
    pub profile: user::Model,
    /// Derived statistics
    pub stats: OrderStats,
}

/// Loads all profiles and all orders and joins them by email.
pub async fn get_users_with_stats(db: &DatabaseConnection) -> Result<Vec<UserWithStats>> {
    let users = get_all_users(db).await?;
    let orders = Order::find().all(db).await?;
    let index = OrderStatsIndex::build(&orders);

    Ok(users
        .into_iter()
        .map(|profile| {
            let stats = index.get(&profile.email);
            UserWithStats { profile, stats }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_order, create_test_product, setup_test_db};

    #[tokio::test]
    async fn test_users_with_stats() -> Result<()> {
        let db = setup_test_db().await?;
        create_profile(&db, 1, "a@b.com", "A", ROLE_USER).await?;
        create_profile(&db, 2, "c@d.com", "C", ROLE_USER).await?;
        let product = create_test_product(&db, "Card", 10.0, 5).await?;

        let first = create_test_order(&db, "a@b.com", &product, 1).await?;
        let second = create_test_order(&db, "a@b.com", &product, 2).await?;

        let users = get_users_with_stats(&db).await?;
        assert_eq!(users.len(), 2);

        let a = users.iter().find(|u| u.profile.email == "a@b.com").unwrap();
        assert_eq!(a.stats.order_count, 2);
        assert_eq!(
            a.stats.last_order,
            Some(first.created_at.max(second.created_at))
        );

        let c = users.iter().find(|u| u.profile.email == "c@d.com").unwrap();
        assert_eq!(c.stats, OrderStats::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_profile_id_fails() -> Result<()> {
        let db = setup_test_db().await?;
        create_profile(&db, 1, "a@b.com", "A", ROLE_USER).await?;
        assert!(create_profile(&db, 1, "x@y.com", "X", ROLE_USER).await.is_err());
        Ok(())
    }
}
