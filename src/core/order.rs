//! Order business logic - Creates orders and moves them through their lifecycle.
//!
//! Orders are created `pending` and end `approved` or `rejected`; no other
//! transition exists. Approval decrements stock for every line and flips the
//! status inside one database transaction, and the status update only matches
//! rows that are still `pending`, so an order cannot be approved twice.

use crate::{
    core::product,
    entities::{Order, order},
    errors::{Error, Result},
    models::{OrderLine, OrderStatus},
};
use sea_orm::{
    PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Everything needed to persist a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Purchaser email
    pub user_email: String,
    /// Purchaser display name, if known
    pub user_name: Option<String>,
    /// Line snapshots
    pub lines: Vec<OrderLine>,
    /// Discount subtracted from the total
    pub discount: f64,
}

/// Persists a new order. Status is always `pending` and the timestamp is now.
///
/// # Errors
/// Returns an error if:
/// - There are no lines, or a line has quantity 0
/// - The discount is negative or not finite
/// - The database insert operation fails
#[instrument(skip(db, new), fields(user_email = %new.user_email, lines = new.lines.len()))]
pub async fn create_order(db: &DatabaseConnection, new: NewOrder) -> Result<order::Model> {
    if new.lines.is_empty() {
        return Err(Error::Validation {
            message: "Cannot submit an empty order".to_string(),
        });
    }
    if new.lines.iter().any(|line| line.quantity == 0) {
        return Err(Error::Validation {
            message: "Every item needs a quantity of at least 1".to_string(),
        });
    }
    if !new.discount.is_finite() || new.discount < 0.0 {
        return Err(Error::InvalidAmount {
            amount: new.discount,
        });
    }

    let total: f64 = new.lines.iter().map(OrderLine::subtotal).sum();
    let final_total = (total - new.discount).max(0.0);

    let order = order::ActiveModel {
        user_email: Set(new.user_email),
        user_name: Set(new.user_name),
        items: Set(serde_json::to_value(&new.lines)?),
        total: Set(total),
        discount: Set(new.discount),
        final_total: Set(final_total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        handoff_sent: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = order.insert(db).await?;
    info!(order_id = created.id, total, "Order created");
    Ok(created)
}

/// Retrieves a specific order by its unique ID.
pub async fn get_order_by_id(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Option<order::Model>> {
    Order::find_by_id(order_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every order, newest first.
pub async fn get_all_orders(db: &DatabaseConnection) -> Result<Vec<order::Model>> {
    Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the orders awaiting a decision, newest first.
pub async fn get_pending_orders(db: &DatabaseConnection) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of orders awaiting a decision.
pub async fn count_pending_orders(db: &DatabaseConnection) -> Result<u64> {
    Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the orders placed with `email`, newest first.
pub async fn get_orders_for_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::UserEmail.eq(email))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records that the messaging handoff was opened for this order.
pub async fn mark_handoff_sent(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let result = Order::update_many()
        .col_expr(order::Column::HandoffSent, Expr::value(true))
        .filter(order::Column::Id.eq(order_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::OrderNotFound { id: order_id });
    }
    Ok(())
}

/// Parses the stored status of an order.
pub fn status_of(order: &order::Model) -> Result<OrderStatus> {
    order.status.parse()
}

fn ensure_transition(order: &order::Model, next: OrderStatus) -> Result<()> {
    let current = status_of(order)?;
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(Error::InvalidStatusTransition {
            id: order.id,
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

/// Moves a `pending` order to `next`. Matches zero rows if the order was decided
/// concurrently, which is reported as an invalid transition.
async fn transition_from_pending<C>(db: &C, order_id: i64, next: OrderStatus) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(next.as_str()))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let from = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or(Error::OrderNotFound { id: order_id })?
            .status;
        return Err(Error::InvalidStatusTransition {
            id: order_id,
            from,
            to: next.to_string(),
        });
    }
    Ok(())
}

/// Approves a pending order and decrements stock for its lines.
///
/// Quantities are summed per product, then each product is decremented with a
/// single `stock = stock - n` update. Lines whose product no longer exists are
/// skipped. All writes share one transaction: if any of them fails, none of the
/// stock changes and not the status change are kept.
///
/// # Errors
/// Returns an error if the order does not exist, is not `pending`, its line
/// snapshot cannot be decoded, or a database write fails.
#[instrument(skip(db))]
pub async fn approve_order(db: &DatabaseConnection, order_id: i64) -> Result<order::Model> {
    let txn = db.begin().await?;

    let order = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;
    ensure_transition(&order, OrderStatus::Approved)?;

    let mut per_product: BTreeMap<i64, i64> = BTreeMap::new();
    for line in order.lines()? {
        *per_product.entry(line.product_id).or_default() += i64::from(line.quantity);
    }

    for (product_id, quantity) in per_product {
        if product::decrement_stock_atomic(&txn, product_id, quantity)
            .await?
            .is_none()
        {
            warn!(order_id, product_id, "Product no longer exists, stock not updated");
        }
    }

    transition_from_pending(&txn, order_id, OrderStatus::Approved).await?;
    txn.commit().await?;
    info!(order_id, "Order approved and stock updated");

    get_order_by_id(db, order_id)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

/// Rejects a pending order. Stock is untouched.
///
/// # Errors
/// Returns an error if the order does not exist or is not `pending`.
#[instrument(skip(db))]
pub async fn reject_order(db: &DatabaseConnection, order_id: i64) -> Result<order::Model> {
    let order = get_order_by_id(db, order_id)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;
    ensure_transition(&order, OrderStatus::Rejected)?;

    transition_from_pending(db, order_id, OrderStatus::Rejected).await?;
    info!(order_id, "Order rejected");

    get_order_by_id(db, order_id)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}
