//! Core business logic, independent of any presentation layer.

/// Admin access gate and management panel
pub mod admin;
/// Persistent cart store
pub mod cart;
/// Product catalog loader
pub mod catalog;
/// Order submission workflow
pub mod checkout;
/// Chat handoff links
pub mod handoff;
/// Identity provider seam and local implementation
pub mod identity;
/// Order persistence and status transitions
pub mod order;
/// Product persistence
pub mod product;
/// Mirrored session shared by checkout and admin
pub mod session;
/// Durable key-value storage for the cart
pub mod storage;
/// User profiles and order statistics
pub mod user;
