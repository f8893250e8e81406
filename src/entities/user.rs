//! User profile entity - One document per registered account.
//!
//! The id is the identity provider's uid. Order statistics are not stored here;
//! they are derived at read time (see `core::user`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Identity provider uid
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// Account email
    pub email: String,
    /// Name chosen at registration
    pub display_name: String,
    /// `"user"` or `"admin"`
    pub role: String,
    /// When the account was registered
    pub created_at: DateTimeUtc,
}

/// `User` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
