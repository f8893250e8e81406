//! Credential entity - Sign-in records owned by the local identity provider.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Credential database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credentials")]
pub struct Model {
    /// Identity uid, shared with the user profile
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sign-in email, unique per account
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name given at registration
    pub display_name: String,
    /// When the account was registered
    pub created_at: DateTimeUtc,
}

/// `Credential` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
