//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the collections the storefront reads and writes.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod credential;
pub mod order;
pub mod product;
pub mod user;

// Re-export specific types to avoid conflicts
pub use credential::{
    Column as CredentialColumn, Entity as Credential, Model as CredentialModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
