//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod comment;
pub mod investment;
pub mod item;
pub mod user;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use comment::{Column as CommentColumn, Entity as Comment, Model as CommentModel};
pub use investment::{
    Column as InvestmentColumn, Entity as Investment, Model as InvestmentModel,
};
pub use item::{Column as ItemColumn, Entity as Item, Model as ItemModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
