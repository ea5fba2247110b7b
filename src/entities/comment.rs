//! Comment entity - A remark left by a user on an item.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Comment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    /// Unique identifier for the comment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item the comment is attached to
    pub item_id: i64,
    /// Author
    pub user_id: i64,
    /// Comment text
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// When the comment was written
    pub created_at: DateTimeUtc,
    /// When the comment was last edited
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Comment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each comment belongs to one item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    /// Each comment belongs to its author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
