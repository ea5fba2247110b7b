//! Investment entity - Cumulative contribution of one user to one item.
//!
//! There is at most one row per (`user_id`, `item_id`) pair, enforced by a unique
//! index created alongside the table. Repeated contributions increase `amount`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Investment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "investments")]
pub struct Model {
    /// Unique identifier for the investment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Investing user
    pub user_id: i64,
    /// Item invested in
    pub item_id: i64,
    /// Total contributed by this user to this item
    pub amount: i64,
    /// First contribution
    pub created_at: DateTimeUtc,
    /// Latest contribution
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Investment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each investment belongs to one item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    /// Each investment belongs to one user
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
