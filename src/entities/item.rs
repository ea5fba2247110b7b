//! Item entity - A fundable campaign.
//!
//! `current_price` is the raised total and `participant_num` the number of distinct
//! investors. Both are written only by the funding operation; owner edits touch the
//! descriptive fields and the goal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who listed the item
    pub owner_id: i64,
    /// Display name, searched by the item list
    pub name: String,
    /// Free-form description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Category code used by the list filter
    pub category: i32,
    /// Funding goal in currency units
    pub target_price: i64,
    /// Cumulative amount raised so far
    pub current_price: i64,
    /// Number of distinct investors
    pub participant_num: i64,
    /// Always 0 on creation
    pub target_num: i64,
    /// Last day of the campaign
    pub end_period: Date,
    /// When the item was listed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to its owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// One item has many investments
    #[sea_orm(has_many = "super::investment::Entity")]
    Investments,
    /// One item has many comments
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::investment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investments.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
