//! Item business logic - Listing, browsing and owner maintenance of fundable items.
//!
//! Owners may change the descriptive fields and the goal of their items. The raised
//! total and the participant count belong to the funding operation and are never
//! written here. Deleting an item removes its comments and investments with it.

use crate::{
    core::comment::{count_comments_by_item, get_comments_for_item},
    entities::{Comment, Investment, Item, User, comment, investment, item},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Owner-editable fields of an item, used for both creation and updates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemDraft {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Category code
    pub category: i32,
    /// Funding goal, must be positive
    pub target_price: i64,
    /// Last day of the campaign
    pub end_period: NaiveDate,
}

impl ItemDraft {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid("item name cannot be empty"));
        }
        if self.target_price <= 0 {
            return Err(Error::invalid(format!(
                "target price must be positive, got {}",
                self.target_price
            )));
        }
        Ok(())
    }
}

/// Optional narrowing of the item list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Only items of this category
    pub category: Option<i32>,
    /// Only items whose name contains this text, ignoring case
    pub search: Option<String>,
}

impl ItemFilter {
    /// Builds a filter from raw query parameters.
    ///
    /// A category that is not a number is ignored and all categories are listed.
    /// Blank values mean "no filter".
    #[must_use]
    pub fn from_raw(category: Option<&str>, search: Option<&str>) -> Self {
        let category = category.and_then(|raw| raw.trim().parse::<i32>().ok());
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        Self { category, search }
    }
}

/// An item together with how many comments it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    /// The item
    #[serde(flatten)]
    pub item: item::Model,
    /// Number of comments on the item
    pub comment_count: u64,
}

/// An item with its comments, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    /// The item
    pub item: item::Model,
    /// Comments on the item
    pub comments: Vec<comment::Model>,
}

/// Finds an item by its unique ID.
pub async fn get_item(db: &DatabaseConnection, item_id: i64) -> Result<Option<item::Model>> {
    Item::find_by_id(item_id).one(db).await.map_err(Into::into)
}

async fn require_item(db: &DatabaseConnection, item_id: i64) -> Result<item::Model> {
    get_item(db, item_id).await?.ok_or(Error::NotFound {
        entity: "item",
        id: item_id,
    })
}

/// Lists a new item owned by `owner_id`. Funding counters start at zero.
pub async fn create_item(
    db: &DatabaseConnection,
    owner_id: i64,
    draft: ItemDraft,
) -> Result<item::Model> {
    draft.validate()?;

    User::find_by_id(owner_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "user",
            id: owner_id,
        })?;

    let created = item::ActiveModel {
        owner_id: Set(owner_id),
        name: Set(draft.name.trim().to_string()),
        description: Set(draft.description),
        category: Set(draft.category),
        target_price: Set(draft.target_price),
        current_price: Set(0),
        participant_num: Set(0),
        target_num: Set(0),
        end_period: Set(draft.end_period),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(item_id = created.id, owner_id, "Item listed");
    Ok(created)
}

/// Lists items matching `filter`, latest campaign end first, then newest listing first.
pub async fn list_items(db: &DatabaseConnection, filter: &ItemFilter) -> Result<Vec<ItemSummary>> {
    let mut query = Item::find();
    if let Some(category) = filter.category {
        query = query.filter(item::Column::Category.eq(category));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        let lower_name = Expr::expr(Func::lower(Expr::col(item::Column::Name)));
        query = query.filter(lower_name.like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)));
    }

    let items = query
        .order_by_desc(item::Column::EndPeriod)
        .order_by_desc(item::Column::CreatedAt)
        .all(db)
        .await?;

    with_comment_counts(db, items).await
}

const LIKE_ESCAPE: char = '!';

/// Makes `%`, `_` and the escape character match literally in a `LIKE` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Attaches comment counts to already loaded items, keeping their order.
pub async fn with_comment_counts(
    db: &DatabaseConnection,
    items: Vec<item::Model>,
) -> Result<Vec<ItemSummary>> {
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let counts = count_comments_by_item(db, &ids).await?;

    Ok(items
        .into_iter()
        .map(|item| {
            let comment_count = counts.get(&item.id).copied().unwrap_or(0);
            ItemSummary {
                item,
                comment_count,
            }
        })
        .collect())
}

/// Loads an item with its comments.
pub async fn get_item_detail(db: &DatabaseConnection, item_id: i64) -> Result<ItemDetail> {
    let item = require_item(db, item_id).await?;
    let comments = get_comments_for_item(db, item_id).await?;
    Ok(ItemDetail { item, comments })
}

/// Replaces the owner-editable fields of an item. Only the owner may do this.
pub async fn update_item(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    draft: ItemDraft,
) -> Result<item::Model> {
    draft.validate()?;

    let existing = require_item(db, item_id).await?;
    if existing.owner_id != user_id {
        return Err(Error::Forbidden {
            user_id,
            entity: "item",
            id: item_id,
        });
    }

    // Only the listed columns are written; funding counters stay untouched
    let updated = item::ActiveModel {
        id: Set(item_id),
        name: Set(draft.name.trim().to_string()),
        description: Set(draft.description),
        category: Set(draft.category),
        target_price: Set(draft.target_price),
        end_period: Set(draft.end_period),
        ..Default::default()
    }
    .update(db)
    .await?;

    info!(item_id, user_id, "Item updated");
    Ok(updated)
}

/// Deletes an item with its comments and investments. Only the owner may do this.
pub async fn delete_item(db: &DatabaseConnection, user_id: i64, item_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Item::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "item",
            id: item_id,
        })?;
    if existing.owner_id != user_id {
        return Err(Error::Forbidden {
            user_id,
            entity: "item",
            id: item_id,
        });
    }

    Comment::delete_many()
        .filter(comment::Column::ItemId.eq(item_id))
        .exec(&txn)
        .await?;
    let investments = Investment::delete_many()
        .filter(investment::Column::ItemId.eq(item_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;

    info!(
        item_id,
        user_id,
        investments_removed = investments.rows_affected,
        "Item deleted"
    );
    Ok(())
}
