//! Comment business logic - Adding, editing and removing comments on items.
//!
//! Anyone may comment on an existing item; only the author may edit or delete a comment.

use crate::{
    entities::{Comment, Item, comment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use std::collections::HashMap;
use tracing::info;

fn normalize_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::invalid("comment cannot be empty"));
    }
    Ok(content.to_string())
}

async fn require_own_comment(
    db: &DatabaseConnection,
    user_id: i64,
    comment_id: i64,
) -> Result<comment::Model> {
    let existing = Comment::find_by_id(comment_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "comment",
            id: comment_id,
        })?;

    if existing.user_id != user_id {
        return Err(Error::Forbidden {
            user_id,
            entity: "comment",
            id: comment_id,
        });
    }
    Ok(existing)
}

/// Retrieves all comments on an item, oldest first.
pub async fn get_comments_for_item(
    db: &DatabaseConnection,
    item_id: i64,
) -> Result<Vec<comment::Model>> {
    Comment::find()
        .filter(comment::Column::ItemId.eq(item_id))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts comments per item for the given ids. Items without comments are absent.
pub async fn count_comments_by_item(
    db: &DatabaseConnection,
    item_ids: &[i64],
) -> Result<HashMap<i64, u64>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, i64)> = Comment::find()
        .select_only()
        .column(comment::Column::ItemId)
        .column_as(comment::Column::Id.count(), "comment_count")
        .filter(comment::Column::ItemId.is_in(item_ids.iter().copied()))
        .group_by(comment::Column::ItemId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(item_id, count)| (item_id, u64::try_from(count).unwrap_or(0)))
        .collect())
}

/// Adds a comment by `user_id` to an existing item.
pub async fn add_comment(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    content: &str,
) -> Result<comment::Model> {
    let content = normalize_content(content)?;

    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "item",
            id: item_id,
        })?;

    let now = Utc::now();
    let created = comment::ActiveModel {
        item_id: Set(item_id),
        user_id: Set(user_id),
        content: Set(content),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(comment_id = created.id, item_id, user_id, "Comment added");
    Ok(created)
}

/// Replaces the text of a comment. Only its author may do this.
pub async fn edit_comment(
    db: &DatabaseConnection,
    user_id: i64,
    comment_id: i64,
    content: &str,
) -> Result<comment::Model> {
    let content = normalize_content(content)?;
    let existing = require_own_comment(db, user_id, comment_id).await?;

    let mut active: comment::ActiveModel = existing.into();
    active.content = Set(content);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!(comment_id, user_id, "Comment edited");
    Ok(updated)
}

/// Deletes a comment. Only its author may do this.
pub async fn delete_comment(db: &DatabaseConnection, user_id: i64, comment_id: i64) -> Result<()> {
    let existing = require_own_comment(db, user_id, comment_id).await?;
    existing.delete(db).await?;

    info!(comment_id, user_id, "Comment deleted");
    Ok(())
}
