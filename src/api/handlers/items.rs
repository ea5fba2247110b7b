//! Item endpoints.

use crate::{
    api::{ApiState, auth::CurrentUser},
    core::item::{self, ItemDetail, ItemDraft, ItemFilter, ItemSummary},
    entities::item as item_entity,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Raw list parameters; both are optional and leniently parsed.
#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    /// Category code
    pub category: Option<String>,
    /// Text to look for in item names
    pub search: Option<String>,
}

/// `GET /items`
pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Vec<ItemSummary>>> {
    let filter = ItemFilter::from_raw(query.category.as_deref(), query.search.as_deref());
    Ok(Json(item::list_items(&state.database, &filter).await?))
}

/// `POST /items`
pub async fn create(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Json(draft): Json<ItemDraft>,
) -> Result<(StatusCode, Json<item_entity::Model>)> {
    let created = item::create_item(&state.database, user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /items/{id}`
pub async fn detail(
    State(state): State<ApiState>,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemDetail>> {
    Ok(Json(item::get_item_detail(&state.database, item_id).await?))
}

/// `PUT /items/{id}`
pub async fn update(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<i64>,
    Json(draft): Json<ItemDraft>,
) -> Result<Json<item_entity::Model>> {
    Ok(Json(
        item::update_item(&state.database, user_id, item_id, draft).await?,
    ))
}

/// `DELETE /items/{id}`
pub async fn delete(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<i64>,
) -> Result<StatusCode> {
    item::delete_item(&state.database, user_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
