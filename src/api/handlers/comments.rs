//! Comment endpoints.

use crate::{
    api::{ApiState, auth::CurrentUser},
    core::comment,
    entities::comment as comment_entity,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Body of comment creation and edits.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    /// Comment text
    pub content: String,
}

/// `POST /items/{id}/comments`
pub async fn add(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<comment_entity::Model>)> {
    let created = comment::add_comment(&state.database, user_id, item_id, &request.content).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /comments/{id}`
pub async fn edit(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Path(comment_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<comment_entity::Model>> {
    Ok(Json(
        comment::edit_comment(&state.database, user_id, comment_id, &request.content).await?,
    ))
}

/// `DELETE /comments/{id}`
pub async fn delete(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Path(comment_id): Path<i64>,
) -> Result<StatusCode> {
    comment::delete_comment(&state.database, user_id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
