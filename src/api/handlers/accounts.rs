//! Account endpoints - signup, own page and deposits.

use crate::{
    api::{ApiState, auth::CurrentUser},
    core::account::{self, UserSummary},
    entities::{account as account_entity, user},
    errors::Result,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

/// Body of `POST /signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Desired username, trimmed before use
    pub username: String,
}

/// Body of `POST /me/deposit`.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Amount to add, must be positive
    pub amount: i64,
}

/// `POST /signup`
pub async fn signup(
    State(state): State<ApiState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<user::Model>)> {
    let user = account::create_user(&state.database, &request.username, state.signup_balance)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /me`
pub async fn me(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserSummary>> {
    Ok(Json(account::get_user_summary(&state.database, user_id).await?))
}

/// `POST /me/deposit`
pub async fn deposit(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<DepositRequest>,
) -> Result<Json<account_entity::Model>> {
    Ok(Json(
        account::deposit(&state.database, user_id, request.amount).await?,
    ))
}
