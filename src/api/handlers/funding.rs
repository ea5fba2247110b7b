//! The funding endpoint.

use crate::{
    api::{ApiState, auth::CurrentUser},
    core::funding::{self, FundingReceipt},
    errors::Result,
};
use axum::{
    Form, Json,
    extract::{Path, State},
};
use serde::Deserialize;

/// Form body of the funding action. The amount stays raw text so that malformed
/// input is reported by the ledger's own validation.
#[derive(Debug, Deserialize)]
pub struct FundForm {
    /// Amount to invest, as typed
    pub amount: Option<String>,
}

/// `POST /items/{id}/fund`
pub async fn fund(
    State(state): State<ApiState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<i64>,
    Form(form): Form<FundForm>,
) -> Result<Json<FundingReceipt>> {
    let amount = funding::parse_amount(form.amount.as_deref())?;
    let receipt = funding::fund_with_policy(
        &state.database,
        state.funding_policy,
        user_id,
        item_id,
        amount,
    )
    .await?;
    Ok(Json(receipt))
}
