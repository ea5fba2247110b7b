//! Funding business logic - Moves balance from a backer's account into an item.
//!
//! A funding call raises the item total, debits the account, accumulates the backer's
//! investment record and recounts the item's participants, all in one database
//! transaction. The balance check and the debit are a single guarded `UPDATE`, so two
//! concurrent requests against the same account can never both pass the check.
//!
//! Every attempt opens with a write. That takes the item row lock on PostgreSQL and
//! the database write lock on SQLite before anything is read, so a waiting writer
//! sits out the busy timeout instead of failing a read-to-write lock upgrade.

use crate::{
    core::retry::{RetryPolicy, with_retry},
    entities::{Account, Investment, Item, account, investment, item},
    errors::{Error, Result, is_unique_violation},
};
use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of a successful funding call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingReceipt {
    /// Backer
    pub user_id: i64,
    /// Funded item
    pub item_id: i64,
    /// Amount moved by this call
    pub amount: i64,
    /// Backer's balance after the transfer
    pub balance: i64,
    /// Item's raised total after the transfer
    pub item_total: i64,
    /// Distinct investors in the item after the transfer
    pub participant_num: i64,
    /// Backer's cumulative investment in the item
    pub invested: i64,
}

/// Parses a raw `amount` form value.
///
/// Missing, non-numeric and non-positive values are rejected with
/// [`Error::InvalidInput`].
pub fn parse_amount(raw: Option<&str>) -> Result<i64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::invalid("amount is required"));
    }

    let amount = raw
        .parse::<i64>()
        .map_err(|_| Error::invalid(format!("amount must be a whole number, got '{raw}'")))?;
    validate_amount(amount)?;
    Ok(amount)
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::invalid(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Invests `amount` of `user_id`'s balance into `item_id` with the default retry policy.
pub async fn fund(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    amount: i64,
) -> Result<FundingReceipt> {
    fund_with_policy(db, RetryPolicy::default(), user_id, item_id, amount).await
}

/// Invests `amount` of `user_id`'s balance into `item_id`.
///
/// # Errors
/// * [`Error::InvalidInput`] - `amount` is not positive, or would overflow the item
///   total or the backer's investment
/// * [`Error::NotFound`] - the item or the user's account does not exist
/// * [`Error::InsufficientFunds`] - the balance is below `amount`; nothing is changed
/// * [`Error::ConcurrencyConflict`] - every attempt lost a race with another writer
pub async fn fund_with_policy(
    db: &DatabaseConnection,
    policy: RetryPolicy,
    user_id: i64,
    item_id: i64,
    amount: i64,
) -> Result<FundingReceipt> {
    validate_amount(amount)?;
    debug!(user_id, item_id, amount, "Funding requested");

    let receipt = with_retry(policy, || fund_once(db, user_id, item_id, amount)).await?;

    info!(
        user_id,
        item_id,
        amount,
        balance = receipt.balance,
        item_total = receipt.item_total,
        participants = receipt.participant_num,
        "Funding committed"
    );
    Ok(receipt)
}

/// One attempt: a single transaction, rolled back on drop if any step fails.
async fn fund_once(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    amount: i64,
) -> Result<FundingReceipt> {
    let txn = db.begin().await?;

    credit_item(&txn, item_id, amount).await?;
    let balance = debit_account(&txn, user_id, amount).await?;
    let invested = accumulate_investment(&txn, user_id, item_id, amount).await?;
    let participant_num = recount_participants(&txn, item_id).await?;

    let item_total = Item::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "item",
            id: item_id,
        })?
        .current_price;

    txn.commit().await?;

    Ok(FundingReceipt {
        user_id,
        item_id,
        amount,
        balance,
        item_total,
        participant_num,
        invested,
    })
}

/// Adds `amount` to the item's raised total unless that would overflow.
async fn credit_item(txn: &DatabaseTransaction, item_id: i64, amount: i64) -> Result<()> {
    let credited = Item::update_many()
        .col_expr(
            item::Column::CurrentPrice,
            Expr::col(item::Column::CurrentPrice).add(amount),
        )
        .filter(item::Column::Id.eq(item_id))
        .filter(item::Column::CurrentPrice.lte(i64::MAX - amount))
        .exec(txn)
        .await?;

    if credited.rows_affected == 0 {
        let item = Item::find_by_id(item_id)
            .one(txn)
            .await?
            .ok_or(Error::NotFound {
                entity: "item",
                id: item_id,
            })?;
        return Err(Error::invalid(format!(
            "funding {amount} would overflow the total {} of item {item_id}",
            item.current_price
        )));
    }
    Ok(())
}

/// Subtracts `amount` from the account only if the balance covers it and returns the
/// new balance.
async fn debit_account(txn: &DatabaseTransaction, user_id: i64, amount: i64) -> Result<i64> {
    let debited = Account::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).sub(amount),
        )
        .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(account::Column::UserId.eq(user_id))
        .filter(account::Column::Balance.gte(amount))
        .exec(txn)
        .await?;

    let account = Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .one(txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "account",
            id: user_id,
        })?;

    if debited.rows_affected == 0 {
        return Err(Error::InsufficientFunds {
            balance: account.balance,
            requested: amount,
        });
    }

    Ok(account.balance)
}

/// Adds `amount` to the (user, item) investment, creating it on first contribution.
/// Returns the cumulative amount.
async fn accumulate_investment(
    txn: &DatabaseTransaction,
    user_id: i64,
    item_id: i64,
    amount: i64,
) -> Result<i64> {
    let now = Utc::now();
    let existing = Investment::find()
        .filter(investment::Column::UserId.eq(user_id))
        .filter(investment::Column::ItemId.eq(item_id))
        .one(txn)
        .await?;

    if let Some(existing) = existing {
        let overflow = || {
            Error::invalid(format!(
                "funding {amount} would overflow investment {} of {}",
                existing.id, existing.amount
            ))
        };
        let accumulated = existing.amount.checked_add(amount).ok_or_else(overflow)?;

        let updated = Investment::update_many()
            .col_expr(
                investment::Column::Amount,
                Expr::col(investment::Column::Amount).add(amount),
            )
            .col_expr(investment::Column::UpdatedAt, Expr::value(now))
            .filter(investment::Column::Id.eq(existing.id))
            .filter(investment::Column::Amount.lte(i64::MAX - amount))
            .exec(txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(overflow());
        }
        return Ok(accumulated);
    }

    let created = investment::ActiveModel {
        user_id: Set(user_id),
        item_id: Set(item_id),
        amount: Set(amount),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|err| {
        // Another transaction created the pair first; a retry finds its row
        if is_unique_violation(&err) {
            Error::WriteConflict {
                message: err.to_string(),
            }
        } else {
            err.into()
        }
    })?;

    Ok(created.amount)
}

/// Sets `participant_num` to the number of investment rows for the item.
///
/// Always a full count, so rows removed by other flows are reflected on the next
/// funding instead of drifting.
async fn recount_participants(txn: &DatabaseTransaction, item_id: i64) -> Result<i64> {
    let count = Investment::find()
        .filter(investment::Column::ItemId.eq(item_id))
        .count(txn)
        .await?;
    let participant_num = i64::try_from(count).unwrap_or(i64::MAX);

    Item::update_many()
        .col_expr(item::Column::ParticipantNum, Expr::value(participant_num))
        .filter(item::Column::Id.eq(item_id))
        .exec(txn)
        .await?;

    Ok(participant_num)
}
