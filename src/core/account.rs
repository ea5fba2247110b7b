//! Account business logic - Signup, balance top-ups and the per-user summary page.
//!
//! A user and their account are always created together. Balances only change through
//! [`deposit`] here and through the funding operation in [`crate::core::funding`].

use crate::{
    core::item::{ItemSummary, with_comment_counts},
    entities::{Account, Item, User, account, item, user},
    errors::{Error, Result, is_unique_violation},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::info;

/// Everything shown on a user's own page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// The user's id
    pub user_id: i64,
    /// The user's name
    pub username: String,
    /// Current spendable balance
    pub balance: i64,
    /// Items listed by the user, latest campaign end first
    pub items: Vec<ItemSummary>,
}

/// Finds a user by id.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user's account, returning None if the user has none.
pub async fn get_account(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Option<account::Model>> {
    Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a user together with an account holding `initial_balance`.
///
/// The username is trimmed and must be non-empty and unused. Uniqueness is left to
/// the `username` index, so two racing signups for one name cannot both succeed.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    initial_balance: i64,
) -> Result<user::Model> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::invalid("username cannot be empty"));
    }
    if initial_balance < 0 {
        return Err(Error::invalid(format!(
            "initial balance cannot be negative, got {initial_balance}"
        )));
    }

    let txn = db.begin().await?;

    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(username.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            Error::UsernameTaken {
                username: username.to_string(),
            }
        } else {
            err.into()
        }
    })?;

    account::ActiveModel {
        user_id: Set(created.id),
        balance: Set(initial_balance),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(user_id = created.id, username, "User signed up");
    Ok(created)
}

/// Adds `amount` to a user's balance and returns the updated account.
///
/// A deposit that would push the balance past `i64::MAX` is rejected as invalid input
/// and changes nothing.
pub async fn deposit(db: &DatabaseConnection, user_id: i64, amount: i64) -> Result<account::Model> {
    if amount <= 0 {
        return Err(Error::invalid(format!(
            "deposit must be positive, got {amount}"
        )));
    }

    let txn = db.begin().await?;

    let credited = Account::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).add(amount),
        )
        .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(account::Column::UserId.eq(user_id))
        .filter(account::Column::Balance.lte(i64::MAX - amount))
        .exec(&txn)
        .await?;

    let account = Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "account",
            id: user_id,
        })?;

    if credited.rows_affected == 0 {
        return Err(Error::invalid(format!(
            "deposit of {amount} would overflow balance {}",
            account.balance
        )));
    }

    txn.commit().await?;

    info!(user_id, amount, balance = account.balance, "Deposit recorded");
    Ok(account)
}

/// Builds the user's own page: name, balance and their listed items.
pub async fn get_user_summary(db: &DatabaseConnection, user_id: i64) -> Result<UserSummary> {
    let user = get_user_by_id(db, user_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: user_id,
    })?;
    let account = get_account(db, user_id).await?.ok_or(Error::NotFound {
        entity: "account",
        id: user_id,
    })?;

    let items = Item::find()
        .filter(item::Column::OwnerId.eq(user_id))
        .order_by_desc(item::Column::EndPeriod)
        .order_by_desc(item::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(UserSummary {
        user_id,
        username: user.username,
        balance: account.balance,
        items: with_comment_counts(db, items).await?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_user(&db, "   ", 0).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = create_user(&db, "alice", -1).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        assert!(User::find().all(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_with_account() -> Result<()> {
        let db = setup_test_db().await?;

        let user = create_user(&db, "  alice  ", 250).await?;
        assert_eq!(user.username, "alice");

        let account = get_account(&db, user.id).await?.unwrap();
        assert_eq!(account.balance, 250);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_user(&db, "alice", 0).await?;

        let result = create_user(&db, "alice", 0).await;
        assert!(matches!(result, Err(Error::UsernameTaken { username }) if username == "alice"));

        assert_eq!(Account::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, "alice", 10).await?;

        let account = deposit(&db, user.id, 90).await?;
        assert_eq!(account.balance, 100);
        assert_eq!(get_balance(&db, user.id).await?, 100);

        let result = deposit(&db, user.id, 0).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = deposit(&db, 999, 10).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "account",
                id: 999
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_cannot_overflow_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, "whale", 0).await?;

        deposit(&db, user.id, i64::MAX).await?;
        let result = deposit(&db, user.id, 1).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        assert_eq!(get_balance(&db, user.id).await?, i64::MAX);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_signups_for_one_name() -> Result<()> {
        let file_db = setup_file_db(4).await?;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = file_db.db.clone();
            handles.push(tokio::spawn(async move {
                create_user(&db, "alice", 10).await
            }));
        }

        let mut created = 0;
        let mut taken = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(Error::UsernameTaken { .. }) => taken += 1,
                Err(other) => return Err(other),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(taken, 3);
        assert_eq!(Account::find().all(&file_db.db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_summary_lists_own_items_in_order() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner", 40).await?;
        let other = create_test_user(&db, "other", 0).await?;

        let soon = create_custom_item(&db, owner.id, "Soon", 1, 100, date(2030, 1, 1)).await?;
        let later = create_custom_item(&db, owner.id, "Later", 1, 100, date(2031, 6, 1)).await?;
        create_custom_item(&db, other.id, "Not mine", 1, 100, date(2032, 1, 1)).await?;
        crate::core::comment::add_comment(&db, other.id, soon.id, "nice").await?;

        let summary = get_user_summary(&db, owner.id).await?;
        assert_eq!(summary.username, "owner");
        assert_eq!(summary.balance, 40);

        let ids: Vec<i64> = summary.items.iter().map(|s| s.item.id).collect();
        assert_eq!(ids, vec![later.id, soon.id]);
        assert_eq!(summary.items[0].comment_count, 0);
        assert_eq!(summary.items[1].comment_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_summary_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = get_user_summary(&db, 42).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "user",
                id: 42
            })
        ));
        Ok(())
    }
}
