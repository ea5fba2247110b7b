use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// SQLite `BUSY`, `LOCKED` and `BUSY_SNAPSHOT`, PostgreSQL serialization failure and deadlock.
const TRANSIENT_SQLSTATES: [&str; 5] = ["5", "6", "517", "40001", "40P01"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(DbErr),

    /// A single attempt lost a race against a concurrent writer.
    #[error("Write conflict: {message}")]
    WriteConflict { message: String },

    #[error("Concurrent updates kept conflicting after {attempts} attempts, try again later")]
    ConcurrencyConflict { attempts: u32 },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("Username '{username}' is already taken")]
    UsernameTaken { username: String },

    #[error("User {user_id} is not allowed to modify {entity} {id}")]
    Forbidden {
        user_id: i64,
        entity: &'static str,
        id: i64,
    },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds an `InvalidInput` error from anything printable.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// True for failures worth retrying in a fresh transaction.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if is_write_conflict(&err) {
            Self::WriteConflict {
                message: err.to_string(),
            }
        } else {
            Self::Database(err)
        }
    }
}

/// True when the statement hit a unique index.
///
/// Not transient on its own. Callers decide what a duplicate means: a taken
/// username, or a lost race on the investment pair that a retry resolves.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Classifies a database error as a lost race rather than a real failure.
fn is_write_conflict(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(runtime) | DbErr::Query(runtime) => runtime,
        _ => return false,
    };

    match runtime {
        RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)) => db_err
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())),
        _ => false,
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_db_errors_are_not_transient() {
        let err: Error = DbErr::RecordNotFound("item".to_string()).into();
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_transient());

        let err: Error = DbErr::Custom("boom".to_string()).into();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_write_conflict_is_transient() {
        let err = Error::WriteConflict {
            message: "database is locked".to_string(),
        };
        assert!(err.is_transient());
        assert!(!Error::ConcurrencyConflict { attempts: 3 }.is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InsufficientFunds {
            balance: 40,
            requested: 60,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: balance is 40, requested 60"
        );

        let err = Error::NotFound {
            entity: "item",
            id: 7,
        };
        assert_eq!(err.to_string(), "item 7 not found");
    }
}
