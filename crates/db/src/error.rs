//! Classification of driver errors into the cases callers branch on.

use sqlx::error::ErrorKind;
use thiserror::Error;

pub use sqlx::Error as SqlxError;

/// Errors surfaced by the database layer.
#[derive(Error, Debug)]
pub enum DbError {
    /// A unique or primary key constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A NOT NULL, CHECK or foreign key constraint rejected the write.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    /// The pool could not hand out a connection.
    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error(transparent)]
    Query(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => Self::UniqueViolation(db_err.message().to_string()),
                ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::ForeignKeyViolation => {
                    Self::ConstraintViolation(db_err.message().to_string())
                }
                _ => Self::Query(sqlx::Error::Database(db_err)),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err)
            }
            other => Self::Query(other),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::Unavailable(_)
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::Unavailable(_)
        ));
    }

    #[test]
    fn missing_row_is_a_query_error() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::Query(sqlx::Error::RowNotFound)
        ));
    }
}
