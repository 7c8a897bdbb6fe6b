//! Error types for SQLite operations.

use std::fmt;

use sieve_query::error::QueryError;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug)]
pub enum SqliteError {
    /// SQLite driver error.
    Sqlite(tokio_rusqlite::Error),
    /// Connection error.
    Connection(String),
    /// Query error.
    Query(String),
    /// Type conversion error.
    TypeConversion(String),
}

impl SqliteError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }
}

impl fmt::Display for SqliteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Connection(msg) => write!(f, "Connection error: {}", msg),
            Self::Query(msg) => write!(f, "Query error: {}", msg),
            Self::TypeConversion(msg) => write!(f, "Type conversion error: {}", msg),
        }
    }
}

impl std::error::Error for SqliteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tokio_rusqlite::Error> for SqliteError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        let message = err.to_string();
        QueryError::database(message).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_query::error::ErrorCode;

    #[test]
    fn test_error_display() {
        let err = SqliteError::query("no such table: dog");
        assert!(err.to_string().contains("Query error"));
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_error_conversion_keeps_source() {
        let err: QueryError = SqliteError::connection("closed").into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("closed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
