//! SQLite execution backend for sieve.
//!
//! [`SqliteEngine`] implements [`QueryEngine`](sieve_query::QueryEngine) on
//! top of `tokio-rusqlite`: plans are rendered with `?` placeholders, bound
//! values are converted to SQLite values and rows come back as JSON objects.
//!
//! # Example
//!
//! ```rust,no_run
//! use sieve_query::prelude::*;
//! use sieve_sqlite::SqliteEngine;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SqliteEngine::open_in_memory().await?;
//! engine.execute_batch("CREATE TABLE dog (id INTEGER PRIMARY KEY, name TEXT);").await?;
//!
//! let registry = SchemaRegistry::new()
//!     .with_entity(EntitySpec::new("Dog", "dog").attribute("name"));
//! let _rows = query_with_filters(
//!     &registry,
//!     &engine,
//!     "Dog",
//!     &[RawFilter::leaf("name", "like", json!("J%"))],
//!     None,
//!     "name",
//!     false,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod types;

pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
