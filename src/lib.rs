//! # sieve
//!
//! Compile declarative JSON filters into relational queries.
//!
//! sieve turns a list of filter entries such as
//! `{"field": "toys.name", "op": "=", "value": "rope"}` into a query plan
//! against an entity schema: relation paths become joins (deduplicated per
//! condition group), leaves become typed predicates, and `order_by` /
//! `is_desc` become ordering clauses.
//!
//! ## Quick Start
//!
//! ```rust
//! use sieve::prelude::*;
//!
//! let registry = SchemaRegistry::new()
//!     .with_entity(EntitySpec::new("Dog", "dog").attributes(["name", "weight"]));
//!
//! let plan = QueryAssembler::new(&registry)
//!     .assemble_json(
//!         "Dog",
//!         r#"{"filters": [{"field": "name", "op": "like", "value": "J%"}], "order_by": "weight"}"#,
//!     )
//!     .unwrap();
//!
//! let (sql, _params) = plan.to_sql_for(DatabaseType::SQLite);
//! assert_eq!(sql, "SELECT dog.* FROM dog WHERE dog.name LIKE ? ORDER BY dog.weight ASC");
//! ```
//!
//! With the `sqlite` feature (on by default), [`sqlite::SqliteEngine`] runs
//! plans on a `tokio-rusqlite` connection.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Filter compilation: deserializer, join planner, predicate builder and assembler.
pub mod query {
    pub use sieve_query::*;
}

/// SQLite execution backend.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use sieve_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sieve_query::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use sieve_sqlite::SqliteEngine;
}

// Re-export key types at the crate root
pub use sieve_query::{CompilerConfig, QueryAssembler, QueryError, QueryPlan, QueryResult};
