//! # sieve-query
//!
//! Compiles declarative filter descriptions into relational queries.
//!
//! A request is a list of raw filter entries, an optional property map and an
//! ordering request. The compiler:
//! - coerces date and datetime strings into typed values
//! - validates every leaf against its operator
//! - joins each relation path once per condition group
//! - builds a grouped AND/OR predicate
//! - normalizes `order_by` and `is_desc` into ordering clauses
//!
//! The schema is reached through [`RelationGraph`] and execution through
//! [`QueryEngine`]; neither is owned by the compiler.
//!
//! ## Filters
//!
//! ```rust
//! use sieve_query::filter::{RawFilter, deserialize};
//! use serde_json::json;
//!
//! let nodes = deserialize(&[
//!     RawFilter::grouped("toys.name", "=", json!("ball"), "a"),
//!     RawFilter::or([
//!         RawFilter::leaf("weight", "<", json!(50)),
//!         RawFilter::leaf("dob", "=", json!(null)),
//!     ]),
//! ])
//! .unwrap();
//! assert_eq!(nodes.len(), 2);
//! ```
//!
//! ## Assembly
//!
//! ```rust
//! use sieve_query::prelude::*;
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new()
//!     .with_entity(
//!         EntitySpec::new("Dog", "dog")
//!             .attributes(["name", "dob"])
//!             .relation(RelationSpec::many_to_many(
//!                 "toys",
//!                 "Toy",
//!                 JoinTableSpec::new("dog_toys", "dog_id", "toy_id"),
//!             )),
//!     )
//!     .with_entity(EntitySpec::new("Toy", "toy").attribute("name"));
//!
//! let map = PropertyMap::new().with("dateOfBirth", "dob");
//! let plan = QueryAssembler::new(&registry)
//!     .assemble(
//!         "Dog",
//!         &[RawFilter::leaf("toys.name", "=", json!("rope"))],
//!         Some(&map),
//!         "dateOfBirth",
//!         false,
//!     )
//!     .unwrap();
//! assert!(plan.distinct);
//! assert_eq!(plan.joins.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod join;
pub mod logging;
pub mod predicate;
pub mod query;
pub mod schema;
pub mod sql;
pub mod traits;
pub mod types;
pub mod value;

pub use config::CompilerConfig;
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{
    CompositeFilter, FieldPath, FilterLeaf, FilterNode, Operator, RawFilter, deserialize,
    deserialize_json,
};
pub use join::{JoinPlan, JoinScope};
pub use predicate::{Expr, PredicateBuilder};
pub use query::{FilterRequest, QueryAssembler, QueryPlan, query_with_filters};
pub use schema::{RelationGraph, SchemaRegistry};
pub use sql::DatabaseType;
pub use traits::{BoxFuture, QueryEngine, Row};
pub use types::{Descending, OrderBySpec, OrderKey, PropertyMap, SortOrder};
pub use value::{FilterValue, coerce};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::CompilerConfig;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{FilterNode, Operator, RawFilter};
    pub use crate::join::JoinScope;
    pub use crate::query::{FilterRequest, QueryAssembler, QueryPlan, query_with_filters};
    pub use crate::schema::{
        EntitySpec, JoinTableSpec, RelationGraph, RelationSpec, RelationType, SchemaRegistry,
    };
    pub use crate::sql::DatabaseType;
    pub use crate::traits::{QueryEngine, Row};
    pub use crate::types::{Descending, OrderBySpec, OrderKey, PropertyMap, SortOrder};
    pub use crate::value::FilterValue;
}
