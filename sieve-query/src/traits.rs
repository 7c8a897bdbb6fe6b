//! Execution collaborator traits.

use std::future::Future;
use std::pin::Pin;

use crate::error::QueryResult;
use crate::query::QueryPlan;

/// A boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Runs assembled plans against a data store.
///
/// Implementations are shared across tasks and render the plan in their own
/// dialect.
pub trait QueryEngine: Send + Sync {
    /// Fetch every row matched by `plan`, in plan order.
    fn fetch_all<'a>(&'a self, plan: &'a QueryPlan) -> BoxFuture<'a, QueryResult<Vec<Row>>>;
}
