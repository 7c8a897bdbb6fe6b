//! Query assembly.
//!
//! [`QueryAssembler::assemble`] runs the whole pipeline: deserialize the raw
//! filters, plan joins for every leaf, build the predicate, then normalize
//! the ordering request into concrete clauses.
//!
//! ```rust
//! use sieve_query::filter::RawFilter;
//! use sieve_query::schema::{EntitySpec, SchemaRegistry};
//! use sieve_query::{DatabaseType, QueryAssembler};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new()
//!     .with_entity(EntitySpec::new("Dog", "dog").attributes(["name", "weight"]));
//! let assembler = QueryAssembler::new(&registry);
//!
//! let plan = assembler
//!     .assemble("Dog", &[RawFilter::leaf("weight", ">", json!(50))], None, "name", true)
//!     .unwrap();
//! let (sql, params) = plan.to_sql_for(DatabaseType::SQLite);
//! assert_eq!(sql, "SELECT dog.* FROM dog WHERE dog.weight > ? ORDER BY dog.name DESC");
//! assert_eq!(params.len(), 1);
//! ```

use serde::Deserialize;
use smol_str::SmolStr;
use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::{QueryError, QueryResult};
use crate::filter::{
    Combinator, CompositeFilter, FilterNode, RawFilter, deserialize_with_group,
};
use crate::join::{Join, JoinPlan};
use crate::predicate::{Expr, PredicateBuilder};
use crate::schema::{EntitySpec, RelationGraph};
use crate::sql::{self, DatabaseType};
use crate::traits::{QueryEngine, Row};
use crate::types::{
    ColumnRef, Descending, OrderBySpec, OrderClause, PropertyMap, SortOrder,
};
use crate::value::FilterValue;

/// An assembled query: root table, joins, predicate and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Root entity name.
    pub root_entity: SmolStr,
    /// Root table.
    pub root_table: SmolStr,
    /// Alias of the root table.
    pub root_alias: SmolStr,
    /// Joins in first-encountered order.
    pub joins: Vec<Join>,
    /// Filter predicate, absent when no filters were given.
    pub predicate: Option<Expr>,
    /// Ordering clauses in request order.
    pub order_by: Vec<OrderClause>,
    /// Whether duplicate root rows must be removed.
    pub distinct: bool,
    /// Dialect used by [`to_sql`](Self::to_sql).
    pub dialect: DatabaseType,
}

impl QueryPlan {
    /// Render in the configured dialect.
    pub fn to_sql(&self) -> (String, Vec<FilterValue>) {
        sql::render(self, self.dialect)
    }

    /// Render in a specific dialect.
    pub fn to_sql_for(&self, dialect: DatabaseType) -> (String, Vec<FilterValue>) {
        sql::render(self, dialect)
    }
}

/// A complete filter request, as received over the wire.
///
/// ```json
/// {"filters": [...], "property_map": {"dateOfBirth": "dob"}, "order_by": "name", "is_desc": false}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    /// Raw filter entries.
    pub filters: Vec<RawFilter>,
    /// External to schema name mapping.
    pub property_map: Option<PropertyMap>,
    /// Ordering keys.
    pub order_by: OrderBySpec,
    /// Sort directions.
    pub is_desc: Descending,
}

/// Compiles filter requests against a relation graph.
pub struct QueryAssembler<'g, G: RelationGraph + ?Sized> {
    graph: &'g G,
    config: CompilerConfig,
}

impl<'g, G: RelationGraph + ?Sized> QueryAssembler<'g, G> {
    /// Create an assembler with the default configuration.
    pub fn new(graph: &'g G) -> Self {
        Self::with_config(graph, CompilerConfig::default())
    }

    /// Create an assembler with a specific configuration.
    pub fn with_config(graph: &'g G, config: CompilerConfig) -> Self {
        Self { graph, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile raw filters and an ordering request into a plan.
    pub fn assemble(
        &self,
        root_entity: &str,
        filters: &[RawFilter],
        property_map: Option<&PropertyMap>,
        order_by: impl Into<OrderBySpec>,
        is_desc: impl Into<Descending>,
    ) -> QueryResult<QueryPlan> {
        let nodes = deserialize_with_group(filters, &self.config.default_condition_group)?;
        self.assemble_nodes(root_entity, nodes, property_map, &order_by.into(), &is_desc.into())
    }

    /// Compile a [`FilterRequest`].
    pub fn assemble_request(&self, root_entity: &str, request: &FilterRequest) -> QueryResult<QueryPlan> {
        let nodes = deserialize_with_group(&request.filters, &self.config.default_condition_group)?;
        self.assemble_nodes(
            root_entity,
            nodes,
            request.property_map.as_ref(),
            &request.order_by,
            &request.is_desc,
        )
    }

    /// Parse a JSON [`FilterRequest`] and compile it.
    pub fn assemble_json(&self, root_entity: &str, json: &str) -> QueryResult<QueryPlan> {
        let request: FilterRequest = serde_json::from_str(json)?;
        self.assemble_request(root_entity, &request)
    }

    /// Compile already deserialized filter nodes.
    pub fn assemble_nodes(
        &self,
        root_entity: &str,
        mut nodes: Vec<FilterNode>,
        property_map: Option<&PropertyMap>,
        order_by: &OrderBySpec,
        is_desc: &Descending,
    ) -> QueryResult<QueryPlan> {
        let property_map = property_map.or_else(|| {
            Some(&self.config.property_map).filter(|map| !map.is_empty())
        });
        let root = self.graph.resolve_entity(root_entity)?;

        let tree = match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(FilterNode::Composite(CompositeFilter::new(Combinator::And, nodes)?)),
        };

        let mut plan = JoinPlan::new(root, self.config.join_scope);
        let predicate = match tree {
            Some(ref tree) => {
                for leaf in tree.leaves() {
                    plan.plan_joins(self.graph, leaf.join_segments(), &leaf.condition_group, property_map)?;
                }
                Some(PredicateBuilder::new(self.graph, &plan, property_map).build(tree)?)
            }
            None => None,
        };

        let order_by = self.order_clauses(root, property_map, order_by, is_desc)?;

        let distinct = plan.fans_out();
        let root_alias = plan.root().alias.clone();
        let joins = plan.into_joins();

        debug!(
            entity = %root.name,
            joins = joins.len(),
            filtered = predicate.is_some(),
            order_keys = order_by.len(),
            distinct,
            "assembled query"
        );

        Ok(QueryPlan {
            root_entity: root.name.clone(),
            root_table: root.table.clone(),
            root_alias,
            joins,
            predicate,
            order_by,
            distinct,
            dialect: self.config.dialect,
        })
    }

    fn order_clauses(
        &self,
        root: &EntitySpec,
        property_map: Option<&PropertyMap>,
        order_by: &OrderBySpec,
        is_desc: &Descending,
    ) -> QueryResult<Vec<OrderClause>> {
        let keys = order_by.keys();
        let flags = is_desc.flags(keys.len())?;
        if flags.len() != keys.len() {
            return Err(QueryError::length_mismatch(keys.len(), flags.len()));
        }

        keys.iter()
            .zip(flags)
            .map(|(key, desc)| -> QueryResult<OrderClause> {
                let column = self.graph.resolve_attribute(&root.name, key.resolve(property_map))?;
                Ok(OrderClause {
                    column: ColumnRef::new(root.table.clone(), column),
                    order: SortOrder::from_desc(desc),
                })
            })
            .collect()
    }

    /// Assemble and run a request on `engine`.
    pub async fn fetch<E: QueryEngine + ?Sized>(
        &self,
        engine: &E,
        root_entity: &str,
        request: &FilterRequest,
    ) -> QueryResult<Vec<Row>> {
        let plan = self.assemble_request(root_entity, request)?;
        engine.fetch_all(&plan).await
    }
}

/// Assemble with the default configuration and run on `engine`.
pub async fn query_with_filters<G, E>(
    graph: &G,
    engine: &E,
    root_entity: &str,
    filters: &[RawFilter],
    property_map: Option<&PropertyMap>,
    order_by: impl Into<OrderBySpec>,
    is_desc: impl Into<Descending>,
) -> QueryResult<Vec<Row>>
where
    G: RelationGraph + ?Sized,
    E: QueryEngine + ?Sized,
{
    let plan = QueryAssembler::new(graph).assemble(root_entity, filters, property_map, order_by, is_desc)?;
    engine.fetch_all(&plan).await
}
