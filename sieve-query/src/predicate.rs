//! Predicate building.
//!
//! Leaves become single conditions against the alias their path was joined
//! to; composites recurse into their children, wrap each in its own group and
//! combine them with AND or OR.

use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Combinator, CompositeFilter, FilterLeaf, FilterNode, Operator};
use crate::join::{Join, JoinPlan, JoinTarget};
use crate::schema::RelationGraph;
use crate::types::{ColumnRef, PropertyMap};
use crate::value::FilterValue;

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// Boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant truth value.
    Literal(bool),
    /// `column <op> value`
    Compare {
        /// Left-hand column.
        column: ColumnRef,
        /// Comparison.
        op: CompareOp,
        /// Bound value.
        value: FilterValue,
    },
    /// `column IS [NOT] NULL`
    IsNull {
        /// Tested column.
        column: ColumnRef,
        /// `IS NOT NULL` when true.
        negated: bool,
    },
    /// `column IN (values)`
    In {
        /// Tested column.
        column: ColumnRef,
        /// Candidate values, never empty.
        values: Vec<FilterValue>,
    },
    /// `column LIKE pattern`
    Like {
        /// Tested column.
        column: ColumnRef,
        /// Pattern with SQL wildcards.
        pattern: String,
    },
    /// At least one row reached through `join` satisfies `condition`.
    Exists {
        /// Correlated relation hop.
        join: Join,
        /// Condition on the related row.
        condition: Box<Expr>,
    },
    /// Parenthesized expression.
    Group(Box<Expr>),
    /// Conjunction.
    And(Vec<Expr>),
    /// Disjunction.
    Or(Vec<Expr>),
}

impl Expr {
    /// Equality that understands null and list values.
    pub fn equals(column: ColumnRef, value: FilterValue) -> Self {
        match value {
            FilterValue::Null => Self::IsNull {
                column,
                negated: false,
            },
            FilterValue::List(values) => Self::is_in(column, values),
            value => Self::Compare {
                column,
                op: CompareOp::Eq,
                value,
            },
        }
    }

    /// Membership test; an empty list never matches.
    pub fn is_in(column: ColumnRef, values: Vec<FilterValue>) -> Self {
        if values.is_empty() {
            Self::Literal(false)
        } else {
            Self::In { column, values }
        }
    }

    /// Wrap in a group.
    pub fn grouped(self) -> Self {
        Self::Group(Box::new(self))
    }
}

/// Builds the predicate of one query assembly.
///
/// Every leaf's join path must already be planned in `plan`.
pub struct PredicateBuilder<'a, G: RelationGraph + ?Sized> {
    graph: &'a G,
    plan: &'a JoinPlan,
    property_map: Option<&'a PropertyMap>,
    subqueries: usize,
}

impl<'a, G: RelationGraph + ?Sized> PredicateBuilder<'a, G> {
    /// Create a builder over a planned set of joins.
    pub fn new(graph: &'a G, plan: &'a JoinPlan, property_map: Option<&'a PropertyMap>) -> Self {
        Self {
            graph,
            plan,
            property_map,
            subqueries: 0,
        }
    }

    /// Build the condition for any node.
    pub fn build(&mut self, node: &FilterNode) -> QueryResult<Expr> {
        match node {
            FilterNode::Leaf(leaf) => self.build_leaf(leaf),
            FilterNode::Composite(composite) => self.build_composite(composite),
        }
    }

    /// Build each child in its own group and combine them.
    pub fn build_composite(&mut self, composite: &CompositeFilter) -> QueryResult<Expr> {
        let children = composite
            .children()
            .iter()
            .map(|child| self.build(child).map(Expr::grouped))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(match composite.combinator {
            Combinator::And => Expr::And(children),
            Combinator::Or => Expr::Or(children),
        })
    }

    /// Build the condition of a single leaf.
    pub fn build_leaf(&mut self, leaf: &FilterLeaf) -> QueryResult<Expr> {
        let target = self
            .plan
            .target(leaf.join_segments(), &leaf.condition_group, self.property_map)?;

        if leaf.operator == Operator::Contains {
            return self.build_contains(leaf, &target);
        }

        let column = self.column(&target, leaf.path.attribute())?;
        let value = leaf.value.clone();

        let expr = match leaf.operator {
            Operator::Equals => Expr::equals(column, value),
            Operator::NotEquals => match value {
                FilterValue::Null => Expr::IsNull {
                    column,
                    negated: true,
                },
                value => Expr::Compare {
                    column,
                    op: CompareOp::Ne,
                    value,
                },
            },
            Operator::Lt => compare(column, CompareOp::Lt, value),
            Operator::Lte => compare(column, CompareOp::Lte, value),
            Operator::Gt => compare(column, CompareOp::Gt, value),
            Operator::Gte => compare(column, CompareOp::Gte, value),
            Operator::In => match value {
                FilterValue::List(values) => Expr::is_in(column, values),
                other => return Err(unexpected(leaf, &other)),
            },
            Operator::Like => match value {
                FilterValue::String(pattern) => Expr::Like { column, pattern },
                other => return Err(unexpected(leaf, &other)),
            },
            Operator::Contains => unreachable!("handled above"),
        };

        Ok(expr)
    }

    /// `contains`: some row of the related collection has the value.
    ///
    /// The collection is the second to last path segment and the compared
    /// subfield the last one; a single-segment path compares the related
    /// entity's primary key.
    fn build_contains(&mut self, leaf: &FilterLeaf, target: &JoinTarget) -> QueryResult<Expr> {
        let segments = leaf.path.segments();
        let (collection, subfield) = match segments {
            [collection] => (collection, None),
            [.., collection, subfield] => (collection, Some(subfield)),
            [] => return Err(QueryError::internal("contains on an empty path")),
        };

        let graph = self.graph;
        let relation = graph.resolve_relation(&target.entity, self.remap(collection))?;

        self.subqueries += 1;
        let alias = SmolStr::from(format!("s{}", self.subqueries));
        let join = Join::resolve(graph, target, relation, alias)?;
        crate::sieve_debug!(
            relation = %relation.name,
            table = %join.table,
            alias = %join.alias,
            "contains evaluated as correlated subquery"
        );

        let column = match subfield {
            Some(attribute) => self.column(&join.target(), attribute)?,
            None => {
                let entity = graph.resolve_entity(&join.entity)?;
                ColumnRef::new(join.alias.clone(), entity.primary_key.clone())
            }
        };

        Ok(Expr::Exists {
            join,
            condition: Box::new(Expr::equals(column, leaf.value.clone())),
        })
    }

    fn column(&self, target: &JoinTarget, attribute: &str) -> QueryResult<ColumnRef> {
        let attribute = self.remap(attribute);
        let column = self.graph.resolve_attribute(&target.entity, attribute)?;
        Ok(ColumnRef::new(target.alias.clone(), column))
    }

    fn remap<'n>(&self, name: &'n str) -> &'n str
    where
        'a: 'n,
    {
        match self.property_map {
            Some(map) => map.resolve(name),
            None => name,
        }
    }
}

fn compare(column: ColumnRef, op: CompareOp, value: FilterValue) -> Expr {
    Expr::Compare { column, op, value }
}

fn unexpected(leaf: &FilterLeaf, value: &FilterValue) -> QueryError {
    QueryError::invalid_value(
        leaf.path.to_string(),
        leaf.operator.symbol(),
        value.to_string(),
        leaf.operator.expected_domain(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::filter::{RawFilter, deserialize};
    use crate::join::JoinScope;
    use crate::schema::{EntitySpec, JoinTableSpec, RelationSpec, SchemaRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_entity(
                EntitySpec::new("Dog", "dog")
                    .attributes(["name", "weight", "dob"])
                    .relation(RelationSpec::many_to_many(
                        "toys",
                        "Toy",
                        JoinTableSpec::new("dog_toys", "dog_id", "toy_id"),
                    )),
            )
            .with_entity(EntitySpec::new("Toy", "toy").attribute("name"))
    }

    fn build(reg: &SchemaRegistry, raw: RawFilter, map: Option<&PropertyMap>) -> QueryResult<Expr> {
        let node = deserialize(&[raw])?.remove(0);
        let mut plan = JoinPlan::new(reg.resolve_entity("Dog")?, JoinScope::ConditionGroup);
        for leaf in node.leaves() {
            plan.plan_joins(reg, leaf.join_segments(), &leaf.condition_group, map)?;
        }
        PredicateBuilder::new(reg, &plan, map).build(&node)
    }

    fn col(alias: &str, column: &str) -> ColumnRef {
        ColumnRef::new(alias, column)
    }

    #[test]
    fn test_comparison() {
        let reg = registry();
        let expr = build(&reg, RawFilter::leaf("weight", "<", json!(50)), None).unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                column: col("dog", "weight"),
                op: CompareOp::Lt,
                value: FilterValue::Int(50),
            }
        );
    }

    #[test]
    fn test_null_equality() {
        let reg = registry();
        let eq = build(&reg, RawFilter::leaf("dob", "=", json!(null)), None).unwrap();
        assert_eq!(
            eq,
            Expr::IsNull {
                column: col("dog", "dob"),
                negated: false
            }
        );
        let ne = build(&reg, RawFilter::leaf("dob", "!=", json!(null)), None).unwrap();
        assert_eq!(
            ne,
            Expr::IsNull {
                column: col("dog", "dob"),
                negated: true
            }
        );
    }

    #[test]
    fn test_in_and_empty_in() {
        let reg = registry();
        let expr = build(&reg, RawFilter::leaf("name", "in", json!(["Jinx", "Kaya"])), None).unwrap();
        assert!(matches!(expr, Expr::In { ref values, .. } if values.len() == 2));
        let empty = build(&reg, RawFilter::leaf("name", "in", json!([])), None).unwrap();
        assert_eq!(empty, Expr::Literal(false));
    }

    #[test]
    fn test_like() {
        let reg = registry();
        let expr = build(&reg, RawFilter::leaf("name", "like", json!("J%")), None).unwrap();
        assert_eq!(
            expr,
            Expr::Like {
                column: col("dog", "name"),
                pattern: "J%".into()
            }
        );
    }

    #[test]
    fn test_nested_attribute_uses_join_alias() {
        let reg = registry();
        let expr = build(&reg, RawFilter::leaf("toys.name", "=", json!("rope")), None).unwrap();
        assert_eq!(expr, Expr::equals(col("j1", "name"), "rope".into()));
    }

    #[test]
    fn test_contains_subfield() {
        let reg = registry();
        let expr = build(&reg, RawFilter::leaf("toys.name", "contains", json!("ball")), None).unwrap();
        let Expr::Exists { join, condition } = expr else {
            panic!("expected EXISTS")
        };
        assert_eq!(join.alias, "s1");
        assert_eq!(join.table, "toy");
        assert_eq!(*condition, Expr::equals(col("s1", "name"), "ball".into()));
    }

    #[test]
    fn test_contains_identity() {
        let reg = registry();
        let expr = build(&reg, RawFilter::leaf("toys", "contains", json!(2)), None).unwrap();
        let Expr::Exists { condition, .. } = expr else {
            panic!("expected EXISTS")
        };
        assert_eq!(*condition, Expr::equals(col("s1", "id"), FilterValue::Int(2)));
    }

    #[test]
    fn test_composite_groups_children() {
        let reg = registry();
        let raw = RawFilter::or([
            RawFilter::leaf("name", "=", json!("Quick")),
            RawFilter::and([
                RawFilter::leaf("weight", ">", json!(50)),
                RawFilter::leaf("weight", "<", json!(60)),
            ]),
        ]);
        let expr = build(&reg, raw, None).unwrap();
        let Expr::Or(children) = expr else {
            panic!("expected OR")
        };
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| matches!(c, Expr::Group(_))));
        let Expr::Group(inner) = &children[1] else { unreachable!() };
        assert!(matches!(**inner, Expr::And(ref v) if v.len() == 2));
    }

    #[test]
    fn test_property_map_on_terminal() {
        let reg = registry();
        let map = PropertyMap::new().with("dateOfBirth", "dob");
        let expr = build(
            &reg,
            RawFilter::leaf("dateOfBirth", "<", json!("2002-01-01")),
            Some(&map),
        )
        .unwrap();
        assert!(matches!(expr, Expr::Compare { ref column, .. } if column.column == "dob"));
    }

    #[test]
    fn test_unknown_attribute() {
        let reg = registry();
        let err = build(&reg, RawFilter::leaf("age", ">", json!(3)), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::FieldResolution);
    }
}
