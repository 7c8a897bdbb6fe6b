//! Filter nodes, the operator registry and the filter deserializer.
//!
//! Raw filter descriptions come in two shapes:
//!
//! ```json
//! {"field": "toys.name", "op": "=", "value": "rope", "condition_group": "a"}
//! {"op": "or", "value": [ ...raw entries... ]}
//! ```
//!
//! [`deserialize`] turns them into a tree of [`FilterNode`]s, validating every
//! leaf value against its [`Operator`] as it goes.
//!
//! ```rust
//! use sieve_query::filter::{deserialize_json, FilterNode, Operator};
//!
//! let nodes = deserialize_json(r#"[{"field": "weight", "op": "<", "value": 50}]"#).unwrap();
//! let FilterNode::Leaf(leaf) = &nodes[0] else { panic!() };
//! assert_eq!(leaf.operator, Operator::Lt);
//! assert_eq!(leaf.path.to_string(), "weight");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::value::{FilterValue, coerce};

/// Condition group used when a leaf does not name one.
pub const DEFAULT_CONDITION_GROUP: &str = "__default__";

/// Comparison operator of a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `=`
    Equals,
    /// `!=`
    NotEquals,
    /// `in`
    In,
    /// `like`
    Like,
    /// `contains`, any member of a related collection matches.
    Contains,
}

impl Operator {
    /// Every registered operator.
    pub const ALL: [Operator; 9] = [
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Equals,
        Self::NotEquals,
        Self::In,
        Self::Like,
        Self::Contains,
    ];

    /// Look up an operator by its symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// The operator's symbol in raw filter input.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::In => "in",
            Self::Like => "like",
            Self::Contains => "contains",
        }
    }

    /// Check whether a value lies in this operator's domain.
    pub fn accepts(&self, value: &FilterValue) -> bool {
        use FilterValue as V;

        match self {
            Self::Lt | Self::Lte | Self::Gt | Self::Gte => {
                matches!(value, V::Int(_) | V::Float(_) | V::Date(_) | V::DateTime(_))
            }
            Self::Equals | Self::NotEquals => matches!(
                value,
                V::Null | V::Bool(_) | V::Int(_) | V::String(_) | V::Date(_) | V::DateTime(_)
            ),
            Self::In => value.is_list(),
            Self::Like => matches!(value, V::String(_)),
            Self::Contains => true,
        }
    }

    /// Description of the accepted domain, used in error messages.
    pub fn expected_domain(&self) -> &'static str {
        match self {
            Self::Lt | Self::Lte | Self::Gt | Self::Gte => {
                "an ordinal value (integer, float, date or datetime)"
            }
            Self::Equals | Self::NotEquals => {
                "a string, integer, boolean, date, datetime or null value"
            }
            Self::In => "a list of values",
            Self::Like => "a string pattern",
            Self::Contains => "any value",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Dotted field path: relation traversals followed by a terminal attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: SmallVec<[SmolStr; 4]>,
}

impl FieldPath {
    /// Split a dotted string into a path. Empty segments are rejected.
    pub fn parse(dotted: &str) -> QueryResult<Self> {
        let segments: SmallVec<[SmolStr; 4]> = dotted.split('.').map(SmolStr::new).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(QueryError::field_resolution("<filter>", dotted)
                .with_help("Field paths are dot-separated names without empty segments"));
        }
        Ok(Self { segments })
    }

    /// All segments.
    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    /// Segments naming relation traversals (all but the last).
    pub fn relations(&self) -> &[SmolStr] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The terminal attribute.
    pub fn attribute(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// A parsed path is never empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// A single condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    /// Field the condition applies to.
    pub path: FieldPath,
    /// Comparison operator.
    pub operator: Operator,
    /// Coerced comparison value.
    pub value: FilterValue,
    /// Join-scope tag.
    pub condition_group: SmolStr,
}

impl FilterLeaf {
    /// Build a leaf, coercing and validating the value.
    pub fn new(
        field: &str,
        operator: Operator,
        value: FilterValue,
        condition_group: impl Into<SmolStr>,
    ) -> QueryResult<Self> {
        let leaf = Self {
            path: FieldPath::parse(field)?,
            operator,
            value: coerce(value),
            condition_group: condition_group.into(),
        };
        leaf.validate()?;
        Ok(leaf)
    }

    /// Check the value against the operator's domain.
    pub fn validate(&self) -> QueryResult<()> {
        if self.operator.accepts(&self.value) {
            return Ok(());
        }
        Err(QueryError::invalid_value(
            self.path.to_string(),
            self.operator.symbol(),
            self.value.to_string(),
            self.operator.expected_domain(),
        ))
    }

    /// Segments that must be joined before the predicate can be built.
    ///
    /// `contains` evaluates its related collection in a subquery, so the
    /// collection itself (the second to last segment of a nested path, or the
    /// only segment) is not joined.
    pub fn join_segments(&self) -> &[SmolStr] {
        let segments = self.path.segments();
        match self.operator {
            Operator::Contains => &segments[..segments.len().saturating_sub(2)],
            _ => self.path.relations(),
        }
    }
}

/// Boolean combinator of a composite filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// All children must hold.
    And,
    /// At least one child must hold.
    Or,
}

impl Combinator {
    /// Parse the raw `op` of a composite.
    pub fn parse(op: &str) -> QueryResult<Self> {
        match op {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(QueryError::invalid_operator(other)),
        }
    }

    /// Raw spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// AND/OR over a non-empty list of children.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFilter {
    /// How the children combine.
    pub combinator: Combinator,
    children: Vec<FilterNode>,
}

impl CompositeFilter {
    /// Build a composite. Fails when `children` is empty.
    pub fn new(combinator: Combinator, children: Vec<FilterNode>) -> QueryResult<Self> {
        if children.is_empty() {
            return Err(QueryError::empty_composite(combinator.as_str()));
        }
        Ok(Self {
            combinator,
            children,
        })
    }

    /// The children, in input order.
    pub fn children(&self) -> &[FilterNode] {
        &self.children
    }
}

/// A node of the typed filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// A single condition.
    Leaf(FilterLeaf),
    /// A group of conditions.
    Composite(CompositeFilter),
}

impl FilterNode {
    /// Every leaf below this node, depth first in input order.
    pub fn leaves(&self) -> Vec<&FilterLeaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a FilterLeaf>) {
        match self {
            Self::Leaf(leaf) => out.push(leaf),
            Self::Composite(composite) => {
                for child in &composite.children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// Raw leaf record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLeaf {
    /// Dotted field path.
    pub field: String,
    /// Operator symbol.
    pub op: String,
    /// Uncoerced value.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Optional join-scope tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_group: Option<String>,
}

/// Raw composite record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawComposite {
    /// `and` or `or`.
    pub op: String,
    /// Child entries.
    pub value: Vec<RawFilter>,
}

/// One raw filter entry, as received from the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFilter {
    /// `{field, op, value, condition_group?}`
    Leaf(RawLeaf),
    /// `{op, value: [...]}`
    Composite(RawComposite),
}

impl RawFilter {
    /// Raw leaf in the default condition group.
    pub fn leaf(field: impl Into<String>, op: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Leaf(RawLeaf {
            field: field.into(),
            op: op.into(),
            value,
            condition_group: None,
        })
    }

    /// Raw leaf in a named condition group.
    pub fn grouped(
        field: impl Into<String>,
        op: impl Into<String>,
        value: serde_json::Value,
        group: impl Into<String>,
    ) -> Self {
        Self::Leaf(RawLeaf {
            field: field.into(),
            op: op.into(),
            value,
            condition_group: Some(group.into()),
        })
    }

    /// Raw `and` composite.
    pub fn and(children: impl IntoIterator<Item = RawFilter>) -> Self {
        Self::composite("and", children)
    }

    /// Raw `or` composite.
    pub fn or(children: impl IntoIterator<Item = RawFilter>) -> Self {
        Self::composite("or", children)
    }

    /// Raw composite with an arbitrary operator.
    pub fn composite(op: impl Into<String>, children: impl IntoIterator<Item = RawFilter>) -> Self {
        Self::Composite(RawComposite {
            op: op.into(),
            value: children.into_iter().collect(),
        })
    }
}

/// Turn raw entries into typed filter nodes.
pub fn deserialize(raw: &[RawFilter]) -> QueryResult<Vec<FilterNode>> {
    deserialize_with_group(raw, DEFAULT_CONDITION_GROUP)
}

/// Like [`deserialize`], tagging leaves without a condition group with
/// `default_group`.
pub fn deserialize_with_group(raw: &[RawFilter], default_group: &str) -> QueryResult<Vec<FilterNode>> {
    raw.iter()
        .map(|entry| deserialize_one(entry, default_group))
        .collect()
}

/// Parse a JSON array of raw entries and deserialize it.
pub fn deserialize_json(json: &str) -> QueryResult<Vec<FilterNode>> {
    let raw: Vec<RawFilter> = serde_json::from_str(json)?;
    deserialize(&raw)
}

fn deserialize_one(raw: &RawFilter, default_group: &str) -> QueryResult<FilterNode> {
    match raw {
        RawFilter::Leaf(leaf) => {
            let operator = Operator::from_symbol(&leaf.op)
                .ok_or_else(|| QueryError::unknown_operator(&leaf.field, &leaf.op))?;
            let group = leaf
                .condition_group
                .as_deref()
                .unwrap_or(default_group);
            let value = FilterValue::from_json(leaf.value.clone()).map_err(|n| {
                QueryError::invalid_value(
                    &leaf.field,
                    &leaf.op,
                    n.to_string(),
                    "integers within the signed 64-bit range",
                )
            })?;
            FilterLeaf::new(&leaf.field, operator, value, group).map(FilterNode::Leaf)
        }
        // emptiness, then the combinator, then the children in order
        RawFilter::Composite(composite) => {
            if composite.value.is_empty() {
                return Err(QueryError::empty_composite(&composite.op));
            }
            let combinator = Combinator::parse(&composite.op)?;
            let children = deserialize_with_group(&composite.value, default_group)?;
            CompositeFilter::new(combinator, children).map(FilterNode::Composite)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn one(raw: RawFilter) -> QueryResult<FilterNode> {
        deserialize(&[raw]).map(|mut nodes| nodes.remove(0))
    }

    fn leaf(raw: RawFilter) -> FilterLeaf {
        match one(raw).unwrap() {
            FilterNode::Leaf(leaf) => leaf,
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    fn err_code(raw: RawFilter) -> ErrorCode {
        one(raw).unwrap_err().code
    }

    #[test]
    fn test_registry_round_trips_symbols() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operator::from_symbol("~"), None);
    }

    #[test]
    fn test_ordinal_operators_accept_numbers_and_dates() {
        let f = leaf(RawFilter::leaf("weight", "<", json!(10.24)));
        assert_eq!(f.operator, Operator::Lt);
        let f = leaf(RawFilter::leaf("weight", "<", json!(10)));
        assert_eq!(f.value, FilterValue::Int(10));
        let f = leaf(RawFilter::leaf("weight", "<", json!("2018-12-15")));
        assert_eq!(
            f.value,
            FilterValue::Date(NaiveDate::from_ymd_opt(2018, 12, 15).unwrap())
        );
        let f = leaf(RawFilter::leaf("weight", "<", json!("2018-12-15T08:00:23")));
        assert!(matches!(f.value, FilterValue::DateTime(_)));
    }

    #[test]
    fn test_ordinal_operators_reject_plain_strings() {
        for op in ["<", "<=", ">", ">="] {
            assert_eq!(
                err_code(RawFilter::leaf("weight", op, json!("heavy"))),
                ErrorCode::InvalidValue
            );
            assert_eq!(
                err_code(RawFilter::leaf("weight", op, json!(true))),
                ErrorCode::InvalidValue
            );
        }
    }

    #[test]
    fn test_equality_rejects_float_accepts_null() {
        for op in ["=", "!="] {
            assert_eq!(
                err_code(RawFilter::leaf("weight", op, json!(1.5))),
                ErrorCode::InvalidValue
            );
            let f = leaf(RawFilter::leaf("dob", op, json!(null)));
            assert!(f.value.is_null());
        }
        assert_eq!(
            err_code(RawFilter::leaf("name", "=", json!(["a"]))),
            ErrorCode::InvalidValue
        );
    }

    #[test]
    fn test_in_requires_list() {
        let f = leaf(RawFilter::leaf("name", "in", json!(["Jinx", "Kaya"])));
        assert!(f.value.is_list());
        assert_eq!(
            err_code(RawFilter::leaf("name", "in", json!(3))),
            ErrorCode::InvalidValue
        );
    }

    #[test]
    fn test_like_requires_string() {
        leaf(RawFilter::leaf("name", "like", json!("J%")));
        assert_eq!(
            err_code(RawFilter::leaf("name", "like", json!(3))),
            ErrorCode::InvalidValue
        );
    }

    #[test]
    fn test_contains_accepts_anything() {
        leaf(RawFilter::leaf("toys.name", "contains", json!("ball")));
        leaf(RawFilter::leaf("toys", "contains", json!(3)));
        leaf(RawFilter::leaf("toys", "contains", json!({"id": 3})));
    }

    #[test]
    fn test_unknown_operator() {
        let err = one(RawFilter::leaf("weight", "~=", json!(1))).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownOperator);
        assert_eq!(err.context.field.as_deref(), Some("weight"));
    }

    #[test]
    fn test_invalid_value_names_path_operator_and_value() {
        let err = one(RawFilter::leaf("toys.weight", ">", json!("a lot"))).unwrap_err();
        assert!(err.message.contains("toys.weight"));
        assert!(err.message.contains('>'));
        assert!(err.message.contains("a lot"));
    }

    #[test]
    fn test_condition_group_defaults() {
        let f = leaf(RawFilter::leaf("name", "=", json!("x")));
        assert_eq!(f.condition_group, DEFAULT_CONDITION_GROUP);
        let f = leaf(RawFilter::grouped("name", "=", json!("x"), "a"));
        assert_eq!(f.condition_group, "a");
    }

    #[test]
    fn test_field_path_split() {
        let f = leaf(RawFilter::leaf("owner.address.street", "=", json!("x")));
        assert_eq!(f.path.relations(), &["owner", "address"]);
        assert_eq!(f.path.attribute(), "street");
        assert_eq!(f.join_segments(), &["owner", "address"]);
        assert_eq!(
            err_code(RawFilter::leaf("owner..street", "=", json!("x"))),
            ErrorCode::FieldResolution
        );
    }

    #[test]
    fn test_contains_join_segments_exclude_collection() {
        let f = leaf(RawFilter::leaf("owner.toys.name", "contains", json!("x")));
        assert_eq!(f.join_segments(), &["owner"]);
        let f = leaf(RawFilter::leaf("toys", "contains", json!(1)));
        assert!(f.join_segments().is_empty());
    }

    #[test]
    fn test_composite() {
        let node = one(RawFilter::or([
            RawFilter::leaf("name", "=", json!("a")),
            RawFilter::and([
                RawFilter::leaf("weight", ">", json!(1)),
                RawFilter::leaf("weight", "<", json!(9)),
            ]),
        ]))
        .unwrap();
        let FilterNode::Composite(c) = &node else {
            panic!("expected composite")
        };
        assert_eq!(c.combinator, Combinator::Or);
        assert_eq!(c.children().len(), 2);
        assert_eq!(node.leaves().len(), 3);
    }

    #[test]
    fn test_empty_composite_at_any_depth() {
        assert_eq!(err_code(RawFilter::and([])), ErrorCode::EmptyComposite);
        let nested = RawFilter::or([RawFilter::and([RawFilter::or([
            RawFilter::leaf("name", "=", json!("a")),
            RawFilter::and([]),
        ])])]);
        assert_eq!(err_code(nested), ErrorCode::EmptyComposite);
    }

    #[test]
    fn test_invalid_composite_operator() {
        let raw = RawFilter::composite("xor", [RawFilter::leaf("name", "=", json!("a"))]);
        assert_eq!(err_code(raw), ErrorCode::InvalidOperator);
    }

    #[test]
    fn test_empty_composite_wins_over_bad_combinator() {
        let raw = RawFilter::composite("xor", Vec::new());
        assert_eq!(err_code(raw), ErrorCode::EmptyComposite);
    }

    #[test]
    fn test_bad_combinator_reported_before_children() {
        let raw = RawFilter::composite("xor", [RawFilter::leaf("weight", "~", json!(1))]);
        assert_eq!(err_code(raw), ErrorCode::InvalidOperator);
    }

    #[test]
    fn test_integer_beyond_i64_is_invalid_value() {
        let err = one(RawFilter::leaf("weight", "=", json!(u64::MAX))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidValue);
        assert!(err.message.contains(&u64::MAX.to_string()));
    }

    #[test]
    fn test_deserialize_json_shapes() {
        let nodes = deserialize_json(
            r#"[
                {"field": "toys.name", "op": "=", "value": "ball", "condition_group": "a"},
                {"op": "or", "value": [{"field": "weight", "op": ">", "value": 90}]}
            ]"#,
        )
        .unwrap();
        assert!(matches!(nodes[0], FilterNode::Leaf(_)));
        assert!(matches!(nodes[1], FilterNode::Composite(_)));
    }

    #[test]
    fn test_deserialize_json_malformed() {
        let err = deserialize_json(r#"[{"op": "="}]"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeserializationError);
    }
}
