//! Common types used in query assembly.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Descending when `desc` is true.
    pub fn from_desc(desc: bool) -> Self {
        if desc { Self::Desc } else { Self::Asc }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Mapping from external field names to schema names.
///
/// Names without an entry map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(HashMap<String, String>);

impl PropertyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping.
    pub fn insert(&mut self, external: impl Into<String>, internal: impl Into<String>) {
        self.0.insert(external.into(), internal.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.insert(external, internal);
        self
    }

    /// Internal name for `external`.
    pub fn resolve<'a>(&'a self, external: &'a str) -> &'a str {
        self.0.get(external).map(String::as_str).unwrap_or(external)
    }

    /// Check if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Column qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table alias.
    pub alias: SmolStr,
    /// Column name.
    pub column: SmolStr,
}

impl ColumnRef {
    /// Create a new column reference.
    pub fn new(alias: impl Into<SmolStr>, column: impl Into<SmolStr>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

/// One entry of an explicit ordering list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OrderKey {
    /// External field name, remapped through the property map.
    Name(String),
    /// Schema attribute name, used verbatim.
    Field(SmolStr),
}

impl OrderKey {
    /// External field name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Schema attribute handle.
    pub fn field(attribute: impl Into<SmolStr>) -> Self {
        Self::Field(attribute.into())
    }

    /// The schema attribute this key refers to.
    pub fn resolve<'a>(&'a self, property_map: Option<&'a PropertyMap>) -> &'a str {
        match self {
            Self::Name(name) => match property_map {
                Some(map) => map.resolve(name),
                None => name,
            },
            Self::Field(field) => field,
        }
    }
}

impl From<String> for OrderKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&str> for OrderKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Requested ordering keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(untagged)]
pub enum OrderBySpec {
    /// No ordering.
    #[default]
    None,
    /// One name or a comma-separated list of names.
    Names(String),
    /// Explicit list of keys.
    Keys(Vec<OrderKey>),
}

impl OrderBySpec {
    /// Flatten into a list of keys. Comma-separated entries are trimmed and
    /// blank entries dropped.
    pub fn keys(&self) -> Vec<OrderKey> {
        match self {
            Self::None => Vec::new(),
            Self::Names(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(OrderKey::from)
                .collect(),
            Self::Keys(keys) => keys.clone(),
        }
    }
}

impl From<&str> for OrderBySpec {
    fn from(names: &str) -> Self {
        Self::Names(names.to_string())
    }
}

impl From<String> for OrderBySpec {
    fn from(names: String) -> Self {
        Self::Names(names)
    }
}

impl<K: Into<OrderKey>> From<Vec<K>> for OrderBySpec {
    fn from(keys: Vec<K>) -> Self {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<OrderBySpec>> From<Option<T>> for OrderBySpec {
    fn from(spec: Option<T>) -> Self {
        spec.map(Into::into).unwrap_or_default()
    }
}

/// Requested sort directions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Descending {
    /// One flag for every ordering key.
    All(bool),
    /// Comma-separated boolean tokens, one per key.
    Tokens(String),
    /// Explicit flag per key.
    PerKey(Vec<bool>),
}

impl Default for Descending {
    fn default() -> Self {
        Self::All(false)
    }
}

impl Descending {
    /// Expand into one flag per ordering key.
    pub fn flags(&self, key_count: usize) -> QueryResult<Vec<bool>> {
        match self {
            Self::All(desc) => Ok(vec![*desc; key_count]),
            Self::Tokens(tokens) => tokens
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(parse_flag)
                .collect(),
            Self::PerKey(flags) => Ok(flags.clone()),
        }
    }
}

fn parse_flag(token: &str) -> QueryResult<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "desc" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "asc" => Ok(false),
        _ => Err(QueryError::invalid_value(
            "is_desc",
            "order",
            token,
            "a boolean token (true/false, yes/no, 1/0, desc/asc)",
        )),
    }
}

impl From<bool> for Descending {
    fn from(desc: bool) -> Self {
        Self::All(desc)
    }
}

impl From<&str> for Descending {
    fn from(tokens: &str) -> Self {
        Self::Tokens(tokens.to_string())
    }
}

impl From<Vec<bool>> for Descending {
    fn from(flags: Vec<bool>) -> Self {
        Self::PerKey(flags)
    }
}

impl<T: Into<Descending>> From<Option<T>> for Descending {
    fn from(desc: Option<T>) -> Self {
        desc.map(Into::into).unwrap_or_default()
    }
}

/// A resolved ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Column to sort by.
    pub column: ColumnRef,
    /// The sort order.
    pub order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sort_order() {
        assert_eq!(SortOrder::from_desc(true).as_sql(), "DESC");
        assert_eq!(SortOrder::default(), SortOrder::Asc);
    }

    #[test]
    fn test_property_map_fallback() {
        let map = PropertyMap::new().with("dateOfBirth", "dob");
        assert_eq!(map.resolve("dateOfBirth"), "dob");
        assert_eq!(map.resolve("weight"), "weight");
    }

    #[test]
    fn test_order_by_comma_string_matches_list() {
        let joined = OrderBySpec::from("name, weight").keys();
        let listed = OrderBySpec::from(vec!["name", "weight"]).keys();
        assert_eq!(joined, listed);
    }

    #[test]
    fn test_order_key_resolve() {
        let map = PropertyMap::new().with("dateOfBirth", "dob");
        assert_eq!(OrderKey::name("dateOfBirth").resolve(Some(&map)), "dob");
        assert_eq!(OrderKey::field("dateOfBirth").resolve(Some(&map)), "dateOfBirth");
        assert_eq!(OrderKey::name("weight").resolve(None), "weight");
    }

    #[test]
    fn test_descending_flags() {
        assert_eq!(Descending::from(true).flags(3).unwrap(), vec![true, true, true]);
        assert_eq!(
            Descending::from("true, no,DESC").flags(3).unwrap(),
            vec![true, false, true]
        );
        assert_eq!(Descending::from(vec![false]).flags(5).unwrap(), vec![false]);
        let err = Descending::from("maybe").flags(1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidValue);
    }

    #[test]
    fn test_deserialize_shapes() {
        let spec: OrderBySpec = serde_json::from_str(r#""name,weight""#).unwrap();
        assert_eq!(spec.keys().len(), 2);
        let spec: OrderBySpec = serde_json::from_str(r#"["name"]"#).unwrap();
        assert_eq!(spec, OrderBySpec::Keys(vec![OrderKey::name("name")]));
        let desc: Descending = serde_json::from_str("true").unwrap();
        assert_eq!(desc, Descending::All(true));
        let desc: Descending = serde_json::from_str(r#""true,false""#).unwrap();
        assert_eq!(desc.flags(2).unwrap(), vec![true, false]);
        let desc: Descending = serde_json::from_str("[true, false]").unwrap();
        assert_eq!(desc, Descending::PerKey(vec![true, false]));
    }
}
