//! SQL generation utilities.
//!
//! [`render`] turns an assembled [`QueryPlan`] into parameterized SQL for a
//! [`DatabaseType`]. Values are never inlined; every literal becomes a
//! placeholder with the value appended to the parameter list.

use serde::{Deserialize, Serialize};

use crate::join::Join;
use crate::predicate::Expr;
use crate::query::QueryPlan;
use crate::types::ColumnRef;
use crate::value::FilterValue;

/// Escape a string for use in SQL (for identifiers, not values).
pub fn escape_identifier(name: &str) -> String {
    // Double any existing quotes
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Check if an identifier needs quoting.
pub fn needs_quoting(name: &str) -> bool {
    let reserved = [
        "user", "order", "group", "select", "from", "where", "table", "index",
        "key", "primary", "foreign", "check", "default", "null", "not", "and",
        "or", "in", "is", "like", "between", "case", "when", "then", "else",
        "end", "as", "on", "join", "left", "right", "inner", "outer", "cross",
        "natural", "using", "limit", "offset", "union", "intersect", "except",
        "all", "distinct", "having", "exists", "values", "set",
    ];

    if name.is_empty() || reserved.contains(&name.to_lowercase().as_str()) {
        return true;
    }

    !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || name.starts_with(|c: char| c.is_ascii_digit())
}

/// Quote an identifier if needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name)
    } else {
        name.to_string()
    }
}

/// SQL dialect, chosen for its placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL uses $1, $2, etc.
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// MySQL uses ?, ?, etc.
    MySQL,
    /// SQLite uses ?, ?, etc.
    #[serde(alias = "sqlite3")]
    SQLite,
}

impl DatabaseType {
    /// Get the parameter placeholder for this database type.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", index),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }
}

/// A SQL builder for constructing queries.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    db_type: DatabaseType,
    parts: Vec<String>,
    params: Vec<FilterValue>,
}

impl SqlBuilder {
    /// Create a new SQL builder.
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            parts: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Create a PostgreSQL SQL builder.
    pub fn postgres() -> Self {
        Self::new(DatabaseType::PostgreSQL)
    }

    /// Create a SQLite SQL builder.
    pub fn sqlite() -> Self {
        Self::new(DatabaseType::SQLite)
    }

    /// Push a literal SQL string.
    pub fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.parts.push(sql.as_ref().to_string());
        self
    }

    /// Push a placeholder bound to `value`.
    pub fn push_param(&mut self, value: impl Into<FilterValue>) -> &mut Self {
        let index = self.params.len() + 1;
        self.parts.push(self.db_type.placeholder(index));
        self.params.push(value.into());
        self
    }

    /// Push an identifier (properly quoted if needed).
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        self.parts.push(quote_identifier(name));
        self
    }

    /// Push `alias.column`.
    pub fn push_column(&mut self, column: &ColumnRef) -> &mut Self {
        self.push_identifier(&column.alias)
            .push(".")
            .push_identifier(&column.column)
    }

    /// Push `table` or `table AS alias`.
    pub fn push_table(&mut self, table: &str, alias: &str) -> &mut Self {
        self.push_identifier(table);
        if table != alias {
            self.push(" AS ").push_identifier(alias);
        }
        self
    }

    /// Push `a = b AND c = d`.
    pub fn push_equalities(&mut self, pairs: &[(ColumnRef, ColumnRef)]) -> &mut Self {
        for (i, (left, right)) in pairs.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push_column(left).push(" = ").push_column(right);
        }
        self
    }

    /// Push `INNER JOIN` clauses for one join, link table first.
    pub fn push_join(&mut self, join: &Join) -> &mut Self {
        if let Some(link) = &join.link {
            self.push(" INNER JOIN ")
                .push_table(&link.table, &link.alias)
                .push(" ON ")
                .push_equalities(&link.on);
        }
        self.push(" INNER JOIN ")
            .push_table(&join.table, &join.alias)
            .push(" ON ")
            .push_equalities(&join.on)
    }

    /// Push a boolean expression.
    pub fn push_expr(&mut self, expr: &Expr) -> &mut Self {
        match expr {
            Expr::Literal(true) => self.push("1 = 1"),
            Expr::Literal(false) => self.push("1 = 0"),
            Expr::Compare { column, op, value } => self
                .push_column(column)
                .push(format!(" {} ", op.as_sql()))
                .push_param(value.clone()),
            Expr::IsNull { column, negated } => {
                let test = if *negated { " IS NOT NULL" } else { " IS NULL" };
                self.push_column(column).push(test)
            }
            Expr::In { column, values } => {
                self.push_column(column).push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push_param(value.clone());
                }
                self.push(")")
            }
            Expr::Like { column, pattern } => self
                .push_column(column)
                .push(" LIKE ")
                .push_param(pattern.as_str()),
            Expr::Exists { join, condition } => self.push_exists(join, condition),
            Expr::Group(inner) => self.push("(").push_expr(inner).push(")"),
            Expr::And(children) => self.push_connective(children, " AND ", true),
            Expr::Or(children) => self.push_connective(children, " OR ", false),
        }
    }

    fn push_connective(&mut self, children: &[Expr], sep: &str, empty: bool) -> &mut Self {
        if children.is_empty() {
            return self.push_expr(&Expr::Literal(empty));
        }
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.push_expr(child);
        }
        self
    }

    /// `EXISTS (SELECT 1 FROM related WHERE correlation AND (condition))`
    fn push_exists(&mut self, join: &Join, condition: &Expr) -> &mut Self {
        self.push("EXISTS (SELECT 1 FROM ");
        let correlation = match &join.link {
            Some(link) => {
                self.push_table(&link.table, &link.alias)
                    .push(" INNER JOIN ")
                    .push_table(&join.table, &join.alias)
                    .push(" ON ")
                    .push_equalities(&join.on);
                &link.on
            }
            None => {
                self.push_table(&join.table, &join.alias);
                &join.on
            }
        };
        self.push(" WHERE ")
            .push_equalities(correlation)
            .push(" AND (")
            .push_expr(condition)
            .push("))")
    }

    /// Build the final SQL string and parameters.
    pub fn build(self) -> (String, Vec<FilterValue>) {
        (self.parts.join(""), self.params)
    }

    /// Get the current SQL string (without consuming).
    pub fn sql(&self) -> String {
        self.parts.join("")
    }

    /// Get the current parameters.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }
}

impl Default for SqlBuilder {
    fn default() -> Self {
        Self::postgres()
    }
}

/// Render a plan as `SELECT ... FROM ... WHERE ... ORDER BY ...`.
pub fn render(plan: &QueryPlan, db_type: DatabaseType) -> (String, Vec<FilterValue>) {
    let mut builder = SqlBuilder::new(db_type);

    builder.push("SELECT ");
    if plan.distinct {
        builder.push("DISTINCT ");
    }
    builder
        .push_identifier(&plan.root_alias)
        .push(".* FROM ")
        .push_table(&plan.root_table, &plan.root_alias);

    for join in &plan.joins {
        builder.push_join(join);
    }

    if let Some(predicate) = &plan.predicate {
        builder.push(" WHERE ").push_expr(predicate);
    }

    for (i, clause) in plan.order_by.iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder
            .push_column(&clause.column)
            .push(" ")
            .push(clause.order.as_sql());
    }

    builder.build()
}
