//! Compiler configuration.
//!
//! ```toml
//! join_scope = "condition_group"
//! default_condition_group = "__default__"
//! dialect = "sqlite"
//!
//! [property_map]
//! dateOfBirth = "dob"
//! ```
//!
//! `${VAR}` references are replaced with environment variable values before
//! parsing; references to unset variables are left as written.

use std::path::Path;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::filter::DEFAULT_CONDITION_GROUP;
use crate::join::JoinScope;
use crate::sql::DatabaseType;
use crate::types::PropertyMap;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Settings shared by every assembly run with one [`QueryAssembler`](crate::QueryAssembler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Join reuse scope.
    #[serde(default)]
    pub join_scope: JoinScope,

    /// Group assigned to leaves that do not name one.
    #[serde(default = "default_condition_group")]
    pub default_condition_group: String,

    /// Dialect used when rendering SQL.
    #[serde(default)]
    pub dialect: DatabaseType,

    /// Property map used when a request carries none.
    #[serde(default)]
    pub property_map: PropertyMap,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            join_scope: JoinScope::default(),
            default_condition_group: default_condition_group(),
            dialect: DatabaseType::default(),
            property_map: PropertyMap::default(),
        }
    }
}

fn default_condition_group() -> String {
    DEFAULT_CONDITION_GROUP.to_string()
}

impl CompilerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("cannot read '{}'", path.display())).with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)
            .map_err(|e| QueryError::configuration(e.message().to_string()).with_source(e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> QueryResult<()> {
        if self.default_condition_group.trim().is_empty() {
            return Err(QueryError::configuration("default_condition_group must not be blank"));
        }
        Ok(())
    }

    /// Set the join scope.
    pub fn with_join_scope(mut self, scope: JoinScope) -> Self {
        self.join_scope = scope;
        self
    }

    /// Set the rendering dialect.
    pub fn with_dialect(mut self, dialect: DatabaseType) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the fallback property map.
    pub fn with_property_map(mut self, map: PropertyMap) -> Self {
        self.property_map = map;
        self
    }

    /// Set the default condition group.
    pub fn with_default_condition_group(mut self, group: impl Into<String>) -> Self {
        self.default_condition_group = group.into();
        self
    }
}

fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
