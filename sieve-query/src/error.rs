//! Error types for filter compilation with actionable messages.
//!
//! Every failure carries an [`ErrorCode`], a message naming the offending
//! field path, operator or value, and an [`ErrorContext`] with suggestions.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: SV{category}{number}
//! - 1xxx: Filter errors (unknown operator, invalid value, empty composite)
//! - 2xxx: Schema resolution errors
//! - 3xxx: Ordering errors
//! - 5xxx: Execution errors
//! - 6xxx: Data errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use sieve_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::unknown_operator("weight", "~=");
//! assert_eq!(err.code, ErrorCode::UnknownOperator);
//! assert!(err.to_string().contains("~="));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for compiler operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filter errors (1xxx)
    /// Leaf operator is not in the operator registry (SV1001).
    UnknownOperator = 1001,
    /// Composite operator is not `and`/`or` (SV1002).
    InvalidOperator = 1002,
    /// Composite filter without children (SV1003).
    EmptyComposite = 1003,
    /// Value outside the operator's domain (SV1004).
    InvalidValue = 1004,

    // Schema errors (2xxx)
    /// Path segment names no relation or attribute (SV2001).
    FieldResolution = 2001,

    // Ordering errors (3xxx)
    /// `order_by` and `is_desc` lengths differ (SV3001).
    LengthMismatch = 3001,

    // Execution errors (5xxx)
    /// The execution collaborator failed (SV5001).
    DatabaseError = 5001,

    // Data errors (6xxx)
    /// Raw filter input could not be deserialized (SV6001).
    DeserializationError = 6001,

    // Configuration errors (7xxx)
    /// Invalid configuration (SV7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (SV9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "SV1001").
    pub fn code(&self) -> String {
        format!("SV{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownOperator => "Unknown filter operator",
            Self::InvalidOperator => "Invalid composite operator",
            Self::EmptyComposite => "Empty composite filter",
            Self::InvalidValue => "Invalid filter value",
            Self::FieldResolution => "Unresolvable field",
            Self::LengthMismatch => "Ordering length mismatch",
            Self::DatabaseError => "Database error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional example input.
    pub example: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            example: None,
        }
    }

    /// Add an example.
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The entity involved.
    pub entity: Option<String>,
    /// The dotted field path involved.
    pub field: Option<String>,
    /// The operator involved.
    pub operator: Option<String>,
    /// The offending value, rendered for display.
    pub value: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while compiling or executing a filter query.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a suggestion with an example input.
    pub fn with_example_suggestion(
        mut self,
        text: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_example(example));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Set the field path.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.context.operator = Some(operator.into());
        self
    }

    /// Set the offending value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.context.value = Some(value.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A leaf used an operator missing from the registry.
    pub fn unknown_operator(field: impl Into<String>, operator: impl Into<String>) -> Self {
        let field = field.into();
        let operator = operator.into();
        Self::new(
            ErrorCode::UnknownOperator,
            format!("No filter with operator '{}' exists (field '{}')", operator, field),
        )
        .with_field(&field)
        .with_operator(&operator)
        .with_suggestion("Use one of: <, <=, >, >=, =, !=, in, like, contains")
    }

    /// A composite used something other than `and`/`or`.
    pub fn invalid_operator(operator: impl Into<String>) -> Self {
        let operator = operator.into();
        Self::new(
            ErrorCode::InvalidOperator,
            format!("Invalid composite operator: '{}'", operator),
        )
        .with_operator(&operator)
        .with_example_suggestion(
            "Composite filters combine children with 'and' or 'or'",
            r#"{"op": "or", "value": [...]}"#,
        )
    }

    /// A composite had no children.
    pub fn empty_composite(operator: impl Into<String>) -> Self {
        let operator = operator.into();
        Self::new(
            ErrorCode::EmptyComposite,
            format!("Composite '{}' filter must have at least one sub-filter", operator),
        )
        .with_operator(&operator)
        .with_suggestion("Remove the empty group or add a condition to it")
    }

    /// A leaf value is outside its operator's domain.
    pub fn invalid_value(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
        expected: &str,
    ) -> Self {
        let field = field.into();
        let operator = operator.into();
        let value = value.into();
        Self::new(
            ErrorCode::InvalidValue,
            format!(
                "Filter '{} {} {}' requires {}",
                field, operator, value, expected
            ),
        )
        .with_field(&field)
        .with_operator(&operator)
        .with_value(&value)
    }

    /// A path segment could not be resolved against the schema.
    pub fn field_resolution(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            ErrorCode::FieldResolution,
            format!("Entity '{}' has no field or relation '{}'", entity, field),
        )
        .with_entity(&entity)
        .with_field(&field)
        .with_suggestion("Check the spelling or add the field to the property map")
    }

    /// Ordering keys and direction flags differ in length.
    pub fn length_mismatch(order_by: usize, is_desc: usize) -> Self {
        Self::new(
            ErrorCode::LengthMismatch,
            format!(
                "order_by and is_desc must have the same length ({} vs {})",
                order_by, is_desc
            ),
        )
        .with_suggestion("Pass a single boolean to apply one direction to every key")
    }

    /// Raw filter input could not be parsed.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize filters: {}", message),
        )
        .with_example_suggestion(
            "Each entry is a leaf or a composite",
            r#"[{"field": "name", "op": "=", "value": "rope"}]"#,
        )
    }

    /// Configuration could not be loaded.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// The execution collaborator failed.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
            .with_suggestion("Check the database logs for more details")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in sieve - please report it")
    }

    // ============== Error Checks ==============

    /// Check if this error was raised while validating filters.
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UnknownOperator
                | ErrorCode::InvalidOperator
                | ErrorCode::EmptyComposite
                | ErrorCode::InvalidValue
        )
    }

    /// Check if this is a schema resolution error.
    pub fn is_field_resolution(&self) -> bool {
        self.code == ErrorCode::FieldResolution
    }

    /// Render the error with context and suggestions for display.
    pub fn display_full(&self) -> String {
        let mut out = format!("Error [{}]: {}", self.code.code(), self.message);

        if let Some(ref field) = self.context.field {
            out.push_str(&format!("\n  field: {}", field));
        }
        if let Some(ref op) = self.context.operator {
            out.push_str(&format!("\n  operator: {}", op));
        }
        if let Some(ref value) = self.context.value {
            out.push_str(&format!("\n  value: {}", value));
        }
        for suggestion in &self.context.suggestions {
            out.push_str(&format!("\n  -> {}", suggestion.text));
            if let Some(ref example) = suggestion.example {
                out.push_str(&format!("\n     {}", example));
            }
        }
        if let Some(ref help) = self.context.help {
            out.push_str(&format!("\n  help: {}", help));
        }
        out
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::deserialization(err.to_string()).with_source(err)
    }
}
