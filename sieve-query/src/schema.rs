//! Entity schema collaborator.
//!
//! The compiler never owns schema definitions. It walks them through the
//! [`RelationGraph`] trait; [`SchemaRegistry`] is an in-memory implementation
//! built from [`EntitySpec`] and [`RelationSpec`] values.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};

/// Type of relation between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relation (e.g., Dog has one Collar).
    OneToOne,
    /// One-to-many relation (e.g., Owner has many Dogs).
    OneToMany,
    /// Many-to-one relation (e.g., Dog belongs to Address).
    ManyToOne,
    /// Many-to-many relation (e.g., Dog has many Toys).
    ManyToMany,
}

impl RelationType {
    /// Check if this relation reaches multiple rows.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }
}

/// Link table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableSpec {
    /// Name of the link table.
    pub table_name: SmolStr,
    /// Column referencing the source entity.
    pub source_column: SmolStr,
    /// Column referencing the target entity.
    pub target_column: SmolStr,
}

impl JoinTableSpec {
    /// Create a new link table spec.
    pub fn new(
        table_name: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// A named relation from one entity to another.
///
/// `fields` are columns on the owning entity, `references` the matching
/// columns on the related entity. Both default to the primary key when left
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Relation name on the owning entity.
    pub name: SmolStr,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Name of the related entity.
    pub related_entity: SmolStr,
    /// Columns on the owning entity.
    pub fields: Vec<SmolStr>,
    /// Columns on the related entity.
    pub references: Vec<SmolStr>,
    /// Link table for many-to-many relations.
    pub join_table: Option<JoinTableSpec>,
}

impl RelationSpec {
    fn new(name: impl Into<SmolStr>, relation_type: RelationType, related: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            relation_type,
            related_entity: related.into(),
            fields: Vec::new(),
            references: Vec::new(),
            join_table: None,
        }
    }

    /// Create a one-to-one relation spec.
    pub fn one_to_one(name: impl Into<SmolStr>, related: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::OneToOne, related)
    }

    /// Create a one-to-many relation spec.
    pub fn one_to_many(name: impl Into<SmolStr>, related: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::OneToMany, related)
    }

    /// Create a many-to-one relation spec.
    pub fn many_to_one(name: impl Into<SmolStr>, related: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::ManyToOne, related)
    }

    /// Create a many-to-many relation spec through a link table.
    pub fn many_to_many(
        name: impl Into<SmolStr>,
        related: impl Into<SmolStr>,
        join_table: JoinTableSpec,
    ) -> Self {
        let mut spec = Self::new(name, RelationType::ManyToMany, related);
        spec.join_table = Some(join_table);
        spec
    }

    /// Set the owning-side columns.
    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the related-side columns.
    pub fn references(mut self, refs: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.references = refs.into_iter().map(Into::into).collect();
        self
    }
}

/// Schema of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpec {
    /// Entity name.
    pub name: SmolStr,
    /// Backing table.
    pub table: SmolStr,
    /// Identity column.
    pub primary_key: SmolStr,
    /// Attribute name to column name.
    pub attributes: IndexMap<SmolStr, SmolStr>,
    /// Relations by name.
    pub relations: IndexMap<SmolStr, RelationSpec>,
}

impl EntitySpec {
    /// Create an entity with an `id` primary key.
    pub fn new(name: impl Into<SmolStr>, table: impl Into<SmolStr>) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert(SmolStr::new_static("id"), SmolStr::new_static("id"));
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: SmolStr::new_static("id"),
            attributes,
            relations: IndexMap::new(),
        }
    }

    /// Set the primary key column (also registered as an attribute).
    pub fn primary_key(mut self, column: impl Into<SmolStr>) -> Self {
        let column = column.into();
        self.attributes.shift_remove(&self.primary_key);
        self.attributes.insert(column.clone(), column.clone());
        self.primary_key = column;
        self
    }

    /// Add an attribute stored in a column of the same name.
    pub fn attribute(self, name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        self.column(name.clone(), name)
    }

    /// Add several same-named attributes.
    pub fn attributes(self, names: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        names.into_iter().fold(self, |spec, name| spec.attribute(name))
    }

    /// Add an attribute stored in a differently named column.
    pub fn column(mut self, name: impl Into<SmolStr>, column: impl Into<SmolStr>) -> Self {
        self.attributes.insert(name.into(), column.into());
        self
    }

    /// Add a relation.
    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.relations.insert(spec.name.clone(), spec);
        self
    }
}

/// Read-only access to the entity relation graph.
///
/// Implementations are shared between concurrent compilations and must
/// never be mutated through this trait.
pub trait RelationGraph: Send + Sync {
    /// Look up an entity by name.
    fn resolve_entity(&self, entity: &str) -> QueryResult<&EntitySpec>;

    /// Look up a relation declared on `entity`.
    fn resolve_relation(&self, entity: &str, relation: &str) -> QueryResult<&RelationSpec>;

    /// Resolve an attribute of `entity` to its column name.
    fn resolve_attribute(&self, entity: &str, attribute: &str) -> QueryResult<&str>;
}

/// In-memory [`RelationGraph`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: IndexMap<SmolStr, EntitySpec>,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, replacing any previous entity of the same name.
    pub fn register(&mut self, spec: EntitySpec) {
        self.entities.insert(spec.name.clone(), spec);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_entity(mut self, spec: EntitySpec) -> Self {
        self.register(spec);
        self
    }

    /// All registered entities.
    pub fn entities(&self) -> impl Iterator<Item = &EntitySpec> {
        self.entities.values()
    }
}

impl RelationGraph for SchemaRegistry {
    fn resolve_entity(&self, entity: &str) -> QueryResult<&EntitySpec> {
        self.entities
            .get(entity)
            .ok_or_else(|| QueryError::field_resolution(entity, "<entity>")
                .with_help(format!("No entity named '{}' is registered", entity)))
    }

    fn resolve_relation(&self, entity: &str, relation: &str) -> QueryResult<&RelationSpec> {
        self.resolve_entity(entity)?
            .relations
            .get(relation)
            .ok_or_else(|| QueryError::field_resolution(entity, relation))
    }

    fn resolve_attribute(&self, entity: &str, attribute: &str) -> QueryResult<&str> {
        self.resolve_entity(entity)?
            .attributes
            .get(attribute)
            .map(SmolStr::as_str)
            .ok_or_else(|| QueryError::field_resolution(entity, attribute))
    }
}
