//! Join planning.
//!
//! A [`JoinPlan`] records which relation prefixes have already been joined
//! and under which alias. Prefixes are tracked per scope: with
//! [`JoinScope::ConditionGroup`] each condition group gets its own joins, so
//! two groups filtering the same to-many relation constrain independent
//! related rows. With [`JoinScope::Global`] every filter shares one scope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::schema::{EntitySpec, RelationGraph, RelationSpec, RelationType};
use crate::types::{ColumnRef, PropertyMap};

/// How join reuse is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinScope {
    /// One scope per condition group.
    #[default]
    ConditionGroup,
    /// One scope shared by every filter.
    Global,
}

/// Entity reached by a path and the alias it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    /// Entity name.
    pub entity: SmolStr,
    /// Table alias.
    pub alias: SmolStr,
}

/// Intermediate link table of a many-to-many hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHop {
    /// Link table.
    pub table: SmolStr,
    /// Link table alias.
    pub alias: SmolStr,
    /// Equalities between the parent and the link table.
    pub on: Vec<(ColumnRef, ColumnRef)>,
}

/// One relation traversal, resolved down to tables and columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Relation name on the parent entity.
    pub relation: SmolStr,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Related entity.
    pub entity: SmolStr,
    /// Related table.
    pub table: SmolStr,
    /// Alias of the related table.
    pub alias: SmolStr,
    /// Link table, for many-to-many relations.
    pub link: Option<LinkHop>,
    /// Equalities between the parent (or link table) and the related table.
    pub on: Vec<(ColumnRef, ColumnRef)>,
}

impl Join {
    /// Resolve `relation` from `parent` and bind the related table to `alias`.
    pub fn resolve<G: RelationGraph + ?Sized>(
        graph: &G,
        parent: &JoinTarget,
        relation: &RelationSpec,
        alias: SmolStr,
    ) -> QueryResult<Self> {
        let parent_spec = graph.resolve_entity(&parent.entity)?;
        let related = graph.resolve_entity(&relation.related_entity)?;

        let (link, on) = match relation.join_table {
            Some(ref jt) => {
                let link_alias = SmolStr::from(format!("{}_link", alias));
                let source = first_or_key(&relation.fields, parent_spec);
                let target = first_or_key(&relation.references, related);
                let link = LinkHop {
                    table: jt.table_name.clone(),
                    alias: link_alias.clone(),
                    on: vec![(
                        ColumnRef::new(parent.alias.clone(), source),
                        ColumnRef::new(link_alias.clone(), jt.source_column.clone()),
                    )],
                };
                let on = vec![(
                    ColumnRef::new(link_alias, jt.target_column.clone()),
                    ColumnRef::new(alias.clone(), target),
                )];
                (Some(link), on)
            }
            None => {
                let on = key_pairs(relation, parent_spec, related)?
                    .into_iter()
                    .map(|(f, r)| {
                        (
                            ColumnRef::new(parent.alias.clone(), f),
                            ColumnRef::new(alias.clone(), r),
                        )
                    })
                    .collect();
                (None, on)
            }
        };

        Ok(Self {
            relation: relation.name.clone(),
            relation_type: relation.relation_type,
            entity: related.name.clone(),
            table: related.table.clone(),
            alias,
            link,
            on,
        })
    }

    /// Target of this join.
    pub fn target(&self) -> JoinTarget {
        JoinTarget {
            entity: self.entity.clone(),
            alias: self.alias.clone(),
        }
    }
}

fn first_or_key(columns: &[SmolStr], entity: &EntitySpec) -> SmolStr {
    columns
        .first()
        .cloned()
        .unwrap_or_else(|| entity.primary_key.clone())
}

/// Column pairs of a direct relation. The side holding the foreign key must
/// name its columns; the other side defaults to its primary key.
fn key_pairs(
    relation: &RelationSpec,
    parent: &EntitySpec,
    related: &EntitySpec,
) -> QueryResult<Vec<(SmolStr, SmolStr)>> {
    let missing = match relation.relation_type {
        RelationType::ManyToOne if relation.fields.is_empty() => Some("fields"),
        RelationType::OneToOne | RelationType::OneToMany if relation.references.is_empty() => {
            Some("references")
        }
        _ => None,
    };
    if let Some(side) = missing {
        return Err(QueryError::configuration(format!(
            "relation '{}.{}' ({:?}) must declare its foreign key {}",
            parent.name, relation.name, relation.relation_type, side
        )));
    }

    let fields = if relation.fields.is_empty() {
        vec![parent.primary_key.clone()]
    } else {
        relation.fields.clone()
    };
    let references = if relation.references.is_empty() {
        vec![related.primary_key.clone()]
    } else {
        relation.references.clone()
    };
    if fields.len() != references.len() {
        return Err(QueryError::configuration(format!(
            "relation '{}.{}' pairs {} fields with {} references",
            parent.name,
            relation.name,
            fields.len(),
            references.len()
        )));
    }
    Ok(fields.into_iter().zip(references).collect())
}

type ScopeKey = (SmolStr, Vec<SmolStr>);

/// Joins accumulated while assembling one query.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    scope: JoinScope,
    root: JoinTarget,
    joins: Vec<Join>,
    joined: HashMap<ScopeKey, JoinTarget>,
}

impl JoinPlan {
    /// Start a plan rooted at `root`, aliased by its table name.
    pub fn new(root: &EntitySpec, scope: JoinScope) -> Self {
        Self {
            scope,
            root: JoinTarget {
                entity: root.name.clone(),
                alias: root.table.clone(),
            },
            joins: Vec::new(),
            joined: HashMap::new(),
        }
    }

    /// The root target.
    pub fn root(&self) -> &JoinTarget {
        &self.root
    }

    /// Joins in first-encountered order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Check if any join can match several rows per parent.
    pub fn fans_out(&self) -> bool {
        self.joins.iter().any(|j| j.relation_type.is_many())
    }

    /// Consume the plan, yielding its joins.
    pub fn into_joins(self) -> Vec<Join> {
        self.joins
    }

    fn scope_key(&self, group: &str) -> SmolStr {
        match self.scope {
            JoinScope::ConditionGroup => SmolStr::new(group),
            JoinScope::Global => SmolStr::default(),
        }
    }

    /// Join every relation segment of a path, reusing joins already made in
    /// the same scope. Returns the entity reached after the last segment.
    pub fn plan_joins<G: RelationGraph + ?Sized>(
        &mut self,
        graph: &G,
        segments: &[SmolStr],
        group: &str,
        property_map: Option<&PropertyMap>,
    ) -> QueryResult<JoinTarget> {
        let scope = self.scope_key(group);
        let mut current = self.root.clone();
        let mut prefix = Vec::with_capacity(segments.len());

        for segment in segments {
            let name = remap(property_map, segment);
            prefix.push(SmolStr::new(name));
            let key = (scope.clone(), prefix.clone());

            if let Some(existing) = self.joined.get(&key) {
                crate::sieve_trace!(relation = %name, alias = %existing.alias, scope = %scope, "reusing join");
                current = existing.clone();
                continue;
            }

            let relation = graph.resolve_relation(&current.entity, name)?;
            let alias = SmolStr::from(format!("j{}", self.joins.len() + 1));
            let join = Join::resolve(graph, &current, relation, alias)?;
            crate::sieve_trace!(relation = %name, table = %join.table, alias = %join.alias, scope = %scope, "adding join");

            current = join.target();
            self.joined.insert(key, current.clone());
            self.joins.push(join);
        }

        Ok(current)
    }

    /// Target of an already planned path.
    pub fn target(
        &self,
        segments: &[SmolStr],
        group: &str,
        property_map: Option<&PropertyMap>,
    ) -> QueryResult<JoinTarget> {
        if segments.is_empty() {
            return Ok(self.root.clone());
        }
        let prefix: Vec<SmolStr> = segments
            .iter()
            .map(|s| SmolStr::new(remap(property_map, s)))
            .collect();
        self.joined
            .get(&(self.scope_key(group), prefix))
            .cloned()
            .ok_or_else(|| {
                QueryError::internal(format!(
                    "path '{}' was not planned in group '{}'",
                    segments.join("."),
                    group
                ))
            })
    }
}

fn remap<'a>(property_map: Option<&'a PropertyMap>, name: &'a str) -> &'a str {
    match property_map {
        Some(map) => map.resolve(name),
        None => name,
    }
}
