//! Fuzz target for query assembly.
//!
//! Generates structured filter trees over a fixed schema and checks that
//! assembly and rendering never panic.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_assemble
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};
use sieve_query::prelude::*;

const FIELDS: &[&str] = &["name", "weight", "dob", "toys", "toys.name", "address.streetname", "owner"];
const OPS: &[&str] = &["<", "<=", ">", ">=", "=", "!=", "in", "like", "contains", "~"];

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(u16, u8, u8),
    List(Vec<FuzzValue>),
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Float(f) => json!(f),
            Self::Text(s) => json!(s),
            Self::Date(y, m, d) => json!(format!("{:04}-{:02}-{:02}", y, m, d)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum FuzzFilter {
    Leaf {
        field: u8,
        op: u8,
        value: FuzzValue,
        group: Option<u8>,
    },
    And(Vec<FuzzFilter>),
    Or(Vec<FuzzFilter>),
}

impl FuzzFilter {
    fn to_raw(&self, depth: usize) -> RawFilter {
        match self {
            Self::Leaf { field, op, value, group } => {
                let field = FIELDS[*field as usize % FIELDS.len()];
                let op = OPS[*op as usize % OPS.len()];
                match group {
                    Some(g) => RawFilter::grouped(field, op, value.to_json(), format!("g{}", g % 4)),
                    None => RawFilter::leaf(field, op, value.to_json()),
                }
            }
            Self::And(children) if depth < 8 => {
                RawFilter::and(children.iter().map(|c| c.to_raw(depth + 1)))
            }
            Self::Or(children) if depth < 8 => {
                RawFilter::or(children.iter().map(|c| c.to_raw(depth + 1)))
            }
            _ => RawFilter::and(Vec::new()),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    filters: Vec<FuzzFilter>,
    order_by: String,
    is_desc: String,
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_entity(
            EntitySpec::new("Dog", "dog")
                .attributes(["name", "weight", "dob"])
                .relation(RelationSpec::many_to_many(
                    "toys",
                    "Toy",
                    JoinTableSpec::new("dog_toys", "dog_id", "toy_id"),
                ))
                .relation(RelationSpec::many_to_one("address", "Address").fields(["address_id"])),
        )
        .with_entity(EntitySpec::new("Toy", "toy").attribute("name"))
        .with_entity(EntitySpec::new("Address", "address").attribute("streetname"))
}

fuzz_target!(|input: Input| {
    let reg = registry();
    let filters: Vec<RawFilter> = input.filters.iter().map(|f| f.to_raw(0)).collect();
    if let Ok(plan) = QueryAssembler::new(&reg).assemble(
        "Dog",
        &filters,
        None,
        input.order_by.as_str(),
        input.is_desc.as_str(),
    ) {
        let (sql, _params) = plan.to_sql_for(DatabaseType::SQLite);
        assert!(sql.starts_with("SELECT "));
    }
});
