//! End-to-end filtering over a small pet store database.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sieve_query::prelude::*;
use sieve_query::ErrorCode;
use sieve_sqlite::SqliteEngine;

const SCHEMA: &str = r#"
CREATE TABLE address (id INTEGER PRIMARY KEY, streetname TEXT, number INTEGER);
CREATE TABLE owner (id INTEGER PRIMARY KEY, name TEXT UNIQUE);
CREATE TABLE dog (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE,
    dob TEXT,
    weight REAL,
    address_id INTEGER REFERENCES address(id),
    owner_id INTEGER REFERENCES owner(id)
);
CREATE TABLE toy (id INTEGER PRIMARY KEY, name TEXT UNIQUE);
CREATE TABLE dog_toys (dog_id INTEGER REFERENCES dog(id), toy_id INTEGER REFERENCES toy(id));

INSERT INTO address VALUES (1, 'Molenstraat', 40), (2, 'Spoorweglaan', 153);
INSERT INTO owner VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Carol');
INSERT INTO toy VALUES (1, 'ball'), (2, 'rope'), (3, 'squicky toy');
INSERT INTO dog VALUES
    (1, 'Xocomil', '1990-12-16', 100, 1, 1),
    (2, 'Jasmine', '1997-04-20', 40, 2, 2),
    (3, 'Quick', '2000-05-24', 90, NULL, 2),
    (4, 'Jinx', '2005-12-31', 55, NULL, 1),
    (5, 'Kaya', NULL, 50, NULL, NULL);
INSERT INTO dog_toys VALUES (1, 1), (1, 2), (2, 1), (2, 3);
"#;

fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_entity(
            EntitySpec::new("Dog", "dog")
                .attributes(["name", "dob", "weight"])
                .relation(RelationSpec::many_to_many(
                    "toys",
                    "Toy",
                    JoinTableSpec::new("dog_toys", "dog_id", "toy_id"),
                ))
                .relation(RelationSpec::many_to_one("address", "Address").fields(["address_id"])),
        )
        .with_entity(EntitySpec::new("Toy", "toy").attribute("name"))
        .with_entity(EntitySpec::new("Address", "address").attributes(["streetname", "number"]))
        .with_entity(
            EntitySpec::new("Owner", "owner")
                .attribute("name")
                .relation(RelationSpec::one_to_many("dogs", "Dog").references(["owner_id"])),
        )
}

async fn petstore() -> SqliteEngine {
    let engine = SqliteEngine::open_in_memory().await.unwrap();
    engine.execute_batch(SCHEMA).await.unwrap();
    engine
}

fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

fn names(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
}

async fn search(filters: Vec<RawFilter>) -> QueryResult<Vec<Row>> {
    let engine = petstore().await;
    query_with_filters(&registry(), &engine, "Dog", &filters, None, None::<&str>, false).await
}

async fn search_owners(filters: Vec<RawFilter>) -> Vec<i64> {
    let engine = petstore().await;
    let rows = query_with_filters(&registry(), &engine, "Owner", &filters, None, None::<&str>, false)
        .await
        .unwrap();
    let mut found = ids(&rows);
    found.sort_unstable();
    found
}

async fn search_one(field: &str, op: &str, value: Value) -> Vec<Row> {
    search(vec![RawFilter::leaf(field, op, value)]).await.unwrap()
}

#[tokio::test]
async fn test_name_equals() {
    let rows = search_one("name", "=", json!("Xocomil")).await;
    assert_eq!(names(&rows), vec!["Xocomil"]);
}

#[tokio::test]
async fn test_name_like() {
    let rows = search_one("name", "like", json!("J%")).await;
    assert_eq!(names(&rows), vec!["Jasmine", "Jinx"]);
}

#[tokio::test]
async fn test_name_not_equals() {
    assert_eq!(search_one("name", "!=", json!("Xocomil")).await.len(), 4);
}

#[tokio::test]
async fn test_name_in() {
    let rows = search_one("name", "in", json!(["Jinx", "Kaya"])).await;
    assert_eq!(ids(&rows), vec![4, 5]);
}

#[tokio::test]
async fn test_empty_in_matches_nothing() {
    assert!(search_one("name", "in", json!([])).await.is_empty());
}

#[tokio::test]
async fn test_dob_before_date_through_property_map() {
    let engine = petstore().await;
    let map = PropertyMap::new().with("dateOfBirth", "dob");
    let rows = query_with_filters(
        &registry(),
        &engine,
        "Dog",
        &[RawFilter::leaf("dateOfBirth", "<", json!("2002-01-01"))],
        Some(&map),
        None::<&str>,
        false,
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_dob_null() {
    let rows = search_one("dob", "=", json!(null)).await;
    assert_eq!(names(&rows), vec!["Kaya"]);
    assert_eq!(search_one("dob", "!=", json!(null)).await.len(), 4);
}

#[tokio::test]
async fn test_weight_comparisons() {
    assert_eq!(search_one("weight", "<", json!(50)).await.len(), 1);
    assert_eq!(search_one("weight", "<=", json!(50)).await.len(), 2);
    assert_eq!(search_one("weight", ">", json!(90)).await.len(), 1);
    assert_eq!(search_one("weight", ">=", json!(90)).await.len(), 2);
}

#[tokio::test]
async fn test_toys_contains() {
    let rows = search_one("toys.name", "contains", json!("ball")).await;
    assert_eq!(names(&rows), vec!["Xocomil", "Jasmine"]);
}

#[tokio::test]
async fn test_toys_contains_identity() {
    let rows = search_one("toys", "contains", json!(2)).await;
    assert_eq!(names(&rows), vec!["Xocomil"]);
}

#[tokio::test]
async fn test_address_nested_scalar() {
    let rows = search_one("address.streetname", "=", json!("Spoorweglaan")).await;
    assert_eq!(names(&rows), vec!["Jasmine"]);
}

#[tokio::test]
async fn test_toys_nested_collection_attribute() {
    let rows = search_one("toys.name", "=", json!("rope")).await;
    assert_eq!(names(&rows), vec!["Xocomil"]);
}

#[tokio::test]
async fn test_to_many_join_does_not_duplicate_rows() {
    let rows = search_one("toys.name", "in", json!(["ball", "rope", "squicky toy"])).await;
    let mut found = ids(&rows);
    found.sort_unstable();
    assert_eq!(found, vec![1, 2]);
}

#[tokio::test]
async fn test_condition_groups_match_different_toys() {
    let rows = search(vec![
        RawFilter::grouped("toys.name", "=", json!("ball"), "a"),
        RawFilter::grouped("toys.name", "=", json!("rope"), "b"),
    ])
    .await
    .unwrap();
    assert_eq!(names(&rows), vec!["Xocomil"]);
}

#[tokio::test]
async fn test_same_group_constrains_one_toy() {
    // no single toy is both ball and rope
    let rows = search(vec![
        RawFilter::leaf("toys.name", "=", json!("ball")),
        RawFilter::leaf("toys.name", "=", json!("rope")),
    ])
    .await
    .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_one_to_many_nested_attribute() {
    let found = search_owners(vec![RawFilter::leaf("dogs.name", "=", json!("Jinx"))]).await;
    assert_eq!(found, vec![1]);
}

#[tokio::test]
async fn test_one_to_many_join_does_not_duplicate_parents() {
    // Alice and Bob own two dogs each, Carol owns none
    let found = search_owners(vec![RawFilter::leaf("dogs.weight", ">", json!(10))]).await;
    assert_eq!(found, vec![1, 2]);
}

#[tokio::test]
async fn test_one_to_many_condition_groups_match_different_children() {
    let found = search_owners(vec![
        RawFilter::grouped("dogs.name", "=", json!("Xocomil"), "a"),
        RawFilter::grouped("dogs.name", "=", json!("Jinx"), "b"),
    ])
    .await;
    assert_eq!(found, vec![1]);

    let found = search_owners(vec![
        RawFilter::leaf("dogs.name", "=", json!("Xocomil")),
        RawFilter::leaf("dogs.name", "=", json!("Jinx")),
    ])
    .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_one_to_many_contains() {
    let found = search_owners(vec![RawFilter::leaf("dogs.name", "contains", json!("Quick"))]).await;
    assert_eq!(found, vec![2]);
}

#[tokio::test]
async fn test_or_composite() {
    let rows = search(vec![RawFilter::or([
        RawFilter::leaf("weight", ">", json!(95)),
        RawFilter::and([
            RawFilter::leaf("name", "like", json!("K%")),
            RawFilter::leaf("dob", "=", json!(null)),
        ]),
    ])])
    .await
    .unwrap();
    assert_eq!(names(&rows), vec!["Xocomil", "Kaya"]);
}

#[tokio::test]
async fn test_no_filter_no_order() {
    assert_eq!(ids(&search(vec![]).await.unwrap()), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_order_by_name() {
    let engine = petstore().await;
    let rows = query_with_filters(&registry(), &engine, "Dog", &[], None, "name", false)
        .await
        .unwrap();
    assert_eq!(ids(&rows), vec![2, 4, 5, 3, 1]);
}

#[tokio::test]
async fn test_order_by_weight_descending() {
    let engine = petstore().await;
    let rows = query_with_filters(&registry(), &engine, "Dog", &[], None, vec!["weight"], true)
        .await
        .unwrap();
    assert_eq!(ids(&rows), vec![1, 3, 4, 5, 2]);
}

#[tokio::test]
async fn test_json_request() {
    let engine = petstore().await;
    let reg = registry();
    let request: FilterRequest = serde_json::from_str(
        r#"{
            "filters": [{"field": "weight", "op": ">=", "value": 50}],
            "order_by": "weight",
            "is_desc": "false"
        }"#,
    )
    .unwrap();
    let rows = QueryAssembler::new(&reg)
        .fetch(&engine, "Dog", &request)
        .await
        .unwrap();
    assert_eq!(ids(&rows), vec![5, 4, 3, 1]);
}

#[tokio::test]
async fn test_invalid_filters_fail_before_execution() {
    let err = search(vec![RawFilter::leaf("weight", "<", json!(["a"]))])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidValue);

    let err = search(vec![RawFilter::leaf("owner.name", "=", json!("x"))])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FieldResolution);
}
