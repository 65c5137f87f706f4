//! schema.json Export Tests

use ddl_schema::model::export::{export_schema, export_schema_json};
use serde_json::{json, Value};

use crate::common::{parse_model, USERS_POSTS_SQL};

#[test]
fn test_export_header() {
    let schema = parse_model(USERS_POSTS_SQL);
    let export = export_schema(&schema, Some("16"));
    assert_eq!(export.database.vendor, "postgresql");
    assert_eq!(export.database.version.as_deref(), Some("16"));
    let names: Vec<_> = export.tables.iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["users", "posts"]);
}

#[test]
fn test_export_json_shape() {
    let schema = parse_model(
        "CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(255) NOT NULL);\nCREATE UNIQUE INDEX users_name_idx ON users (name);",
    );
    let value: Value = serde_json::from_str(&export_schema_json(&schema, None).unwrap()).unwrap();

    assert_eq!(value["database"], json!({ "vendor": "postgresql", "version": null }));
    let users = &value["tables"][0];
    assert_eq!(users["name"], json!("users"));
    assert_eq!(users["comment"], Value::Null);
    assert_eq!(users["columns"][0]["name"], json!("id"));
    assert_eq!(users["columns"][0]["increment"], json!(true));
    assert_eq!(users["columns"][1]["notNull"], json!(true));
    assert_eq!(
        users["indexes"][0],
        json!({ "name": "users_name_idx", "unique": true, "columns": ["name"], "type": "" })
    );
    assert_eq!(
        users["constraints"][0],
        json!({ "type": "PRIMARY_KEY", "name": "users_pkey", "columns": ["id"] })
    );
}

#[test]
fn test_model_json_shape() {
    let schema = parse_model(USERS_POSTS_SQL);
    let value = serde_json::to_value(&schema).unwrap();
    assert!(value["tableGroups"].as_object().unwrap().is_empty());
    assert_eq!(
        value["relationships"]["posts_user_id_to_users_id"],
        json!({
            "name": "posts_user_id_to_users_id",
            "primaryTable": "users",
            "primaryColumn": "id",
            "foreignTable": "posts",
            "foreignColumn": "user_id",
            "cardinality": "ONE_TO_MANY",
            "onUpdate": "NO_ACTION",
            "onDelete": "NO_ACTION"
        })
    );
    assert_eq!(
        value["tables"]["posts"]["constraints"]["posts_user_id_fkey"],
        json!({
            "type": "FOREIGN_KEY",
            "name": "posts_user_id_fkey",
            "column": "user_id",
            "targetTable": "users",
            "targetColumn": "id",
            "onUpdate": "NO_ACTION",
            "onDelete": "NO_ACTION"
        })
    );
}

#[test]
fn test_model_json_round_trip() {
    let schema = parse_model(USERS_POSTS_SQL);
    let json = serde_json::to_string(&schema).unwrap();
    let back: ddl_schema::Schema = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schema);
}

#[test]
fn test_export_defaults_are_scalars() {
    let schema = parse_model(
        "CREATE TABLE products (id int, price numeric DEFAULT 9.99, label text DEFAULT 'x', created_at timestamp DEFAULT now());",
    );
    let value: Value = serde_json::from_str(&export_schema_json(&schema, None).unwrap()).unwrap();
    let columns = &value["tables"][0]["columns"];
    assert_eq!(columns[0]["default"], Value::Null);
    assert_eq!(columns[1]["default"], json!(9.99));
    assert_eq!(columns[2]["default"], json!("x"));
    assert_eq!(columns[3]["default"], json!("now()"));
    assert_eq!(columns[1]["type"], json!("numeric"));
}

#[test]
fn test_model_json_numeric_default() {
    let schema = parse_model("CREATE TABLE products (price numeric DEFAULT 9.99);");
    let value = serde_json::to_value(&schema).unwrap();
    assert_eq!(value["tables"]["products"]["columns"]["price"]["default"], json!(9.99));

    let back: ddl_schema::Schema = serde_json::from_value(value).unwrap();
    assert_eq!(back, schema);
}
