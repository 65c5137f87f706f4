//! Deparser tests: operations rendered back to PostgreSQL DDL

use ddl_schema::model::{ColumnDefault, Constraint, ReferenceAction};
use ddl_schema::operation::ColumnChange;
use ddl_schema::{deparse, DeparseError, Operation, Schema};
use pretty_assertions::assert_eq;

use crate::common::{column, foreign_key, id_column, index, parse_model, primary_key, table, USERS_POSTS_SQL};

fn render(op: &Operation) -> String {
    deparse(op, &Schema::new()).expect("operation should render")
}

fn render_errors(op: &Operation) -> Vec<DeparseError> {
    deparse(op, &Schema::new()).expect_err("operation should fail")
}

// ============================================================================
// Table Tests
// ============================================================================

#[test]
fn test_add_table_inline_primary_key() {
    let op = Operation::AddTable {
        table: table("users", vec![id_column(), column("name", "varchar")]),
    };
    assert_eq!(
        render(&op),
        "CREATE TABLE \"users\" (\n  \"id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL PRIMARY KEY,\n  \"name\" varchar\n);"
    );
}

#[test]
fn test_add_table_with_named_constraints() {
    let mut users = table("users", vec![id_column(), column("name", "varchar")]);
    users
        .constraints
        .insert("users_pkey".to_string(), primary_key("users_pkey", &["id"]));
    assert_eq!(
        render(&Operation::AddTable { table: users }),
        "CREATE TABLE \"users\" (\n  \"id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n  \"name\" varchar,\n  CONSTRAINT \"users_pkey\" PRIMARY KEY (\"id\")\n);"
    );
}

#[test]
fn test_add_table_from_parsed_model() {
    let schema = parse_model(USERS_POSTS_SQL);
    let op = Operation::AddTable {
        table: schema.tables["posts"].clone(),
    };
    assert_eq!(
        render(&op),
        "CREATE TABLE \"posts\" (\n  \"id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n  \"user_id\" int,\n  \"title\" text NOT NULL,\n  CONSTRAINT \"posts_pkey\" PRIMARY KEY (\"id\"),\n  CONSTRAINT \"posts_user_id_fkey\" FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\")\n);"
    );
}

#[test]
fn test_add_table_composite_primary_flags() {
    let mut user_id = column("user_id", "integer");
    user_id.primary = true;
    user_id.not_null = true;
    let mut group_id = column("group_id", "integer");
    group_id.primary = true;
    group_id.not_null = true;
    let op = Operation::AddTable {
        table: table("memberships", vec![user_id, group_id]),
    };
    assert_eq!(
        render(&op),
        "CREATE TABLE \"memberships\" (\n  \"user_id\" integer NOT NULL,\n  \"group_id\" integer NOT NULL,\n  PRIMARY KEY (\"user_id\", \"group_id\")\n);"
    );
}

#[test]
fn test_add_table_follow_ups() {
    let mut notes = table("audit.notes", vec![id_column(), column("body", "text")]);
    notes.comment = Some("Free text".to_string());
    notes.columns["body"].comment = Some("Markdown, it's fine".to_string());
    notes
        .indexes
        .insert("notes_body_idx".to_string(), index("notes_body_idx", false, &["body"]));
    assert_eq!(
        render(&Operation::AddTable { table: notes }),
        "CREATE TABLE \"audit\".\"notes\" (\n  \"id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL PRIMARY KEY,\n  \"body\" text\n);\n\n\
COMMENT ON TABLE \"audit\".\"notes\" IS 'Free text';\n\
COMMENT ON COLUMN \"audit\".\"notes\".\"body\" IS 'Markdown, it''s fine';\n\
CREATE INDEX \"notes_body_idx\" ON \"audit\".\"notes\" (\"body\");"
    );
}

#[test]
fn test_add_table_errors_are_collected() {
    let op = Operation::AddTable {
        table: table("t", vec![column("a", ""), column("b", " ")]),
    };
    let errors = render_errors(&op);
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, DeparseError::MissingField { field: "type", .. })));
}

#[test]
fn test_add_table_without_columns() {
    let errors = render_errors(&Operation::AddTable {
        table: table("empty", vec![]),
    });
    assert_eq!(
        errors,
        vec![DeparseError::EmptyTable {
            table: "empty".to_string()
        }]
    );
}

#[test]
fn test_drop_rename_and_comment_table() {
    assert_eq!(
        render(&Operation::DropTable {
            table: "users".to_string()
        }),
        "DROP TABLE \"users\";"
    );
    assert_eq!(
        render(&Operation::RenameTable {
            table: "audit.events".to_string(),
            to: "journal".to_string()
        }),
        "ALTER TABLE \"audit\".\"events\" RENAME TO \"journal\";"
    );
    assert_eq!(
        render(&Operation::SetTableComment {
            table: "users".to_string(),
            comment: None
        }),
        "COMMENT ON TABLE \"users\" IS NULL;"
    );
}

// ============================================================================
// Column Tests
// ============================================================================

#[test]
fn test_add_column_with_default_and_comment() {
    let mut nickname = column("nickname", "varchar");
    nickname.not_null = true;
    nickname.default = Some(ColumnDefault::Text("anon".to_string()));
    nickname.comment = Some("Shown in lists".to_string());
    assert_eq!(
        render(&Operation::AddColumn {
            table: "users".to_string(),
            column: nickname
        }),
        "ALTER TABLE \"users\" ADD COLUMN \"nickname\" varchar NOT NULL DEFAULT 'anon';\n\n\
COMMENT ON COLUMN \"users\".\"nickname\" IS 'Shown in lists';"
    );
}

#[test]
fn test_add_column_unique_and_check() {
    let mut email = column("email", "text");
    email.unique = true;
    email.check = Some("email <> ''".to_string());
    let op = Operation::AddColumn {
        table: "users".to_string(),
        column: email,
    };
    assert_eq!(
        render(&op),
        "ALTER TABLE \"users\" ADD COLUMN \"email\" text UNIQUE CHECK (email <> '');"
    );

    // A unique constraint already on the table covers the column
    let context = parse_model("CREATE TABLE users (id int, email text, CONSTRAINT users_email_key UNIQUE (email));");
    assert_eq!(
        deparse(&op, &context).unwrap(),
        "ALTER TABLE \"users\" ADD COLUMN \"email\" text CHECK (email <> '');"
    );
}

#[test]
fn test_add_column_numeric_default() {
    let mut ratio = column("ratio", "numeric");
    ratio.default = Some(ColumnDefault::Number("0.5".parse().unwrap()));
    assert_eq!(
        render(&Operation::AddColumn {
            table: "users".to_string(),
            column: ratio
        }),
        "ALTER TABLE \"users\" ADD COLUMN \"ratio\" numeric DEFAULT 0.5;"
    );
}

#[test]
fn test_add_primary_column_to_keyed_table_is_an_error() {
    let context = parse_model(USERS_POSTS_SQL);
    let mut code = column("code", "integer");
    code.primary = true;
    let op = Operation::AddColumn {
        table: "users".to_string(),
        column: code,
    };
    assert_eq!(
        deparse(&op, &context).unwrap_err(),
        vec![DeparseError::DuplicatePrimaryKey {
            table: "users".to_string(),
            column: "code".to_string(),
            existing: "users_pkey".to_string(),
        }]
    );

    // Without a key on the table the inline clause is fine
    assert_eq!(
        render(&op),
        "ALTER TABLE \"users\" ADD COLUMN \"code\" integer PRIMARY KEY;"
    );
}

#[test]
fn test_increment_column_drops_default() {
    let mut id = id_column();
    id.primary = false;
    id.default = Some(ColumnDefault::expression("nextval('x')"));
    assert_eq!(
        render(&Operation::AddColumn {
            table: "t".to_string(),
            column: id
        }),
        "ALTER TABLE \"t\" ADD COLUMN \"id\" integer GENERATED BY DEFAULT AS IDENTITY NOT NULL;"
    );
}

#[test]
fn test_serial_type_renders_as_identity() {
    assert_eq!(
        render(&Operation::AddColumn {
            table: "t".to_string(),
            column: column("n", "BIGSERIAL")
        }),
        "ALTER TABLE \"t\" ADD COLUMN \"n\" bigint GENERATED BY DEFAULT AS IDENTITY;"
    );
}

#[test]
fn test_drop_column() {
    assert_eq!(
        render(&Operation::DropColumn {
            table: "users".to_string(),
            column: "age".to_string()
        }),
        "ALTER TABLE \"users\" DROP COLUMN \"age\";"
    );
}

#[test]
fn test_alter_column_changes() {
    let alter = |change| Operation::AlterColumn {
        table: "users".to_string(),
        column: "name".to_string(),
        change,
    };
    let cases = vec![
        (
            ColumnChange::Type {
                data_type: "text".to_string(),
            },
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" TYPE text;",
        ),
        (
            ColumnChange::NotNull { value: true },
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" SET NOT NULL;",
        ),
        (
            ColumnChange::NotNull { value: false },
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" DROP NOT NULL;",
        ),
        (
            ColumnChange::Default {
                value: Some(ColumnDefault::Boolean(false)),
            },
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" SET DEFAULT FALSE;",
        ),
        (
            ColumnChange::Default { value: None },
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" DROP DEFAULT;",
        ),
        (
            ColumnChange::Comment {
                value: Some("Full name".to_string()),
            },
            "COMMENT ON COLUMN \"users\".\"name\" IS 'Full name';",
        ),
        (
            ColumnChange::Rename {
                to: "full_name".to_string(),
            },
            "ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"full_name\";",
        ),
    ];
    for (change, expected) in cases {
        assert_eq!(render(&alter(change)), expected);
    }
}

#[test]
fn test_check_change_is_an_error() {
    let errors = render_errors(&Operation::AlterColumn {
        table: "users".to_string(),
        column: "age".to_string(),
        change: ColumnChange::Check {
            value: Some("age > 0".to_string()),
        },
    });
    assert!(matches!(
        errors.as_slice(),
        [DeparseError::UnsupportedColumnChange { attribute: "check", .. }]
    ));
}

// ============================================================================
// Constraint and Index Tests
// ============================================================================

#[test]
fn test_add_foreign_key_with_actions() {
    let mut fk = foreign_key("posts_user_fk", "user_id", "users", "id");
    if let Constraint::ForeignKey {
        on_update,
        on_delete,
        ..
    } = &mut fk
    {
        *on_update = ReferenceAction::SetNull;
        *on_delete = ReferenceAction::Cascade;
    }
    assert_eq!(
        render(&Operation::AddConstraint {
            table: "posts".to_string(),
            constraint: fk
        }),
        "ALTER TABLE \"posts\" ADD CONSTRAINT \"posts_user_fk\" FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\") ON UPDATE SET NULL ON DELETE CASCADE;"
    );
}

#[test]
fn test_add_unique_and_check_constraints() {
    assert_eq!(
        render(&Operation::AddConstraint {
            table: "t".to_string(),
            constraint: Constraint::Unique {
                name: "t_a_b_key".to_string(),
                columns: vec!["a".to_string(), "b".to_string()],
            }
        }),
        "ALTER TABLE \"t\" ADD CONSTRAINT \"t_a_b_key\" UNIQUE (\"a\", \"b\");"
    );
    assert_eq!(
        render(&Operation::AddConstraint {
            table: "t".to_string(),
            constraint: Constraint::Check {
                name: "t_check".to_string(),
                expression: "a < b".to_string(),
            }
        }),
        "ALTER TABLE \"t\" ADD CONSTRAINT \"t_check\" CHECK (a < b);"
    );
}

#[test]
fn test_constraint_without_columns_is_an_error() {
    let errors = render_errors(&Operation::AddConstraint {
        table: "t".to_string(),
        constraint: primary_key("t_pkey", &[]),
    });
    assert!(matches!(
        errors.as_slice(),
        [DeparseError::EmptyColumnList { constraint: "PRIMARY KEY", .. }]
    ));
}

#[test]
fn test_drop_constraint() {
    assert_eq!(
        render(&Operation::DropConstraint {
            table: "posts".to_string(),
            name: "posts_user_id_fkey".to_string()
        }),
        "ALTER TABLE \"posts\" DROP CONSTRAINT \"posts_user_id_fkey\";"
    );
}

#[test]
fn test_add_index_with_method() {
    let mut gin = index("docs_tags_idx", true, &["tags", "kind"]);
    gin.index_type = "gin".to_string();
    assert_eq!(
        render(&Operation::AddIndex {
            table: "docs".to_string(),
            index: gin
        }),
        "CREATE UNIQUE INDEX \"docs_tags_idx\" ON \"docs\" USING gin (\"tags\", \"kind\");"
    );
}

#[test]
fn test_drop_index_uses_table_schema() {
    assert_eq!(
        render(&Operation::DropIndex {
            table: "audit.events".to_string(),
            name: "events_at_idx".to_string()
        }),
        "DROP INDEX \"audit\".\"events_at_idx\";"
    );
    assert_eq!(
        render(&Operation::DropIndex {
            table: "users".to_string(),
            name: "users_name_idx".to_string()
        }),
        "DROP INDEX \"users_name_idx\";"
    );
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_unsupported_operation() {
    assert_eq!(
        render_errors(&Operation::Unsupported),
        vec![DeparseError::UnsupportedOperation {
            kind: "unsupported".to_string()
        }]
    );
}

#[test]
fn test_malformed_operation() {
    let op = Operation::from_value(serde_json::json!({ "kind": "add_column", "table": "t" }));
    let errors = render_errors(&op);
    assert!(
        matches!(
            errors.as_slice(),
            [DeparseError::MalformedOperation { kind, message }]
                if kind == "add_column" && message.contains("column")
        ),
        "errors: {:?}",
        errors
    );
}

#[test]
fn test_missing_required_fields() {
    assert_eq!(
        render_errors(&Operation::DropTable {
            table: String::new()
        }),
        vec![DeparseError::MissingField {
            operation: "drop_table",
            field: "table"
        }]
    );
    assert!(matches!(
        render_errors(&Operation::AddIndex {
            table: "t".to_string(),
            index: index("", false, &["a"]),
        })
        .as_slice(),
        [DeparseError::MissingField {
            field: "index.name",
            ..
        }]
    ));
}

#[test]
fn test_result_is_never_empty() {
    let ops = vec![
        Operation::DropTable {
            table: "t".to_string(),
        },
        Operation::Unsupported,
        Operation::AddTable {
            table: table("t", vec![]),
        },
    ];
    for op in &ops {
        match deparse(op, &Schema::new()) {
            Ok(sql) => assert!(!sql.is_empty()),
            Err(errors) => assert!(!errors.is_empty()),
        }
    }
}
