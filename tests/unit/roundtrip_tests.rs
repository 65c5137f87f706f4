//! Deparse-then-parse round trip tests
//!
//! Applying an operation to a schema must give the same schema as parsing
//! the original DDL followed by the operation's rendered DDL.

use ddl_schema::model::{ColumnDefault, Constraint};
use ddl_schema::operation::ColumnChange;
use ddl_schema::{apply_operation, deparse, Operation};
use pretty_assertions::assert_eq;

use crate::common::{
    column, foreign_key, id_column, index, parse_model, primary_key, table, USERS_POSTS_SQL,
};

fn assert_round_trip(base: &str, op: Operation) {
    let mut applied = parse_model(base);
    let sql = deparse(&op, &applied)
        .unwrap_or_else(|errors| panic!("{} did not render: {:?}", op.kind(), errors));
    apply_operation(&mut applied, &op);

    let parsed = parse_model(&format!("{}\n{}", base, sql));
    assert_eq!(applied, parsed, "round trip of {} via:\n{}", op.kind(), sql);
}

fn alter(table: &str, column: &str, change: ColumnChange) -> Operation {
    Operation::AlterColumn {
        table: table.to_string(),
        column: column.to_string(),
        change,
    }
}

#[test]
fn test_round_trip_add_table_with_constraints() {
    let mut tags = table(
        "tags",
        vec![id_column(), column("user_id", "integer"), column("label", "text")],
    );
    tags.comment = Some("User labels".to_string());
    tags.columns["label"].default = Some(ColumnDefault::Text("new".to_string()));
    tags.constraints
        .insert("tags_pkey".to_string(), primary_key("tags_pkey", &["id"]));
    tags.constraints.insert(
        "tags_user_id_fkey".to_string(),
        foreign_key("tags_user_id_fkey", "user_id", "users", "id"),
    );
    tags.constraints.insert(
        "tags_label_check".to_string(),
        Constraint::Check {
            name: "tags_label_check".to_string(),
            expression: "length(label) > 0".to_string(),
        },
    );
    tags.indexes
        .insert("tags_label_idx".to_string(), index("tags_label_idx", true, &["label"]));

    assert_round_trip(USERS_POSTS_SQL, Operation::AddTable { table: tags });
}

#[test]
fn test_round_trip_add_table_with_key_flags_only() {
    let mut a = column("a", "int");
    a.primary = true;
    let mut b = column("b", "int");
    b.primary = true;
    let mut code = column("code", "varchar");
    code.unique = true;
    code.not_null = true;

    assert_round_trip(
        "",
        Operation::AddTable {
            table: table("pairs", vec![a, b, code]),
        },
    );
}

#[test]
fn test_round_trip_columns() {
    let mut nickname = column("nickname", "varchar");
    nickname.not_null = true;
    nickname.default = Some(ColumnDefault::Text("anon".to_string()));
    nickname.comment = Some("Shown in lists".to_string());
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddColumn {
            table: "users".to_string(),
            column: nickname,
        },
    );

    let mut seq = column("seq", "bigint");
    seq.increment = true;
    seq.not_null = true;
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddColumn {
            table: "posts".to_string(),
            column: seq,
        },
    );

    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::DropColumn {
            table: "posts".to_string(),
            column: "user_id".to_string(),
        },
    );
}

#[test]
fn test_round_trip_column_changes() {
    let changes = vec![
        alter("users", "name", ColumnChange::NotNull { value: true }),
        alter("posts", "title", ColumnChange::NotNull { value: false }),
        alter("users", "name", ColumnChange::Type { data_type: "text".to_string() }),
        alter(
            "users",
            "name",
            ColumnChange::Default {
                value: Some(ColumnDefault::Text("n/a".to_string())),
            },
        ),
        alter(
            "posts",
            "user_id",
            ColumnChange::Default {
                value: Some(ColumnDefault::Integer(-1)),
            },
        ),
        alter("users", "name", ColumnChange::Default { value: None }),
        alter(
            "users",
            "name",
            ColumnChange::Comment {
                value: Some("Display name".to_string()),
            },
        ),
        alter("posts", "user_id", ColumnChange::Rename { to: "author_id".to_string() }),
    ];
    for op in changes {
        assert_round_trip(USERS_POSTS_SQL, op);
    }
}

#[test]
fn test_round_trip_constraints() {
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddConstraint {
            table: "users".to_string(),
            constraint: Constraint::Unique {
                name: "users_name_key".to_string(),
                columns: vec!["name".to_string()],
            },
        },
    );
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddConstraint {
            table: "posts".to_string(),
            constraint: foreign_key("posts_author", "user_id", "users", "id"),
        },
    );
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::DropConstraint {
            table: "posts".to_string(),
            name: "posts_user_id_fkey".to_string(),
        },
    );
}

#[test]
fn test_round_trip_tables_and_indexes() {
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::RenameTable {
            table: "users".to_string(),
            to: "accounts".to_string(),
        },
    );
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::DropTable {
            table: "users".to_string(),
        },
    );
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::SetTableComment {
            table: "posts".to_string(),
            comment: Some("Blog posts".to_string()),
        },
    );
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddIndex {
            table: "posts".to_string(),
            index: index("posts_user_title_idx", false, &["user_id", "title"]),
        },
    );

    let with_index = format!("{}\nCREATE INDEX posts_title_idx ON posts (title);", USERS_POSTS_SQL);
    assert_round_trip(
        &with_index,
        Operation::DropIndex {
            table: "posts".to_string(),
            name: "posts_title_idx".to_string(),
        },
    );
}

#[test]
fn test_round_trip_sequence_defaults() {
    assert_round_trip(
        USERS_POSTS_SQL,
        alter(
            "users",
            "name",
            ColumnChange::Default {
                value: Some(ColumnDefault::expression("nextval('users_name_seq'::regclass)")),
            },
        ),
    );

    let mut seq_no = column("seq_no", "bigint");
    seq_no.default = Some(ColumnDefault::expression("nextval('posts_seq_no_seq'::regclass)"));
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddColumn {
            table: "posts".to_string(),
            column: seq_no,
        },
    );
}

#[test]
fn test_round_trip_numeric_default() {
    let mut price = column("price", "numeric(10,2)");
    price.default = Some(ColumnDefault::Number("9.99".parse().unwrap()));
    assert_round_trip(
        USERS_POSTS_SQL,
        Operation::AddColumn {
            table: "posts".to_string(),
            column: price,
        },
    );
    assert_round_trip(
        USERS_POSTS_SQL,
        alter(
            "posts",
            "title",
            ColumnChange::Default {
                value: Some(ColumnDefault::Number("-0.5".parse().unwrap())),
            },
        ),
    );
}
