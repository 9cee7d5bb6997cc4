use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::*;
use crate::adapters::{ConnectionConfig, ConnectionFactory, DatabaseConnection};
use crate::models::{ColumnInfo, ExecutionSummary, IndexInfo};
use crate::security::Credentials;
use crate::test_support::{MockConnection, MockFactory};

async fn actions_with(connection: MockConnection) -> (DatabaseActions, Arc<MockConnection>) {
    let connection = Arc::new(connection);
    let factory: Arc<dyn ConnectionFactory> =
        Arc::new(MockFactory::serving(Arc::clone(&connection)));
    let manager = Arc::new(ConnectionManager::new(factory));
    manager
        .connect(
            "main",
            ConnectionConfig::new(connection.driver(), "app".to_string()),
            &Credentials::anonymous(),
            true,
        )
        .await
        .unwrap();
    (DatabaseActions::new(manager, DbConfig::default()), connection)
}

fn unconnected() -> DatabaseActions {
    let factory: Arc<dyn ConnectionFactory> = Arc::new(MockFactory::default());
    DatabaseActions::new(Arc::new(ConnectionManager::new(factory)), DbConfig::default())
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[tokio::test]
async fn test_create_reports_insert_id() {
    let (actions, connection) = actions_with(MockConnection::new().with_summary(
        ExecutionSummary {
            rows_affected: 1,
            last_insert_id: Some(7),
        },
    ))
    .await;

    let result = actions
        .invoke(
            Action::CreateRecord,
            json!({"table": "users", "data": {"name": "Alice"}}),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.insert_id, Some(7));
    assert_eq!(result.affected_rows, Some(1));
    assert_eq!(
        connection.statements(),
        vec![(
            "INSERT INTO users (name) VALUES (?)".to_string(),
            vec![json!("Alice")]
        )]
    );
}

#[tokio::test]
async fn test_create_on_postgres_reads_returned_id() {
    let (actions, connection) = actions_with(
        MockConnection::new()
            .with_driver(Driver::Postgres)
            .with_rows(vec![row(json!({"id": 42, "name": "Alice"}))]),
    )
    .await;

    let result = actions
        .invoke(
            Action::CreateRecord,
            json!({"table": "users", "data": {"name": "Alice"}}),
        )
        .await;

    assert_eq!(result.insert_id, Some(42));
    assert_eq!(
        connection.statements()[0].0,
        "INSERT INTO users (name) VALUES ($1) RETURNING *"
    );
}

fn column(field: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        field: field.to_string(),
        data_type: data_type.to_string(),
        nullable: true,
        key: String::new(),
        default: None,
        extra: String::new(),
    }
}

#[tokio::test]
async fn test_postgres_text_values_cast_to_column_types() {
    let (actions, connection) = actions_with(
        MockConnection::new()
            .with_driver(Driver::Postgres)
            .with_columns(
                "events",
                vec![
                    column("id", "uuid"),
                    column("happened_at", "timestamp without time zone"),
                    column("mood", "public.mood"),
                    column("title", "character varying"),
                    column("attempts", "integer"),
                ],
            ),
    )
    .await;

    let updated = actions
        .invoke(
            Action::UpdateRecord,
            json!({
                "table": "events",
                "data": {"happened_at": "2024-05-01 10:00:00", "mood": "happy", "title": "t", "attempts": 2},
                "where": {"id": "5f0c1d9e-9a4e-4c4b-8f39-3d6b0a0c2f11"}
            }),
        )
        .await;
    assert!(updated.success, "{:?}", updated.error);

    let queried = actions
        .invoke(
            Action::QueryData,
            json!({"table": "events", "where": {"id": "5f0c1d9e-9a4e-4c4b-8f39-3d6b0a0c2f11"}}),
        )
        .await;
    assert!(queried.success, "{:?}", queried.error);

    let statements: Vec<String> = connection.statements().into_iter().map(|(sql, _)| sql).collect();
    assert_eq!(
        statements,
        [
            "UPDATE events SET happened_at = $1::timestamp without time zone, mood = $2::public.mood, \
             title = $3, attempts = $4 WHERE id = $5::uuid",
            "SELECT * FROM events WHERE id = $1::uuid",
        ]
    );
    assert_eq!(connection.describe_calls(), 1);
}

#[tokio::test]
async fn test_mysql_values_stay_uncast() {
    let (actions, connection) = actions_with(
        MockConnection::new().with_columns("events", vec![column("id", "char(36)")]),
    )
    .await;

    let result = actions
        .invoke(
            Action::DeleteRecord,
            json!({"table": "events", "where": {"id": "5f0c1d9e"}}),
        )
        .await;

    assert!(result.success);
    assert_eq!(connection.statements()[0].0, "DELETE FROM events WHERE id = ?");
    assert_eq!(connection.describe_calls(), 0);
}

#[tokio::test]
async fn test_injected_table_name_never_reaches_database() {
    let (actions, connection) = actions_with(MockConnection::new()).await;

    let result = actions
        .invoke(Action::QueryData, json!({"table": "users; DROP TABLE users;"}))
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.starts_with("Invalid table name: users; DROP TABLE users;"));
    assert!(connection.statements().is_empty());
}

#[tokio::test]
async fn test_injected_column_names_are_rejected() {
    let (actions, connection) = actions_with(MockConnection::new()).await;

    for arguments in [
        json!({"table": "users", "select": "id, name FROM secrets --"}),
        json!({"table": "users", "where": {"1=1 OR id": 1}}),
        json!({"table": "users", "orderBy": "name; DROP TABLE users"}),
    ] {
        let result = actions.invoke(Action::QueryData, arguments).await;
        assert!(!result.success);
    }
    assert!(connection.statements().is_empty());
}

#[tokio::test]
async fn test_update_and_delete_require_where() {
    let (actions, connection) = actions_with(MockConnection::new()).await;

    let cases = [
        (Action::UpdateRecord, json!({"table": "users", "data": {"name": "x"}})),
        (
            Action::UpdateRecord,
            json!({"table": "users", "data": {"name": "x"}, "where": {}}),
        ),
        (Action::DeleteRecord, json!({"table": "users"})),
        (Action::DeleteRecord, json!({"table": "users", "where": {}})),
    ];
    for (action, arguments) in cases {
        let result = actions.invoke(action, arguments).await;
        let error = result.error.unwrap();
        assert!(
            error.ends_with("without WHERE clause is not allowed. Provide at least one condition."),
            "{}",
            error
        );
    }
    assert!(connection.statements().is_empty());
}

#[tokio::test]
async fn test_update_builds_set_then_where() {
    let (actions, connection) = actions_with(MockConnection::new().with_summary(
        ExecutionSummary {
            rows_affected: 3,
            last_insert_id: None,
        },
    ))
    .await;

    let result = actions
        .invoke(
            Action::UpdateRecord,
            json!({"table": "users", "data": {"status": "inactive"}, "where": {"team": 4}}),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.affected_rows, Some(3));
    assert_eq!(result.detail("where"), Some(&json!({"team": 4})));
    assert_eq!(
        connection.statements(),
        vec![(
            "UPDATE users SET status = ? WHERE team = ?".to_string(),
            vec![json!("inactive"), json!(4)]
        )]
    );
}

#[tokio::test]
async fn test_query_data_builds_paged_select() {
    let (actions, connection) = actions_with(
        MockConnection::new().with_rows(vec![row(json!({"id": 1})), row(json!({"id": 2}))]),
    )
    .await;

    let result = actions
        .invoke(
            Action::QueryData,
            json!({
                "table": "users",
                "select": "id",
                "where": {"active": true, "deleted_at": null},
                "orderBy": "id DESC",
                "limit": "10",
                "offset": 5
            }),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.count, Some(2));
    let sql = "SELECT id FROM users WHERE active = ? AND deleted_at IS NULL ORDER BY id DESC LIMIT 10 OFFSET 5";
    assert_eq!(result.detail("query"), Some(&json!(sql)));
    assert_eq!(connection.statements()[0].1, vec![json!(true)]);
}

#[tokio::test]
async fn test_negative_limit_is_rejected() {
    let (actions, connection) = actions_with(MockConnection::new()).await;

    let result = actions
        .invoke(Action::QueryData, json!({"table": "users", "limit": -1}))
        .await;

    assert!(!result.success);
    assert!(connection.statements().is_empty());
}

#[tokio::test]
async fn test_raw_sql_classifies_statements() {
    let (actions, connection) = actions_with(
        MockConnection::new()
            .with_rows(vec![row(json!({"total": 3}))])
            .with_summary(ExecutionSummary {
                rows_affected: 2,
                last_insert_id: None,
            }),
    )
    .await;

    let select = actions
        .invoke(
            Action::ExecuteRawSql,
            json!({"sql": "SELECT COUNT(*) AS total FROM users WHERE team = ?", "params": [4]}),
        )
        .await;
    assert_eq!(select.count, Some(1));
    assert_eq!(select.data, Some(json!([{"total": 3}])));

    let delete = actions
        .invoke(
            Action::ExecuteRawSql,
            json!({"sql": "DELETE FROM sessions WHERE expired = 1"}),
        )
        .await;
    assert_eq!(delete.affected_rows, Some(2));
    assert_eq!(delete.count, None);
    assert_eq!(connection.statements().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_query_times_out() {
    let (actions, _connection) =
        actions_with(MockConnection::new().with_delay(Duration::from_secs(60))).await;

    let result = actions
        .invoke(Action::ExecuteRawSql, json!({"sql": "SELECT SLEEP(60)"}))
        .await;

    assert_eq!(result.error.as_deref(), Some("Query timeout after 30000ms"));
}

#[tokio::test(start_paused = true)]
async fn test_custom_timeout_applies() {
    let (actions, _connection) =
        actions_with(MockConnection::new().with_delay(Duration::from_secs(5))).await;
    let actions = actions.with_query_timeout(Duration::from_secs(2));

    let result = actions
        .invoke(Action::QueryData, json!({"table": "users"}))
        .await;

    assert_eq!(result.error.as_deref(), Some("Query timeout after 2000ms"));
}

#[tokio::test]
async fn test_driver_errors_pass_through() {
    let (actions, _connection) =
        actions_with(MockConnection::new().failing("Table 'app.ghosts' doesn't exist")).await;

    let result = actions
        .invoke(Action::QueryData, json!({"table": "ghosts"}))
        .await;

    assert_eq!(result.error.as_deref(), Some("Table 'app.ghosts' doesn't exist"));
}

#[tokio::test]
async fn test_table_schema_uses_cache() {
    let columns = vec![ColumnInfo {
        field: "id".to_string(),
        data_type: "int".to_string(),
        nullable: false,
        key: "PRI".to_string(),
        default: None,
        extra: "auto_increment".to_string(),
    }];
    let indexes = vec![IndexInfo {
        name: "PRIMARY".to_string(),
        column: "id".to_string(),
        unique: true,
        index_type: "BTREE".to_string(),
    }];
    let (actions, connection) = actions_with(
        MockConnection::new()
            .with_columns("users", columns)
            .with_indexes(indexes),
    )
    .await;

    for _ in 0..2 {
        let result = actions
            .invoke(Action::GetTableSchema, json!({"table": "users"}))
            .await;
        assert!(result.success);
        assert_eq!(
            result.detail("columns"),
            Some(&json!([{
                "field": "id",
                "type": "int",
                "nullable": false,
                "key": "PRI",
                "default": null,
                "extra": "auto_increment"
            }]))
        );
        assert_eq!(result.detail("indexes").and_then(Value::as_array).map(Vec::len), Some(1));
    }
    assert_eq!(connection.describe_calls(), 1);
}

#[tokio::test]
async fn test_no_active_connection() {
    let actions = unconnected();

    let result = actions
        .invoke(Action::QueryData, json!({"table": "users"}))
        .await;

    assert_eq!(
        result.error.as_deref(),
        Some("No active database connection. Please connect first using connect_database tool.")
    );
}

#[tokio::test]
async fn test_connection_lifecycle_actions() {
    let actions = unconnected();

    let first = actions
        .invoke(
            Action::ConnectDatabase,
            json!({"connectionName": "x", "driver": "sqlite", "database": "x.db"}),
        )
        .await;
    assert!(first.success, "{:?}", first.error);
    assert_eq!(first.detail("isActive"), Some(&json!(true)));

    let second = actions
        .invoke(
            Action::ConnectDatabase,
            json!({
                "connectionName": "y",
                "driver": "postgresql",
                "database": "app",
                "password": "hunter2",
                "setAsActive": false
            }),
        )
        .await;
    assert_eq!(second.detail("isActive"), Some(&json!(false)));
    assert_eq!(second.detail("driver"), Some(&json!("postgres")));
    assert_eq!(second.detail("totalConnections"), Some(&json!(2)));

    let listed = actions.invoke(Action::ListConnections, Value::Null).await;
    assert_eq!(listed.detail("activeConnection"), Some(&json!("x")));
    assert!(!listed.to_value().to_string().contains("hunter2"));

    let switched = actions
        .invoke(Action::SwitchConnection, json!({"connectionName": "y"}))
        .await;
    assert_eq!(switched.message.as_deref(), Some("Switched to connection 'y'"));

    let disconnected = actions.invoke(Action::DisconnectDatabase, json!({})).await;
    assert_eq!(disconnected.message.as_deref(), Some("Disconnected from 'y'"));
    assert_eq!(disconnected.detail("activeConnection"), Some(&json!("x")));
    assert_eq!(disconnected.detail("remainingConnections"), Some(&json!(1)));

    let all = actions.invoke(Action::DisconnectAll, Value::Null).await;
    assert_eq!(all.detail("closedConnections"), Some(&json!(1)));

    let nothing = actions.invoke(Action::DisconnectDatabase, json!({})).await;
    assert!(!nothing.success);
}

#[tokio::test]
async fn test_connect_requires_driver_and_database() {
    let actions = unconnected();

    let result = actions
        .invoke(Action::ConnectDatabase, json!({"connectionName": "x"}))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("driver"));
}

#[tokio::test]
async fn test_db_config_opens_default_connection() {
    let actions = unconnected();

    let result = actions
        .invoke(
            Action::QueryData,
            json!({"table": "users", "dbConfig": {"driver": "sqlite", "database": ":memory:"}}),
        )
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        actions.manager().active_name().await.as_deref(),
        Some(crate::manager::DEFAULT_CONNECTION_NAME)
    );
}

#[tokio::test]
async fn test_malformed_arguments_become_failures() {
    let actions = unconnected();

    let result = actions.invoke(Action::CreateRecord, json!({"data": {}})).await;

    let error = result.error.unwrap();
    assert!(error.starts_with("Invalid arguments for create_record"), "{}", error);
}

#[test]
fn test_action_names_round_trip() {
    for action in Action::ALL {
        assert_eq!(action.name().parse::<Action>().ok(), Some(action));
    }
    assert!("drop_database".parse::<Action>().is_err());
}
