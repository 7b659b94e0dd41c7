//! Executor and model tests over a recording backend
//!
//! The backend records every statement it is handed and answers from queues
//! of canned rows and outcomes, so statement shapes and round-trip counts can
//! be checked without a server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::backends::{DatabaseBackend, DatabaseBackendType, DatabaseValue, ExecuteOutcome, Row};
use crate::collection::ModelCollection;
use crate::config::ConnectionConfig;
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::relationships::{ManyToMany, ManyToOne, OneToMany};
use crate::sql::Statement;

#[derive(Default)]
struct RecordingBackend {
    statements: Mutex<Vec<Statement>>,
    rows: Mutex<VecDeque<ModelResult<Vec<Row>>>>,
    outcomes: Mutex<VecDeque<ModelResult<ExecuteOutcome>>>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    fn push_rows(&self, rows: Vec<Row>) {
        self.rows.lock().unwrap().push_back(Ok(rows));
    }

    fn push_fetch_error(&self, err: ModelError) {
        self.rows.lock().unwrap().push_back(Err(err));
    }

    fn push_outcome(&self, rows_affected: u64, last_insert_id: Option<u64>) {
        self.outcomes.lock().unwrap().push_back(Ok(ExecuteOutcome {
            rows_affected,
            last_insert_id,
        }));
    }

    fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    fn sql(&self) -> Vec<String> {
        self.statements().iter().map(|s| s.sql().to_string()).collect()
    }

    async fn record(&self, statement: &Statement) {
        self.statements.lock().unwrap().push(statement.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DatabaseBackend for RecordingBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::MySQL
    }

    async fn fetch_all(&self, _config: &ConnectionConfig, statement: &Statement) -> ModelResult<Vec<Row>> {
        self.record(statement).await;
        self.rows.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn execute(&self, _config: &ConnectionConfig, statement: &Statement) -> ModelResult<ExecuteOutcome> {
        self.record(statement).await;
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ExecuteOutcome::default()))
    }
}

fn database(backend: &Arc<RecordingBackend>) -> Database {
    Database::with_backend(ConnectionConfig::new("app"), backend.clone()).unwrap()
}

fn user_row(id: i64, name: &str) -> Row {
    Row::new().column("id", id).column("name", name)
}

#[tokio::test]
async fn test_all_selects_every_row_in_order() {
    let backend = RecordingBackend::new();
    backend.push_rows(vec![user_row(1, "Ann"), user_row(2, "Bo")]);
    let db = database(&backend);

    let users = Model::all(&db, "users", "*").await.unwrap();
    assert_eq!(backend.sql(), vec!["SELECT * FROM users WHERE 1"]);
    assert_eq!(users.only("name").unwrap(), vec![json!("Ann"), json!("Bo")]);
}

#[tokio::test]
async fn test_where_raw_with_extra_and_columns() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let users = Model::where_raw(&db, "users", "id > 1", "id, name", "ORDER BY name LIMIT 10")
        .await
        .unwrap();
    assert!(users.is_empty());
    assert_eq!(
        backend.sql(),
        vec!["SELECT id, name FROM users WHERE id > 1 ORDER BY name LIMIT 10"]
    );
}

#[tokio::test]
async fn test_count_and_exists() {
    let backend = RecordingBackend::new();
    backend.push_rows(vec![Row::new().column("count", 1i64)]);
    backend.push_rows(vec![Row::new().column("count", 0i64)]);
    let db = database(&backend);

    assert_eq!(Model::count(&db, "users", "id > 1").await.unwrap(), 1);
    assert!(!Model::exists(&db, "users", "id > 5").await.unwrap());
    assert_eq!(
        backend.sql(),
        vec![
            "SELECT count(*) as count FROM users WHERE id > 1",
            "SELECT count(*) as count FROM users WHERE id > 5",
        ]
    );
}

#[tokio::test]
async fn test_find_binds_id_and_reports_not_found() {
    let backend = RecordingBackend::new();
    backend.push_rows(vec![user_row(2, "Bo")]);
    let db = database(&backend);

    let bo = Model::find(&db, "users", 2i64).await.unwrap();
    assert_eq!(bo.get_str("name"), Some("Bo"));

    let err = Model::find(&db, "users", 99i64).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Record not found in table 'users' where id = 99");

    let statements = backend.statements();
    assert_eq!(statements[0].sql(), "SELECT * FROM users WHERE `id` = ? LIMIT 1");
    assert_eq!(statements[0].params(), &[DatabaseValue::Int(2)]);
    assert_eq!(statements[1].params(), &[DatabaseValue::Int(99)]);
    // a missing row is not a database failure
    assert!(db.last_error().is_none());
}

#[tokio::test]
async fn test_find_by_or_none() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let found = Model::find_by_or_none(&db, "users", "email", "nobody@example.com", "id")
        .await
        .unwrap();
    assert!(found.is_none());
    assert_eq!(backend.sql(), vec!["SELECT id FROM users WHERE `email` = ? LIMIT 1"]);
}

#[tokio::test]
async fn test_store_records_generated_id() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, Some(3));
    let db = database(&backend);

    let mut cy = Model::new().set("name", "Cy");
    let id = cy.store(&db, "users").await.unwrap();

    assert_eq!(id, Some(3));
    assert_eq!(cy.get_i64("id"), Some(3));
    assert_eq!(db.last_insert_id(), Some(3));

    let statements = backend.statements();
    assert_eq!(statements[0].sql(), "INSERT INTO users(`name`) VALUES(?)");
    assert_eq!(statements[0].params(), &[DatabaseValue::from("Cy")]);
}

#[tokio::test]
async fn test_store_keeps_explicit_id() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, Some(50));
    let db = database(&backend);

    let mut model = Model::new().set("id", 7).set("name", "Di");
    model.save(&db, "users").await.unwrap();
    assert_eq!(model.get_i64("id"), Some(7));
    assert_eq!(backend.sql(), vec!["INSERT INTO users(`id`, `name`) VALUES(?, ?)"]);
}

#[tokio::test]
async fn test_store_replaces_null_id() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, Some(2));
    backend.push_outcome(1, None);
    let db = database(&backend);

    let mut model = Model::new().set("id", serde_json::Value::Null).set("name", "Zed");
    assert_eq!(model.store(&db, "users").await.unwrap(), Some(2));
    assert_eq!(model.get_i64("id"), Some(2));
    assert_eq!(model.keys().collect::<Vec<_>>(), vec!["id", "name"]);

    model.delete_by_id(&db, "users", "id").await.unwrap();
    let statements = backend.statements();
    assert_eq!(statements[1].sql(), "DELETE FROM users WHERE `id` = ?");
    assert_eq!(statements[1].params(), &[DatabaseValue::Int(2)]);
}

#[tokio::test]
async fn test_create_builds_and_stores() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, Some(4));
    let db = database(&backend);

    let attributes = match json!({"name": "Ed", "age": 40}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let ed = Model::create(&db, "users", attributes).await.unwrap();
    assert_eq!(ed.keys().collect::<Vec<_>>(), vec!["name", "age", "id"]);
    assert_eq!(backend.sql(), vec!["INSERT INTO users(`name`, `age`) VALUES(?, ?)"]);
}

#[tokio::test]
async fn test_last_insert_id_only_follows_the_latest_statement() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, Some(3));
    let db = database(&backend);

    Model::new().set("name", "Cy").store(&db, "users").await.unwrap();
    assert_eq!(db.last_insert_id(), Some(3));

    Model::all(&db, "users", "*").await.unwrap();
    assert_eq!(db.last_insert_id(), None);
}

#[tokio::test]
async fn test_update_by_id_writes_every_attribute() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, None);
    let db = database(&backend);

    let bo = Model::new().set("id", 2).set("name", "Bea");
    let affected = bo.update_by_id(&db, "users", "id").await.unwrap();

    assert_eq!(affected, 1);
    let statements = backend.statements();
    assert_eq!(statements[0].sql(), "UPDATE users SET `id` = ?, `name` = ? WHERE `id` = ?");
    assert_eq!(
        statements[0].params(),
        &[DatabaseValue::Int(2), DatabaseValue::from("Bea"), DatabaseValue::Int(2)]
    );
}

#[tokio::test]
async fn test_update_with_raw_condition() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let patch = Model::new().set("active", false);
    patch.update(&db, "users", "last_login < '2020-01-01'").await.unwrap();
    assert_eq!(
        backend.sql(),
        vec!["UPDATE users SET `active` = ? WHERE last_login < '2020-01-01'"]
    );
}

#[tokio::test]
async fn test_delete_and_delete_by_id() {
    let backend = RecordingBackend::new();
    backend.push_outcome(2, None);
    backend.push_outcome(1, None);
    let db = database(&backend);

    assert_eq!(Model::delete(&db, "users", "age > 90").await.unwrap(), 2);

    let cy = Model::new().set("id", 3).set("name", "Cy");
    assert_eq!(cy.delete_by_id(&db, "users", "id").await.unwrap(), 1);

    let statements = backend.statements();
    assert_eq!(statements[0].sql(), "DELETE FROM users WHERE age > 90");
    assert_eq!(statements[1].sql(), "DELETE FROM users WHERE `id` = ?");
    assert_eq!(statements[1].params(), &[DatabaseValue::Int(3)]);
}

#[tokio::test]
async fn test_refresh_replaces_attributes() {
    let backend = RecordingBackend::new();
    backend.push_rows(vec![user_row(2, "Bea")]);
    let db = database(&backend);

    let mut bo = Model::new().set("id", 2).set("name", "Bo").set("draft", true);
    bo.refresh(&db, "users", "id").await.unwrap();
    assert_eq!(bo.get_str("name"), Some("Bea"));
    assert!(!bo.has("draft"));
}

#[tokio::test]
async fn test_invalid_input_never_reaches_the_database() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let nameless = Model::new().set("name", "Cy");
    assert!(matches!(
        nameless.delete_by_id(&db, "users", "id").await,
        Err(ModelError::MissingAttribute(_))
    ));
    assert!(matches!(
        Model::all(&db, "users; DROP TABLE users", "*").await,
        Err(ModelError::Validation(_))
    ));
    assert!(matches!(
        Model::new().update(&db, "users", "1").await,
        Err(ModelError::Validation(_))
    ));

    assert!(backend.statements().is_empty());
}

#[tokio::test]
async fn test_last_error_tracks_the_latest_statement() {
    let backend = RecordingBackend::new();
    backend.push_fetch_error(ModelError::query(
        "Table 'app.nope' doesn't exist",
        "SELECT * FROM nope WHERE 1",
    ));
    let db = database(&backend);

    let err = Model::all(&db, "nope", "*").await.unwrap_err();
    assert!(matches!(&err, ModelError::Query { sql, .. } if sql == "SELECT * FROM nope WHERE 1"));
    assert!(db.last_error().unwrap().contains("doesn't exist"));

    Model::all(&db, "users", "*").await.unwrap();
    assert!(db.last_error().is_none());
}

#[tokio::test]
async fn test_overlapping_calls_report_one_statement() {
    let backend = RecordingBackend::new();
    backend.push_outcome(1, Some(9));
    backend.push_fetch_error(ModelError::query("boom", "SELECT * FROM users WHERE 1"));
    let db = database(&backend);

    let mut cy = Model::new().set("name", "Cy");
    let (stored, fetched) = tokio::join!(cy.store(&db, "users"), Model::all(&db, "users", "*"));
    assert_eq!(stored.unwrap(), Some(9));
    assert!(fetched.is_err());

    match (db.last_insert_id(), db.last_error()) {
        (Some(9), None) => {}
        (None, Some(error)) => assert!(error.contains("boom")),
        other => panic!("accessors disagree: {:?}", other),
    }
}

#[tokio::test]
async fn test_round_trip_deadline() {
    let backend = RecordingBackend::slow(Duration::from_millis(500));
    let config = ConnectionConfig::new("app").with_timeout(Duration::from_millis(20));
    let db = Database::with_backend(config, backend.clone()).unwrap();

    let err = Model::all(&db, "users", "*").await.unwrap_err();
    assert!(matches!(err, ModelError::Timeout(_)));
    assert!(db.last_error().is_some());
}

#[test]
fn test_database_requires_a_database_name() {
    let backend = RecordingBackend::new();
    let result = Database::with_backend(ConnectionConfig::new(""), backend);
    assert!(matches!(result, Err(ModelError::Configuration(_))));
}

#[tokio::test]
async fn test_one_to_many_from_model() {
    let backend = RecordingBackend::new();
    backend.push_rows(vec![Row::new().column("id", 10i64).column("user_id", 1i64)]);
    let db = database(&backend);

    let ann = Model::new().set("id", 1).set("name", "Ann");
    let posts = ann
        .one_to_many(&db, &OneToMany::new("posts", "user_id"))
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(backend.sql(), vec!["SELECT * FROM posts WHERE `user_id` = ? AND (1)"]);
}

#[tokio::test]
async fn test_many_to_one_from_model() {
    let backend = RecordingBackend::new();
    backend.push_rows(vec![user_row(1, "Ann")]);
    let db = database(&backend);

    let post = Model::new().set("id", 10).set("user_id", 1);
    let author = post
        .many_to_one(&db, &ManyToOne::new("users", "user_id"))
        .await
        .unwrap();
    assert_eq!(author.get_str("name"), Some("Ann"));
    assert_eq!(backend.sql(), vec!["SELECT * FROM users WHERE `id` = ? LIMIT 1"]);

    let missing = post.many_to_one(&db, &ManyToOne::new("users", "user_id")).await;
    assert!(missing.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_collection_relationships_use_one_query() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let users = ModelCollection::create_from_array(json!([
        {"id": 1, "name": "Ann"},
        {"id": 2, "name": "Bo"},
        {"id": 3, "name": "Cy"},
    ]))
    .unwrap();

    users
        .one_to_many(&db, &OneToMany::new("posts", "user_id").conditions("published = 1"))
        .await
        .unwrap();
    users
        .many_to_many(&db, &ManyToMany::new("roles", "role_user", "user_id", "role_id"))
        .await
        .unwrap();

    let statements = backend.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].sql(),
        "SELECT * FROM posts WHERE `user_id` IN (?, ?, ?) AND (published = 1)"
    );
    assert_eq!(
        statements[1].sql(),
        "SELECT roles.* FROM roles INNER JOIN role_user ON `roles`.`id` = `role_user`.`role_id` \
         WHERE `role_user`.`user_id` IN (?, ?, ?) AND (1)"
    );
    assert_eq!(
        statements[1].params(),
        &[DatabaseValue::Int(1), DatabaseValue::Int(2), DatabaseValue::Int(3)]
    );
}

#[tokio::test]
async fn test_collection_relationships_without_keys_skip_the_query() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let empty = ModelCollection::new();
    assert!(empty
        .one_to_many(&db, &OneToMany::new("posts", "user_id"))
        .await
        .unwrap()
        .is_empty());

    let orphans = ModelCollection::create_from_array(json!([{"id": 10, "user_id": null}])).unwrap();
    assert!(orphans
        .many_to_one(&db, &ManyToOne::new("users", "user_id"))
        .await
        .unwrap()
        .is_empty());

    assert!(backend.statements().is_empty());
}

#[tokio::test]
async fn test_collection_relationship_requires_key_on_every_member() {
    let backend = RecordingBackend::new();
    let db = database(&backend);

    let users = ModelCollection::create_from_array(json!([{"id": 1}, {"name": "no id"}])).unwrap();
    let result = users.one_to_many(&db, &OneToMany::new("posts", "user_id")).await;
    assert!(matches!(result, Err(ModelError::MissingAttribute(column)) if column == "id"));
    assert!(backend.statements().is_empty());
}
