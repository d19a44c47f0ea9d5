#![allow(dead_code)]

use rowcrate::models::Project;
use rowcrate::{Connection, Entity, ImageStore};
use sea_orm::{ConnectionTrait, Database, DbErr};
use serde_json::json;

const CREATE_PROJECTS: &str = "CREATE TABLE projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    date TEXT NOT NULL,
    link TEXT,
    short_description TEXT,
    long_description TEXT,
    tags TEXT,
    colour TEXT,
    created_at TEXT,
    updated_at TEXT
)";

const CREATE_IMAGES: &str = "CREATE TABLE images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    file TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT
)";

pub async fn setup_test_db() -> Result<Connection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    db.execute_unprepared(CREATE_PROJECTS).await?;
    db.execute_unprepared(CREATE_IMAGES).await?;

    Ok(Connection::from(db))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh, empty image directory under the system temp dir
pub fn temp_image_store() -> ImageStore {
    ImageStore::new(std::env::temp_dir().join(format!("rowcrate-test-{}", uuid::Uuid::new_v4())))
}

pub fn cleanup(store: &ImageStore) {
    let _ = std::fs::remove_dir_all(store.root());
}

pub async fn create_project(conn: &Connection, name: &str, date: &str) -> Project {
    let mut project = Project::from_values([("name", json!(name)), ("date", json!(date))]);
    assert!(project.save(conn).await, "failed to save project {name}");
    project
}

pub async fn count_rows(conn: &Connection, table: &str) -> i64 {
    let row = conn
        .inner()
        .query_one(sea_orm::Statement::from_string(
            conn.inner().get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

pub fn file_exists(store: &ImageStore, file: &str) -> bool {
    store.root().join(file).exists()
}
