#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use kotoba_backend_rust::config::Config;
use kotoba_backend_rust::{app_with_pool, db};

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    // Holds the SQLite file alive for the duration of the test.
    _db_dir: TempDir,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(true).await
}

pub async fn create_test_app_with(enable_history_reset: bool) -> TestApp {
    let db_dir = tempfile::tempdir().expect("create temp dir");
    let db_path = db_dir.path().join("words.db");

    let config = Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "info".to_string(),
        database_url: format!("sqlite:{}?mode=rwc", db_path.display()),
        allowed_origins: Vec::new(),
        enable_history_reset,
        seed_demo_data: false,
    };

    let pool = db::connect(&config.database_url)
        .await
        .expect("connect test database");
    let router = app_with_pool(config, pool.clone());

    TestApp {
        router,
        pool,
        _db_dir: db_dir,
    }
}

pub async fn insert_group(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query(r#"INSERT INTO "groups" ("name") VALUES (?)"#)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert group")
        .last_insert_rowid()
}

pub async fn insert_activity(pool: &SqlitePool, name: &str, url: &str) -> i64 {
    sqlx::query(r#"INSERT INTO "study_activities" ("name", "url") VALUES (?, ?)"#)
        .bind(name)
        .bind(url)
        .execute(pool)
        .await
        .expect("insert activity")
        .last_insert_rowid()
}

pub async fn insert_word(pool: &SqlitePool, kanji: &str, romaji: &str, french: &str) -> i64 {
    sqlx::query(r#"INSERT INTO "words" ("kanji", "romaji", "french") VALUES (?, ?, ?)"#)
        .bind(kanji)
        .bind(romaji)
        .bind(french)
        .execute(pool)
        .await
        .expect("insert word")
        .last_insert_rowid()
}

pub async fn link_word_to_group(pool: &SqlitePool, word_id: i64, group_id: i64) {
    sqlx::query(r#"INSERT INTO "word_groups" ("word_id", "group_id") VALUES (?, ?)"#)
        .bind(word_id)
        .bind(group_id)
        .execute(pool)
        .await
        .expect("insert word_group");
}

pub async fn get(app: &TestApp, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");

    read_json(response).await
}

pub async fn post_json(
    app: &TestApp,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("build request"),
        )
        .await
        .expect("send request");

    read_json(response).await
}

pub async fn post_empty(app: &TestApp, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");

    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();

    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON body")
    };

    (status, json)
}
