//! Shared harness for abibuch-server integration tests
//!
//! Every [`TestApp`] owns a fresh SQLite database and uploads directory in a
//! temp dir. [`Client`]s keep their own cookie jar so a test can act as
//! several users against the same router.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use abibuch_common::config::TomlConfig;
use abibuch_common::db::init_database;
use abibuch_common::models::{AnswerMode, Gender, PersonKind, Role};
use abibuch_server::db::questions::{self, QuestionInput};
use abibuch_server::db::students::{self, StudentInput};
use abibuch_server::db::teachers::{self, TeacherInput};
use abibuch_server::db::{accounts, fields};
use abibuch_server::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";
pub const ALIAS: &str = "ops-team";

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub uploads: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(TomlConfig::default()).await
    }

    pub async fn with_config(mut config: TomlConfig) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db = init_database(&dir.path().join("abibuch.db"))
            .await
            .expect("database");
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).expect("uploads dir");

        config.cookie_secret.get_or_insert_with(|| "integration-test-secret".to_string());
        let router = build_router(AppState::new(db.clone(), config, uploads.clone()));

        Self {
            router,
            db,
            uploads,
            _dir: dir,
        }
    }

    /// Client without cookies
    pub fn anonymous(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookies: BTreeMap::new(),
        }
    }

    pub async fn student(&self, first: &str, last: &str, gender: Gender) -> String {
        let input = StudentInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            gender,
            email: None,
        };
        students::insert(&self.db, &input).await.expect("student").guid
    }

    pub async fn teacher(&self, last: &str, gender: Gender) -> String {
        let input = TeacherInput {
            first_name: None,
            last_name: last.to_string(),
            gender,
            subject: None,
        };
        teachers::insert(&self.db, &input).await.expect("teacher").guid
    }

    pub async fn question(&self, text: &str, target: PersonKind, mode: AnswerMode) -> String {
        let mut conn = self.db.acquire().await.expect("connection");
        let input = QuestionInput {
            text: text.to_string(),
            target,
            answer_mode: mode,
            active: true,
        };
        questions::insert(&mut conn, &input).await.expect("question").guid
    }

    pub async fn field(&self, label: &str, max_length: i64, required: bool) -> String {
        let mut conn = self.db.acquire().await.expect("connection");
        let input = fields::FieldInput {
            label: label.to_string(),
            field_type: abibuch_common::models::FieldType::Text,
            max_length,
            required,
        };
        fields::insert(&mut conn, &input).await.expect("field").guid
    }

    /// Student record plus a logged-in client for it
    pub async fn student_client(&self, first: &str, last: &str, gender: Gender) -> (String, Client) {
        let guid = self.student(first, last, gender).await;
        let username = format!("{}.{}", first, last).to_lowercase();
        accounts::insert(&self.db, &username, PASSWORD, Role::Student, Some(&guid))
            .await
            .expect("student account");

        let mut client = self.anonymous();
        client.login(&username, PASSWORD).await;
        (guid, client)
    }

    /// Logged-in admin without an alias
    pub async fn admin_without_alias(&self, username: &str) -> Client {
        accounts::insert(&self.db, username, PASSWORD, Role::Admin, None)
            .await
            .expect("admin account");

        let mut client = self.anonymous();
        client.login(username, PASSWORD).await;
        client
    }

    /// Logged-in admin acting as [`ALIAS`]
    pub async fn admin(&self) -> Client {
        let mut client = self.admin_without_alias("admin").await;
        let res = client.post("/api/admin/alias", json!({ "alias": ALIAS })).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text());
        client
    }

    pub async fn audit_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.db)
            .await
            .expect("audit count")
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `error.code` of an error body
    pub fn error_code(&self) -> String {
        self.json()["error"]["code"].as_str().unwrap_or_default().to_string()
    }
}

#[derive(Clone)]
pub struct Client {
    router: Router,
    cookies: BTreeMap<String, String>,
}

impl Client {
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    pub async fn send(&mut self, method: Method, uri: &str, content_type: Option<&str>, body: Vec<u8>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = builder.body(Body::from(body)).expect("request");
        let response = self.router.clone().oneshot(request).await.expect("response");

        let status = response.status();
        let headers = response.headers().clone();
        for set_cookie in headers.get_all(header::SET_COOKIE) {
            self.store_cookie(set_cookie.to_str().expect("cookie header"));
        }

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec();

        TestResponse { status, headers, body }
    }

    fn store_cookie(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let removed = value.is_empty() || set_cookie.to_ascii_lowercase().contains("max-age=0");
        if removed {
            self.cookies.remove(name.trim());
        } else {
            self.cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    async fn json_request(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        match body {
            Some(body) => {
                self.send(method, uri, Some("application/json"), body.to_string().into_bytes())
                    .await
            }
            None => self.send(method, uri, None, Vec::new()).await,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.json_request(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.json_request(Method::POST, uri, Some(body)).await
    }

    pub async fn post_empty(&mut self, uri: &str) -> TestResponse {
        self.json_request(Method::POST, uri, None).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.json_request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.json_request(Method::DELETE, uri, None).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> TestResponse {
        let res = self
            .post(
                "/api/auth/login",
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.text());
        res
    }
}
