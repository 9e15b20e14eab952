//! In-process test harness: a router over a temp SQLite store and an in-memory index.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use sheepdog::auth::issue_token;
use sheepdog::index::MemoryIndex;
use sheepdog::server::{AppState, create_router};
use sheepdog::store::{SqliteStore, Store};
use sheepdog::types::{Program, Project, Role, RoleGrant, User};

pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub index: Arc<MemoryIndex>,
    pub admin_token: String,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_dir.path().join("sheepdog.db")).expect("open store"),
        );
        store.initialize().expect("initialize store");

        let (_token, admin_token) =
            issue_token(store.as_ref(), true, None, None).expect("issue admin token");

        let index = Arc::new(MemoryIndex::new());
        let state = Arc::new(AppState::new(
            store.clone(),
            index.clone(),
            temp_dir.path().to_path_buf(),
        ));

        Self {
            router: create_router(state),
            temp_dir,
            store,
            index,
            admin_token,
        }
    }

    pub fn program(&self, name: &str, accession: &str) -> Program {
        let program = Program {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            dbgap_accession_number: accession.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_program(&program).expect("create program");
        program
    }

    pub fn project(&self, program: &Program, code: &str, accession: &str) -> Project {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            program_id: program.id.clone(),
            code: code.to_string(),
            dbgap_accession_number: accession.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_project(&project).expect("create project");
        project
    }

    /// Creates a user with the given `(scope, role)` grants and returns them with a raw token.
    pub fn user(&self, username: &str, grants: &[(&str, Role)]) -> (User, String) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");

        for (scope, role) in grants {
            self.store
                .grant_role(&RoleGrant {
                    user_id: user.id.clone(),
                    scope: (*scope).to_string(),
                    role: *role,
                    created_at: now,
                })
                .expect("grant role");
        }

        let (_token, raw) =
            issue_token(self.store.as_ref(), false, Some(&user.id), None).expect("issue token");
        (user, raw)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}
