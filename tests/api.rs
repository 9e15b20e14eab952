//! HTTP API tests driven through the router in-process.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::TestApp;
use sheepdog::index::Version;
use sheepdog::types::Role;

const ACCESS: &str = "/api/v1/submission/TCGA/BRCA/access";

fn seeded() -> TestApp {
    let app = TestApp::new();
    let program = app.program("TCGA", "phs-tcga");
    app.project(&program, "BRCA", "phs-brca");
    app
}

fn file_body(md5: &str) -> Value {
    json!({ "hashes": { "md5": md5 }, "size": 128, "file_name": "reads.bam" })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, _) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_access_granted_by_project_role() {
    let app = seeded();
    let (_, token) = app.user("alice", &[("phs-brca", Role::Read)]);

    let (status, body) = app.get(ACCESS, &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["roles"], json!(["read"]));
}

#[tokio::test]
async fn test_access_granted_by_program_role() {
    let app = seeded();
    let (_, token) = app.user("bob", &[("phs-tcga", Role::Member)]);

    let (status, body) = app.get(ACCESS, &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], json!(["_member_"]));
}

#[tokio::test]
async fn test_roles_union_across_scopes() {
    let app = seeded();
    let (_, token) = app.user(
        "carol",
        &[("phs-tcga", Role::Read), ("phs-brca", Role::Update)],
    );

    let (status, body) = app.get(ACCESS, &token).await;

    assert_eq!(status, StatusCode::OK);
    let roles = body["data"]["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 2);
}

#[tokio::test]
async fn test_access_denied_names_user_and_project() {
    let app = seeded();
    let (_, token) = app.user("dave", &[("phs-brca", Role::Upload)]);

    let (status, body) = app.get(ACCESS, &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("User dave doesn't have"));
    assert!(message.ends_with("access in BRCA"));
}

#[tokio::test]
async fn test_roles_on_unrelated_scope_do_not_grant() {
    let app = seeded();
    let other = app.program("TARGET", "phs-target");
    app.project(&other, "AML", "phs-aml");
    let (_, token) = app.user("erin", &[("phs-aml", Role::Admin)]);

    let (status, _) = app.get(ACCESS, &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_program_is_denied_not_error() {
    let app = TestApp::new();
    let (_, token) = app.user("frank", &[("phs-brca", Role::Read)]);

    let (status, body) = app
        .get("/api/v1/submission/NOPE/NOTHING/access", &token)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().ends_with("access in NOTHING"));
}

#[tokio::test]
async fn test_missing_project_falls_back_to_program_roles() {
    let app = seeded();
    let (_, token) = app.user("gina", &[("phs-tcga", Role::Read)]);

    let (status, _) = app
        .get("/api/v1/submission/TCGA/UNKNOWN/access", &token)
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = seeded();

    let (status, body) = app.request(Method::GET, ACCESS, None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_admin_token_cannot_act_as_user() {
    let app = seeded();
    let admin = app.admin_token.clone();

    let (status, _) = app.get(ACCESS, &admin).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_write_requires_create_or_update() {
    let app = seeded();
    let (_, reader) = app.user("reader", &[("phs-brca", Role::Read)]);
    let (_, writer) = app.user("writer", &[("phs-brca", Role::Create)]);
    let uri = "/api/v1/submission/TCGA/BRCA/files/node-1/versions";

    let (status, _) = app.post(uri, &reader, file_body("aaa")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.index.documents().is_empty());

    let (status, body) = app.post(uri, &writer, file_body("aaa")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["did"], "node-1");
    assert_eq!(body["data"]["version"], Value::Null);
}

#[tokio::test]
async fn test_invalid_version_attributes_rejected() {
    let app = seeded();
    let (_, writer) = app.user("writer", &[("phs-brca", Role::Update)]);

    let (status, _) = app
        .post(
            "/api/v1/submission/TCGA/BRCA/files/node-1/versions",
            &writer,
            json!({ "hashes": {}, "size": 1 }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_version_then_release_flow() {
    let app = seeded();
    let (_, token) = app.user(
        "submitter",
        &[("phs-brca", Role::Create), ("phs-brca", Role::Release)],
    );
    let versions = "/api/v1/submission/TCGA/BRCA/files/node-1/versions";
    let release = "/api/v1/submission/TCGA/BRCA/files/node-1/release";

    app.post(versions, &token, file_body("aaa")).await;
    let (status, body) = app
        .post(release, &token, json!({ "release_number": "R1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["released"], true);

    // Nothing new to release.
    let (_, body) = app
        .post(release, &token, json!({ "release_number": "R2" }))
        .await;
    assert_eq!(body["data"]["released"], false);

    let (status, body) = app.post(versions, &token, file_body("bbb")).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["did"], "node-1");

    app.post(release, &token, json!({ "release_number": "R3" }))
        .await;

    let mut numbers: Vec<u32> = app
        .index
        .documents()
        .iter()
        .filter_map(|d| d.version.number())
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2]);

    let frozen = app
        .index
        .documents()
        .into_iter()
        .find(|d| d.did == "node-1")
        .unwrap();
    assert_eq!(frozen.version, Version::Versioned(1));
    assert_eq!(frozen.metadata["gdc_release_number"], "R1");
    assert_eq!(frozen.metadata["project_id"], "TCGA-BRCA");
}

#[tokio::test]
async fn test_release_requires_release_role() {
    let app = seeded();
    let (_, token) = app.user("creator", &[("phs-brca", Role::Create)]);

    let (status, body) = app
        .post(
            "/api/v1/submission/TCGA/BRCA/files/node-1/release",
            &token,
            json!({ "release_number": "R1" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("release"));
}

#[tokio::test]
async fn test_project_admin_can_release() {
    let app = seeded();
    let (_, token) = app.user(
        "steward",
        &[("phs-brca", Role::Create), ("phs-brca", Role::Admin)],
    );

    app.post(
        "/api/v1/submission/TCGA/BRCA/files/node-1/versions",
        &token,
        file_body("aaa"),
    )
    .await;
    let (status, body) = app
        .post(
            "/api/v1/submission/TCGA/BRCA/files/node-1/release",
            &token,
            json!({ "release_number": "R1" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["released"], true);
}

#[tokio::test]
async fn test_read_file_and_versions() {
    let app = seeded();
    let (_, token) = app.user(
        "reader",
        &[("phs-brca", Role::Read), ("phs-brca", Role::Update)],
    );

    let (status, _) = app
        .get("/api/v1/submission/TCGA/BRCA/files/node-1", &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post(
        "/api/v1/submission/TCGA/BRCA/files/node-1/versions",
        &token,
        file_body("aaa"),
    )
    .await;

    let (status, body) = app
        .get("/api/v1/submission/TCGA/BRCA/files/node-1", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hashes"]["md5"], "aaa");

    let (status, body) = app
        .get("/api/v1/submission/TCGA/BRCA/files/node-1/versions", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_files_are_bound_to_their_project() {
    let app = TestApp::new();
    let program = app.program("TCGA", "phs-tcga");
    app.project(&program, "BRCA", "phs-brca");
    app.project(&program, "LUAD", "phs-luad");

    let (_, owner) = app.user("owner", &[("phs-brca", Role::Create)]);
    let (_, mallory) = app.user(
        "mallory",
        &[
            ("phs-luad", Role::Create),
            ("phs-luad", Role::Release),
            ("phs-luad", Role::Read),
        ],
    );

    let (status, body) = app
        .post(
            "/api/v1/submission/TCGA/BRCA/files/brca-file/versions",
            &owner,
            file_body("original"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metadata"]["project_id"], "TCGA-BRCA");

    let (status, _) = app
        .post(
            "/api/v1/submission/TCGA/LUAD/files/brca-file/versions",
            &mallory,
            file_body("forged"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/v1/submission/TCGA/LUAD/files/brca-file/release",
            &mallory,
            json!({ "release_number": "R1" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .get("/api/v1/submission/TCGA/LUAD/files/brca-file", &mallory)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .get("/api/v1/submission/TCGA/LUAD/files/brca-file/versions", &mallory)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let documents = app.index.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].hashes["md5"], "original");
    assert!(documents[0].version.is_head());
    assert!(!documents[0].metadata.contains_key("gdc_release_number"));
}

#[tokio::test]
async fn test_caller_cannot_stamp_another_project() {
    let app = seeded();
    let (_, token) = app.user("writer", &[("phs-brca", Role::Create)]);

    let (status, body) = app
        .post(
            "/api/v1/submission/TCGA/BRCA/files/node-1/versions",
            &token,
            json!({
                "hashes": { "md5": "aaa" },
                "size": 1,
                "metadata": { "project_id": "TCGA-LUAD" }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metadata"]["project_id"], "TCGA-BRCA");
}

#[tokio::test]
async fn test_admin_provisions_program_project_and_roles() {
    let app = TestApp::new();
    let admin = app.admin_token.clone();

    let (status, _) = app
        .post(
            "/api/v1/admin/programs",
            &admin,
            json!({ "name": "TCGA", "dbgap_accession_number": "phs-tcga" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(
            "/api/v1/admin/programs",
            &admin,
            json!({ "name": "TCGA", "dbgap_accession_number": "phs-other" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/v1/admin/programs/TCGA/projects",
            &admin,
            json!({ "code": "BRCA", "dbgap_accession_number": "phs-brca" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get("/api/v1/admin/programs/TCGA", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["projects"][0]["code"], "BRCA");

    let (status, body) = app
        .post("/api/v1/admin/users", &admin, json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/users/{user_id}/roles"),
            &admin,
            json!({ "scope": "phs-brca", "roles": ["read", "_member_"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["roles"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/users/{user_id}/tokens"),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("sheepdog_"));

    let (status, _) = app.get(ACCESS, &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete(
            &format!("/api/v1/admin/users/{user_id}/roles/phs-brca/read"),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete(
            &format!("/api/v1/admin/users/{user_id}/roles/phs-brca/_member_"),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(ACCESS, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_rejects_unknown_role() {
    let app = TestApp::new();
    let admin = app.admin_token.clone();
    let (user, _) = app.user("alice", &[]);

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/users/{}/roles", user.id),
            &admin,
            json!({ "scope": "phs-brca", "roles": ["superuser"] }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Valid roles"));
}

#[tokio::test]
async fn test_admin_routes_reject_user_tokens() {
    let app = TestApp::new();
    let (_, token) = app.user("alice", &[]);

    let (status, _) = app.get("/api/v1/admin/users", &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_cannot_delete_own_token() {
    let app = TestApp::new();
    let admin = app.admin_token.clone();

    let (_, body) = app.get("/api/v1/admin/tokens", &admin).await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .delete(&format!("/api/v1/admin/tokens/{id}"), &admin)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_token_listing_filters() {
    let app = TestApp::new();
    let admin = app.admin_token.clone();
    let (user, _) = app.user("alice", &[]);
    let (expired, _) = sheepdog::auth::issue_token(
        app.store.as_ref(),
        false,
        Some(&user.id),
        Some(chrono::Utc::now() - chrono::Duration::hours(1)),
    )
    .unwrap();

    let (status, body) = app.get("/api/v1/admin/tokens", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = app.get("/api/v1/admin/tokens?kind=admin", &admin).await;
    let admins = body["data"].as_array().unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0]["is_admin"], true);

    let (_, body) = app
        .get("/api/v1/admin/tokens?kind=user&active=true", &admin)
        .await;
    let active = body["data"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0]["id"], expired.id.as_str());

    let (status, _) = app.get("/api/v1/admin/tokens?kind=robot", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_revokes_user_token() {
    let app = TestApp::new();
    let admin = app.admin_token.clone();
    let (user, token) = app.user("alice", &[]);

    let (_, body) = app
        .get(&format!("/api/v1/admin/users/{}/tokens", user.id), &admin)
        .await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/v1/admin/tokens/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], user.id.as_str());

    let (status, _) = app
        .delete(&format!("/api/v1/admin/tokens/{id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/v1/admin/tokens/{id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/v1/submission/TCGA/BRCA/access", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
