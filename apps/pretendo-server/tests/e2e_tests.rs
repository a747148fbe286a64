//! End-to-end scenarios exercised through the full middleware pipeline and
//! route table, without binding a real socket (`tower::ServiceExt::oneshot`),
//! mirroring the teacher's `api_ingress` request-id integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pretendo_auth::AuthService;
use pretendo_config::PretendoConfig;
use pretendo_db::Database;
use pretendo_logs::LogStore;
use pretendo_persistence::MemoryAdapter;
use pretendo_server::script::RhaiSandbox;
use pretendo_server::server::build_router;
use pretendo_server::state::AppState;
use serde_json::Value;
use sha2::Digest;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

async fn build_app(config_yaml: &str) -> axum::Router {
    let config: PretendoConfig = serde_yaml::from_str(config_yaml).expect("valid config yaml");
    let config = Arc::new(config);
    let adapter = Arc::new(MemoryAdapter::new());
    let db = Arc::new(Database::init(config.clone(), adapter).await.unwrap());
    let auth = Arc::new(AuthService::new(Duration::from_secs(3600)));
    let logs = Arc::new(LogStore::new(config.options.log_max_entries));
    let sandbox = Arc::new(RhaiSandbox::default());
    let cancel = CancellationToken::new();
    let state = AppState::new(db, auth, logs, config, sandbox, cancel);
    build_router(state)
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn method_json(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(mut req: Request<Body>, token: &str) -> Request<Body> {
    req.headers_mut().insert(
        "Authorization",
        format!("Bearer {token}").parse().unwrap(),
    );
    req
}

/// Scenario 1 (spec §8): sort desc + pagination, with Link-header rels.
#[tokio::test]
async fn scenario_sort_and_paginate() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
      - name: name
        type: string
    seed:
      - { id: 1, name: "A" }
      - { id: 2, name: "B" }
"#,
    )
    .await;

    let (status, headers, body) = send(&app, get("/users?sortBy=name.desc&perPage=1&page=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!([{"id": 1, "name": "A"}]));
    assert_eq!(body["meta"]["pagination"]["totalItems"], 2);
    assert_eq!(body["meta"]["pagination"]["totalPages"], 2);

    let link = headers.get("Link").unwrap().to_str().unwrap();
    assert!(link.contains("rel=\"first\""));
    assert!(link.contains("rel=\"prev\""));
    assert!(link.contains("rel=\"last\""));
    assert_eq!(headers.get("X-Total-Count").unwrap(), "2");
}

/// Scenario 2: create then fetch by the generated id.
#[tokio::test]
async fn scenario_create_then_get() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
      - name: name
        type: string
"#,
    )
    .await;

    let (status, _headers, body) = send(&app, post_json("/users", serde_json::json!({"name": "C"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], 1);

    let (status, _headers, body) = send(&app, get("/users/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "C");
}

/// `POST` with an explicit id that already exists is a conflict, not a
/// silent duplicate.
#[tokio::test]
async fn scenario_create_with_duplicate_id_conflicts() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
      - name: name
        type: string
    seed:
      - { id: 1, name: "A" }
"#,
    )
    .await;

    let (status, _headers, _body) = send(&app, post_json("/users", serde_json::json!({"id": 1, "name": "dup"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Scenario 3: `owner` access control on `PATCH`.
#[tokio::test]
async fn scenario_owner_access_control() {
    let app = build_app(
        r#"
options:
  auth:
    enabled: true
    users:
      - { id: 10, username: "x", password: "30c952fab122c3f9759f02a6d95c3758b246b4fee239957b2d4fee46e26170c4", role: "user" }
      - { id: 11, username: "y", password: "30c952fab122c3f9759f02a6d95c3758b246b4fee239957b2d4fee46e26170c4", role: "user" }
resources:
  - name: posts
    ownedBy: userId
    fields:
      - name: id
        type: number
      - name: userId
        type: number
      - name: title
        type: string
    access:
      update: ["owner"]
    seed:
      - { id: 1, userId: 10, title: "P" }
"#,
    )
    .await;

    let (status, _h, body) = send(&app, post_json("/auth/login", serde_json::json!({"username": "x", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::OK);
    let token_x = body["token"].as_str().unwrap().to_string();

    let (status, _h, body) = send(&app, post_json("/auth/login", serde_json::json!({"username": "y", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::OK);
    let token_y = body["token"].as_str().unwrap().to_string();

    let req = with_bearer(method_json("PATCH", "/posts/1", serde_json::json!({"title": "edited"})), &token_x);
    let (status, _h, _b) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = with_bearer(method_json("PATCH", "/posts/1", serde_json::json!({"title": "edited again"})), &token_y);
    let (status, _h, _b) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

/// Scenario 4: `$hash` default on a password field; re-posting the already
/// hashed value leaves it unchanged.
#[tokio::test]
async fn scenario_hash_default() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
      - name: username
        type: string
      - name: password
        type: string
        defaultValue: "$hash"
"#,
    )
    .await;

    let (status, _h, body) = send(&app, post_json("/users", serde_json::json!({"username": "u", "password": "secret"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let hashed = body["data"]["password"].as_str().unwrap().to_string();
    assert_eq!(hashed.len(), 64);
    assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(
        hashed,
        format!("{:x}", sha2::Sha256::digest(b"secret"))
    );

    // Re-submitting the record with its already-hashed password leaves it alone.
    let (status, _h, body) = send(
        &app,
        post_json("/users", serde_json::json!({"username": "u2", "password": hashed.clone()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["password"], hashed);
}

/// Scenario 6: login -> role-gated endpoint -> logout revokes the token.
#[tokio::test]
async fn scenario_login_rbac_logout() {
    let app = build_app(
        r#"
options:
  auth:
    enabled: true
    users:
      - { id: 1, username: "admin", password: "30c952fab122c3f9759f02a6d95c3758b246b4fee239957b2d4fee46e26170c4", role: "admin" }
      - { id: 2, username: "bob", password: "30c952fab122c3f9759f02a6d95c3758b246b4fee239957b2d4fee46e26170c4", role: "user" }
resources:
  - name: settings
    fields:
      - name: id
        type: number
      - name: value
        type: string
    access:
      list: ["admin"]
    seed:
      - { id: 1, value: "v" }
"#,
    )
    .await;

    let (status, _h, _b) = send(&app, get("/settings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _h, body) = send(&app, post_json("/auth/login", serde_json::json!({"username": "bob", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::OK);
    let bob_token = body["token"].as_str().unwrap().to_string();

    let (status, _h, _b) = send(&app, with_bearer(get("/settings"), &bob_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _h, body) = send(&app, post_json("/auth/login", serde_json::json!({"username": "admin", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::OK);
    let admin_token = body["token"].as_str().unwrap().to_string();

    let (status, _h, _b) = send(&app, with_bearer(get("/settings"), &admin_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _h, _b) = send(&app, with_bearer(post_json("/auth/logout", serde_json::json!({})), &admin_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _h, _b) = send(&app, with_bearer(get("/settings"), &admin_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Cascade delete: deleting a `users` record removes its `posts`.
#[tokio::test]
async fn scenario_cascade_delete() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
    relationships:
      - name: posts
        type: hasMany
        resource: posts
        foreignKey: userId
    seed:
      - { id: 1 }
  - name: posts
    fields:
      - name: id
        type: number
      - name: userId
        type: number
    seed:
      - { id: 1, userId: 1 }
      - { id: 2, userId: 1 }
"#,
    )
    .await;

    let (status, _h, _b) = send(&app, Request::builder().method("DELETE").uri("/users/1").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _h, body) = send(&app, get("/posts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // second delete on the same id is a no-op 404, not a crash.
    let (status, _h, _b) = send(&app, Request::builder().method("DELETE").uri("/users/1").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// `GET /<name>/:id/<related>` applies the query string's filter/sort/
/// pagination options to the related records, not just the raw list.
#[tokio::test]
async fn scenario_relation_endpoint_honors_query_options() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
    relationships:
      - name: posts
        type: hasMany
        resource: posts
        foreignKey: userId
    seed:
      - { id: 1 }
  - name: posts
    fields:
      - name: id
        type: number
      - name: userId
        type: number
      - name: title
        type: string
    seed:
      - { id: 1, userId: 1, title: "b-post" }
      - { id: 2, userId: 1, title: "a-post" }
      - { id: 3, userId: 1, title: "c-post" }
"#,
    )
    .await;

    let (status, _h, body) = send(&app, get("/users/1/posts?sortBy=title.asc&perPage=2")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"].as_array().unwrap().iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["a-post", "b-post"]);

    let (status, _h, body) = send(&app, get("/users/1/posts?title=a-post")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "a-post");
}

/// Relationship expansion surfaces a nested record in place of the raw id.
#[tokio::test]
async fn scenario_expand_relationship() {
    let app = build_app(
        r#"
resources:
  - name: authors
    fields:
      - name: id
        type: number
      - name: name
        type: string
    seed:
      - { id: 1, name: "Ada" }
  - name: posts
    fields:
      - name: id
        type: number
      - name: authorId
        type: number
    relationships:
      - name: author
        type: belongsTo
        resource: authors
        foreignKey: authorId
    seed:
      - { id: 1, authorId: 1 }
"#,
    )
    .await;

    let (status, _h, body) = send(&app, get("/posts/1?expand=author")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["author"]["name"], "Ada");
    assert_eq!(body["data"]["author"]["id"], 1);
}

/// Admin reset/backup/restore round trip.
#[tokio::test]
async fn scenario_admin_backup_restore() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
    seed:
      - { id: 1 }
"#,
    )
    .await;

    let (status, _h, body) = send(&app, post_json("/__backup", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let backup_id = body["backupId"].as_str().unwrap().to_string();

    let (status, _h, _b) = send(&app, post_json("/users", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _h, body) = send(&app, get("/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _h, _b) = send(&app, post_json("/__restore", serde_json::json!({"backupId": backup_id}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _h, body) = send(&app, get("/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

/// Unknown route falls through to a plain 404, and the root document lists
/// configured resources.
#[tokio::test]
async fn scenario_root_document_and_404() {
    let app = build_app(
        r#"
resources:
  - name: widgets
    fields:
      - name: id
        type: number
"#,
    )
    .await;

    let (status, headers, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resources"], serde_json::json!(["widgets"]));
    assert_eq!(headers.get("X-Powered-By").unwrap(), "Pretendo");

    let (status, _h, _b) = send(&app, get("/nonexistent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Validation failures surface as 400 with a `validation` error body, not a
/// panic or a 500.
#[tokio::test]
async fn scenario_validation_failure() {
    let app = build_app(
        r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
      - name: name
        type: string
        required: true
        minLength: 2
"#,
    )
    .await;

    let (status, _h, body) = send(&app, post_json("/users", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}
