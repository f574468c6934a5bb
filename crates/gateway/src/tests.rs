//! Router-level tests against an in-memory SQLite database

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use quickonboard_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{schema::create_schema, DbPool, Repository},
    embeddings::MockEmbedder,
    storage::LocalBlobStore,
};
use quickonboard_context::{MockChatModel, NO_INFORMATION_REPLY};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{create_router, prometheus_builder};
use crate::state::AppState;

const SECRET: &str = "router-test-secret";
const BOUNDARY: &str = "quickonboard-test-boundary";

struct TestApp {
    router: Router,
    repo: Repository,
    jwt: JwtManager,
}

impl TestApp {
    async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let conn = Database::connect(options).await.unwrap();
        create_schema(&conn).await.unwrap();

        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some(SECRET.to_string());
        config.ingestion.chunk_size = 200;
        config.ingestion.chunk_overlap = 40;
        config.invites.public_base_url = "https://app.example.com/".to_string();

        let blob_root = std::env::temp_dir().join(format!("quickonboard-gateway-{}", Uuid::new_v4()));
        let state = AppState::new(
            Arc::new(config),
            DbPool::from_connection(conn),
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockChatModel::default()),
            Arc::new(LocalBlobStore::new(blob_root).unwrap()),
        )
        .unwrap();

        Self {
            repo: state.repo.clone(),
            router: create_router(state),
            jwt: JwtManager::new(SECRET, 3600),
        }
    }

    fn token(&self, email: &str, name: &str) -> String {
        self.jwt
            .generate_token(Uuid::new_v4(), email, Some(name.to_string()))
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn upload(&self, token: &str, workspace_id: &str, filename: &str, mime: &str, content: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {m}\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            m = mime,
            c = content
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/v1/workspaces/{}/documents", workspace_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn notifications(&self, token: &str) -> Vec<Value> {
        let (status, body) = self.call(Method::GET, "/v1/notifications", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body["notifications"].as_array().cloned().unwrap_or_default()
    }

    /// Invite `email` as a plain member and accept with `token`
    async fn join(&self, owner: &str, workspace_id: &str, email: &str, token: &str) {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/v1/workspaces/{}/invites", workspace_id),
                Some(owner),
                Some(json!({ "email": email, "role": "member" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let invite = body["invite"]["token"].as_str().unwrap().to_string();
        let (status, body) = self
            .call(Method::POST, &format!("/v1/invites/{}/accept", invite), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    async fn chunk_count(&self, token: &str, workspace_id: &str, document_id: &str) -> u64 {
        let (status, body) = self
            .call(
                Method::GET,
                &format!("/v1/workspaces/{}/documents/status", workspace_id),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["documents"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["id"] == document_id)
            .and_then(|d| d["chunk_count"].as_u64())
            .unwrap()
    }

    async fn create_workspace(&self, token: &str, name: &str, company_id: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/v1/workspaces",
                Some(token),
                Some(json!({ "name": name, "company_id": company_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["workspace"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.call(Method::GET, "/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_prometheus_builder_accepts_upstream_buckets() {
    let recorder = prometheus_builder(0).unwrap().build_recorder();
    assert!(recorder.handle().render().is_empty());
}

#[tokio::test]
async fn test_authentication_failures_look_the_same() {
    let app = TestApp::new().await;

    let (missing_status, missing) = app.call(Method::GET, "/v1/workspaces", None, None).await;
    let forged = JwtManager::new("another-secret", 3600)
        .generate_token(Uuid::new_v4(), "eve@example.com", None)
        .unwrap();
    let (forged_status, forged) = app
        .call(Method::GET, "/v1/workspaces", Some(&forged), None)
        .await;

    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing, forged);
    assert_eq!(missing["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_workspace_lifecycle() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");

    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/workspaces",
            Some(&owner),
            Some(json!({ "name": "Acme 2", "company_id": "acme" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = app.call(Method::GET, "/v1/workspaces", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspaces"].as_array().unwrap().len(), 1);

    let uri = format!("/v1/workspaces/{}", workspace_id);
    let (status, body) = app.call(Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "owner");
    assert_eq!(body["member_count"], 1);
    assert_eq!(body["members"][0]["email"], "owner@example.com");

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&owner), Some(json!({ "name": "Acme Corp" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspace"]["name"], "Acme Corp");

    let (status, _) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outsiders_see_not_found() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let outsider = app.token("mallory@example.com", "Mallory");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    for uri in [
        format!("/v1/workspaces/{}", workspace_id),
        format!("/v1/workspaces/{}/documents", workspace_id),
        format!("/v1/workspaces/{}/members", workspace_id),
        format!("/v1/workspaces/{}", Uuid::new_v4()),
    ] {
        let (status, _) = app.call(Method::GET, &uri, Some(&outsider), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/v1/workspaces/{}/chat", workspace_id),
            Some(&outsider),
            Some(json!({ "message": "What is the vacation policy?" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_without_documents() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;
    let uri = format!("/v1/workspaces/{}/chat", workspace_id);

    let (status, body) = app
        .call(Method::POST, &uri, Some(&owner), Some(json!({ "message": "Where is the office?" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], NO_INFORMATION_REPLY);
    assert_eq!(body["confidence"], 50);
    assert_eq!(body["sources"], json!([]));
    assert_eq!(body["workspace_name"], "Acme");

    let (status, _) = app
        .call(Method::POST, &uri, Some(&owner), Some(json!({ "message": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_then_chat_cites_document() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (status, body) = app
        .upload(
            &owner,
            &workspace_id,
            "handbook.txt",
            "text/plain",
            "Our vacation policy grants 25 days of paid leave per year.",
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["document"]["processed"], true);
    assert_eq!(body["chunk_count"], 1);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/v1/workspaces/{}/documents/status", workspace_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["documents"][0]["chunk_count"], 1);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/v1/workspaces/{}/chat", workspace_id),
            Some(&owner),
            Some(json!({ "message": "What is the vacation policy?" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"], json!(["handbook.txt"]));
    let confidence = body["confidence"].as_i64().unwrap();
    assert!((50..=100).contains(&confidence));

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/v1/workspaces/{}/stats/queries", workspace_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_month"], 1);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/v1/workspaces/{}/welcome", workspace_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspace"]["document_count"], 1);
    assert!(body["message"].as_str().unwrap().contains("handbook.txt"));
}

#[tokio::test]
async fn test_unsupported_upload_is_recorded_unprocessed() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (status, body) = app
        .upload(&owner, &workspace_id, "logo.png", "image/png", "not really an image")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["document"]["processed"], false);
    assert!(body["error"].as_str().unwrap().contains("image/png"));

    let (_, body) = app.call(Method::GET, "/v1/notifications", Some(&owner), None).await;
    let titles: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert!(titles.contains(&"Document Processing Failed"));
}

#[tokio::test]
async fn test_invite_lifecycle() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let invitee = app.token("bob@example.com", "Bob");
    let stranger = app.token("carol@example.com", "Carol");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;
    let invites_uri = format!("/v1/workspaces/{}/invites", workspace_id);

    let (status, _) = app
        .call(
            Method::POST,
            &invites_uri,
            Some(&owner),
            Some(json!({ "email": "bob@example.com", "role": "owner" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            &invites_uri,
            Some(&owner),
            Some(json!({ "email": "Bob@Example.com", "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let token = body["invite"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["invite"]["email"], "bob@example.com");
    assert_eq!(
        body["invite"]["invite_url"],
        format!("https://app.example.com/invite/{}", token)
    );

    let (status, _) = app
        .call(
            Method::POST,
            &invites_uri,
            Some(&owner),
            Some(json!({ "email": "bob@example.com", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::GET, &format!("/v1/invites/{}", token), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invite"]["workspace"]["name"], "Acme");

    let accept_uri = format!("/v1/invites/{}/accept", token);
    let (status, _) = app.call(Method::POST, &accept_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::POST, &accept_uri, Some(&invitee), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["role"], "member");

    let (status, _) = app.call(Method::POST, &accept_uri, Some(&invitee), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::GET, &format!("/v1/workspaces/{}", workspace_id), Some(&invitee), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "member");
    assert_eq!(body["member_count"], 2);

    // Plain members cannot invite
    let (status, _) = app
        .call(
            Method::POST,
            &invites_uri,
            Some(&invitee),
            Some(json!({ "email": "dave@example.com", "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.call(Method::GET, "/v1/notifications", Some(&owner), None).await;
    let messages: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["message"].as_str())
        .collect();
    assert!(messages.contains(&"Bob joined \"Acme\""));
}

#[tokio::test]
async fn test_member_management() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let invitee = app.token("bob@example.com", "Bob");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (_, body) = app
        .call(
            Method::POST,
            &format!("/v1/workspaces/{}/invites", workspace_id),
            Some(&owner),
            Some(json!({ "email": "bob@example.com", "role": "member" })),
        )
        .await;
    let token = body["invite"]["token"].as_str().unwrap().to_string();
    app.call(Method::POST, &format!("/v1/invites/{}/accept", token), Some(&invitee), None)
        .await;

    let members_uri = format!("/v1/workspaces/{}/members", workspace_id);
    let (status, body) = app.call(Method::GET, &members_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let members = body["members"].as_array().unwrap();
    let find = |role: &str| {
        members
            .iter()
            .find(|m| m["role"] == role)
            .and_then(|m| m["id"].as_str())
            .unwrap()
            .to_string()
    };
    let owner_member = find("owner");
    let bob_member = find("member");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("{}/{}", members_uri, owner_member),
            Some(&invitee),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("{}/{}", members_uri, bob_member),
            Some(&owner),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member"]["role"], "admin");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("{}/{}", members_uri, bob_member),
            Some(&owner),
            Some(json!({ "role": "superuser" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::DELETE, &format!("{}/{}", members_uri, owner_member), Some(&invitee), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::DELETE, &format!("{}/{}", members_uri, bob_member), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(Method::GET, &format!("/v1/workspaces/{}", workspace_id), Some(&invitee), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notifications_read_flow() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/notifications",
            Some(&owner),
            Some(json!({ "title": "Reminder", "message": "Read the handbook" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let reminder_id = body["notification"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/v1/notifications", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 2);

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/v1/notifications?workspace_id={}", workspace_id),
            Some(&owner),
            None,
        )
        .await;
    let scoped = body["notifications"].as_array().unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0]["title"], "Workspace Created");
    assert_eq!(scoped[0]["workspace_name"], "Acme");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/v1/notifications/{}/read", reminder_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let other = app.token("bob@example.com", "Bob");
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/v1/notifications/{}/read", reminder_id),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::PUT, "/v1/notifications/read-all", Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, body) = app.call(Method::GET, "/v1/notifications", Some(&owner), None).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::new().await;
    let user = app.token("ada@example.com", "Ada");

    let (status, body) = app.call(Method::GET, "/v1/me", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");

    let (status, body) = app
        .call(Method::PATCH, "/v1/me", Some(&user), Some(json!({ "name": "Ada Lovelace" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada Lovelace");

    let (status, _) = app
        .call(Method::PATCH, "/v1/me", Some(&user), Some(json!({ "name": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

const LONG_HANDBOOK: &str = "Our vacation policy grants 25 days of paid leave per year. \
Requests go through the HR portal at least two weeks ahead. \
Remote work is allowed up to three days a week with manager approval. \
Laptops are issued on the first day and must be returned when you leave. \
The office opens at eight and the kitchen is stocked every Monday.";

fn titles(notifications: &[Value]) -> Vec<String> {
    notifications
        .iter()
        .filter_map(|n| n["title"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_reprocess_all_isolates_failures() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (_, body) = app
        .upload(&owner, &workspace_id, "handbook.txt", "text/plain", LONG_HANDBOOK)
        .await;
    let good_id = body["document"]["id"].as_str().unwrap().to_string();
    let before = app.chunk_count(&owner, &workspace_id, &good_id).await;
    assert!(before > 1);
    app.upload(&owner, &workspace_id, "logo.png", "image/png", "not really an image")
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/v1/workspaces/{}/documents/reprocess", workspace_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 1);

    let results = body["results"].as_array().unwrap();
    let good = results.iter().find(|r| r["name"] == "handbook.txt").unwrap();
    assert_eq!(good["success"], true);
    assert_eq!(good["chunk_count"].as_u64(), Some(before));
    let bad = results.iter().find(|r| r["name"] == "logo.png").unwrap();
    assert_eq!(bad["success"], false);
    assert!(bad["error"].as_str().is_some());

    assert_eq!(app.chunk_count(&owner, &workspace_id, &good_id).await, before);
}

#[tokio::test]
async fn test_reprocess_document_replaces_chunks() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (_, body) = app
        .upload(&owner, &workspace_id, "handbook.txt", "text/plain", LONG_HANDBOOK)
        .await;
    let document_id = body["document"]["id"].as_str().unwrap().to_string();
    let before = app.chunk_count(&owner, &workspace_id, &document_id).await;

    for _ in 0..2 {
        let (status, body) = app
            .call(
                Method::POST,
                &format!("/v1/workspaces/{}/documents/{}/reprocess", workspace_id, document_id),
                Some(&owner),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);
        assert_eq!(body["chunk_count"].as_u64(), Some(before));
    }

    assert_eq!(app.chunk_count(&owner, &workspace_id, &document_id).await, before);

    let workspace = Uuid::parse_str(&workspace_id).unwrap();
    let chunks = app.repo.processed_chunks(workspace).await.unwrap();
    assert_eq!(chunks.len() as u64, before);
    let indices: HashSet<i32> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices.len(), chunks.len());
    assert_eq!(indices, (0..before as i32).collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_process_in_background_notifies_uploader() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;

    let (_, body) = app
        .upload(&owner, &workspace_id, "handbook.txt", "text/plain", LONG_HANDBOOK)
        .await;
    let document_id = body["document"]["id"].as_str().unwrap().to_string();
    let processed_before = titles(&app.notifications(&owner).await)
        .iter()
        .filter(|t| *t == "Document Processed")
        .count();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/v1/workspaces/{}/documents/{}/process", workspace_id, document_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["document_id"], document_id.as_str());
    assert_eq!(body["status"], "processing");

    let mut processed_after = processed_before;
    for _ in 0..50 {
        processed_after = titles(&app.notifications(&owner).await)
            .iter()
            .filter(|t| *t == "Document Processed")
            .count();
        if processed_after > processed_before {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(processed_after, processed_before + 1);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/v1/workspaces/{}/documents/{}/process", workspace_id, Uuid::new_v4()),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_document_notifies_members() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let member = app.token("bob@example.com", "Bob");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;
    app.join(&owner, &workspace_id, "bob@example.com", &member).await;

    let (_, body) = app
        .upload(&owner, &workspace_id, "handbook.txt", "text/plain", LONG_HANDBOOK)
        .await;
    let document_id = body["document"]["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/workspaces/{}/documents/{}", workspace_id, document_id);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app
        .call(Method::GET, &format!("/v1/workspaces/{}/documents", workspace_id), Some(&owner), None)
        .await;
    assert_eq!(body["documents"], json!([]));
    let workspace = Uuid::parse_str(&workspace_id).unwrap();
    assert!(app.repo.processed_chunks(workspace).await.unwrap().is_empty());

    let messages = |notifications: Vec<Value>| -> Vec<String> {
        notifications
            .iter()
            .filter(|n| n["title"] == "Document Deleted")
            .filter_map(|n| n["message"].as_str().map(str::to_string))
            .collect()
    };
    assert_eq!(
        messages(app.notifications(&owner).await),
        vec!["You deleted \"handbook.txt\"".to_string()]
    );
    assert_eq!(
        messages(app.notifications(&member).await),
        vec!["Olivia deleted \"handbook.txt\"".to_string()]
    );

    let (status, _) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_change_owner_role() {
    let app = TestApp::new().await;
    let owner = app.token("owner@example.com", "Olivia");
    let admin = app.token("bob@example.com", "Bob");
    let workspace_id = app.create_workspace(&owner, "Acme", "acme").await;
    app.join(&owner, &workspace_id, "bob@example.com", &admin).await;

    let members_uri = format!("/v1/workspaces/{}/members", workspace_id);
    let (_, body) = app.call(Method::GET, &members_uri, Some(&owner), None).await;
    let member_id = |role: &str| {
        body["members"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["role"] == role)
            .and_then(|m| m["id"].as_str())
            .unwrap()
            .to_string()
    };
    let owner_member = member_id("owner");
    let bob_member = member_id("member");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("{}/{}", members_uri, bob_member),
            Some(&owner),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("{}/{}", members_uri, owner_member),
            Some(&admin),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = app
        .call(Method::DELETE, &format!("{}/{}", members_uri, owner_member), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(Method::GET, &format!("/v1/workspaces/{}", workspace_id), Some(&owner), None)
        .await;
    assert_eq!(body["role"], "owner");
}
