use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use zoro_config::AppConfig;
use zoro_gateway::{build_router, AppState};
use zoro_runtime::BackendServices;

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");

        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("zoro-e2e.db").display());
        config.database.max_connections = 5;
        config.encryption.key = Some("e2e-encryption-secret".to_string());
        config.cache.redis_url = None;
        config.orchestrator.gemini.api_key = None;

        let services = BackendServices::initialise(&config)
            .await
            .expect("initialise backend services");

        let state = AppState::new(
            &config,
            services.db_pool.clone(),
            services.cipher.clone(),
            services.orchestrator.clone(),
            services.suggestions.clone(),
        );

        Self {
            router: build_router(state),
            _dir: dir,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if !token.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn sign_up(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                "",
                Some(json!({"email": email, "password": "long-enough-pw"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["token"].as_str().expect("token").to_string(),
            body["user"]["public_id"].as_str().expect("id").to_string(),
        )
    }
}

#[tokio::test]
async fn direct_messages_round_trip_through_encryption() {
    let app = TestApp::new().await;
    let (alice, alice_id) = app.sign_up("alice@example.com").await;
    let (bob, bob_id) = app.sign_up("bob@example.com").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/messages",
            &alice,
            Some(json!({"recipient_id": bob_id, "content": "standup in 5?"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, history) = app
        .call(Method::GET, &format!("/api/messages/{alice_id}"), &bob, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["content"], "standup in 5?");

    let (_, conversations) = app
        .call(Method::GET, "/api/messages/conversations", &bob, None)
        .await;
    assert_eq!(conversations.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .call(Method::POST, &format!("/api/messages/{alice_id}/read"), &bob, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, unread) = app
        .call(Method::GET, "/api/messages/unread-count", &bob, None)
        .await;
    assert_eq!(unread["count"], 0);
}

#[tokio::test]
async fn sharing_a_file_notifies_the_recipient() {
    let app = TestApp::new().await;
    let (alice, _) = app.sign_up("alice@example.com").await;
    let (bob, bob_id) = app.sign_up("bob@example.com").await;

    let (status, file) = app
        .call(
            Method::POST,
            "/api/zoro/files",
            &alice,
            Some(json!({
                "file_name": "roadmap.pdf",
                "mime_type": "application/pdf",
                "size_bytes": 2048,
                "file_url": "https://files.example.com/roadmap.pdf"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{file}");
    let file_id = file["id"].as_str().expect("file id");

    let (status, share) = app
        .call(
            Method::POST,
            &format!("/api/zoro/files/{file_id}/share"),
            &alice,
            Some(json!({"recipient_id": bob_id, "note": "for Monday"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{share}");
    assert_eq!(share["status"], "pending");

    let (_, inbox) = app.call(Method::GET, "/api/notifications", &bob, None).await;
    assert_eq!(inbox["unread_count"], 1);

    let (_, incoming) = app
        .call(Method::GET, "/api/zoro/shares/incoming?status=pending", &bob, None)
        .await;
    assert_eq!(incoming.as_array().map(Vec::len), Some(1));

    let share_id = share["id"].as_str().expect("share id");
    let (status, answered) = app
        .call(
            Method::POST,
            &format!("/api/zoro/shares/{share_id}/respond"),
            &bob,
            Some(json!({"accept": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{answered}");
    assert_eq!(answered["status"], "accepted");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/zoro/shares/{share_id}/respond"),
            &bob,
            Some(json!({"accept": false})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn code_sessions_require_participation() {
    let app = TestApp::new().await;
    let (alice, _) = app.sign_up("alice@example.com").await;
    let (bob, _) = app.sign_up("bob@example.com").await;

    let (status, session) = app
        .call(
            Method::POST,
            "/api/code/sessions",
            &alice,
            Some(json!({"title": "Parser spike", "language": "rust", "content": "fn main() {}"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{session}");
    let session_id = session["id"].as_str().expect("session id");

    let (status, _) = app
        .call(Method::GET, &format!("/api/code/sessions/{session_id}"), &bob, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::POST, &format!("/api/code/sessions/{session_id}/join"), &bob, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/code/sessions/{session_id}"),
            &bob,
            Some(json!({"content": "fn main() { println!(\"hi\"); }"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["language"], "rust");

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/code/sessions/{session_id}"), &bob, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_events_show_up_for_everyone() {
    let app = TestApp::new().await;
    let (admin, _) = app.sign_up("admin@example.com").await;
    let (member, _) = app.sign_up("member@example.com").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/admin/events",
            &member,
            Some(json!({"title": "Offsite", "starts_at": "2099-05-01T09:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, event) = app
        .call(
            Method::POST,
            "/api/admin/events",
            &admin,
            Some(json!({"title": "Offsite", "starts_at": "2099-05-01T09:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");

    let (status, upcoming) = app.call(Method::GET, "/api/events", &member, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upcoming[0]["title"], "Offsite");
}
