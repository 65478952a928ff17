use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pact_broker_rust::config::AppConfig;
use pact_broker_rust::{build_app, InMemoryStore, TestDataBuilder};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

const PROVIDER_VERSION: &str = "1315e0b1924cb6f42751f977789be3559373033a";

fn seeded_store(deployed: bool) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let builder = TestDataBuilder::new(&store)
        .create_environment("production", true)
        .unwrap()
        .create_environment("test", false)
        .unwrap()
        .create_consumer("Foo1", Some("foo1main"))
        .unwrap()
        .create_provider("Foo2", Some("foo2main"))
        .unwrap()
        .publish_pact("1", Some("foo1main"))
        .unwrap()
        .create_verification(PROVIDER_VERSION, Some("foo2main"), true)
        .unwrap();
    if deployed {
        builder
            .create_deployed_version_for_provider_version("production")
            .unwrap();
    }
    store
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_can_i_deploy_route() {
    let app = build_app(seeded_store(true), &AppConfig::default());

    let (status, body) = send(
        app,
        post_json(
            "/matrix/can-i-deploy",
            json!({
                "selectors": [{"pacticipant_name": "Foo1", "pacticipant_version_number": "1"}],
                "options": {"environment_name": "production", "latestby": "cvp"}
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["deployable"], json!(true));
    assert_eq!(body["matrix"].as_array().unwrap().len(), 1);
    assert_eq!(body["matrix"][0]["status"], json!("verified"));
}

#[tokio::test]
async fn test_invalid_selectors_are_bad_requests() {
    let app = build_app(seeded_store(true), &AppConfig::default());

    let (status, body) = send(
        app.clone(),
        post_json("/matrix/can-i-deploy", json!({"selectors": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("At least one selector"));

    let (status, _) = send(
        app,
        post_json(
            "/matrix/can-i-deploy",
            json!({"selectors": [{"pacticipant_name": "Foo1", "branch": "a", "tag": "b"}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_can_i_merge_route() {
    let store = seeded_store(false);
    TestDataBuilder::new(&store)
        .use_consumer("Foo1")
        .unwrap()
        .use_provider("Foo2")
        .unwrap()
        .publish_pact("2", Some("feat/new-thing"))
        .unwrap();
    let app = build_app(store, &AppConfig::default());

    let (status, body) = send(
        app,
        post_json(
            "/matrix/can-i-merge",
            json!({"selectors": [{"pacticipant_name": "Foo1", "branch": "feat/new-thing"}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_merge"], json!(false));
    assert_eq!(
        body["reason"],
        json!(format!(
            "There is no verified pact between version 2 of Foo1 and the latest version of Foo2 from branch foo2main ({})",
            PROVIDER_VERSION
        ))
    );
}

#[tokio::test]
async fn test_environments_route() {
    let app = build_app(seeded_store(true), &AppConfig::default());

    let (status, body) = send(
        app,
        post_json(
            "/matrix/can-i-deploy/environments",
            json!({
                "selector": {"pacticipant_name": "Foo1", "pacticipant_version_number": "1"},
                "environments": ["test", "production"]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["production"]["deployable"], json!(true));
    assert!(body["results"]["test"]["deployable"].is_null());
    assert!(body["results"]["test"]["executed_at"].is_string());
}

#[tokio::test]
async fn test_summary_route() {
    let app = build_app(seeded_store(true), &AppConfig::default());

    let (status, body) = send(
        app.clone(),
        Request::builder()
            .uri("/pacticipants/Foo1/summary")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["main_branch"], json!("foo1main"));
    assert_eq!(body["can_i_deploy"]["production"]["deployable"], json!(true));
    assert_eq!(body["max_pacticipants"], json!(50));

    let (status, _) = send(
        app,
        Request::builder()
            .uri("/pacticipants/Ghost/summary")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

#[tokio::test]
async fn test_server_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let app = build_app(seeded_store(false), &AppConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = TestClient::new(format!("http://{}", address));

    let health = client.get("/health").await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    let health: Value = health.json().await.unwrap();
    assert_eq!(health["status"], json!("healthy"));

    let response = client
        .post(
            "/matrix/can-i-deploy",
            json!({
                "selectors": [{"pacticipant_name": "Foo1", "pacticipant_version_number": "1"}],
                "options": {"environment_name": "production"}
            }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["summary"]["deployable"].is_null());
    assert_eq!(
        body["summary"]["reason"],
        json!("There is no verified pact between version 1 of Foo1 and a version of Foo2 currently in production (no version is currently recorded as deployed/released in this environment)")
    );
}
