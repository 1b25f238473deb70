use api_lib::adapters::RelayGeneratorAdapter;
use axum::{http::StatusCode, routing::post, Json, Router};
use promptsmith_core::{normalize, GenerationFailure, PromptGenerationService};
use serde_json::{json, Value};

/// Serves `app` on an ephemeral port and returns its base URL.
async fn spawn_relay(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn adapter(base: &str, path: &str) -> RelayGeneratorAdapter {
    RelayGeneratorAdapter::new(reqwest::Client::new(), format!("{}{}", base, path))
}

#[tokio::test]
async fn returns_the_relay_body_and_sends_the_input() {
    let app = Router::new().route(
        "/generate",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "prompt": format!("Echo: {}", body["input"].as_str().unwrap_or_default()),
                "follow_up_questions": ["Which audience?"],
            }))
        }),
    );
    let base = spawn_relay(app).await;

    let payload = adapter(&base, "/generate").generate("write a poem").await.unwrap();
    let result = normalize(&payload);
    assert_eq!(result.prompt_text, "Echo: write a poem");
    assert_eq!(result.follow_up_questions, vec!["Which audience?".to_string()]);
}

#[tokio::test]
async fn error_status_is_rejected_with_the_body_message() {
    let app = Router::new().route(
        "/generate",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "quota exceeded" })),
            )
        }),
    );
    let base = spawn_relay(app).await;

    let err = adapter(&base, "/generate").generate("x").await.unwrap_err();
    assert_eq!(
        err,
        GenerationFailure::Rejected {
            status: 503,
            message: Some("quota exceeded".to_string()),
        }
    );
}

#[tokio::test]
async fn error_status_without_a_json_body_has_no_message() {
    let app = Router::new().route(
        "/generate",
        post(|| async { (StatusCode::BAD_REQUEST, "nope") }),
    );
    let base = spawn_relay(app).await;

    let err = adapter(&base, "/generate").generate("x").await.unwrap_err();
    assert_eq!(
        err,
        GenerationFailure::Rejected {
            status: 400,
            message: None,
        }
    );
}

#[tokio::test]
async fn malformed_success_body_is_a_transport_failure() {
    let app = Router::new().route("/generate", post(|| async { "definitely not json" }));
    let base = spawn_relay(app).await;

    let err = adapter(&base, "/generate").generate("x").await.unwrap_err();
    assert!(matches!(err, GenerationFailure::Transport(_)));
}

#[tokio::test]
async fn unreachable_relay_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = adapter(&format!("http://{}", addr), "/generate")
        .generate("x")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationFailure::Transport(_)));
}
