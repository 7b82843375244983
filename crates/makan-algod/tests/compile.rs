//! AlgodClient against an in-process stand-in node.

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use makan_algod::{AlgodClient, AlgodError, API_TOKEN_HEADER};
use makan_core::{Address, ProgramCompiler};
use serde_json::{json, Value};

const PROGRAM: [u8; 3] = [0x08, 0x81, 0x01];
const TOKEN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Accepts only the rubber-stamp program and requires the token.
async fn compile(headers: HeaderMap, body: String) -> (StatusCode, Json<Value>) {
    let token = headers.get(API_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if token != Some(TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid API Token" })),
        );
    }
    if body.trim() != "#pragma version 8\nint 1" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "1: unknown opcode" })),
        );
    }
    let address = Address::for_program(&PROGRAM);
    (
        StatusCode::OK,
        Json(json!({ "hash": address.to_string(), "result": "CIEB" })),
    )
}

async fn spawn_node() -> String {
    let app = Router::new().route("/v2/teal/compile", post(compile));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_compile_through_node() {
    let url = spawn_node().await;
    let client = AlgodClient::new(&url, TOKEN);

    let compiled = client.compile("#pragma version 8\nint 1\n").await.unwrap();
    assert_eq!(compiled.bytes, PROGRAM);
    assert_eq!(compiled.reported_address, Address::for_program(&PROGRAM));
}

#[tokio::test]
async fn test_missing_token_is_status_error() {
    let url = spawn_node().await;
    let client = AlgodClient::new(&url, "");

    match client.compile("#pragma version 8\nint 1").await {
        Err(AlgodError::Status { code, body }) => {
            assert_eq!(code, 401);
            assert!(body.contains("Invalid API Token"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_compile_error_is_reported() {
    let url = spawn_node().await;
    let client = AlgodClient::new(&url, TOKEN);

    let err = client.compile("bogus").await.unwrap_err();
    assert!(err.to_string().contains("unknown opcode"));
}

#[tokio::test]
async fn test_unreachable_node_is_http_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = AlgodClient::new(&format!("http://{}", addr), TOKEN);
    let err = client.compile("#pragma version 8\nint 1").await.unwrap_err();
    assert!(matches!(err, AlgodError::Http(_)));
}
