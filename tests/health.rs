use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Url;
use serde_json::json;

use text_generator::api::routes::heartbeat;
use text_generator::health::check;

/// Serves a heartbeat plus a few unhealthy variants from a dedicated runtime thread.
fn spawn_server() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let router = Router::new()
                .route("/v1/heartbeat", get(heartbeat))
                .route(
                    "/degraded",
                    get(|| async { Json(json!({"status": "loading", "message": "warming up"})) }),
                )
                .route("/no-status", get(|| async { Json(json!({"message": "hello"})) }))
                .route(
                    "/down",
                    get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
                );
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    addr
}

fn url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}{path}")).unwrap()
}

#[test]
fn running_service_passes() {
    let addr = spawn_server();
    check(url(addr, "/v1/heartbeat")).unwrap();
}

#[test]
fn error_status_fails() {
    let addr = spawn_server();
    let err = check(url(addr, "/down")).unwrap_err();
    assert!(err.to_string().contains("503"));
    assert!(check(url(addr, "/missing")).is_err());
}

#[test]
fn success_without_ok_status_fails() {
    let addr = spawn_server();
    let err = check(url(addr, "/degraded")).unwrap_err();
    assert_eq!(err.to_string(), "Service reported status loading");
    assert!(check(url(addr, "/no-status")).is_err());
}

#[test]
fn unreachable_service_fails() {
    // nothing listens on the discard port
    assert!(check(Url::parse("http://127.0.0.1:9/v1/heartbeat").unwrap()).is_err());
}
