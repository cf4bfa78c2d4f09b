//! The axum host: fallback routing into the dispatcher, the 500 error
//! boundary, and graceful shutdown on a real listener.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use route_engine::error::DispatchError;
use route_engine::http::{ClassRef, ControllerRef, ControllerResult, HttpServer, RequestContext};
use route_engine::lifecycle::Shutdown;
use route_engine::routing::{Route, RouteGroup};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

mod common;
use common::*;

async fn fails(_: RequestContext) -> ControllerResult {
    Err(DispatchError::handler("boom"))
}

fn server() -> HttpServer {
    let d = dispatcher(
        RouteGroup::new()
            .route(Route::get("/hello/{name}", ClassRef::injectable("echo")))
            .route(Route::get("/fail", ControllerRef::callable(fails)))
            .route(Route::get("/unmarked", ClassRef::unmarked("echo"))),
    );
    HttpServer::new(Arc::new(d))
}

#[tokio::test]
async fn test_fallback_forwards_every_path() {
    let app = server().router();

    let response = app.clone().oneshot(get("/hello/world")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["params"]["name"], "world");

    let response = app.oneshot(request(Method::POST, "example.com", "/hello/world")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dispatch_errors_become_500() {
    let app = server().router();

    for uri in ["/fail", "/unmarked"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(body_string(response).await, "Internal Server Error");
    }
}

#[tokio::test]
async fn test_serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let serving = tokio::spawn(server().run(listener, shutdown.subscribe()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /hello/ferris HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
    assert!(raw.contains("\"name\":\"ferris\""), "{raw}");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("server should stop after shutdown")
        .unwrap()
        .unwrap();
}
