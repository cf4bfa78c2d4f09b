//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router that hands every request to the dispatcher
//! - Wire up tracing
//! - Record request metrics
//! - Turn dispatch errors into 500 responses (the host's error boundary)
//! - Serve on a listener until shutdown is triggered

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::dispatcher::{Dispatcher, MatchedRoute};
use crate::observability::metrics;

/// HTTP server fronting a [`Dispatcher`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            router: Self::build_router(dispatcher),
        }
    }

    /// Build the Axum router: one fallback, no axum-level routes.
    fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(TraceLayer::new_for_http())
    }

    /// The Axum router, for embedding or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = match dispatcher.handle(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(method = %method, path = %path, error = %err, "Unhandled dispatch error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    };

    let route = response
        .extensions()
        .get::<MatchedRoute>()
        .map(|m| m.path.as_str())
        .unwrap_or("none");
    metrics::record_request(&method, response.status().as_u16(), route, start);
    response
}
