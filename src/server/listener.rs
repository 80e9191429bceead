//! Feed server listener
//!
//! Serves the WebSocket feed and a health endpoint over axum, and owns the
//! registry, channel and notifier shared by every session.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::channel::LocalChannel;
use crate::error::Result;
use crate::publisher::ChangeNotifier;
use crate::registry::{GroupName, GroupRegistry};
use crate::server::config::ServerConfig;
use crate::server::ws::serve_socket;
use crate::session::FeedConfig;

/// WebSocket route for the product feed
pub const PRODUCTS_WS_PATH: &str = "/ws/products/";

/// Health check route
pub const HEALTH_PATH: &str = "/health";

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    /// Sessions currently subscribed to any group
    pub connections: usize,
    /// Groups with at least one member
    pub groups: usize,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<GroupRegistry>,
    feed: FeedConfig,
    group: GroupName,
    next_session_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
    started_at: Instant,
}

/// Product feed server
pub struct FeedServer {
    config: ServerConfig,
    registry: Arc<GroupRegistry>,
    channel: Arc<LocalChannel>,
    notifier: Arc<ChangeNotifier>,
    next_session_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
    started_at: Instant,
}

impl FeedServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let registry = Arc::new(GroupRegistry::new());
        let channel = Arc::new(LocalChannel::new(registry.clone()));
        let notifier = Arc::new(ChangeNotifier::products(channel.clone()));

        Self {
            config,
            registry,
            channel,
            notifier,
            next_session_id: Arc::new(AtomicU64::new(1)),
            connection_semaphore,
            started_at: Instant::now(),
        }
    }

    /// Get a reference to the group registry
    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Get a reference to the broadcast channel
    pub fn channel(&self) -> &Arc<LocalChannel> {
        &self.channel
    }

    /// Notifier to install as the catalog's persistence hook
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            feed: self.config.feed.clone(),
            group: self.notifier.group().clone(),
            next_session_id: self.next_session_id.clone(),
            connection_semaphore: self.connection_semaphore.clone(),
            started_at: self.started_at,
        };

        Router::new()
            .route(PRODUCTS_WS_PATH, get(ws_handler))
            .route(HEALTH_PATH, get(health_handler))
            .with_state(state)
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    ///
    /// Every session is asked to close as soon as the signal fires, so
    /// connections drain instead of holding the server open.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "Feed server listening");

        let channel = self.channel.clone();
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            channel.shutdown();
        };

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("Feed server stopped");
        Ok(())
    }
}

/// GET /ws/products/
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.registry.is_closed() {
        tracing::debug!("Connection rejected: feed shut down");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    // Check connection limit
    let permit = match &state.connection_semaphore {
        Some(sem) => match sem.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Connection rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let session_id = state.next_session_id.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(session_id = session_id, "New feed connection");

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        let reason = serve_socket(socket, session_id, state.registry, state.feed, state.group).await;
        tracing::debug!(session_id = session_id, reason = ?reason, "Connection closed");
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        connections: state.registry.session_count(),
        groups: state.registry.group_count(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::session::SessionHandle;

    fn make_server() -> FeedServer {
        FeedServer::new(ServerConfig::default())
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = make_server();

        let parsed = get_json(server.router(), HEALTH_PATH).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["groups"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn test_health_counts_sessions() {
        let server = make_server();
        let handle = SessionHandle::new(1, &FeedConfig::default());
        server.registry().join(&GroupName::products(), handle);

        let parsed = get_json(server.router(), HEALTH_PATH).await;
        assert_eq!(parsed["connections"], 1);
        assert_eq!(parsed["groups"], 1);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let server = make_server();
        let req = Request::builder()
            .uri(PRODUCTS_WS_PATH)
            .body(Body::empty())
            .unwrap();

        let resp = server.router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
        assert_ne!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();

        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_notifier_targets_products() {
        let server = make_server();
        assert_eq!(server.notifier().group().as_str(), "products_updates");
        assert_eq!(server.bind_addr().port(), 8000);
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let server = make_server();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = server.serve(listener, async {}).await;
        assert!(result.is_ok());
        assert!(server.channel().is_closed());
    }
}
