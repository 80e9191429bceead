//! Feed server
//!
//! HTTP surface for the product feed: a WebSocket upgrade route that turns
//! each client into a feed session, and a health endpoint.

pub mod config;
pub mod listener;
pub mod ws;

pub use config::ServerConfig;
pub use listener::{FeedServer, HealthResponse, HEALTH_PATH, PRODUCTS_WS_PATH};
pub use ws::{drain_inbound, serve_socket, WsTransport};
