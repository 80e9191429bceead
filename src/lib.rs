//! # storefeed
//!
//! Live product-change feed for the tea store backend.
//!
//! Whenever a product card is persisted, the change is serialized once and
//! fanned out to every client subscribed to the `products_updates` group.
//!
//! ```text
//!   persistence ──► ChangeNotifier ──► LocalChannel ──► GroupRegistry::members_of
//!   (create/update)   (serialize)       (publish)              │
//!                                                 ┌────────────┼────────────┐
//!                                                 ▼            ▼            ▼
//!                                              Outbox       Outbox       Outbox
//!                                                 │            │            │
//!                                          ConnectionSession  ...          ...
//!                                                 │
//!                                             Transport (WebSocket text frame)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storefeed::catalog::{MemoryCatalog, NewCartItem};
//! use storefeed::{FeedServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> storefeed::Result<()> {
//!     let server = FeedServer::new(ServerConfig::default());
//!     let catalog = MemoryCatalog::with_hook(server.notifier().clone());
//!
//!     catalog.create(NewCartItem::new("Green Tea", 5.0).quantity(3), Some(1))?;
//!
//!     server.run().await
//! }
//! ```

pub mod catalog;
pub mod channel;
pub mod error;
pub mod publisher;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use channel::{BroadcastChannel, ChangeEnvelope, ChangeKind, LocalChannel, PublishReceipt};
pub use error::{Error, Result};
pub use publisher::{ChangeNotifier, PersistHook};
pub use registry::{GroupName, GroupRegistry, PRODUCTS_UPDATES};
pub use server::{FeedServer, ServerConfig};
pub use session::{ConnectionSession, FeedConfig, OverflowPolicy, SessionHandle, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
