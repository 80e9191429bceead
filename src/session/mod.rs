//! Feed session management
//!
//! Each connected client gets a [`ConnectionSession`]: it joins the feed group
//! when opened, suspends on its outbox between deliveries, and forwards every
//! pushed payload to its [`Transport`]. The registry and the broadcast channel
//! only ever see the cheap, cloneable [`SessionHandle`].

pub mod config;
pub mod connection;
pub mod handle;
pub mod state;
pub mod transport;

pub use config::{FeedConfig, OverflowPolicy, MAX_OUTBOX_CAPACITY};
pub use connection::{CloseReason, ConnectionSession};
pub use handle::{DeliveryOutcome, SessionHandle, SessionId};
pub use state::{SessionPhase, SessionState};
pub use transport::{ChannelTransport, Transport, TransportError};
