//! Group registry for pub/sub routing
//!
//! The registry records which live sessions belong to which broadcast group.
//! It is the only shared mutable state in the feed: publishers read member
//! snapshots from it, sessions join on open and are removed everywhere on
//! close.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<GroupRegistry>
//!                     ┌──────────────────────────┐
//!                     │ groups: HashMap<Group,   │
//!                     │   GroupEntry {           │
//!                     │     members: HashMap<    │
//!                     │       SessionId,         │
//!                     │       SessionHandle>,    │
//!                     │   }                      │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!    [LocalChannel]         [ConnectionSession]      [ConnectionSession]
//!    members_of()           join() on open           remove_everywhere()
//!         │                                           on close
//!         └──► handle.deliver() ──► Outbox ──► session task ──► Transport
//! ```
//!
//! # Invariant
//!
//! A session that has closed is absent from every group. Close marks the
//! session as closing before removing it, and `join` refuses closing
//! sessions under the same lock, so the removal cannot be undone by a
//! late join.

pub mod entry;
pub mod group;
pub mod store;

pub use entry::{GroupEntry, GroupStats};
pub use group::{GroupName, PRODUCTS_UPDATES};
pub use store::GroupRegistry;
