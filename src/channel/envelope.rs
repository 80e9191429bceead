//! Change envelopes
//!
//! The unit published to a group. The payload is serialized once and shared
//! by every subscriber.

use bytes::Bytes;
use serde::Serialize;

use crate::registry::GroupName;

/// Kind of persistence event that produced an envelope
///
/// Not part of the wire payload; subscribers see only the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

impl ChangeKind {
    pub fn from_created(was_created: bool) -> Self {
        if was_created {
            Self::Created
        } else {
            Self::Updated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized change addressed to a group
///
/// Cheap to clone: `Bytes` is reference counted, so fan-out never copies the
/// payload.
#[derive(Debug, Clone)]
pub struct ChangeEnvelope {
    /// Target group
    pub group: GroupName,
    /// Create or update
    pub kind: ChangeKind,
    /// JSON text of the entity
    pub payload: Bytes,
}

impl ChangeEnvelope {
    /// Create an envelope from an already-serialized payload
    pub fn new(group: GroupName, kind: ChangeKind, payload: impl Into<Bytes>) -> Self {
        Self {
            group,
            kind,
            payload: payload.into(),
        }
    }

    /// Serialize `entity` into its canonical JSON shape
    pub fn from_entity<E: Serialize + ?Sized>(
        group: GroupName,
        kind: ChangeKind,
        entity: &E,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(entity)?;
        Ok(Self::new(group, kind, payload))
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
