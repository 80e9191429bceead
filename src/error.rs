//! Crate-level error type
//!
//! Subsystem errors stay in their own modules (`TransportError`,
//! `PublishError`, `CatalogError`); this wraps them for callers that drive the
//! whole server.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::session::TransportError;

/// Top-level error for the feed server and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Socket bind/accept failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure surfaced outside a session
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Catalog operation failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_converts() {
        let err: Error = CatalogError::NotFound(7).into();
        assert!(matches!(err, Error::Catalog(CatalogError::NotFound(7))));
        assert_eq!(err.to_string(), "cart item not found: 7");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: Error = io.into();
        assert!(err.to_string().starts_with("i/o error"));
    }
}
