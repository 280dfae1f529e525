//! Usage: Error taxonomy for the real-time provider (tracking + persistence + lifecycle).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a positioning source for a single read or a watch delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorKind {
    PermissionDenied,
    Timeout,
    Unavailable,
}

impl fmt::Display for PositionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PositionErrorKind::PermissionDenied => "permission denied",
            PositionErrorKind::Timeout => "timed out acquiring position",
            PositionErrorKind::Unavailable => "position unavailable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RealTimeError {
    /// The host has no positioning capability.
    #[error("LOCATION_UNSUPPORTED: no positioning capability on this host")]
    CapabilityUnavailable,

    #[error("LOCATION_ERROR: {0}")]
    Position(PositionErrorKind),

    /// A persisted value could not be decoded.
    #[error("STORAGE_CORRUPT: {0}")]
    PersistenceCorrupt(String),

    #[error("PROVIDER_CLOSED: real-time provider is no longer running")]
    Closed,
}

impl From<PositionErrorKind> for RealTimeError {
    fn from(kind: PositionErrorKind) -> Self {
        RealTimeError::Position(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_error_codes() {
        assert!(RealTimeError::CapabilityUnavailable
            .to_string()
            .starts_with("LOCATION_UNSUPPORTED:"));
        assert_eq!(
            RealTimeError::from(PositionErrorKind::Timeout).to_string(),
            "LOCATION_ERROR: timed out acquiring position"
        );
        assert!(RealTimeError::Closed.to_string().starts_with("PROVIDER_CLOSED:"));
    }

    #[test]
    fn position_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&PositionErrorKind::PermissionDenied).expect("json");
        assert_eq!(json, "\"permission_denied\"");
    }
}
