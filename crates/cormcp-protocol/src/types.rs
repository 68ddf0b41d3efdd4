//! Handshake and protocol-version types shared by both roles (§3, §4.A).

use serde::{Deserialize, Serialize};

/// The latest protocol version this stack speaks.
pub const LATEST_PROTOCOL_VERSION: &str = "2024-11-05";
/// The one legacy protocol version this stack still accepts.
pub const LEGACY_PROTOCOL_VERSION: &str = "2024-10-07";

/// All protocol versions a client will accept from a server, and vice versa.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &[LATEST_PROTOCOL_VERSION, LEGACY_PROTOCOL_VERSION];

/// True if `version` is one this stack understands.
pub fn is_supported_protocol_version(version: &str) -> bool {
    SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
}

/// Name and version of a peer, exchanged during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_and_legacy_versions_are_both_supported() {
        assert!(is_supported_protocol_version("2024-11-05"));
        assert!(is_supported_protocol_version("2024-10-07"));
        assert!(!is_supported_protocol_version("1999-01-01"));
    }
}
