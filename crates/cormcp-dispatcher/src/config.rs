//! Dispatcher configuration (§3.2).

use std::time::Duration;

/// Tunables for a [`crate::Dispatcher`] instance. Constructed explicitly by
/// the embedding application; nothing here is read from the environment.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Deadline applied to an outbound request when the caller does not
    /// override it via `RequestOptions::timeout`.
    pub default_timeout: Duration,
    /// When true, role engines assert remote/local capability support
    /// before sending or registering a handler for a gated method.
    pub enforce_strict_capabilities: bool,
    /// Upper bound on a single frame a stream transport will buffer before
    /// treating the connection as misbehaving.
    pub max_frame_bytes: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            enforce_strict_capabilities: true,
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_minute_timeout_with_strict_capabilities() {
        let config = DispatcherConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(60));
        assert!(config.enforce_strict_capabilities);
        assert_eq!(config.max_frame_bytes, 16 * 1024 * 1024);
    }
}
