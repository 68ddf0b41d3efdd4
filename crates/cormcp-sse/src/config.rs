//! Configuration for the server-side SSE+POST transport (§3.2).

use std::time::Duration;

/// Paths and timings for the SSE server integration.
#[derive(Debug, Clone)]
pub struct SseServerConfig {
    /// Path the client GETs to open the SSE stream, e.g. `/sse`.
    pub sse_path: String,
    /// Path prefix the client POSTs outbound messages to, e.g. `/message`.
    /// The published endpoint is `{post_path_prefix}?sessionId=<id>`.
    pub post_path_prefix: String,
    /// Interval at which an SSE comment keep-alive is sent to defeat
    /// intermediary idle timeouts. `None` disables keep-alives.
    pub keep_alive_interval: Option<Duration>,
}

impl Default for SseServerConfig {
    fn default() -> Self {
        Self {
            sse_path: "/sse".to_string(),
            post_path_prefix: "/message".to_string(),
            keep_alive_interval: Some(Duration::from_secs(15)),
        }
    }
}
