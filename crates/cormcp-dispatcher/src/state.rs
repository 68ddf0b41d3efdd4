//! Dispatcher lifecycle state machine (§4.J).

/// `Unconnected -> Connecting -> Ready -> Closing -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No transport has been attached yet.
    Unconnected,
    /// A transport was started; the handshake (if any) has not finished.
    Connecting,
    /// Handshake complete (client) or transport started (server); the
    /// dispatcher is fully operational.
    Ready,
    /// `close()` was called or the peer closed; pending requests are being
    /// resolved with `ConnectionClosed`.
    Closing,
    /// Fully torn down. Every `pending` entry has been resolved.
    Closed,
}
