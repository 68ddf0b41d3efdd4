//! Byte-stream frame buffer (§4.B): accumulates bytes from a stream
//! transport and emits whole JSON-RPC messages delimited by `\n`.
//!
//! Only the stdio transport uses this; SSE and WebSocket receive whole
//! messages from their own framing and never touch [`FrameBuffer`].

use cormcp_protocol::jsonrpc::{decode, CodecError, Message};

/// Accumulates bytes and yields complete [`Message`]s as newlines arrive.
///
/// Mirrors the shape of `tokio_util::codec::LinesCodec`, but surfaces a
/// decode error for a malformed line instead of discarding or propagating
/// it as a fatal I/O error, matching the "report but do not disconnect"
/// requirement of §4.B(iii).
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    /// A fresh, empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly-received bytes to the buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete message out of the buffer, if one is ready.
    ///
    /// Scans for the first `\n` (tolerating a preceding `\r`), decodes the
    /// bytes before it, and advances the buffer past the delimiter. Partial
    /// lines are retained across calls; empty lines are skipped and yield
    /// no message. Returns `Some(Err(_))` for malformed JSON so the caller
    /// can route it to an error callback without closing the transport.
    pub fn take_next_message(&mut self) -> Option<Result<Message, CodecError>> {
        loop {
            let newline_at = self.buf.iter().position(|&b| b == b'\n')?;
            let mut line_end = newline_at;
            if line_end > 0 && self.buf[line_end - 1] == b'\r' {
                line_end -= 1;
            }
            let line: Vec<u8> = self.buf.drain(..=newline_at).collect();
            let line = &line[..line_end];

            if line.is_empty() {
                continue;
            }
            let text = match std::str::from_utf8(line) {
                Ok(t) => t,
                Err(_) => return Some(Err(CodecError::Unrecognized)),
            };
            return Some(decode(text));
        }
    }

    /// Number of unconsumed bytes currently buffered.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emits_two_messages_in_wire_order() {
        let mut buf = FrameBuffer::new();
        buf.push_bytes(
            b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        );
        let first = buf.take_next_message().unwrap().unwrap();
        assert!(matches!(first, Message::Request(ref r) if r.id == 1 && r.method == "ping"));
        let second = buf.take_next_message().unwrap().unwrap();
        assert!(
            matches!(second, Message::Notification(ref n) if n.method == "notifications/initialized")
        );
        assert!(buf.take_next_message().is_none());
    }

    #[test]
    fn retains_partial_lines() {
        let mut buf = FrameBuffer::new();
        buf.push_bytes(b"{\"jsonrpc\":\"2.0\",\"method\":\"pi");
        assert!(buf.take_next_message().is_none());
        buf.push_bytes(b"ng\",\"id\":1}\n");
        let msg = buf.take_next_message().unwrap().unwrap();
        assert!(matches!(msg, Message::Request(ref r) if r.id == 1));
    }

    #[test]
    fn skips_empty_lines() {
        let mut buf = FrameBuffer::new();
        buf.push_bytes(b"\n\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n");
        let msg = buf.take_next_message().unwrap().unwrap();
        assert!(matches!(msg, Message::Request(ref r) if r.id == 1));
    }

    #[test]
    fn tolerates_crlf() {
        let mut buf = FrameBuffer::new();
        buf.push_bytes(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\r\n");
        let msg = buf.take_next_message().unwrap().unwrap();
        assert!(matches!(msg, Message::Request(ref r) if r.id == 1));
    }

    #[test]
    fn malformed_json_surfaces_as_error_without_wedging_the_buffer() {
        let mut buf = FrameBuffer::new();
        buf.push_bytes(b"not json\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n");
        assert!(buf.take_next_message().unwrap().is_err());
        let msg = buf.take_next_message().unwrap().unwrap();
        assert!(matches!(msg, Message::Request(ref r) if r.id == 1));
    }
}
