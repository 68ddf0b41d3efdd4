//! # cormcp-stdio
//!
//! Newline-delimited JSON transport over a byte stream (§4.D): this
//! process's own stdin/stdout, or a spawned child process's pipes.

#![warn(rust_2018_idioms)]

mod process;
mod transport;

pub use process::{sanitized_environment, ChildProcessTransport, StdioProcessConfig};
pub use transport::StdioTransport;

use tokio::io::{stdin, stdout, Stdin, Stdout};

/// Convenience alias for a transport wrapping this process's own stdio handles.
pub type ProcessStdioTransport = StdioTransport<Stdin, Stdout>;

/// Build a transport over this process's own stdin/stdout.
pub fn process_stdio() -> ProcessStdioTransport {
    StdioTransport::new(stdin(), stdout())
}
