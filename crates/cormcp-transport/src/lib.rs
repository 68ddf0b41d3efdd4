//! # cormcp-transport
//!
//! The transport contract (§4.C) and the frame buffer (§4.B) shared by
//! every concrete transport in the workspace: `cormcp-stdio`, `cormcp-sse`,
//! `cormcp-ws`, and `cormcp-loopback`.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod frame;
pub mod traits;

pub use error::TransportError;
pub use frame::FrameBuffer;
pub use traits::{InboundEvent, Transport};
