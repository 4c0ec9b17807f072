//! Length-prefixed message transport over TCP, plus the chat programs built on it.
//!
//! Every frame on the wire is an 8-byte big-endian length followed by that many
//! payload bytes. The crate is split into the transport and the applications
//! that plug into it:
//!
//! - [`header`] encodes and decodes the length prefix.
//! - [`connection`] drives one socket: a sequential read loop that hands each
//!   payload to the bound [`Application`], and a writer that drains a FIFO of
//!   outbound frames.
//! - [`registry`] owns the live connections, keyed by [`ConnectionId`].
//!   [`ConnectionHandle`]s look their connection up through it.
//! - [`listener`] accepts sockets and [`dialer`] opens one, both binding the
//!   resulting connection to an application.
//! - [`room`], [`bot`] and [`client`] are the applications shipped with the
//!   `chatroom`, `chatbot` and `chat-client` binaries. [`console`] holds the
//!   stdin/stdout glue they share and [`cli`] their argument parsing.

pub mod application;
pub mod bot;
pub mod cli;
pub mod client;
pub mod connection;
pub mod console;
pub mod dialer;
pub mod error;
pub mod eval;
pub mod header;
pub mod listener;
pub mod registry;
pub mod room;

pub use application::Application;
pub use connection::{Connection, ConnectionHandle};
pub use dialer::{Dialer, PendingConnection};
pub use error::{DialError, TransportError};
pub use listener::Listener;
pub use registry::{ConnectionId, Registry};
