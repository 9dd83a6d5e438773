//! E2ELink Session
//!
//! End-to-end session over an already established relay connection.
//!
//! ## Lifecycle
//!
//! 1. Construct an [`E2eSession`] around the relayed stream
//! 2. Negotiate the role with `connect_as_initiator` (client side) or
//!    `connect_as_acceptor` (device side)
//! 3. Read/write the returned [`LocalConn`], or wire it into a tunnel
//! 4. `close` tears down the local pipe and the relayed stream exactly once

mod bridge;
pub mod handshake;
mod session;
mod signal;

pub use session::{BoxedTransport, E2eSession, LocalConn, Transport};
pub use signal::CloseSignal;
