//! E2ELink Tunnel
//!
//! Byte pump between two duplex streams. A [`Tunnel`] runs one copy loop per
//! direction; each loop reads at most `chunk_size` bytes, writes exactly what
//! it read, and stops on EOF, error or timeout without touching the other
//! direction. Once both loops end the endpoints are handed back to the caller.

mod pump;
mod tunnel;

pub use pump::{pump, PumpLimits, WriteMode};
pub use tunnel::{Direction, DirectionEnd, Tunnel, TunnelHandle, TunnelOutcome};
