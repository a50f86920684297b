//! The `connection` module tracks live broker connections.
//!
//! A [`Connection`] pairs a broker-assigned identity with the sending half
//! of the per-connection outbound queue. The socket itself stays owned by the
//! transport task; the broker only ever pushes frames into the queue.

pub mod registry;

pub use registry::{Connection, ConnectionId, ConnectionRegistry};

#[cfg(test)]
mod tests;
