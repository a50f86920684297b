use tokio::sync::watch;

use crate::utils::error::TransportError;

/// Lifecycle of a client connection, mirroring the WebSocket `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    pub fn is_open(self) -> bool {
        self == ReadyState::Open
    }

    /// `Closing` and `Closed` never lead back to `Open`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReadyState::Closing | ReadyState::Closed)
    }
}

/// The connection handle a connector drives.
///
/// The handle may be created before the underlying transport has finished
/// its own handshake; `watch_ready` reports when it does.
pub trait Transport: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    fn watch_ready(&self) -> watch::Receiver<ReadyState>;

    /// Queue one text frame. Must fail fast when the connection is not open.
    fn send_text(&self, text: String) -> Result<(), TransportError>;
}
