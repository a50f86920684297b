//! Diagnostics hook
//!
//! The broker never reports failures to its caller and the connector only
//! returns booleans. `Diagnostics` is where those swallowed failures go, so
//! they can be logged (the default) or captured by tests and metrics code
//! without changing either contract.

use tracing::{debug, warn};

use crate::connection::ConnectionId;
use crate::utils::error::{FrameError, HandshakeError, TransportError};

#[derive(Debug)]
pub enum Diagnostic<'a> {
    /// An inbound frame was dropped before dispatch.
    FrameDropped {
        connection: &'a ConnectionId,
        error: &'a FrameError,
    },
    /// A subscribe arrived for a (connection, channel) pair that already exists.
    DuplicateSubscription {
        connection: &'a ConnectionId,
        channel: &'a str,
    },
    /// Writing a fanned-out frame to a peer failed.
    DeliveryFailed {
        connection: &'a ConnectionId,
        channel: &'a str,
    },
    /// A connector gave up waiting for its connection to open.
    HandshakeFailed {
        channel: &'a str,
        error: &'a HandshakeError,
    },
    /// A connector refused to publish.
    PublishRejected {
        channel: &'a str,
        error: &'a TransportError,
    },
}

pub trait Diagnostics: Send + Sync {
    fn record(&self, event: &Diagnostic<'_>);
}

/// Default sink: everything goes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: &Diagnostic<'_>) {
        match event {
            Diagnostic::FrameDropped { connection, error } => {
                debug!("Dropped frame from {connection}: {error}");
            }
            Diagnostic::DuplicateSubscription {
                connection,
                channel,
            } => {
                debug!("{connection} is already subscribed to {channel}");
            }
            Diagnostic::DeliveryFailed {
                connection,
                channel,
            } => {
                warn!("Failed to deliver frame on {channel} to {connection}");
            }
            Diagnostic::HandshakeFailed { channel, error } => {
                warn!("Subscribe handshake for {channel} failed: {error}");
            }
            Diagnostic::PublishRejected { channel, error } => {
                warn!("Publish on {channel} rejected: {error}");
            }
        }
    }
}
