//! Channel-bound client connector
//!
//! `Connector` owns one connection handle and one inbound frame stream. The
//! subscribe handshake is:
//!
//! 1. if the connection is already open, send `subscribe` right away;
//! 2. otherwise wait for it to open (see [`wait_for_open`]) and then send;
//! 3. if it never opens within the retry budget, give up for good.
//!
//! Publishing never queues: a frame offered while the connection is not open
//! is rejected and lost. Callers get a `bool` back in every case.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::broker::message::{Frame, MessageFrame, Origin, SubscribeFrame};
use crate::connector::handshake::{RetryPolicy, wait_for_open};
use crate::connector::transport::Transport;
use crate::utils::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
use crate::utils::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Constructed,
    WaitingForOpen,
    Subscribed,
    Failed,
}

pub struct Connector<T: Transport> {
    channel: String,
    role: Origin,
    transport: T,
    inbound: UnboundedReceiver<MessageFrame>,
    policy: RetryPolicy,
    state: HandshakeState,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<T: Transport> Connector<T> {
    /// Build a connector without starting the handshake.
    pub fn new(
        channel: impl Into<String>,
        role: Origin,
        transport: T,
        inbound: UnboundedReceiver<MessageFrame>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            channel: channel.into(),
            role,
            transport,
            inbound,
            policy,
            state: HandshakeState::Constructed,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Build a connector and run the subscribe handshake. Check
    /// [`Connector::state`] to see whether it succeeded.
    pub async fn connect(
        channel: impl Into<String>,
        role: Origin,
        transport: T,
        inbound: UnboundedReceiver<MessageFrame>,
        policy: RetryPolicy,
    ) -> Self {
        let mut connector = Self::new(channel, role, transport, inbound, policy);
        connector.subscribe().await;
        connector
    }

    /// Send the `subscribe` frame for this connector's channel, waiting for
    /// the connection to open first if necessary.
    ///
    /// Returns `false` if the connection never opened, or if an earlier
    /// handshake on this connector already failed.
    pub async fn subscribe(&mut self) -> bool {
        if self.state == HandshakeState::Failed {
            return false;
        }

        let frame = Frame::Subscribe(SubscribeFrame::new(self.channel.clone(), self.role));

        if !self.transport.ready_state().is_open() {
            self.state = HandshakeState::WaitingForOpen;
            let mut ready = self.transport.watch_ready();
            match wait_for_open(&mut ready, &self.policy).await {
                Ok(attempt) => debug!("{} open after {attempt} attempt(s)", self.channel),
                Err(error) => {
                    self.state = HandshakeState::Failed;
                    self.diagnostics.record(&Diagnostic::HandshakeFailed {
                        channel: &self.channel,
                        error: &error,
                    });
                    return false;
                }
            }
        }

        if self.send(&frame) {
            self.state = HandshakeState::Subscribed;
            info!("Subscribed to {}", self.channel);
            true
        } else {
            self.state = HandshakeState::Failed;
            false
        }
    }

    /// Publish `message` on this connector's channel.
    ///
    /// The channel field is overwritten with the connector's own channel
    /// before sending, whatever the caller put there.
    pub fn publish(&self, message: &mut MessageFrame) -> bool {
        if !self.transport.ready_state().is_open() {
            self.reject(&TransportError::NotOpen);
            return false;
        }

        message.channel.clone_from(&self.channel);
        self.send(&Frame::Message(message.clone()))
    }

    /// Next frame delivered to this connector, or `None` once the connection
    /// is gone.
    pub async fn recv(&mut self) -> Option<MessageFrame> {
        self.inbound.recv().await
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn role(&self) -> Origin {
        self.role
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send(&self, frame: &Frame) -> bool {
        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize frame for {}: {e}", self.channel);
                return false;
            }
        };

        match self.transport.send_text(text) {
            Ok(()) => true,
            Err(error) => {
                self.reject(&error);
                false
            }
        }
    }

    fn reject(&self, error: &TransportError) {
        self.diagnostics.record(&Diagnostic::PublishRejected {
            channel: &self.channel,
            error,
        });
    }
}

impl<T: Transport> fmt::Debug for Connector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("channel", &self.channel)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("ready", &self.transport.ready_state())
            .finish_non_exhaustive()
    }
}
