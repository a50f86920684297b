//! Broker engine
//!
//! In-memory broker responsible for:
//! - assigning identities to new connections
//! - dispatching inbound `subscribe` / `message` frames
//! - fanning a published message out to every other subscriber of its channel
//! - purging a connection's subscriptions when it closes
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to be held behind a single lock
//!   (`Arc<Mutex<Broker>>`) by the transport layer. Every index mutation and
//!   every publish read happens under that lock, which gives the same
//!   one-frame-at-a-time ordering as a single-threaded event loop.
//! - Nothing here returns an error to the caller. Unparseable frames, unknown
//!   channels and dead peers are reported to the `Diagnostics` hook and
//!   otherwise ignored.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::{Envelope, Frame, FrameKind, MessageFrame};
use crate::broker::subscription::SubscriptionIndex;
use crate::config::BrokerSettings;
use crate::connection::{ConnectionId, ConnectionRegistry};
use crate::utils::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};

pub struct Broker {
    pub(crate) connections: ConnectionRegistry,
    pub(crate) subscriptions: SubscriptionIndex,
    dedupe_subscriptions: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        Self::with_settings(&BrokerSettings::default())
    }

    pub fn with_settings(settings: &BrokerSettings) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            subscriptions: SubscriptionIndex::new(),
            dedupe_subscriptions: settings.dedupe_subscriptions,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replace the default `tracing` diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Register a freshly accepted connection. It has no subscriptions yet.
    pub fn on_connect(&mut self, sender: UnboundedSender<WsMessage>) -> ConnectionId {
        let id = self.connections.register(sender);
        debug!("{id} connected");
        id
    }

    /// Handle one raw text frame from `connection`.
    ///
    /// Only `type` and `channel` are read. A `message` frame is forwarded as
    /// the exact text that arrived.
    pub fn on_message(&mut self, connection: &ConnectionId, raw: &str) {
        match Envelope::parse(raw) {
            Ok(Envelope {
                kind: FrameKind::Subscribe,
                channel,
            }) => self.subscribe(&channel, connection),
            Ok(Envelope {
                kind: FrameKind::Message,
                channel,
            }) => {
                self.fan_out(&channel, raw, connection);
            }
            Err(error) => self.diagnostics.record(&Diagnostic::FrameDropped {
                connection,
                error: &error,
            }),
        }
    }

    /// Subscribe `connection` to `channel`, creating the channel if needed.
    /// No acknowledgement is sent back.
    pub fn subscribe(&mut self, channel: &str, connection: &ConnectionId) {
        if self.dedupe_subscriptions && self.subscriptions.contains(connection, channel) {
            self.diagnostics.record(&Diagnostic::DuplicateSubscription {
                connection,
                channel,
            });
            return;
        }

        self.subscriptions.insert(connection, channel);
        info!("{connection} subscribed to {channel}");
    }

    /// Serialize `message` and deliver it to every subscriber of its channel
    /// except `sender`.
    pub fn publish(&self, message: &MessageFrame, sender: &ConnectionId) -> usize {
        match Frame::Message(message.clone()).to_json() {
            Ok(text) => self.fan_out(&message.channel, &text, sender),
            Err(e) => {
                error!("Failed to serialize message: {e}");
                0
            }
        }
    }

    /// Write `text` to every subscriber of `channel` except `sender`.
    ///
    /// Returns the number of frames written. A channel without subscribers
    /// yields zero; that is not an error.
    pub fn fan_out(&self, channel: &str, text: &str, sender: &ConnectionId) -> usize {
        let subscribers = self.subscriptions.subscribers(channel);
        if subscribers.is_empty() {
            debug!("No subscribers on channel '{channel}'");
            return 0;
        }

        let ws_msg = WsMessage::text(text.to_owned());

        let mut delivered = 0;
        for subscription in subscribers {
            if subscription.connection == *sender {
                continue;
            }

            let sent = self
                .connections
                .get(&subscription.connection)
                .is_some_and(|peer| peer.sender.send(ws_msg.clone()).is_ok());

            if sent {
                delivered += 1;
            } else {
                self.diagnostics.record(&Diagnostic::DeliveryFailed {
                    connection: &subscription.connection,
                    channel,
                });
            }
        }

        debug!("{sender} published to {channel} ({delivered} recipients)");
        delivered
    }

    /// Forget `connection` and every subscription it owns. Safe to call for
    /// connections that never subscribed or were already removed.
    pub fn on_disconnect(&mut self, connection: &ConnectionId) {
        self.connections.remove(connection);

        for subscription in self.subscriptions.remove_connection(connection) {
            debug!("Unsubscribed {connection} from channel {}", subscription.channel);
        }

        info!("Cleaned up connection {connection}");
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn subscriptions(&self) -> &SubscriptionIndex {
        &self.subscriptions
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("connections", &self.connections)
            .field("subscriptions", &self.subscriptions)
            .field("dedupe_subscriptions", &self.dedupe_subscriptions)
            .finish_non_exhaustive()
    }
}
