use chrono::Utc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::broker::message::{MessageFrame, Origin};
use crate::connector::{Connector, RetryPolicy, Transport};
use crate::conversation::responder::{BotReply, Responder};

/// Appended to a message's text when it could not be published.
pub const SEND_FAILURE_SUFFIX: &str = "\nOops... could not send message.";

#[derive(Debug)]
pub struct Conversation<T: Transport> {
    id: String,
    messages: Vec<MessageFrame>,
    connector: Connector<T>,
}

impl<T: Transport> Conversation<T> {
    /// Open a conversation: one connector on the channel named `id`, with the
    /// subscribe handshake already run.
    pub async fn open(
        id: impl Into<String>,
        role: Origin,
        transport: T,
        inbound: UnboundedReceiver<MessageFrame>,
        policy: RetryPolicy,
    ) -> Self {
        let id = id.into();
        let connector = Connector::connect(id.clone(), role, transport, inbound, policy).await;
        Self::with_connector(connector)
    }

    pub fn with_connector(connector: Connector<T>) -> Self {
        Self {
            id: connector.channel().to_string(),
            messages: Vec::new(),
            connector,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[MessageFrame] {
        &self.messages
    }

    pub fn connector(&self) -> &Connector<T> {
        &self.connector
    }

    /// Send `text` as this side's role and log it.
    ///
    /// The returned (and logged) message is marked `ready` when it went out.
    /// Otherwise it stays unready and its text carries [`SEND_FAILURE_SUFFIX`].
    pub fn send(&mut self, text: &str) -> MessageFrame {
        let mut message = MessageFrame::text(self.id.clone(), self.connector.role(), text);

        if self.connector.publish(&mut message) {
            message.ready = true;
        } else {
            message.text = Some(format!("{text}{SEND_FAILURE_SUFFIX}"));
        }

        self.messages.push(message.clone());
        message
    }

    /// Wait for the next inbound message and log it.
    pub async fn next_message(&mut self) -> Option<MessageFrame> {
        let message = self.connector.recv().await?;
        debug!("Message on {}: {:?}", self.id, message.text);
        self.messages.push(message.clone());
        Some(message)
    }

    /// Publish each reply as a ready `bot` message and log it. Returns how
    /// many were actually sent; unsent replies are still logged.
    pub fn reply(&mut self, replies: Vec<BotReply>) -> usize {
        let mut sent = 0;
        for reply in replies {
            let mut message = MessageFrame {
                channel: self.id.clone(),
                from: Origin::Bot,
                text: reply.text,
                image: reply.image,
                video: None,
                link: None,
                buttons: reply.buttons,
                created: Utc::now(),
                ready: true,
            };
            if self.connector.publish(&mut message) {
                sent += 1;
            }
            self.messages.push(message);
        }
        sent
    }

    /// Receive one message and answer it through `responder`.
    pub async fn handle_inbound<R: Responder + ?Sized>(
        &mut self,
        responder: &R,
    ) -> Option<MessageFrame> {
        let message = self.next_message().await?;
        let replies = responder.respond(&self.id, &message);
        self.reply(replies);
        Some(message)
    }
}
