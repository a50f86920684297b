//! WebSocket client transport
//!
//! `WsTransport::connect` hands back a handle immediately, still in
//! `Connecting`; the actual WebSocket handshake runs in a background task.
//! That task owns the socket, flips the ready state, forwards queued
//! outbound text and parses inbound `message` frames.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::{Frame, MessageFrame};
use crate::connector::transport::{ReadyState, Transport};
use crate::utils::error::TransportError;

#[derive(Debug, Clone)]
pub struct WsTransport {
    ready: watch::Receiver<ReadyState>,
    outgoing: mpsc::UnboundedSender<WsMessage>,
}

impl WsTransport {
    /// Start connecting to `url`. Must be called inside a tokio runtime.
    pub fn connect(url: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<MessageFrame>) {
        let url = url.into();
        let (ready_tx, ready_rx) = watch::channel(ReadyState::Connecting);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<WsMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<MessageFrame>();

        tokio::spawn(run(url, ready_tx, out_rx, in_tx));

        (
            Self {
                ready: ready_rx,
                outgoing: out_tx,
            },
            in_rx,
        )
    }
}

impl Transport for WsTransport {
    fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    fn watch_ready(&self) -> watch::Receiver<ReadyState> {
        self.ready.clone()
    }

    fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.ready_state().is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outgoing
            .send(WsMessage::text(text))
            .map_err(|_| TransportError::Closed)
    }
}

async fn run(
    url: String,
    ready: watch::Sender<ReadyState>,
    mut outgoing: mpsc::UnboundedReceiver<WsMessage>,
    inbound: mpsc::UnboundedSender<MessageFrame>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!("Failed to connect to {url}: {e}");
            ready.send_replace(ReadyState::Closed);
            return;
        }
    };
    let (mut sink, mut stream) = ws_stream.split();
    ready.send_replace(ReadyState::Open);
    debug!("Connected to {url}");

    loop {
        tokio::select! {
            queued = outgoing.recv() => match queued {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        warn!("Failed to send to {url}: {e}");
                        break;
                    }
                }
                // Every handle was dropped.
                None => {
                    ready.send_replace(ReadyState::Closing);
                    let _ = sink.close().await;
                    break;
                }
            },
            received = stream.next() => match received {
                Some(Ok(WsMessage::Text(text))) => match Frame::parse(text.as_str()) {
                    Ok(Frame::Message(frame)) => {
                        let _ = inbound.send(frame);
                    }
                    Ok(other) => debug!("Ignoring {} frame from broker", frame_kind(&other)),
                    Err(e) => debug!("Dropping frame from {url}: {e}"),
                },
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Connection to {url} failed: {e}");
                    break;
                }
            },
        }
    }

    ready.send_replace(ReadyState::Closed);
    debug!("Disconnected from {url}");
}

fn frame_kind(frame: &Frame) -> &'static str {
    match frame {
        Frame::Subscribe(_) => "subscribe",
        Frame::Message(_) => "message",
    }
}
