//! WebSocket broker server
//!
//! Responsibilities:
//! - Accept TCP connections and upgrade them to WebSockets
//! - Register each connection with the `Broker` and remove it on close
//! - Drain each connection's outbound queue into its socket
//! - Hand every inbound text frame to `Broker::on_message`
//!
//! The broker lock is only held for the synchronous broker call, never
//! across socket I/O. A connection slot is taken from a semaphore before the
//! upgrade and released when the connection task ends.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{self, SharedBroker};
use crate::config::Settings;

/// Bind `addr` and serve until the listener fails.
pub async fn start_websocket_server(
    addr: String,
    broker: SharedBroker,
    settings: Settings,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("WebSocket broker listening on ws://{addr}");
    serve(listener, broker, settings).await;
    Ok(())
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, broker: SharedBroker, settings: Settings) {
    let max_connections = settings.broker.max_connections;
    let slots = Arc::new(Semaphore::new(max_connections.min(Semaphore::MAX_PERMITS)));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {e}");
                return;
            }
        };

        let Ok(permit) = slots.clone().try_acquire_owned() else {
            warn!("Rejecting {peer}: connection limit of {max_connections} reached");
            drop(stream);
            continue;
        };

        let broker = broker.clone();
        tokio::spawn(async move {
            let _permit = permit;
            handle_connection(stream, broker).await;
        });
    }
}

/// Run one connection from upgrade to cleanup.
pub(crate) async fn handle_connection<S>(stream: S, broker: SharedBroker)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection_id = broker::lock(&broker).on_connect(tx);

    // Ends when the broker drops the connection's sender or the socket fails.
    let mut writer = {
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!("Failed to send message to {connection_id}: {e}");
                    break;
                }
            }
            let _ = ws_sender.close().await;
            debug!("Send loop closed for {connection_id}");
        })
    };

    let mut writer_done = false;
    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    broker::lock(&broker).on_message(&connection_id, text.as_str());
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read error on {connection_id}: {e}");
                    break;
                }
            },
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    broker::lock(&broker).on_disconnect(&connection_id);
    if !writer_done {
        let _ = writer.await;
    }
    info!("{connection_id} disconnected");
}
