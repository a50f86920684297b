use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpListener;
use tokio_tungstenite::{client_async, connect_async};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::{MessageFrame, Origin};
use crate::broker::{self, Broker, SharedBroker};
use crate::config::Settings;
use crate::connector::{Connector, HandshakeState, ReadyState, RetryPolicy, Transport};
use crate::transport::websocket::handle_connection;
use crate::transport::{WsTransport, serve};

async fn start_broker(settings: Settings) -> (String, SharedBroker) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let broker = Arc::new(Mutex::new(Broker::with_settings(&settings.broker)));

    tokio::spawn(serve(listener, broker.clone(), settings));

    (format!("ws://{addr}"), broker)
}

/// Stream whose writes start failing once `broken` is set. Reads pass through.
struct BreakableStream {
    inner: DuplexStream,
    broken: Arc<AtomicBool>,
}

impl AsyncRead for BreakableStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for BreakableStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.broken.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

async fn join(url: &str, channel: &str) -> Connector<WsTransport> {
    let (transport, inbound) = WsTransport::connect(url);
    Connector::connect(
        channel,
        Origin::Client,
        transport,
        inbound,
        RetryPolicy::default(),
    )
    .await
}

/// Poll the broker until `condition` holds, failing the test after a second.
async fn wait_until(broker: &SharedBroker, condition: impl Fn(&Broker) -> bool) {
    for _ in 0..100 {
        let reached = {
            let guard = broker::lock(broker);
            condition(&*guard)
        };
        if reached {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("broker never reached the expected state");
}

async fn nothing_received(connector: &mut Connector<WsTransport>) -> bool {
    tokio::time::timeout(Duration::from_millis(150), connector.recv())
        .await
        .is_err()
}

#[tokio::test]
async fn test_end_to_end_fan_out() {
    let (url, broker) = start_broker(Settings::default()).await;

    let mut x = join(&url, "room-1").await;
    let mut y = join(&url, "room-1").await;
    assert_eq!(x.state(), HandshakeState::Subscribed);
    assert_eq!(y.state(), HandshakeState::Subscribed);
    wait_until(&broker, |b| b.subscriptions().subscribers("room-1").len() == 2).await;

    let mut message = MessageFrame::text("room-1", Origin::Client, "hi");
    assert!(x.publish(&mut message));

    let received = tokio::time::timeout(Duration::from_secs(1), y.recv())
        .await
        .expect("y should receive the message")
        .expect("connection open");
    assert_eq!(received.text.as_deref(), Some("hi"));
    assert_eq!(received.channel, "room-1");

    assert!(nothing_received(&mut y).await);
    assert!(nothing_received(&mut x).await);
}

#[tokio::test]
async fn test_publish_is_scoped_to_connector_channel() {
    let (url, broker) = start_broker(Settings::default()).await;

    let x = join(&url, "conv-1").await;
    let mut y = join(&url, "conv-1").await;
    let mut z = join(&url, "conv-2").await;
    wait_until(&broker, |b| {
        b.subscriptions().subscribers("conv-1").len() == 2
            && b.subscriptions().subscribers("conv-2").len() == 1
    })
    .await;

    let mut message = MessageFrame::text("conv-2", Origin::Client, "leak?");
    assert!(x.publish(&mut message));

    let received = tokio::time::timeout(Duration::from_secs(1), y.recv())
        .await
        .expect("y should receive the message")
        .expect("connection open");
    assert_eq!(received.channel, "conv-1");
    assert!(nothing_received(&mut z).await);
}

#[tokio::test]
async fn test_disconnect_removes_subscriptions() {
    let (url, broker) = start_broker(Settings::default()).await;

    let x = join(&url, "room-1").await;
    let y = join(&url, "room-1").await;
    wait_until(&broker, |b| b.connection_count() == 2).await;

    drop(y);
    wait_until(&broker, |b| b.connection_count() == 1).await;

    {
        let lock = broker::lock(&broker);
        assert_eq!(lock.subscriptions().subscribers("room-1").len(), 1);
    }

    let mut message = MessageFrame::text("room-1", Origin::Client, "anyone?");
    assert!(x.publish(&mut message));
}

#[tokio::test]
async fn test_malformed_frames_do_not_close_connection() {
    let (url, broker) = start_broker(Settings::default()).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");

    ws.send(WsMessage::text("definitely not json"))
        .await
        .unwrap();
    ws.send(WsMessage::text(json!({"type": "ping"}).to_string()))
        .await
        .unwrap();
    ws.send(WsMessage::text(
        json!({"type": "subscribe", "channel": "room-1", "from": "client", "ready": false})
            .to_string(),
    ))
    .await
    .unwrap();

    wait_until(&broker, |b| b.subscriptions().subscribers("room-1").len() == 1).await;

    let y = join(&url, "room-1").await;
    wait_until(&broker, |b| b.subscriptions().subscribers("room-1").len() == 2).await;
    let mut message = MessageFrame::text("room-1", Origin::Server, "still here");
    assert!(y.publish(&mut message));

    let frame = tokio::time::timeout(Duration::from_secs(1), ws.next())
        .await
        .expect("frame in time")
        .expect("stream open")
        .expect("valid frame");
    let value: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(value["type"], "message");
    assert_eq!(value["text"], "still here");
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_clients() {
    let mut settings = Settings::default();
    settings.broker.max_connections = 1;
    let (url, broker) = start_broker(settings).await;

    let first = join(&url, "room-1").await;
    assert_eq!(first.state(), HandshakeState::Subscribed);
    wait_until(&broker, |b| b.connection_count() == 1).await;

    let second = join(&url, "room-1").await;
    assert_eq!(second.state(), HandshakeState::Failed);
    assert_eq!(second.transport().ready_state(), ReadyState::Closed);
    assert_eq!(broker::lock(&broker).connection_count(), 1);
}

#[tokio::test]
async fn test_unreachable_broker_fails_handshake() {
    // Grab a free port and release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = join(&format!("ws://{addr}"), "room-1").await;
    assert_eq!(connector.state(), HandshakeState::Failed);
}

#[tokio::test]
async fn test_connection_limit_holds_under_concurrent_connects() {
    let mut settings = Settings::default();
    settings.broker.max_connections = 1;
    let (url, broker) = start_broker(settings).await;

    let attempts: Vec<_> = (0..5)
        .map(|_| {
            let url = url.clone();
            tokio::spawn(async move { connect_async(url.as_str()).await })
        })
        .collect();

    let mut open = Vec::new();
    for attempt in attempts {
        if let Ok((ws, _)) = attempt.await.unwrap() {
            open.push(ws);
        }
    }

    assert_eq!(open.len(), 1);
    wait_until(&broker, |b| b.connection_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(broker::lock(&broker).connection_count(), 1);
}

#[tokio::test]
async fn test_failed_socket_write_disconnects_immediately() {
    let broker: SharedBroker = Arc::new(Mutex::new(Broker::new()));
    let (server_io, client_io) = tokio::io::duplex(4096);
    let broken = Arc::new(AtomicBool::new(false));
    let stream = BreakableStream {
        inner: server_io,
        broken: broken.clone(),
    };
    tokio::spawn(handle_connection(stream, broker.clone()));

    let (mut ws, _) = client_async("ws://localhost/", client_io)
        .await
        .expect("handshake");
    ws.send(WsMessage::text(
        json!({"type": "subscribe", "channel": "room-1"}).to_string(),
    ))
    .await
    .unwrap();
    wait_until(&broker, |b| b.subscriptions().subscribers("room-1").len() == 1).await;

    broken.store(true, Ordering::SeqCst);
    let message = MessageFrame::text("room-1", Origin::Server, "into the void");
    let delivered = broker::lock(&broker).publish(&message, &"conn-elsewhere".to_string());
    assert_eq!(delivered, 1);

    // The client stays silent, so only the failed write can end the connection.
    wait_until(&broker, |b| b.connection_count() == 0).await;
    assert!(broker::lock(&broker).subscriptions().is_empty());
    drop(ws);
}
