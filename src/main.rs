//! CLI for chatrelay
//!
//! Subcommands:
//! - `server`: run the broker
//! - `client`: join a channel, send one line and print what comes back
//! - `bot`: answer every message on a channel with an echo

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatrelay::broker::Broker;
use chatrelay::broker::message::Origin;
use chatrelay::config::{Settings, load_config};
use chatrelay::connector::{HandshakeState, RetryPolicy};
use chatrelay::conversation::{Conversation, EchoResponder};
use chatrelay::transport::{WsTransport, start_websocket_server};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "chatrelay")]
enum Command {
    /// Start the broker
    Server,
    /// Join a channel as a client, send one message and print replies
    Client {
        /// Channel (conversation id) to join
        #[arg(long)]
        channel: String,
        /// Text to send once subscribed
        #[arg(long)]
        text: String,
        /// Broker URL; defaults to `connector.url` from the configuration
        #[arg(long)]
        url: Option<String>,
        /// How long to wait for replies, in seconds
        #[arg(long, default_value_t = 5)]
        wait_secs: u64,
    },
    /// Join a channel as the server side and echo every message back
    Bot {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            chatrelay::utils::logging::init("info");
            error!("Failed to load configuration: {e}");
            return;
        }
    };
    chatrelay::utils::logging::init(&settings.logging.level);

    let result = match Command::parse() {
        Command::Server => run_server(settings).await,
        Command::Client {
            channel,
            text,
            url,
            wait_secs,
        } => {
            let url = url.unwrap_or_else(|| settings.connector.url.clone());
            run_client(&settings, &url, channel, &text, Duration::from_secs(wait_secs)).await
        }
        Command::Bot { channel, url } => {
            let url = url.unwrap_or_else(|| settings.connector.url.clone());
            run_bot(&settings, &url, channel).await
        }
    };

    if let Err(e) = result {
        error!("{e}");
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let broker = Arc::new(Mutex::new(Broker::with_settings(&settings.broker)));

    tokio::select! {
        result = start_websocket_server(addr, broker, settings) => {
            result?;
            error!("Broker server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(
    settings: &Settings,
    url: &str,
    channel: String,
    text: &str,
    wait: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let (transport, inbound) = WsTransport::connect(url);
    let policy = RetryPolicy::from(&settings.connector);
    let mut conversation =
        Conversation::open(channel, Origin::Client, transport, inbound, policy).await;

    if conversation.connector().state() != HandshakeState::Subscribed {
        return Err(format!("could not subscribe to {}", conversation.id()).into());
    }

    let sent = conversation.send(text);
    println!("> {}", sent.text.unwrap_or_default());

    let deadline = tokio::time::Instant::now() + wait;
    while let Ok(Some(message)) =
        tokio::time::timeout_at(deadline, conversation.next_message()).await
    {
        println!("< [{:?}] {}", message.from, message.text.unwrap_or_default());
    }

    Ok(())
}

async fn run_bot(
    settings: &Settings,
    url: &str,
    channel: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let (transport, inbound) = WsTransport::connect(url);
    let policy = RetryPolicy::from(&settings.connector);
    let mut conversation =
        Conversation::open(channel, Origin::Server, transport, inbound, policy).await;

    if conversation.connector().state() != HandshakeState::Subscribed {
        return Err(format!("could not subscribe to {}", conversation.id()).into());
    }
    info!("Answering messages on {}", conversation.id());

    loop {
        tokio::select! {
            handled = conversation.handle_inbound(&EchoResponder) => {
                if handled.is_none() {
                    warn!("Connection to broker closed");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting gracefully.");
                break;
            }
        }
    }

    Ok(())
}
