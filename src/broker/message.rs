//! Wire protocol
//!
//! Every frame is a JSON text frame with a `type` discriminator:
//!
//! ```json
//! {"type":"subscribe","channel":"room-1","from":"client","created":"2024-01-01T00:00:00Z","ready":false}
//! {"type":"message","channel":"room-1","from":"bot","text":"hi","created":"2024-01-01T00:00:00Z","ready":true}
//! ```
//!
//! `subscribe` is a control frame consumed by the broker. `message` is a data
//! frame fanned out to the other subscribers of its channel. Frames carry no
//! sequence number; ordering is the delivery order of a single connection.
//!
//! The broker only looks at `type` and `channel` (see [`Envelope`]) and
//! forwards message frames byte for byte. The typed [`Frame`] is what
//! connectors build and read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::FrameError;

/// Which side of the relay produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Client,
    Server,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub title: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeFrame {
    pub channel: String,
    pub from: Origin,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub ready: bool,
}

impl SubscribeFrame {
    pub fn new(channel: impl Into<String>, from: Origin) -> Self {
        Self {
            channel: channel.into(),
            from,
            created: Utc::now(),
            ready: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFrame {
    pub channel: String,
    pub from: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub ready: bool,
}

impl MessageFrame {
    /// A plain text message, not yet marked ready.
    pub fn text(channel: impl Into<String>, from: Origin, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            from,
            text: Some(text.into()),
            image: None,
            video: None,
            link: None,
            buttons: None,
            created: Utc::now(),
            ready: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "subscribe")]
    Subscribe(SubscribeFrame),
    #[serde(rename = "message")]
    Message(MessageFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Subscribe,
    Message,
}

impl FrameKind {
    fn of(value: &Value) -> Result<Self, FrameError> {
        match value.get("type") {
            None | Some(Value::Null) => Err(FrameError::MissingType),
            Some(Value::String(kind)) => match kind.as_str() {
                "subscribe" => Ok(FrameKind::Subscribe),
                "message" => Ok(FrameKind::Message),
                other => Err(FrameError::UnknownType(other.to_string())),
            },
            Some(other) => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}

/// The part of an inbound frame the broker routes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: FrameKind,
    pub channel: String,
}

impl Envelope {
    /// Read `type` and `channel` from a raw frame. Every other field is left
    /// uninterpreted.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(raw)?;
        let kind = FrameKind::of(&value)?;
        match value.get("channel") {
            Some(Value::String(channel)) => Ok(Self {
                kind,
                channel: channel.clone(),
            }),
            _ => Err(FrameError::MissingChannel),
        }
    }
}

impl Frame {
    /// Parse a raw text frame into its typed form.
    pub fn parse(raw: &str) -> Result<Frame, FrameError> {
        let value: Value = serde_json::from_str(raw)?;
        FrameKind::of(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn channel(&self) -> &str {
        match self {
            Frame::Subscribe(frame) => &frame.channel,
            Frame::Message(frame) => &frame.channel,
        }
    }
}
