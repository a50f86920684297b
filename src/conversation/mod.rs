//! The `conversation` module is the consumer of a connector.
//!
//! A [`Conversation`] is bound to one channel named after its id. It keeps
//! an in-memory log of everything sent and received, turns a failed publish
//! into a visible note on the message text, and can answer inbound messages
//! through a [`Responder`].

pub mod chat;
pub mod responder;

pub use chat::{Conversation, SEND_FAILURE_SUFFIX};
pub use responder::{BotReply, EchoResponder, Responder};
