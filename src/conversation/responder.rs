use crate::broker::message::{Button, MessageFrame};

/// One bot answer, before it is stamped into a `MessageFrame`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotReply {
    pub text: Option<String>,
    pub image: Option<String>,
    pub buttons: Option<Vec<Button>>,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Produces bot answers for an inbound message.
pub trait Responder {
    fn respond(&self, conversation_id: &str, message: &MessageFrame) -> Vec<BotReply>;
}

/// Answers every text message by repeating it back.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoResponder;

impl Responder for EchoResponder {
    fn respond(&self, _conversation_id: &str, message: &MessageFrame) -> Vec<BotReply> {
        match &message.text {
            Some(text) => vec![BotReply::text(format!("You said: {text}"))],
            None => Vec::new(),
        }
    }
}
