//! Consultant chat transcript.

use crate::constants::{CHAT_FALLBACK_REPLY, CHAT_GREETING};
use crate::gateway::ModelGateway;
use crate::prediction::PredictionResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Bot,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }
}

/// Append-only transcript that always opens with the greeting.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    typing: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::bot(CHAT_GREETING)],
            typing: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Send `input` and append the assistant's reply.
    ///
    /// Blank input is ignored and returns `None`. A failed call appends the fixed fallback
    /// reply instead of an error, so every accepted message gets exactly one answer.
    pub async fn send(
        &mut self,
        gateway: &ModelGateway,
        input: &str,
        context: Option<&PredictionResult>,
    ) -> Option<&ChatMessage> {
        let input = input.trim();
        if input.is_empty() || self.typing {
            return None;
        }

        self.messages.push(ChatMessage::user(input));
        self.typing = true;

        let reply = match gateway.chat(input, context).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("chat reply failed: {e}");
                CHAT_FALLBACK_REPLY.to_string()
            }
        };

        self.typing = false;
        self.messages.push(ChatMessage::bot(reply));
        self.messages.last()
    }
}
