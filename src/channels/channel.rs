//! Channel trait and the message types that flow through it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::menu::Reply;

/// Platform-supplied identity of the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    /// Stable platform user id (Telegram numeric id as a string).
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// First name, falling back to the username, then "друг".
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("друг")
    }
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Name of the channel that delivered it.
    pub channel: String,
    pub sender: UserIdentity,
    pub content: String,
    /// Channel-specific routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            sender: UserIdentity::new(user_id),
            content: content.to_string(),
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_sender(mut self, sender: UserIdentity) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.sender.id
    }
}

/// A reply to send back on the originating channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Reply keyboard rows; `None` leaves the current keyboard in place.
    pub keyboard: Option<Vec<Vec<String>>>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            keyboard: None,
        }
    }
}

impl From<Reply> for OutgoingResponse {
    fn from(reply: Reply) -> Self {
        Self {
            keyboard: reply.menu.keyboard(),
            content: reply.text,
        }
    }
}

/// Stream of inbound messages from a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A messaging transport the bot can listen on and reply through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening; inbound messages arrive on the returned stream.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::Menu;

    #[test]
    fn display_name_fallbacks() {
        let mut identity = UserIdentity::new("1");
        assert_eq!(identity.display_name(), "друг");
        identity.username = Some("ivan".into());
        assert_eq!(identity.display_name(), "ivan");
        identity.first_name = Some("Иван".into());
        assert_eq!(identity.display_name(), "Иван");
    }

    #[test]
    fn reply_converts_with_keyboard() {
        let response: OutgoingResponse = Reply::new("hi", Menu::Cancel).into();
        assert_eq!(response.content, "hi");
        assert_eq!(response.keyboard, Some(vec![vec!["Отмена".to_string()]]));

        let response: OutgoingResponse = Reply::text("plain").into();
        assert!(response.keyboard.is_none());
    }

    #[test]
    fn incoming_message_builders() {
        let msg = IncomingMessage::new("cli", "local-user", "hello")
            .with_metadata(serde_json::json!({"chat_id": "5"}));
        assert_eq!(msg.user_id(), "local-user");
        assert_eq!(msg.metadata["chat_id"], "5");
    }
}
