//! ChannelManager: starts every channel and routes replies back.

use futures::stream::SelectAll;

use super::channel::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Owns the configured channels.
#[derive(Default)]
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::debug!(channel = channel.name(), "Channel registered");
        self.channels.push(channel);
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Start all channels and merge their streams. A channel that fails to
    /// start is logged and skipped; it is an error only if none start.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut merged: SelectAll<MessageStream> = SelectAll::new();
        for channel in &self.channels {
            match channel.start().await {
                Ok(stream) => {
                    tracing::info!(channel = channel.name(), "Channel started");
                    merged.push(stream);
                }
                Err(e) => {
                    tracing::error!(channel = channel.name(), error = %e, "Channel failed to start");
                }
            }
        }

        if merged.is_empty() {
            return Err(ChannelError::StartupFailed {
                name: "all".into(),
                reason: "no channel could be started".into(),
            });
        }
        Ok(Box::pin(merged))
    }

    /// Reply on the channel the message came from.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .iter()
            .find(|c| c.name() == msg.channel)
            .ok_or_else(|| ChannelError::SendFailed {
                name: msg.channel.clone(),
                reason: "unknown channel".into(),
            })?;
        channel.respond(msg, response).await
    }

    pub async fn shutdown_all(&self) {
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), error = %e, "Channel shutdown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::StreamExt;

    use super::*;

    struct FixedChannel {
        name: &'static str,
        messages: Vec<&'static str>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Channel for FixedChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let name = self.name;
            let msgs: Vec<IncomingMessage> = self
                .messages
                .iter()
                .map(|m| IncomingMessage::new(name, "u", m))
                .collect();
            Ok(Box::pin(futures::stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(response.content);
            Ok(())
        }
    }

    struct BrokenChannel;

    #[async_trait]
    impl Channel for BrokenChannel {
        fn name(&self) -> &str {
            "broken"
        }
        async fn start(&self) -> Result<MessageStream, ChannelError> {
            Err(ChannelError::StartupFailed {
                name: "broken".into(),
                reason: "no token".into(),
            })
        }
        async fn respond(
            &self,
            _msg: &IncomingMessage,
            _response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn fixed(name: &'static str, messages: Vec<&'static str>) -> Box<FixedChannel> {
        Box::new(FixedChannel {
            name,
            messages,
            sent: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn merges_streams_and_skips_broken_channels() {
        let mut manager = ChannelManager::new();
        manager.add(fixed("a", vec!["1", "2"]));
        manager.add(Box::new(BrokenChannel));
        manager.add(fixed("b", vec!["3"]));
        assert_eq!(manager.names(), vec!["a", "broken", "b"]);

        let stream = manager.start_all().await.unwrap();
        let mut contents: Vec<String> = stream.map(|m| m.content).collect().await;
        contents.sort();
        assert_eq!(contents, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn start_all_fails_when_nothing_starts() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(BrokenChannel));
        assert!(manager.start_all().await.is_err());
    }

    #[tokio::test]
    async fn respond_unknown_channel_errors() {
        let manager = ChannelManager::new();
        let msg = IncomingMessage::new("ghost", "u", "hi");
        let err = manager
            .respond(&msg, OutgoingResponse::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::SendFailed { .. }));
    }
}
