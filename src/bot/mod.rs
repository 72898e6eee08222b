//! Bot runtime: reads the merged channel stream and hands each message to
//! its sender's lane.

pub mod commands;
pub mod handler;
pub mod lanes;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

pub use commands::{Command, StatusArgs};
pub use handler::MessageHandler;
pub use lanes::Lanes;

use crate::channels::ChannelManager;
use crate::error::Result;

pub struct Bot {
    channels: Arc<ChannelManager>,
    lanes: Lanes,
}

impl Bot {
    pub fn new(handler: MessageHandler, channels: ChannelManager, lane_idle_timeout: Duration) -> Self {
        let channels = Arc::new(channels);
        let lanes = Lanes::new(Arc::new(handler), Arc::clone(&channels), lane_idle_timeout);
        Self { channels, lanes }
    }

    /// Run until Ctrl+C or until every channel stream ends.
    pub async fn run(self) -> Result<()> {
        let mut message_stream = self.channels.start_all().await?;

        tracing::info!(channels = ?self.channels.names(), "Intake bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            tracing::debug!(
                user_id = %message.user_id(),
                channel = %message.channel,
                "Message received"
            );
            self.lanes.dispatch(message);
        }

        self.lanes.drain().await;
        self.channels.shutdown_all().await;
        Ok(())
    }
}
