//! Per-user ordered lanes.
//!
//! Each user gets an unbounded queue drained by its own task, so one user's
//! messages are handled strictly in arrival order while different users run
//! concurrently. A lane that sits idle with an empty queue removes itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::handler::MessageHandler;
use crate::channels::{ChannelManager, IncomingMessage};

struct Lane {
    /// Distinguishes a lane from its replacement under the same key.
    generation: u64,
    tx: mpsc::UnboundedSender<IncomingMessage>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
struct LaneContext {
    lanes: Arc<DashMap<String, Lane>>,
    handler: Arc<MessageHandler>,
    channels: Arc<ChannelManager>,
    idle_timeout: Duration,
}

/// Dispatcher owning one lane per active user.
pub struct Lanes {
    ctx: LaneContext,
    next_generation: AtomicU64,
}

impl Lanes {
    pub fn new(
        handler: Arc<MessageHandler>,
        channels: Arc<ChannelManager>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            ctx: LaneContext {
                lanes: Arc::new(DashMap::new()),
                handler,
                channels,
                idle_timeout,
            },
            next_generation: AtomicU64::new(0),
        }
    }

    /// Number of live lanes.
    pub fn len(&self) -> usize {
        self.ctx.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctx.lanes.is_empty()
    }

    /// Queue a message on its sender's lane, opening one if needed.
    pub fn dispatch(&self, msg: IncomingMessage) {
        let user_id = msg.user_id().to_string();
        match self.ctx.lanes.entry(user_id.clone()) {
            Entry::Occupied(mut entry) => {
                // A send only fails if the lane task has already exited.
                if let Err(mpsc::error::SendError(msg)) = entry.get().tx.send(msg) {
                    tracing::debug!(user_id = %user_id, "Lane closed; reopening");
                    entry.insert(self.open(user_id, msg));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(self.open(user_id, msg));
            }
        }
    }

    fn open(&self, user_id: String, first: IncomingMessage) -> Lane {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(first);
        let handle = tokio::spawn(run_lane(self.ctx.clone(), user_id, generation, rx));
        Lane {
            generation,
            tx,
            handle,
        }
    }

    /// Close every lane and wait for queued messages to be handled.
    pub async fn drain(&self) {
        let keys: Vec<String> = self.ctx.lanes.iter().map(|e| e.key().clone()).collect();
        let mut handles = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, lane)) = self.ctx.lanes.remove(&key) {
                drop(lane.tx);
                handles.push(lane.handle);
            }
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Lane task failed");
            }
        }
    }
}

async fn run_lane(
    ctx: LaneContext,
    user_id: String,
    generation: u64,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
) {
    tracing::debug!(user_id = %user_id, generation, "Lane opened");
    loop {
        match tokio::time::timeout(ctx.idle_timeout, rx.recv()).await {
            Ok(Some(msg)) => process(&ctx, msg).await,
            Ok(None) => break,
            Err(_) => {
                // Checked under the shard lock, so no send can slip in between.
                let reaped = ctx
                    .lanes
                    .remove_if(&user_id, |_, lane| {
                        lane.generation == generation && rx.is_empty()
                    })
                    .is_some();
                if reaped {
                    break;
                }
            }
        }
    }
    tracing::debug!(user_id = %user_id, generation, "Lane closed");
}

async fn process(ctx: &LaneContext, msg: IncomingMessage) {
    let Some(response) = ctx.handler.handle(&msg).await else {
        return;
    };
    if let Err(e) = ctx.channels.respond(&msg, response).await {
        tracing::error!(
            user_id = %msg.user_id(),
            channel = %msg.channel,
            error = %e,
            "Failed to send reply"
        );
    }
}
