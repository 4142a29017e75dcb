//! "Thinking" feedback shown while the backend has not produced output.

use std::{sync::Arc, time::Duration};

use {
    relay_channels::{ChannelOutbound, MessageRef},
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

pub const THINKING_EMOJI: &str = "🤔";

/// How often the platform's "typing" state is refreshed.
pub const TYPING_INTERVAL: Duration = Duration::from_secs(8);

/// A running indicator on one user message.
pub struct ThinkingIndicator {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ThinkingIndicator {
    /// React on `message` and keep the channel "typing" until cancelled or
    /// until `ceiling` elapses. The reaction is removed exactly once.
    pub fn spawn(
        outbound: Arc<dyn ChannelOutbound>,
        message: MessageRef,
        ceiling: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = outbound.add_reaction(message, THINKING_EMOJI).await {
                debug!(message_id = %message.message_id, error = %e, "thinking reaction failed");
            }

            let deadline = tokio::time::sleep(ceiling);
            tokio::pin!(deadline);
            let mut typing = tokio::time::interval(TYPING_INTERVAL);

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = &mut deadline => {
                        debug!(message_id = %message.message_id, "thinking ceiling reached");
                        break;
                    },
                    _ = typing.tick() => {
                        if let Err(e) = outbound.send_typing(message.channel_id).await {
                            debug!(channel_id = %message.channel_id, error = %e, "typing indicator failed");
                        }
                    },
                }
            }

            if let Err(e) = outbound.remove_reaction(message, THINKING_EMOJI).await {
                debug!(message_id = %message.message_id, error = %e, "removing thinking reaction failed");
            }
        });
        Self { token, handle }
    }

    /// Token that stops the indicator when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the indicator and wait for its cleanup.
    pub async fn finish(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            debug!(error = %e, "thinking task ended abnormally");
        }
    }
}
