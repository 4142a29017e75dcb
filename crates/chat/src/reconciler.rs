//! Turns a chunk stream into a bounded sequence of edited chat messages.
//!
//! Text is buffered and flushed either when enough characters accumulate or
//! when the flush interval elapses. Each flush re-renders the open message
//! as its committed text plus the buffer plus a "still typing" marker. When
//! that would exceed the platform limit, the open message is filled to
//! exactly the limit and sealed, and the remainder continues in a fresh
//! message sent as a reply to the sealed one.
//!
//! Lengths are counted in `char`s, and splits always land on a char
//! boundary.
//!
//! Whitespace that can never become part of a visible message is dropped:
//! a limit-sized run of it at the start of a fresh message, and whatever
//! whitespace is still buffered when the stream ends after a seal.

use std::time::Duration;

use {
    futures::StreamExt,
    relay_channels::{ChannelOutbound, MessageRef},
    relay_common::{ChannelId, MessageId},
    relay_config::StreamConfig,
    relay_providers::ChunkStream,
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
    tracing::{debug, trace},
};

use crate::{
    error::Result,
    turn::{TurnOutcome, TurnPhase, TurnTarget},
};

/// Minutes of inactivity before a created thread is archived.
pub const THREAD_AUTO_ARCHIVE_MINUTES: u16 = 60;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub max_message_len: usize,
    pub buffer_size: usize,
    pub flush_interval: Duration,
    pub marker: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            buffer_size: 32,
            flush_interval: Duration::from_secs(1),
            marker: "…".into(),
        }
    }
}

impl From<&StreamConfig> for ReconcilerConfig {
    fn from(cfg: &StreamConfig) -> Self {
        Self {
            max_message_len: cfg.max_message_len,
            buffer_size: cfg.buffer_size,
            flush_interval: Duration::from_millis(cfg.flush_interval_ms),
            marker: cfg.marker.clone(),
        }
    }
}

/// State of one in-flight turn.
pub struct Reconciler<'a> {
    outbound: &'a dyn ChannelOutbound,
    config: &'a ReconcilerConfig,
    target: TurnTarget,
    thinking: Option<CancellationToken>,

    /// Received but not yet shown.
    buffer: String,
    buffer_chars: usize,
    /// Text of the open message that is final regardless of what follows.
    committed: String,
    committed_chars: usize,
    open: Option<MessageRef>,
    last_rendered: Option<String>,
    last_flush: Instant,

    /// Channel for every send after the first (the thread, once created).
    channel: Option<ChannelId>,
    reply_to: Option<MessageId>,
    messages: Vec<MessageRef>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        outbound: &'a dyn ChannelOutbound,
        config: &'a ReconcilerConfig,
        target: TurnTarget,
    ) -> Self {
        Self {
            outbound,
            config,
            target,
            thinking: None,
            buffer: String::new(),
            buffer_chars: 0,
            committed: String::new(),
            committed_chars: 0,
            open: None,
            last_rendered: None,
            last_flush: Instant::now(),
            channel: None,
            reply_to: None,
            messages: Vec::new(),
        }
    }

    /// Cancel `token` once the first message becomes visible.
    #[must_use]
    pub fn with_thinking(mut self, token: CancellationToken) -> Self {
        self.thinking = Some(token);
        self
    }

    /// Drain `stream` to its terminal chunk.
    ///
    /// On a stream error, whatever was flushed stays visible and the error
    /// is returned; no continuation is produced.
    pub async fn run(mut self, mut stream: ChunkStream<'_>) -> Result<TurnOutcome> {
        self.last_flush = Instant::now();
        while let Some(item) = stream.next().await {
            let chunk = item?;
            self.push(&chunk.delta);

            if chunk.done {
                self.flush(true).await?;
                debug!(
                    phase = %TurnPhase::Sealed,
                    messages = self.messages.len(),
                    "turn complete"
                );
                return Ok(TurnOutcome {
                    messages: std::mem::take(&mut self.messages),
                    continuation: chunk.continuation,
                });
            }

            if self.due() {
                self.flush(false).await?;
            }
        }
        Err(relay_providers::Error::Truncated.into())
    }

    fn push(&mut self, delta: &str) {
        self.buffer.push_str(delta);
        self.buffer_chars += delta.chars().count();
    }

    fn due(&self) -> bool {
        self.buffer_chars >= self.config.buffer_size
            || self.last_flush.elapsed() >= self.config.flush_interval
    }

    /// Commit the buffer to the visible message(s).
    ///
    /// A no-op when there is nothing new to show. Pending text that is
    /// empty or whitespace only stays buffered.
    pub async fn flush(&mut self, terminal: bool) -> Result<()> {
        let config = self.config;
        let marker = if terminal { "" } else { config.marker.as_str() };
        let marker_chars = marker.chars().count();
        let limit = config.max_message_len;

        loop {
            if self.committed.trim().is_empty() && self.buffer.trim().is_empty() {
                break;
            }

            if self.committed_chars + self.buffer_chars + marker_chars <= limit {
                let rendered = format!("{}{}{marker}", self.committed, self.buffer);
                self.render(rendered).await?;
                self.committed.push_str(&self.buffer);
                self.committed_chars += self.buffer_chars;
                self.buffer.clear();
                self.buffer_chars = 0;
                break;
            }

            // Fill the open message up to the limit, then seal it.
            let take = (limit - self.committed_chars).min(self.buffer_chars);
            let split = self
                .buffer
                .char_indices()
                .nth(take)
                .map_or(self.buffer.len(), |(i, _)| i);
            if self.committed.is_empty() && self.buffer[..split].trim().is_empty() {
                trace!(chars = take, "dropping blank prefix of a fresh message");
                self.buffer.drain(..split);
                self.buffer_chars -= take;
                continue;
            }
            let rest = self.buffer.split_off(split);
            let rendered = format!("{}{}", self.committed, self.buffer);
            self.buffer = rest;
            self.buffer_chars -= take;
            self.render(rendered).await?;
            self.seal();
        }

        self.last_flush = Instant::now();
        Ok(())
    }

    /// Send or edit the open message so it shows `rendered`.
    async fn render(&mut self, rendered: String) -> Result<()> {
        if let Some(open) = self.open {
            if self.last_rendered.as_deref() == Some(rendered.as_str()) {
                trace!(message_id = %open.message_id, "unchanged render skipped");
                return Ok(());
            }
            debug!(
                phase = %TurnPhase::Flushing,
                message_id = %open.message_id,
                chars = rendered.chars().count(),
                "editing message"
            );
            self.outbound.edit_message(open, &rendered).await?;
        } else {
            let (channel_id, reply_to) = self.destination().await?;
            let sent = self
                .outbound
                .send_message(channel_id, &rendered, reply_to)
                .await?;
            debug!(
                phase = %TurnPhase::Flushing,
                channel_id = %sent.channel_id,
                message_id = %sent.message_id,
                chars = rendered.chars().count(),
                "sent message"
            );
            if let Some(token) = &self.thinking {
                token.cancel();
            }
            self.open = Some(sent);
            self.messages.push(sent);
        }
        self.last_rendered = Some(rendered);
        Ok(())
    }

    /// Channel and reply target for a new message, starting the thread on
    /// the turn's first send.
    async fn destination(&mut self) -> Result<(ChannelId, Option<MessageId>)> {
        if let Some(channel_id) = self.channel {
            return Ok((channel_id, self.reply_to));
        }

        let origin = self.target.origin;
        let (channel_id, reply_to) = match &self.target.thread_name {
            Some(name) => {
                let thread = self
                    .outbound
                    .create_thread(origin, name, THREAD_AUTO_ARCHIVE_MINUTES)
                    .await?;
                debug!(%thread, from = %origin.message_id, "started thread");
                (thread, None)
            },
            None => (origin.channel_id, Some(origin.message_id)),
        };
        self.channel = Some(channel_id);
        self.reply_to = reply_to;
        Ok((channel_id, reply_to))
    }

    fn seal(&mut self) {
        if let Some(sealed) = self.open.take() {
            debug!(phase = %TurnPhase::Sealed, message_id = %sealed.message_id, "sealed message");
            self.reply_to = Some(sealed.message_id);
        }
        self.committed.clear();
        self.committed_chars = 0;
        self.last_rendered = None;
    }
}

impl Drop for Reconciler<'_> {
    fn drop(&mut self) {
        if let Some(token) = &self.thinking {
            token.cancel();
        }
    }
}
