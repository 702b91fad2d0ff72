//! Per-conversation stream consumption.
//!
//! One feed per open conversation: a single consumer pulls events off one
//! channel in arrival order and folds them into the transcript. Conversations
//! are independent; nothing is shared between feeds. Readers only ever see
//! snapshots published through a watch channel; the transcript itself is
//! owned by the feed task.

use crate::error::{Result, WeftError};
use crate::transcript::{Applied, Transcript};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use weft_observability::{emit_event, ObservabilityEvent, ProcessKind};
use weft_types::ChatMessage;
use weft_wire::WireEvent;

/// Point-in-time view of a conversation, cheap to clone out of the watch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptSnapshot {
    pub messages: Vec<ChatMessage>,
    /// Monotonic count of applied (non-ignored) events; the transport uses it
    /// as the resume cursor to request only the tail after a reconnect.
    pub applied_events: u64,
}

/// Handle to a running conversation feed.
pub struct ConversationFeed {
    chat_id: String,
    cancel: CancellationToken,
    snapshot_rx: watch::Receiver<TranscriptSnapshot>,
    task: tokio::task::JoinHandle<Result<u64>>,
}

impl ConversationFeed {
    /// Spawn the consumer for one conversation, starting from messages loaded
    /// out-of-band (chat history).
    pub fn spawn(
        chat_id: impl Into<String>,
        initial: Vec<ChatMessage>,
        mut events: mpsc::Receiver<WireEvent>,
    ) -> ConversationFeed {
        let chat_id = chat_id.into();
        let cancel = CancellationToken::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(TranscriptSnapshot {
            messages: initial.clone(),
            applied_events: 0,
        });

        let token = cancel.clone();
        let id = chat_id.clone();
        let task = tokio::spawn(async move {
            let mut transcript = Transcript::from_messages(initial);
            let mut applied: u64 = 0;

            emit_event(
                Level::INFO,
                ProcessKind::Frontend,
                ObservabilityEvent {
                    event: "feed.start",
                    component: "session",
                    chat_id: Some(&id),
                    message_id: None,
                    tool_call_id: None,
                    status: Some("running"),
                    error_code: None,
                    detail: None,
                },
            );

            loop {
                tokio::select! {
                    // Cancellation wins over a queued event.
                    biased;
                    _ = token.cancelled() => {
                        // Deltas still in flight for this conversation are
                        // dropped with the receiver; the transcript built so
                        // far stays visible through the watch.
                        emit_event(
                            Level::INFO,
                            ProcessKind::Frontend,
                            ObservabilityEvent {
                                event: "feed.cancelled",
                                component: "session",
                                chat_id: Some(&id),
                                message_id: None,
                                tool_call_id: None,
                                status: Some("cancelled"),
                                error_code: None,
                                detail: None,
                            },
                        );
                        break;
                    }
                    maybe = events.recv() => {
                        let Some(event) = maybe else {
                            tracing::debug!(target: "weft.session", chat_id = %id, "event channel closed");
                            break;
                        };
                        if event.chat_id != id {
                            tracing::debug!(
                                target: "weft.session",
                                chat_id = %id,
                                foreign = %event.chat_id,
                                "dropping event for another conversation"
                            );
                            continue;
                        }
                        match transcript.apply(&event) {
                            Ok(Applied::Ignored) => {}
                            Ok(_) => {
                                applied += 1;
                                let _ = snapshot_tx.send(TranscriptSnapshot {
                                    messages: transcript.messages().to_vec(),
                                    applied_events: applied,
                                });
                            }
                            Err(err) => {
                                emit_event(
                                    Level::ERROR,
                                    ProcessKind::Frontend,
                                    ObservabilityEvent {
                                        event: "feed.desync",
                                        component: "session",
                                        chat_id: Some(&id),
                                        message_id: Some(&event.message_id),
                                        tool_call_id: event.tool_call_id(),
                                        status: Some("failed"),
                                        error_code: Some("CONVERSATION_DESYNC"),
                                        detail: None,
                                    },
                                );
                                return Err(err);
                            }
                        }
                    }
                }
            }

            Ok(applied)
        });

        ConversationFeed {
            chat_id,
            cancel,
            snapshot_rx,
            task,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Current snapshot; never blocks.
    pub fn snapshot(&self) -> TranscriptSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe for change notifications (render layer).
    pub fn subscribe(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop consuming: navigation away or a new user turn supersedes this feed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the consumer to finish; returns the applied-event count, or
    /// the desync error the caller must surface as a full-reload prompt.
    pub async fn join(self) -> Result<u64> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(WeftError::ChannelClosed(format!(
                "feed task for {} aborted: {err}",
                self.chat_id
            ))),
        }
    }
}
