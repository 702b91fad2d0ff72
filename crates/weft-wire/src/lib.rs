//! Inbound event envelope for the weft reconciler.
//!
//! The model-invocation layer emits a stream of JSON objects, each identifying a
//! target message and carrying one part-shaped payload. This crate converts that
//! raw shape into typed events. Transport framing (SSE, WebSocket, ...) is the
//! transport collaborator's concern, not ours.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_types::{MessagePart, MessageRole, ToolState};

/// Wire event type for part updates.
pub const PART_UPDATED: &str = "message.part.updated";

/// What a wire event does to its target message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EventBody {
    /// A full part payload to append (or reconcile, for tool-tagged parts).
    Snapshot(Value),
    /// A tool call became visible with its arguments.
    ToolInput {
        tool_call_id: String,
        tool: String,
        input: Value,
    },
    /// A tool call completed; `output` may carry an `error` key.
    ToolOutput {
        tool_call_id: String,
        tool: String,
        output: Value,
    },
}

/// One inbound event, addressed to a message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireEvent {
    pub chat_id: String,
    pub message_id: String,
    pub role: MessageRole,
    pub body: EventBody,
}

impl WireEvent {
    /// Convert a raw provider event into a typed one.
    ///
    /// Tolerant by design: unknown event types, missing addressing fields, or
    /// unrecognizable payloads yield `None` and are dropped by the caller. This
    /// never errors; a bad event must not take the stream down.
    pub fn from_json(raw: &Value) -> Option<WireEvent> {
        let event_type = raw.get("type").and_then(|t| t.as_str())?.trim();
        if event_type != PART_UPDATED {
            return None;
        }

        let props = raw.get("properties")?;
        let chat_id = props.get("chatId").and_then(|v| v.as_str())?.to_string();
        let message_id = props.get("messageId").and_then(|v| v.as_str())?.to_string();
        // Streamed parts come from the assistant unless the envelope says otherwise.
        let role = match props.get("role").and_then(|r| r.as_str()) {
            Some("user") => MessageRole::User,
            _ => MessageRole::Assistant,
        };

        let part = props.get("part")?;
        let body = match MessagePart::classify(part) {
            MessagePart::Tool {
                tool,
                tool_call_id,
                state,
                input,
                output,
            } => {
                if tool_call_id.is_empty() {
                    return None;
                }
                match state {
                    ToolState::InputAvailable => EventBody::ToolInput {
                        tool_call_id,
                        tool,
                        input,
                    },
                    ToolState::OutputAvailable => EventBody::ToolOutput {
                        tool_call_id,
                        tool,
                        output: output.unwrap_or(Value::Null),
                    },
                }
            }
            _ => EventBody::Snapshot(part.clone()),
        };

        Some(WireEvent {
            chat_id,
            message_id,
            role,
            body,
        })
    }

    /// The tool call id this event addresses, if it is a tool lifecycle event.
    pub fn tool_call_id(&self) -> Option<&str> {
        match &self.body {
            EventBody::ToolInput { tool_call_id, .. }
            | EventBody::ToolOutput { tool_call_id, .. } => Some(tool_call_id),
            EventBody::Snapshot(_) => None,
        }
    }
}
