//! The stream reconciler: folds inbound part events into the authoritative,
//! append/patch-only message list for one conversation.
//!
//! The fold is explicit and pure with respect to its inputs: the same event
//! sequence always produces the same transcript, and replaying an
//! already-applied suffix leaves the transcript unchanged. That is what makes
//! resume after a connectivity gap safe: the transport may re-deliver an
//! overlapping prefix and nothing duplicates or regresses.

use crate::error::{Result, WeftError};
use crate::tool_call::{self, Advance};
use serde_json::Value;
use weft_types::{ChatMessage, MessagePart};
use weft_wire::{EventBody, WireEvent};

/// What applying one event did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    AppendedMessage,
    AppendedPart,
    Patched,
    Ignored,
}

/// The growing message list of one conversation. Owned exclusively by the
/// reconciler; readers get snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from messages loaded out-of-band (chat history storage).
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Fold one event into the transcript.
    ///
    /// Errors only on the single fatal condition: a tool completion addressing
    /// a message or call this transcript has never seen. Everything else
    /// (duplicates, post-terminal re-delivery, unknown part tags) is absorbed.
    pub fn apply(&mut self, event: &WireEvent) -> Result<Applied> {
        match &event.body {
            EventBody::ToolInput {
                tool_call_id,
                tool,
                input,
            } => Ok(self.apply_tool_input(event, tool_call_id, tool, input)),
            EventBody::ToolOutput {
                tool_call_id,
                output,
                ..
            } => self.apply_tool_output(event, tool_call_id, output),
            EventBody::Snapshot(raw) => Ok(self.apply_snapshot(event, raw)),
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a WireEvent>) -> Result<()> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    fn apply_tool_input(
        &mut self,
        event: &WireEvent,
        tool_call_id: &str,
        tool: &str,
        input: &Value,
    ) -> Applied {
        let part = tool_call::start_part(tool, tool_call_id, input);
        let Some(message) = self.message_mut(&event.message_id) else {
            let mut message = ChatMessage::new(event.message_id.clone(), event.role);
            message.parts.push(part);
            self.messages.push(message);
            return Applied::AppendedMessage;
        };

        match message.tool_part_mut(tool_call_id) {
            Some(existing) => match tool_call::apply_input(existing, input) {
                Advance::Patched => Applied::Patched,
                Advance::Ignored => {
                    tracing::debug!(
                        target: "weft.transcript",
                        tool_call_id,
                        "dropping tool input for terminal call"
                    );
                    Applied::Ignored
                }
            },
            None => {
                message.parts.push(part);
                Applied::AppendedPart
            }
        }
    }

    fn apply_tool_output(
        &mut self,
        event: &WireEvent,
        tool_call_id: &str,
        output: &Value,
    ) -> Result<Applied> {
        let Some(message) = self.message_mut(&event.message_id) else {
            return Err(WeftError::Desynchronized(format!(
                "tool output for unknown message {} (call {})",
                event.message_id, tool_call_id
            )));
        };

        let Some(existing) = message.tool_part_mut(tool_call_id) else {
            return Err(WeftError::Desynchronized(format!(
                "tool output for unknown call {} in message {}",
                tool_call_id, event.message_id
            )));
        };

        match tool_call::apply_output(existing, output) {
            Advance::Patched => Ok(Applied::Patched),
            Advance::Ignored => {
                tracing::debug!(
                    target: "weft.transcript",
                    tool_call_id,
                    "dropping duplicate tool completion"
                );
                Ok(Applied::Ignored)
            }
        }
    }

    fn apply_snapshot(&mut self, event: &WireEvent, raw: &Value) -> Applied {
        let part = MessagePart::classify(raw);

        // Tool-tagged snapshots (e.g. replayed history) go through the same
        // per-call-id reconciliation as live lifecycle events.
        if let MessagePart::Tool {
            tool,
            tool_call_id,
            state,
            input,
            output,
        } = &part
        {
            let input_applied = self.apply_tool_input(event, tool_call_id, tool, input);
            if state.is_terminal() {
                let out = output.clone().unwrap_or(Value::Null);
                return match self.apply_tool_output(event, tool_call_id, &out) {
                    Ok(applied) => applied,
                    // The input half above just created the part, so this is
                    // unreachable; don't let a snapshot kill the fold.
                    Err(_) => Applied::Ignored,
                };
            }
            return input_applied;
        }

        let Some(message) = self.message_mut(&event.message_id) else {
            let mut message = ChatMessage::new(event.message_id.clone(), event.role);
            message.parts.push(part);
            self.messages.push(message);
            return Applied::AppendedMessage;
        };

        // Re-delivered snapshots arrive byte-identical; appending them again
        // would break replay idempotence. Distinct intermediate ticks differ
        // in content and are all kept.
        if message.parts.iter().any(|existing| *existing == part) {
            tracing::debug!(
                target: "weft.transcript",
                message_id = %event.message_id,
                "dropping duplicate part snapshot"
            );
            return Applied::Ignored;
        }

        message.parts.push(part);
        Applied::AppendedPart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_types::{MessageRole, ToolState};

    fn snapshot_event(message_id: &str, role: MessageRole, part: Value) -> WireEvent {
        WireEvent {
            chat_id: "chat_1".to_string(),
            message_id: message_id.to_string(),
            role,
            body: EventBody::Snapshot(part),
        }
    }

    fn tool_input(message_id: &str, call: &str, input: Value) -> WireEvent {
        WireEvent {
            chat_id: "chat_1".to_string(),
            message_id: message_id.to_string(),
            role: MessageRole::Assistant,
            body: EventBody::ToolInput {
                tool_call_id: call.to_string(),
                tool: "getScrape".to_string(),
                input,
            },
        }
    }

    fn tool_output(message_id: &str, call: &str, output: Value) -> WireEvent {
        WireEvent {
            chat_id: "chat_1".to_string(),
            message_id: message_id.to_string(),
            role: MessageRole::Assistant,
            body: EventBody::ToolOutput {
                tool_call_id: call.to_string(),
                tool: "getScrape".to_string(),
                output,
            },
        }
    }

    fn scrape_log() -> Vec<WireEvent> {
        vec![
            snapshot_event(
                "msg_user",
                MessageRole::User,
                json!({ "type": "text", "text": "Get me the pricing info" }),
            ),
            snapshot_event(
                "msg_asst",
                MessageRole::Assistant,
                json!({ "type": "reasoning", "text": "Need to scrape the page" }),
            ),
            tool_input(
                "msg_asst",
                "call_1",
                json!({ "url": "https://example.com/pricing" }),
            ),
            tool_output("msg_asst", "call_1", json!("# Pricing\n\n$10/mo")),
            snapshot_event(
                "msg_asst",
                MessageRole::Assistant,
                json!({ "type": "text", "text": "The plan costs $10/mo." }),
            ),
        ]
    }

    #[test]
    fn folds_a_conversation() {
        let mut transcript = Transcript::new();
        transcript.apply_all(&scrape_log()).unwrap();

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].parts.len(), 3);
        match &messages[1].parts[1] {
            MessagePart::Tool { state, output, .. } => {
                assert_eq!(*state, ToolState::OutputAvailable);
                assert_eq!(*output, Some(json!("# Pricing\n\n$10/mo")));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn patch_keeps_part_position() {
        let mut transcript = Transcript::new();
        let events = scrape_log();
        transcript.apply_all(&events[..3]).unwrap();
        // Tool part is at index 1 before the output arrives...
        assert!(matches!(
            transcript.messages()[1].parts[1],
            MessagePart::Tool {
                state: ToolState::InputAvailable,
                ..
            }
        ));
        transcript.apply_all(&events[3..]).unwrap();
        // ...and stays there after.
        assert!(matches!(
            transcript.messages()[1].parts[1],
            MessagePart::Tool {
                state: ToolState::OutputAvailable,
                ..
            }
        ));
    }

    #[test]
    fn replaying_any_suffix_is_idempotent() {
        let events = scrape_log();
        let mut reference = Transcript::new();
        reference.apply_all(&events).unwrap();

        for start in 0..events.len() {
            let mut transcript = Transcript::new();
            transcript.apply_all(&events).unwrap();
            transcript.apply_all(&events[start..]).unwrap();
            assert_eq!(transcript, reference, "suffix from {start} diverged");
        }
    }

    #[test]
    fn terminal_call_survives_trailing_duplicates_in_any_order() {
        let events = scrape_log();
        let dup_out = tool_output("msg_asst", "call_1", json!("stale second result"));
        let dup_in = tool_input("msg_asst", "call_1", json!({ "url": "https://stale.example" }));

        let mut reference = Transcript::new();
        reference.apply_all(&events).unwrap();

        for tail in [
            vec![&dup_out, &dup_in],
            vec![&dup_in, &dup_out],
            vec![&dup_out, &dup_out, &dup_in],
        ] {
            let mut transcript = Transcript::new();
            transcript.apply_all(&events).unwrap();
            for event in tail {
                transcript.apply(event).unwrap();
            }
            assert_eq!(transcript, reference);
        }
    }

    #[test]
    fn orphan_tool_output_is_desync() {
        let mut transcript = Transcript::new();
        let err = transcript
            .apply(&tool_output("msg_ghost", "call_9", json!("late")))
            .unwrap_err();
        assert!(matches!(err, WeftError::Desynchronized(_)));
    }

    #[test]
    fn unknown_part_tags_pass_through() {
        let mut transcript = Transcript::new();
        transcript
            .apply(&snapshot_event(
                "msg_1",
                MessageRole::Assistant,
                json!({ "type": "step-start", "step": 1 }),
            ))
            .unwrap();
        assert!(matches!(
            transcript.messages()[0].parts[0],
            MessagePart::Unknown { .. }
        ));
    }

    #[test]
    fn tool_snapshot_replay_reconciles_by_call_id() {
        // History replay delivers the finished tool part as one snapshot.
        let snapshot = snapshot_event(
            "msg_asst",
            MessageRole::Assistant,
            json!({
                "type": "tool-getScrape",
                "toolCallId": "call_1",
                "state": "output-available",
                "input": { "url": "https://example.com/pricing" },
                "output": "# Pricing",
            }),
        );

        let mut transcript = Transcript::new();
        transcript.apply(&snapshot).unwrap();
        transcript.apply(&snapshot).unwrap();

        assert_eq!(transcript.messages().len(), 1);
        assert_eq!(transcript.messages()[0].parts.len(), 1);
        assert!(matches!(
            transcript.messages()[0].parts[0],
            MessagePart::Tool {
                state: ToolState::OutputAvailable,
                ..
            }
        ));
    }
}
