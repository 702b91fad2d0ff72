use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Observable lifecycle points of a tool invocation.
///
/// Absence of a part for a call id means the call has not started yet.
/// `OutputAvailable` is terminal: no later event may change the part.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolState {
    #[serde(rename = "input-available")]
    InputAvailable,
    #[serde(rename = "output-available")]
    OutputAvailable,
}

impl ToolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolState::OutputAvailable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolState::InputAvailable => "input-available",
            ToolState::OutputAvailable => "output-available",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input-available" => Some(ToolState::InputAvailable),
            "output-available" => Some(ToolState::OutputAvailable),
            _ => None,
        }
    }
}

/// One atomic unit of a message's content.
///
/// Tool parts carry their tag's tool name as data (`tool-getScrape` -> `getScrape`)
/// so a single variant covers every tool. Tags we don't know are preserved opaquely
/// in `Unknown` and never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    File {
        url: String,
        filename: Option<String>,
        media_type: String,
    },
    Tool {
        tool: String,
        tool_call_id: String,
        state: ToolState,
        input: Value,
        output: Option<Value>,
    },
    Unknown {
        part_type: String,
        payload: Value,
    },
}

impl MessagePart {
    /// Classify a raw incoming part object into exactly one variant.
    ///
    /// Never fails: anything that doesn't match a known tag (including a missing
    /// `type` field) becomes `Unknown` with the original payload preserved.
    pub fn classify(raw: &Value) -> MessagePart {
        let part_type = raw.get("type").and_then(|t| t.as_str()).unwrap_or("");

        if let Some(tool) = part_type.strip_prefix("tool-") {
            let output = raw.get("output").cloned();
            // Some emitters omit the state string on snapshots; infer it from shape
            // the way an output-carrying part can only be terminal.
            let state = raw
                .get("state")
                .and_then(|s| s.as_str())
                .and_then(ToolState::parse)
                .unwrap_or(if output.is_some() {
                    ToolState::OutputAvailable
                } else {
                    ToolState::InputAvailable
                });
            return MessagePart::Tool {
                tool: tool.to_string(),
                tool_call_id: raw
                    .get("toolCallId")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                state,
                input: raw.get("input").cloned().unwrap_or(Value::Null),
                output,
            };
        }

        match part_type {
            "text" => MessagePart::Text {
                text: raw
                    .get("text")
                    .and_then(|t| t.as_str())
                    .unwrap_or("")
                    .to_string(),
            },
            "reasoning" => MessagePart::Reasoning {
                text: raw
                    .get("text")
                    .and_then(|t| t.as_str())
                    .unwrap_or("")
                    .to_string(),
            },
            "file" => MessagePart::File {
                url: raw
                    .get("url")
                    .and_then(|u| u.as_str())
                    .unwrap_or("")
                    .to_string(),
                filename: raw
                    .get("filename")
                    .and_then(|f| f.as_str())
                    .map(|f| f.to_string()),
                media_type: raw
                    .get("mediaType")
                    .and_then(|m| m.as_str())
                    .unwrap_or("")
                    .to_string(),
            },
            other => MessagePart::Unknown {
                part_type: other.to_string(),
                payload: raw.clone(),
            },
        }
    }

    /// Inverse of `classify`, used for persistence and replay.
    pub fn to_value(&self) -> Value {
        match self {
            MessagePart::Text { text } => json!({ "type": "text", "text": text }),
            MessagePart::Reasoning { text } => json!({ "type": "reasoning", "text": text }),
            MessagePart::File {
                url,
                filename,
                media_type,
            } => {
                let mut obj = json!({ "type": "file", "url": url, "mediaType": media_type });
                if let Some(name) = filename {
                    obj["filename"] = Value::String(name.clone());
                }
                obj
            }
            MessagePart::Tool {
                tool,
                tool_call_id,
                state,
                input,
                output,
            } => {
                let mut obj = json!({
                    "type": format!("tool-{tool}"),
                    "toolCallId": tool_call_id,
                    "state": state.as_str(),
                    "input": input,
                });
                if let Some(out) = output {
                    obj["output"] = out.clone();
                }
                obj
            }
            MessagePart::Unknown { payload, .. } => payload.clone(),
        }
    }

    /// The tool call id if this is a tool part.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            MessagePart::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}

impl Serialize for MessagePart {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MessagePart {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(MessagePart::classify(&raw))
    }
}

/// A chat message: stable id, author role, and an ordered part list.
///
/// Part order is arrival order and is preserved; patches to tool parts update
/// in place without moving the part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, role: MessageRole) -> Self {
        Self {
            id: id.into(),
            role,
            parts: Vec::new(),
        }
    }

    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Find the tool part for a call id, if any.
    pub fn tool_part(&self, tool_call_id: &str) -> Option<&MessagePart> {
        self.parts
            .iter()
            .find(|p| p.tool_call_id() == Some(tool_call_id))
    }

    pub fn tool_part_mut(&mut self, tool_call_id: &str) -> Option<&mut MessagePart> {
        self.parts
            .iter_mut()
            .find(|p| p.tool_call_id() == Some(tool_call_id))
    }
}

/// Per-message vote, supplied by the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub chat_id: String,
    pub message_id: String,
    pub is_upvoted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_text_part() {
        let raw = json!({ "type": "text", "text": "hello" });
        assert_eq!(
            MessagePart::classify(&raw),
            MessagePart::Text {
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn classify_tool_part_with_output() {
        let raw = json!({
            "type": "tool-getScrape",
            "toolCallId": "call_1",
            "state": "output-available",
            "input": { "url": "https://example.com" },
            "output": "done",
        });
        match MessagePart::classify(&raw) {
            MessagePart::Tool {
                tool,
                tool_call_id,
                state,
                input,
                output,
            } => {
                assert_eq!(tool, "getScrape");
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(state, ToolState::OutputAvailable);
                assert_eq!(input["url"], "https://example.com");
                assert_eq!(output, Some(json!("done")));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn classify_tool_part_infers_state_from_shape() {
        let raw = json!({
            "type": "tool-getWeather",
            "toolCallId": "call_2",
            "input": { "city": "Oslo" },
        });
        match MessagePart::classify(&raw) {
            MessagePart::Tool { state, .. } => assert_eq!(state, ToolState::InputAvailable),
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_round_trips_opaquely() {
        let raw = json!({ "type": "step-start", "stepId": 7 });
        let part = MessagePart::classify(&raw);
        assert!(matches!(
            &part,
            MessagePart::Unknown { part_type, .. } if part_type == "step-start"
        ));
        assert_eq!(part.to_value(), raw);
    }

    #[test]
    fn part_equality_is_exact_on_text() {
        let a = MessagePart::Text {
            text: "hi ".to_string(),
        };
        let b = MessagePart::Text {
            text: "hi".to_string(),
        };
        assert_ne!(a, b);
    }

    #[test]
    fn to_value_round_trips_through_classify() {
        let part = MessagePart::Tool {
            tool: "createDocument".to_string(),
            tool_call_id: "call_9".to_string(),
            state: ToolState::InputAvailable,
            input: json!({ "title": "Notes" }),
            output: None,
        };
        assert_eq!(MessagePart::classify(&part.to_value()), part);
    }
}
