//! Maps finalized part state to a presentation mode, and decides when a
//! message's render can be skipped.
//!
//! This is the branch table the UI layer consumes; it holds no state of its
//! own. The one hard rule: a terminal tool part carrying an `error` key must
//! present as an error affordance, never as success content.

use crate::scrape_output::{extract_screenshot_url, format_scrape_output, strip_screenshot_preview};
use serde_json::Value;
use weft_types::{ChatMessage, MessagePart, ScrapeDirective, ToolState, Vote};

/// How a single part should be presented.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// Markdown body. For assistant text the screenshot preview fragment has
    /// already been stripped into `screenshot_url`.
    Markdown {
        text: String,
        screenshot_url: Option<String>,
    },
    Reasoning {
        text: String,
    },
    Attachment {
        url: String,
        filename: Option<String>,
        media_type: String,
    },
    /// Tool call awaiting completion; `summary` is the scrape badge line when
    /// the arguments parse as a scrape directive.
    ToolPending {
        tool: String,
        summary: Option<String>,
    },
    ToolResult {
        tool: String,
        text: String,
        screenshot_url: Option<String>,
    },
    ToolError {
        tool: String,
        message: String,
    },
    /// Nothing to draw: empty reasoning, unknown tags.
    Hidden,
}

fn error_message(output: &Value) -> Option<String> {
    output.get("error").map(|error| {
        error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string())
    })
}

fn opaque_result_text(output: &Value) -> String {
    output
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string()))
}

/// Pure lookup from part tag + lifecycle state to presentation mode.
pub fn presentation_for(part: &MessagePart) -> Presentation {
    match part {
        MessagePart::Text { text } => {
            let screenshot_url = extract_screenshot_url(text);
            Presentation::Markdown {
                text: strip_screenshot_preview(text),
                screenshot_url,
            }
        }
        MessagePart::Reasoning { text } => {
            if text.trim().is_empty() {
                Presentation::Hidden
            } else {
                Presentation::Reasoning { text: text.clone() }
            }
        }
        MessagePart::File {
            url,
            filename,
            media_type,
        } => Presentation::Attachment {
            url: url.clone(),
            filename: filename.clone(),
            media_type: media_type.clone(),
        },
        MessagePart::Tool {
            tool,
            state,
            input,
            output,
            ..
        } => match state {
            ToolState::InputAvailable => {
                let summary = (tool == "getScrape").then(|| {
                    let directive = ScrapeDirective::from_input(input);
                    format!("{} {}", directive.display_url(), directive.summary())
                });
                Presentation::ToolPending {
                    tool: tool.clone(),
                    summary,
                }
            }
            ToolState::OutputAvailable => {
                let output = output.as_ref().unwrap_or(&Value::Null);
                if let Some(message) = error_message(output) {
                    return Presentation::ToolError {
                        tool: tool.clone(),
                        message,
                    };
                }
                if tool == "getScrape" {
                    let directive = ScrapeDirective::from_input(input);
                    let formatted = format_scrape_output(
                        output,
                        directive.screenshot,
                        &directive.display_url(),
                    );
                    return Presentation::ToolResult {
                        tool: tool.clone(),
                        screenshot_url: extract_screenshot_url(&formatted),
                        text: strip_screenshot_preview(&formatted),
                    };
                }
                Presentation::ToolResult {
                    tool: tool.clone(),
                    text: opaque_result_text(output),
                    screenshot_url: None,
                }
            }
        },
        MessagePart::Unknown { .. } => Presentation::Hidden,
    }
}

/// Everything a message render depends on. Two consecutive renders may be
/// skipped only when every field is deep-equal.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub message_id: String,
    pub is_loading: bool,
    pub requires_scroll_padding: bool,
    pub parts: Vec<MessagePart>,
    pub vote: Option<Vote>,
}

impl RenderSnapshot {
    pub fn new(
        message: &ChatMessage,
        is_loading: bool,
        requires_scroll_padding: bool,
        vote: Option<Vote>,
    ) -> Self {
        Self {
            message_id: message.id.clone(),
            is_loading,
            requires_scroll_padding,
            parts: message.parts.clone(),
            vote,
        }
    }
}

/// Equality-based render suppression: re-render only when something changed.
pub fn should_rerender(prev: &RenderSnapshot, next: &RenderSnapshot) -> bool {
    prev != next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape_output::screenshot_preview_block;
    use serde_json::json;
    use weft_types::MessageRole;

    fn scrape_part(state: ToolState, output: Option<Value>) -> MessagePart {
        MessagePart::Tool {
            tool: "getScrape".to_string(),
            tool_call_id: "call_1".to_string(),
            state,
            input: json!({ "url": "https://example.com", "screenshot": "screenshot" }),
            output,
        }
    }

    #[test]
    fn empty_reasoning_is_hidden() {
        assert_eq!(
            presentation_for(&MessagePart::Reasoning {
                text: "  \n ".to_string()
            }),
            Presentation::Hidden
        );
        assert!(matches!(
            presentation_for(&MessagePart::Reasoning {
                text: "thinking".to_string()
            }),
            Presentation::Reasoning { .. }
        ));
    }

    #[test]
    fn pending_scrape_carries_badge_summary() {
        match presentation_for(&scrape_part(ToolState::InputAvailable, None)) {
            Presentation::ToolPending { tool, summary } => {
                assert_eq!(tool, "getScrape");
                assert_eq!(
                    summary.as_deref(),
                    Some("https://example.com scrape with screenshot")
                );
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }

    #[test]
    fn error_output_never_presents_as_success() {
        let part = scrape_part(
            ToolState::OutputAvailable,
            Some(json!({ "error": "blocked by robots.txt" })),
        );
        match presentation_for(&part) {
            Presentation::ToolError { message, .. } => {
                assert_eq!(message, "blocked by robots.txt");
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }

    #[test]
    fn scrape_result_splits_screenshot_from_text() {
        let part = scrape_part(
            ToolState::OutputAvailable,
            Some(json!({
                "data": { "markdown": "Body", "screenshot": "https://shots.example/1.png" },
            })),
        );
        match presentation_for(&part) {
            Presentation::ToolResult {
                text,
                screenshot_url,
                ..
            } => {
                assert_eq!(text, "Body");
                assert_eq!(
                    screenshot_url.as_deref(),
                    Some("https://shots.example/1.png")
                );
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }

    #[test]
    fn assistant_text_is_stripped_of_preview_block() {
        let text = format!(
            "Here you go.{}",
            screenshot_preview_block("https://example.com", "https://shots.example/1.png")
        );
        match presentation_for(&MessagePart::Text { text }) {
            Presentation::Markdown {
                text,
                screenshot_url,
            } => {
                assert_eq!(text, "Here you go.");
                assert_eq!(
                    screenshot_url.as_deref(),
                    Some("https://shots.example/1.png")
                );
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }

    #[test]
    fn other_tools_render_opaquely() {
        let part = MessagePart::Tool {
            tool: "getWeather".to_string(),
            tool_call_id: "call_2".to_string(),
            state: ToolState::OutputAvailable,
            input: json!({ "city": "Oslo" }),
            output: Some(json!({ "tempC": 4 })),
        };
        match presentation_for(&part) {
            Presentation::ToolResult { tool, text, .. } => {
                assert_eq!(tool, "getWeather");
                assert!(text.contains("tempC"));
            }
            other => panic!("unexpected presentation: {:?}", other),
        }
    }

    #[test]
    fn identical_snapshots_suppress_rerender() {
        let mut message = ChatMessage::new("msg_1", MessageRole::Assistant);
        message.parts.push(MessagePart::Text {
            text: "hello".to_string(),
        });
        let vote = Some(Vote {
            chat_id: "chat_1".to_string(),
            message_id: "msg_1".to_string(),
            is_upvoted: true,
        });

        let prev = RenderSnapshot::new(&message, false, false, vote.clone());
        let next = RenderSnapshot::new(&message, false, false, vote.clone());
        assert!(!should_rerender(&prev, &next));

        // Any single field changing forces a re-render.
        let loading = RenderSnapshot::new(&message, true, false, vote.clone());
        assert!(should_rerender(&prev, &loading));

        let padded = RenderSnapshot::new(&message, false, true, vote.clone());
        assert!(should_rerender(&prev, &padded));

        let unvoted = RenderSnapshot::new(&message, false, false, None);
        assert!(should_rerender(&prev, &unvoted));

        let mut renamed = message.clone();
        renamed.id = "msg_2".to_string();
        let other_id = RenderSnapshot::new(&renamed, false, false, vote.clone());
        assert!(should_rerender(&prev, &other_id));

        let mut grown = message.clone();
        grown.parts.push(MessagePart::Text {
            text: "more".to_string(),
        });
        let more_parts = RenderSnapshot::new(&grown, false, false, vote);
        assert!(should_rerender(&prev, &more_parts));
    }
}
