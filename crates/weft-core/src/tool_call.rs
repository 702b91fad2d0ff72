//! Per-call-id tool invocation lifecycle.
//!
//! One instance of this state machine exists implicitly for every tool call
//! embedded in an assistant message: absent -> input-available ->
//! output-available, and output-available is terminal. The machine never
//! raises; payload validity is the formatter's and dispatcher's problem.

use serde_json::Value;
use weft_types::{MessagePart, ToolState};

/// Outcome of advancing one tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The existing part was updated in place.
    Patched,
    /// Duplicate or post-terminal event, dropped.
    Ignored,
}

/// Build the part for a call's first observed event.
pub fn start_part(tool: &str, tool_call_id: &str, input: &Value) -> MessagePart {
    MessagePart::Tool {
        tool: tool.to_string(),
        tool_call_id: tool_call_id.to_string(),
        state: ToolState::InputAvailable,
        input: input.clone(),
        output: None,
    }
}

/// Apply a (possibly re-delivered) input event to an existing part.
///
/// Stores the argument payload verbatim. A terminal call is left untouched so
/// duplicate or reordered delivery cannot move it backward.
pub fn apply_input(part: &mut MessagePart, input: &Value) -> Advance {
    match part {
        MessagePart::Tool {
            state,
            input: slot,
            ..
        } => {
            if state.is_terminal() {
                return Advance::Ignored;
            }
            *slot = input.clone();
            Advance::Patched
        }
        _ => Advance::Ignored,
    }
}

/// Apply a completion event to an existing part. Terminal: a second completion
/// for the same call id is ignored, whatever it carries.
pub fn apply_output(part: &mut MessagePart, output: &Value) -> Advance {
    match part {
        MessagePart::Tool {
            state,
            output: slot,
            ..
        } => {
            if state.is_terminal() {
                return Advance::Ignored;
            }
            *state = ToolState::OutputAvailable;
            *slot = Some(output.clone());
            Advance::Patched
        }
        _ => Advance::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call_with_output() -> MessagePart {
        let mut part = start_part("getScrape", "call_1", &json!({ "url": "https://a.example" }));
        assert_eq!(apply_output(&mut part, &json!("first result")), Advance::Patched);
        part
    }

    #[test]
    fn input_then_output_lifecycle() {
        let mut part = start_part("getScrape", "call_1", &json!({ "url": "https://a.example" }));
        match &part {
            MessagePart::Tool { state, output, .. } => {
                assert_eq!(*state, ToolState::InputAvailable);
                assert!(output.is_none());
            }
            other => panic!("unexpected part: {:?}", other),
        }

        assert_eq!(apply_output(&mut part, &json!("done")), Advance::Patched);
        match &part {
            MessagePart::Tool { state, output, .. } => {
                assert_eq!(*state, ToolState::OutputAvailable);
                assert_eq!(*output, Some(json!("done")));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn duplicate_input_patches_verbatim() {
        let mut part = start_part("getWeather", "call_2", &json!({ "city": "Oslo" }));
        assert_eq!(
            apply_input(&mut part, &json!({ "city": "Bergen" })),
            Advance::Patched
        );
        match &part {
            MessagePart::Tool { input, .. } => assert_eq!(input["city"], "Bergen"),
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn terminal_state_ignores_everything() {
        let mut part = call_with_output();
        let before = part.clone();

        assert_eq!(
            apply_output(&mut part, &json!("second result")),
            Advance::Ignored
        );
        assert_eq!(
            apply_input(&mut part, &json!({ "url": "https://b.example" })),
            Advance::Ignored
        );
        assert_eq!(part, before);
    }

    #[test]
    fn error_outputs_still_reach_terminal_state() {
        let mut part = start_part("createDocument", "call_3", &json!({ "title": "x" }));
        assert_eq!(
            apply_output(&mut part, &json!({ "error": "boom" })),
            Advance::Patched
        );
        match &part {
            MessagePart::Tool { state, .. } => assert_eq!(*state, ToolState::OutputAvailable),
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn non_tool_parts_are_left_alone() {
        let mut part = MessagePart::Text {
            text: "hello".to_string(),
        };
        assert_eq!(apply_output(&mut part, &json!("x")), Advance::Ignored);
    }
}
