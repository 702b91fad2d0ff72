//! Recovers structured scrape parameters from directive text embedded in a
//! message by the assistant's planning step.
//!
//! The labeled-line block after the marker sentence is a de-facto wire format
//! shared with existing transcripts (see `weft_types::DIRECTIVE_MARKER`).
//! Parsing is intentionally lossy and best-effort: a field that fails to parse
//! takes its default, and nothing here ever errors.

use once_cell::sync::Lazy;
use regex::Regex;
use weft_types::{
    ScrapeAction, ScrapeDirective, ScrapeFormat, ScreenshotMode, DEFAULT_MAX_AGE_MS,
    DEFAULT_SCRAPE_LIMIT,
};

static PRE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^(.+?)\n\n(.+?)\n\n$").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- URL: (.+)").unwrap());
static ACTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Action: (.+)").unwrap());
static TOPIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Topic: (.+)").unwrap());
static FORMATS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Formats: (.+)").unwrap());
static SCREENSHOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Screenshot: (.+)").unwrap());
static LIMIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Limit: (.+)").unwrap());
static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Include selectors: (.+)").unwrap());
static EXCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Exclude selectors: (.+)").unwrap());
static MAX_AGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"- Max Age: (\d+) ms").unwrap());

/// A message body split into what the user actually typed and the machine
/// directive the planning step appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScrapeMessage {
    pub user_text: String,
    pub directive: Option<ScrapeDirective>,
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].trim().to_string())
}

fn capture_list(re: &Regex, text: &str) -> Vec<String> {
    match capture(re, text) {
        // The sentinel for "no selectors", not a literal selector.
        None => Vec::new(),
        Some(raw) if raw == "None" => Vec::new(),
        Some(raw) => raw.split(", ").map(|s| s.to_string()).collect(),
    }
}

/// Extract the user-visible text before the directive marker.
///
/// The expected shape is `<action description>\n\n<original user text>\n\n`;
/// the description line is redundant with the parsed directive and dropped.
fn split_user_text(before_marker: &str) -> String {
    if let Some(caps) = PRE_BLOCK_RE.captures(before_marker) {
        return caps[2].trim().to_string();
    }

    let trimmed = before_marker.trim();
    let lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() >= 2 {
        lines[1..].join("\n").trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a message body. Absent marker means plain conversational text.
pub fn parse_scrape_message(text: &str) -> ParsedScrapeMessage {
    let Some(marker_idx) = text.find(weft_types::DIRECTIVE_MARKER) else {
        return ParsedScrapeMessage {
            user_text: text.to_string(),
            directive: None,
        };
    };

    let user_text = split_user_text(&text[..marker_idx]);

    let action = capture(&ACTION_RE, text)
        .and_then(|s| ScrapeAction::parse(&s))
        .unwrap_or_default();
    let topic = capture(&TOPIC_RE, text).filter(|t| t != "N/A");
    let formats = capture(&FORMATS_RE, text)
        .map(|raw| {
            raw.split(", ")
                .filter_map(ScrapeFormat::parse)
                .collect::<Vec<_>>()
        })
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| vec![ScrapeFormat::Markdown]);
    let screenshot = capture(&SCREENSHOT_RE, text)
        .and_then(|s| ScreenshotMode::parse(&s))
        .unwrap_or_default();
    let limit = capture(&LIMIT_RE, text)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SCRAPE_LIMIT);
    let max_age_ms = capture(&MAX_AGE_RE, text)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_AGE_MS);

    let directive = ScrapeDirective {
        url: capture(&URL_RE, text).unwrap_or_default(),
        action,
        topic,
        formats,
        screenshot,
        limit,
        include_selectors: capture_list(&INCLUDE_RE, text),
        exclude_selectors: capture_list(&EXCLUDE_RE, text),
        max_age_ms,
    };

    ParsedScrapeMessage {
        user_text,
        directive: Some(directive),
    }
}
