//! Normalizes the scraping tool's heterogeneous result shapes into one display
//! string, and splices/strips the canonical screenshot-preview fragment.
//!
//! The backend returns a plain string, an array of page objects under `data`,
//! a single object under `data`, or a bare object with `content`/`markdown`.
//! The preview block's exact text is a wire format: the renderer strips it with
//! the same pattern to feed a standalone screenshot widget.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use weft_types::ScreenshotMode;

/// Separator between joined multi-page results.
pub const RESULT_SEPARATOR: &str = "\n\n---\n\n";

static PREVIEW_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\n\n\*\*Screenshot Preview:\*\*\n\n\[!\[Screenshot[^\]]*\]\([^)]+\)\]\([^)]+\)\n\n\*Click the image above to view the full screenshot in a new tab\*",
    )
    .unwrap()
});

static SCREENSHOT_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[Screenshot[^\]]*\]\(([^)]+)\)").unwrap());

/// The fixed preview fragment appended to formatted results.
pub fn screenshot_preview_block(display_url: &str, screenshot_url: &str) -> String {
    format!(
        "\n\n**Screenshot Preview:**\n\n[![Screenshot of {display_url}]({screenshot_url})]({screenshot_url})\n\n*Click the image above to view the full screenshot in a new tab*"
    )
}

/// Remove every preview fragment, restoring the bare content string.
pub fn strip_screenshot_preview(text: &str) -> String {
    PREVIEW_BLOCK_RE.replace_all(text, "").into_owned()
}

/// Pull the screenshot URL back out of a formatted result, if one was spliced.
pub fn extract_screenshot_url(text: &str) -> Option<String> {
    SCREENSHOT_LINK_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn item_text(item: &Value) -> String {
    str_field(item, "content")
        .or_else(|| str_field(item, "markdown"))
        .unwrap_or_else(|| pretty(item))
}

/// Screenshot URL locations checked when normalization didn't find one.
fn fallback_screenshot_url(output: &Value) -> Option<String> {
    str_field(output, "screenshot")
        .or_else(|| {
            output
                .get("metadata")
                .and_then(|m| str_field(m, "screenshot"))
        })
        .or_else(|| {
            output
                .get("images")
                .and_then(|i| i.as_array())
                .and_then(|items| items.first())
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .or_else(|| {
            output
                .get("data")
                .and_then(|d| d.get("actions"))
                .and_then(|a| a.get("screenshots"))
                .and_then(|s| s.as_array())
                .and_then(|items| items.first())
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
}

/// Normalize a raw tool result into the display string.
///
/// Error outputs bypass normalization and surface as a distinct error string.
/// Never panics, whatever the shape.
pub fn format_scrape_output(
    output: &Value,
    screenshot: ScreenshotMode,
    display_url: &str,
) -> String {
    if let Some(error) = output.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return format!("Scraping Error: {message}");
    }

    let mut screenshot_url: Option<String> = None;

    let content = if let Some(s) = output.as_str() {
        s.to_string()
    } else if let Some(items) = output.get("data").and_then(|d| d.as_array()) {
        screenshot_url = items.first().and_then(|item| str_field(item, "screenshot"));
        items
            .iter()
            .map(item_text)
            .collect::<Vec<_>>()
            .join(RESULT_SEPARATOR)
    } else if let Some(data) = output.get("data").filter(|d| d.is_object()) {
        screenshot_url = str_field(data, "screenshot");
        str_field(data, "markdown")
            .or_else(|| str_field(data, "html"))
            .unwrap_or_else(|| pretty(data))
    } else if let Some(content) = str_field(output, "content") {
        content
    } else if let Some(markdown) = str_field(output, "markdown") {
        markdown
    } else {
        pretty(output)
    };

    if screenshot_url.is_none() {
        screenshot_url = fallback_screenshot_url(output);
    }

    match screenshot_url {
        Some(url) if screenshot.is_requested() => {
            format!("{content}{}", screenshot_preview_block(display_url, &url))
        }
        _ => content,
    }
}
