mod message;
mod scrape;

pub use message::{ChatMessage, MessagePart, MessageRole, ToolState, Vote};
pub use scrape::{
    ScrapeAction, ScrapeDirective, ScrapeFormat, ScreenshotMode, DEFAULT_MAX_AGE_MS,
    DEFAULT_SCRAPE_LIMIT, DIRECTIVE_MARKER,
};
