use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SCRAPE_LIMIT: u32 = 10;

/// 24 hours, the scraping backend's default cache window.
pub const DEFAULT_MAX_AGE_MS: u64 = 86_400_000;

/// Marker sentence introducing a machine-directive block inside plain text.
/// This is a wire format shared with existing transcripts; do not change it.
pub const DIRECTIVE_MARKER: &str = "Please use the getScrape tool with these parameters:";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeAction {
    #[default]
    Scrape,
    Crawl,
    Map,
    Search,
}

impl ScrapeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeAction::Scrape => "scrape",
            ScrapeAction::Crawl => "crawl",
            ScrapeAction::Map => "map",
            ScrapeAction::Search => "search",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scrape" => Some(ScrapeAction::Scrape),
            "crawl" => Some(ScrapeAction::Crawl),
            "map" => Some(ScrapeAction::Map),
            "search" => Some(ScrapeAction::Search),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeFormat {
    Markdown,
    Html,
    Json,
}

impl ScrapeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeFormat::Markdown => "markdown",
            ScrapeFormat::Html => "html",
            ScrapeFormat::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "markdown" => Some(ScrapeFormat::Markdown),
            "html" => Some(ScrapeFormat::Html),
            "json" => Some(ScrapeFormat::Json),
            _ => None,
        }
    }
}

/// Requested screenshot capture mode.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScreenshotMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "screenshot")]
    Viewport,
    #[serde(rename = "screenshot@fullPage")]
    FullPage,
}

impl ScreenshotMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenshotMode::None => "none",
            ScreenshotMode::Viewport => "screenshot",
            ScreenshotMode::FullPage => "screenshot@fullPage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ScreenshotMode::None),
            "screenshot" => Some(ScreenshotMode::Viewport),
            "screenshot@fullPage" => Some(ScreenshotMode::FullPage),
            _ => None,
        }
    }

    pub fn is_requested(self) -> bool {
        !matches!(self, ScreenshotMode::None)
    }
}

/// Structured parameters of a scrape/crawl/map/search tool call.
///
/// Matches the `getScrape` input contract on the wire (camelCase keys), and is
/// also what the instruction parser reconstructs from directive text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeDirective {
    pub url: String,
    pub action: ScrapeAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub formats: Vec<ScrapeFormat>,
    pub screenshot: ScreenshotMode,
    pub limit: u32,
    pub include_selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
    #[serde(rename = "maxAge")]
    pub max_age_ms: u64,
}

impl Default for ScrapeDirective {
    fn default() -> Self {
        Self {
            url: String::new(),
            action: ScrapeAction::Scrape,
            topic: None,
            formats: vec![ScrapeFormat::Markdown],
            screenshot: ScreenshotMode::None,
            limit: DEFAULT_SCRAPE_LIMIT,
            include_selectors: Vec::new(),
            exclude_selectors: Vec::new(),
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }
}

impl ScrapeDirective {
    /// Best-effort read of a tool part's `input` payload. Fields that fail to
    /// deserialize fall back to defaults; never errors.
    pub fn from_input(input: &Value) -> ScrapeDirective {
        serde_json::from_value(input.clone()).unwrap_or_default()
    }

    /// Short label shown in badges: the search topic for searches, else the URL.
    pub fn display_url(&self) -> String {
        if self.action == ScrapeAction::Search {
            format!("Search: {}", self.topic.as_deref().unwrap_or_default())
        } else {
            self.url.clone()
        }
    }

    fn formats_text(&self) -> String {
        self.formats
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// One-line human summary, e.g. `crawl with screenshot (limit: 25)`.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.action.as_str().to_string()];
        if self.screenshot.is_requested() {
            parts.push("with screenshot".to_string());
        }
        if !self.formats.is_empty() && !self.formats.contains(&ScrapeFormat::Markdown) {
            parts.push(format!("as {}", self.formats_text()));
        }
        if self.limit != DEFAULT_SCRAPE_LIMIT {
            parts.push(format!("(limit: {})", self.limit));
        }
        parts.join(" ")
    }

    /// Render the directive as the labeled instruction block embedded in a user
    /// message. The instruction parser is the exact inverse.
    pub fn to_instruction_text(&self, user_text: &str, action_description: &str) -> String {
        let topic = self.topic.as_deref().unwrap_or("N/A");
        let join_or_none = |items: &[String]| {
            if items.is_empty() {
                "None".to_string()
            } else {
                items.join(", ")
            }
        };
        format!(
            "{action_description}\n\n{user_text}\n\n{DIRECTIVE_MARKER}\n\
             - URL: {}\n\
             - Action: {}\n\
             - Topic: {}\n\
             - Formats: {}\n\
             - Screenshot: {}\n\
             - Limit: {}\n\
             - Include selectors: {}\n\
             - Exclude selectors: {}\n\
             - Max Age: {} ms",
            self.url,
            self.action.as_str(),
            topic,
            self.formats_text(),
            self.screenshot.as_str(),
            self.limit,
            join_or_none(&self.include_selectors),
            join_or_none(&self.exclude_selectors),
            self.max_age_ms,
        )
    }
}
