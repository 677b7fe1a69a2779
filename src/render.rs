//! Pure projection of briefing state into a view description.
//!
//! Nothing here touches the terminal; front-ends draw the returned values.

use crate::normalize::parse_timestamp;
use crate::payload::{BriefingPayload, Item, Tag};
use serde::Serialize;

pub const UNTITLED: &str = "Untitled update";
pub const EMPTY_STATE: &str = "No updates were published in the latest run.";
pub const NO_MATCHES: &str = "No updates match the selected filters.";
pub const LOADING: &str = "Loading the latest briefing…";
pub const FAILURE_BODY: &str =
    "Unable to load the latest report. Check your network connection and try again.";
pub const OFFLINE_NOTICE: &str =
    "Offline preview: the live feed is unreachable, showing bundled sample data.";

const DATE_TIME_FORMAT: &str = "%b %-d, %Y, %H:%M UTC";
const DATE_FORMAT: &str = "%b %-d, %Y";

/// Whether the displayed payload came from the live feed or the sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedMode {
    Live,
    Sample,
}

impl FeedMode {
    pub fn from_fallback(used_fallback: bool) -> Self {
        if used_fallback {
            FeedMode::Sample
        } else {
            FeedMode::Live
        }
    }
}

/// Header region: timestamp, counts and source list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderView {
    pub generated_at: String,
    pub total_label: String,
    pub total_items: String,
    pub source_count_label: String,
    pub source_count: String,
    pub sources: String,
    /// Shown only when the sample payload is on screen
    pub notice: Option<String>,
}

/// One rendered news item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub title: String,
    pub href: String,
    pub verticals: Vec<String>,
    pub meta: String,
    pub summary: Option<String>,
    pub compliance_focus: Option<String>,
    pub keywords: Option<String>,
}

/// A compliance segment in the grouped view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentView {
    pub heading: String,
    pub articles: Vec<ArticleView>,
}

/// A vertical section in the grouped view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub heading: String,
    pub segments: Vec<SegmentView>,
}

/// Articles region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BodyView {
    Loading(String),
    Failed(String),
    Empty(String),
    Articles(Vec<ArticleView>),
    Grouped(Vec<SectionView>),
}

/// Refresh affordance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshButton {
    pub label: String,
    pub enabled: bool,
}

impl RefreshButton {
    pub fn new(loading: bool) -> Self {
        if loading {
            Self {
                label: "Refreshing…".to_string(),
                enabled: false,
            }
        } else {
            Self {
                label: "Refresh briefing".to_string(),
                enabled: true,
            }
        }
    }
}

/// Everything a front-end needs to draw one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub header: HeaderView,
    pub body: BodyView,
    pub refresh: RefreshButton,
}

/// Project the payload's metadata onto the header
pub fn render_summary(payload: &BriefingPayload, used_fallback: bool) -> HeaderView {
    let mode = FeedMode::from_fallback(used_fallback);
    let summary = &payload.summary;
    let sources = &summary.sources;

    let generated_at = match (non_blank(payload.generated_at.as_deref()), mode) {
        (Some(ts), FeedMode::Live) => format!("Last refreshed {}", format_date_time(ts)),
        (Some(ts), FeedMode::Sample) => format!("Sample snapshot from {}", format_date_time(ts)),
        (None, FeedMode::Live) => "Last refreshed: unavailable".to_string(),
        (None, FeedMode::Sample) => "Sample snapshot: timestamp unavailable".to_string(),
    };

    let source_list = match (sources.is_empty(), mode) {
        (false, FeedMode::Live) => format!("Sources: {}", sources.join(" • ")),
        (false, FeedMode::Sample) => format!("Sample sources: {}", sources.join(" • ")),
        (true, FeedMode::Live) => "No sources captured in the latest run.".to_string(),
        (true, FeedMode::Sample) => "No sources captured in the sample data.".to_string(),
    };

    let (total_label, source_count_label, notice) = match mode {
        FeedMode::Live => ("Items in latest run", "Sources scanned", None),
        FeedMode::Sample => (
            "Items in sample",
            "Sample sources scanned",
            Some(OFFLINE_NOTICE.to_string()),
        ),
    };

    HeaderView {
        generated_at,
        total_label: total_label.to_string(),
        total_items: summary.total_items.unwrap_or(0).to_string(),
        source_count_label: source_count_label.to_string(),
        source_count: sources.len().to_string(),
        sources: source_list,
        notice,
    }
}

/// Header shown before the first payload arrives
pub fn render_pending_summary() -> HeaderView {
    HeaderView {
        generated_at: "Last refreshed: pending".to_string(),
        total_label: "Items in latest run".to_string(),
        total_items: "0".to_string(),
        source_count_label: "Sources scanned".to_string(),
        source_count: "0".to_string(),
        sources: "Fetching sources…".to_string(),
        notice: None,
    }
}

/// Header shown after both sources failed
pub fn render_failure_summary() -> HeaderView {
    HeaderView {
        generated_at: "Unable to refresh – please try again later.".to_string(),
        total_label: "Items in latest run".to_string(),
        total_items: "0".to_string(),
        source_count_label: "Sources scanned".to_string(),
        source_count: "0".to_string(),
        sources: "Sources unavailable – please retry.".to_string(),
        notice: None,
    }
}

/// Terminal error state after both sources failed
pub fn render_failure(loading: bool) -> Screen {
    Screen {
        header: render_failure_summary(),
        body: BodyView::Failed(FAILURE_BODY.to_string()),
        refresh: RefreshButton::new(loading),
    }
}

/// Project a flat item list, or the empty-state message when there is none
pub fn render_list(items: &[Item]) -> BodyView {
    if items.is_empty() {
        return BodyView::Empty(EMPTY_STATE.to_string());
    }
    BodyView::Articles(items.iter().map(render_article).collect())
}

/// Project a single item
pub fn render_article(item: &Item) -> ArticleView {
    let title = non_blank(item.title.as_deref()).unwrap_or(UNTITLED).to_string();
    let href = non_blank(item.link.as_deref()).unwrap_or("#").to_string();
    let source = non_blank(item.source.as_deref()).unwrap_or("Source unavailable");

    let compliance = labels(&item.compliance);
    let compliance_focus = if compliance.is_empty() {
        None
    } else {
        Some(format!("Compliance focus: {}", compliance.join(" · ")))
    };

    ArticleView {
        title,
        href,
        verticals: labels(&item.verticals),
        meta: format!("{} · {}", source, format_date(item.published.as_deref())),
        summary: non_blank(item.summary.as_deref()).map(str::to_string),
        compliance_focus,
        keywords: keyword_line(item),
    }
}

/// `Label: kw1, kw2; Label: kw3`, labels resolved from the item's own tags
fn keyword_line(item: &Item) -> Option<String> {
    let mut parts = Vec::new();

    for (category, hits) in &item.keyword_hits {
        let tags = if category == "verticals" {
            &item.verticals
        } else {
            &item.compliance
        };
        for (key, matches) in hits {
            if matches.is_empty() {
                continue;
            }
            let label = tags
                .iter()
                .find(|tag| &tag.key == key && !tag.label.is_empty())
                .map(|tag| tag.label.as_str())
                .unwrap_or(key);
            let mut unique: Vec<&str> = matches.iter().map(String::as_str).collect();
            unique.sort_unstable();
            unique.dedup();
            parts.push(format!("{}: {}", label, unique.join(", ")));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("Keywords flagged: {}", parts.join("; ")))
    }
}

/// Date and time in UTC, the literal text when unparsable
pub fn format_date_time(text: &str) -> String {
    match parse_timestamp(text) {
        Some(ts) => ts.format(DATE_TIME_FORMAT).to_string(),
        None => text.to_string(),
    }
}

/// Short date for meta lines, the literal text when unparsable
pub fn format_date(text: Option<&str>) -> String {
    match non_blank(text) {
        None => "Date unavailable".to_string(),
        Some(text) => match parse_timestamp(text) {
            Some(ts) => ts.format(DATE_FORMAT).to_string(),
            None => text.to_string(),
        },
    }
}

fn labels(tags: &[Tag]) -> Vec<String> {
    tags.iter()
        .filter(|tag| !tag.label.is_empty())
        .map(|tag| tag.label.clone())
        .collect()
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}
