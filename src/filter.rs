//! Vertical / compliance filtering and the grouped view.

use crate::normalize::inherit_tags;
use crate::payload::{BriefingPayload, Item, LabeledCount, Tag};
use crate::render::{self, BodyView, SectionView, SegmentView};
use serde::Serialize;
use std::fmt;

/// One filter dimension's current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Selection {
    #[default]
    All,
    Key(String),
}

impl Selection {
    /// `None` or `"all"` select everything
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None | Some("") | Some("all") => Selection::All,
            Some(key) => Selection::Key(key.to_string()),
        }
    }

    fn matches_key(&self, key: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Key(wanted) => key == Some(wanted.as_str()),
        }
    }

    fn matches_any(&self, tags: &[Tag]) -> bool {
        match self {
            Selection::All => true,
            Selection::Key(wanted) => tags.iter().any(|tag| &tag.key == wanted),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "all"),
            Selection::Key(key) => write!(f, "{}", key),
        }
    }
}

/// Both filter selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters {
    pub vertical: Selection,
    pub compliance: Selection,
}

impl Filters {
    pub fn new(vertical: Selection, compliance: Selection) -> Self {
        Self {
            vertical,
            compliance,
        }
    }

    pub fn is_all(&self) -> bool {
        self.vertical == Selection::All && self.compliance == Selection::All
    }

    /// Whether a flattened item passes both selections
    pub fn matches(&self, item: &Item) -> bool {
        self.vertical.matches_any(&item.verticals) && self.compliance.matches_any(&item.compliance)
    }

    /// Reset selections whose key no longer exists in `options`
    pub fn retain_known(&mut self, options: &FilterOptions) {
        if !options.has_vertical(&self.vertical) {
            self.vertical = Selection::All;
        }
        if !options.has_compliance(&self.compliance) {
            self.compliance = Selection::All;
        }
    }
}

/// A selectable filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub key: String,
    pub label: String,
    /// Known only when the payload summary carries counts
    pub count: Option<u64>,
}

/// Selectable values for both dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub verticals: Vec<FilterOption>,
    pub compliance: Vec<FilterOption>,
}

impl FilterOptions {
    fn has_vertical(&self, selection: &Selection) -> bool {
        has_option(&self.verticals, selection)
    }

    fn has_compliance(&self, selection: &Selection) -> bool {
        has_option(&self.compliance, selection)
    }

    /// Next vertical selection, wrapping back to `All` after the last option
    pub fn next_vertical(&self, current: &Selection) -> Selection {
        cycle(&self.verticals, current)
    }

    /// Next compliance selection, wrapping back to `All` after the last option
    pub fn next_compliance(&self, current: &Selection) -> Selection {
        cycle(&self.compliance, current)
    }

    /// Display label for a vertical selection
    pub fn vertical_label(&self, selection: &Selection) -> String {
        label_for(&self.verticals, selection)
    }

    /// Display label for a compliance selection
    pub fn compliance_label(&self, selection: &Selection) -> String {
        label_for(&self.compliance, selection)
    }
}

/// Collect the filter values offered by a payload.
///
/// Uses the summary counts when the generator provided them, otherwise the
/// section and segment tags in payload order.
pub fn filter_options(payload: &BriefingPayload) -> FilterOptions {
    let verticals = if payload.summary.vertical_counts.is_empty() {
        collect_tags(payload.sections.iter().filter_map(|s| s.vertical.as_ref()))
    } else {
        from_counts(&payload.summary.vertical_counts)
    };

    let compliance = if payload.summary.compliance_counts.is_empty() {
        collect_tags(
            payload
                .sections
                .iter()
                .flat_map(|s| &s.segments)
                .filter_map(|segment| segment.compliance.as_ref()),
        )
    } else {
        from_counts(&payload.summary.compliance_counts)
    };

    FilterOptions {
        verticals,
        compliance,
    }
}

/// Keep only the flattened items matching `filters`
pub fn apply(items: Vec<Item>, filters: &Filters) -> Vec<Item> {
    if filters.is_all() {
        return items;
    }
    items.into_iter().filter(|item| filters.matches(item)).collect()
}

/// Render the payload grouped by vertical, then compliance segment.
///
/// A segment is shown only if at least one of its items survives the
/// filters, and a section only if at least one of its segments does.
pub fn render_grouped(payload: &BriefingPayload, filters: &Filters) -> BodyView {
    if payload.item_count() == 0 {
        return BodyView::Empty(render::EMPTY_STATE.to_string());
    }

    let mut sections = Vec::new();

    for section in &payload.sections {
        let vertical_key = section.vertical.as_ref().map(|tag| tag.key.as_str());
        if !filters.vertical.matches_key(vertical_key) {
            continue;
        }

        let mut segments = Vec::new();
        for segment in &section.segments {
            let compliance_key = segment.compliance.as_ref().map(|tag| tag.key.as_str());
            if !filters.compliance.matches_key(compliance_key) {
                continue;
            }

            let articles: Vec<_> = segment
                .items
                .iter()
                .map(|item| inherit_tags(item, section.vertical.as_ref(), segment.compliance.as_ref()))
                .filter(|item| filters.matches(item))
                .map(|item| render::render_article(&item))
                .collect();

            if !articles.is_empty() {
                segments.push(SegmentView {
                    heading: heading(segment.compliance.as_ref()),
                    articles,
                });
            }
        }

        if !segments.is_empty() {
            sections.push(SectionView {
                heading: heading(section.vertical.as_ref()),
                segments,
            });
        }
    }

    if sections.is_empty() {
        BodyView::Empty(render::NO_MATCHES.to_string())
    } else {
        BodyView::Grouped(sections)
    }
}

fn heading(tag: Option<&Tag>) -> String {
    match tag {
        Some(tag) if !tag.label.is_empty() => tag.label.clone(),
        Some(tag) if !tag.key.is_empty() => tag.key.clone(),
        _ => "Unclassified".to_string(),
    }
}

fn from_counts(counts: &[LabeledCount]) -> Vec<FilterOption> {
    let mut options: Vec<FilterOption> = Vec::with_capacity(counts.len());
    for entry in counts {
        if entry.key.is_empty() || options.iter().any(|o| o.key == entry.key) {
            continue;
        }
        options.push(FilterOption {
            key: entry.key.clone(),
            label: display_label(&entry.key, &entry.label),
            count: Some(entry.count),
        });
    }
    options
}

fn collect_tags<'a>(tags: impl Iterator<Item = &'a Tag>) -> Vec<FilterOption> {
    let mut options: Vec<FilterOption> = Vec::new();
    for tag in tags {
        if tag.key.is_empty() || options.iter().any(|o| o.key == tag.key) {
            continue;
        }
        options.push(FilterOption {
            key: tag.key.clone(),
            label: display_label(&tag.key, &tag.label),
            count: None,
        });
    }
    options
}

fn display_label(key: &str, label: &str) -> String {
    if label.is_empty() {
        key.to_string()
    } else {
        label.to_string()
    }
}

fn has_option(options: &[FilterOption], selection: &Selection) -> bool {
    match selection {
        Selection::All => true,
        Selection::Key(key) => options.iter().any(|o| &o.key == key),
    }
}

fn cycle(options: &[FilterOption], current: &Selection) -> Selection {
    let next = match current {
        Selection::All => options.first(),
        Selection::Key(key) => options
            .iter()
            .position(|o| &o.key == key)
            .and_then(|idx| options.get(idx + 1)),
    };
    next.map(|o| Selection::Key(o.key.clone()))
        .unwrap_or(Selection::All)
}

fn label_for(options: &[FilterOption], selection: &Selection) -> String {
    match selection {
        Selection::All => "All".to_string(),
        Selection::Key(key) => options
            .iter()
            .find(|o| &o.key == key)
            .map(|o| o.label.clone())
            .unwrap_or_else(|| key.clone()),
    }
}
