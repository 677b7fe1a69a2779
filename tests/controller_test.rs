//! Tests for RefreshController with in-memory sources.
//!
//! Covers the single-flight guard, success / failure transitions and the
//! screens projected from each state.

use async_trait::async_trait;
use briefing::loader::{BriefingSource, CombinedError, FetchError, Loaded, Origin};
use briefing::render::{self, BodyView};
use briefing::{BriefingPayload, Filters, Phase, RefreshController, Selection, View};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source returning a fixed outcome and counting calls
struct FakeSource {
    calls: AtomicUsize,
    payload: Option<BriefingPayload>,
    origin: Origin,
}

impl FakeSource {
    fn ok(payload: BriefingPayload, origin: Origin) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            payload: Some(payload),
            origin,
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            payload: None,
            origin: Origin::Primary,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BriefingSource for FakeSource {
    async fn load(&self) -> Result<Loaded, CombinedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.payload {
            Some(payload) => Ok(Loaded {
                payload: payload.clone(),
                origin: self.origin,
            }),
            None => Err(combined_error()),
        }
    }
}

fn read_error(name: &str) -> FetchError {
    FetchError::Read {
        path: name.into(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
    }
}

fn combined_error() -> CombinedError {
    CombinedError {
        primary: read_error("latest.json"),
        fallback: read_error("sample.json"),
    }
}

fn briefing() -> BriefingPayload {
    serde_json::from_value(json!({
        "generated_at": "2024-05-02T06:00:00+00:00",
        "summary": {"total_items": 3, "sources": ["FinCEN", "OFAC"]},
        "sections": [
            {
                "vertical": {"key": "banking", "label": "Banking"},
                "segments": [
                    {
                        "compliance": {"key": "aml", "label": "AML"},
                        "items": [
                            {"title": "Older", "source": "FinCEN", "published": "2024-04-01T00:00:00+00:00"},
                            {"title": "X", "source": "FinCEN", "published": "not-a-date"}
                        ]
                    }
                ]
            },
            {
                "vertical": {"key": "crypto", "label": "Crypto"},
                "segments": [
                    {
                        "compliance": {"key": "sanctions", "label": "Sanctions"},
                        "items": [
                            {"title": "Newer", "source": "OFAC", "published": "2024-05-01T00:00:00+00:00"}
                        ]
                    }
                ]
            }
        ]
    }))
    .unwrap()
}

fn article_titles(body: &BodyView) -> Vec<String> {
    match body {
        BodyView::Articles(articles) => articles.iter().map(|a| a.title.clone()).collect(),
        other => panic!("expected articles, got {:?}", other),
    }
}

#[tokio::test]
async fn refresh_stores_payload_and_returns_to_idle() {
    let source = FakeSource::ok(briefing(), Origin::Primary);
    let mut controller = RefreshController::new();

    assert!(controller.refresh(&source).await);

    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(source.calls(), 1);
    let loaded = controller.briefing().unwrap();
    assert!(!loaded.used_fallback());
    assert_eq!(loaded.payload, briefing());
}

#[tokio::test]
async fn trigger_while_loading_is_a_no_op() {
    let source = FakeSource::ok(briefing(), Origin::Primary);
    let mut controller = RefreshController::new();

    assert!(controller.trigger());
    assert_eq!(controller.phase(), Phase::Loading);

    assert!(!controller.trigger());
    assert!(!controller.refresh(&source).await);
    assert_eq!(source.calls(), 0);
    assert_eq!(controller.phase(), Phase::Loading);
    assert!(controller.briefing().is_none());

    let screen = controller.screen(&Filters::default(), View::List);
    assert_eq!(screen.body, BodyView::Loading(render::LOADING.to_string()));
    assert!(!screen.refresh.enabled);
}

#[tokio::test]
async fn failure_clears_payload_and_rearms_trigger() {
    let mut controller = RefreshController::new();
    controller
        .refresh(&FakeSource::ok(briefing(), Origin::Primary))
        .await;

    let failing = FakeSource::failing();
    assert!(controller.refresh(&failing).await);

    assert_eq!(controller.phase(), Phase::Idle);
    assert!(controller.briefing().is_none());
    assert!(controller.failure().is_some());

    let screen = controller.screen(&Filters::default(), View::List);
    assert_eq!(screen.header.total_items, "0");
    assert_eq!(screen.header.source_count, "0");
    assert_eq!(screen.body, BodyView::Failed(render::FAILURE_BODY.to_string()));
    assert!(screen.refresh.enabled);

    // retry works
    assert!(controller.trigger());
}

#[test]
fn settle_without_trigger_is_ignored() {
    let mut controller = RefreshController::new();
    controller.settle(Ok(Loaded {
        payload: briefing(),
        origin: Origin::Primary,
    }));
    assert!(controller.briefing().is_none());
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn list_screen_sorts_newest_first() {
    let mut controller = RefreshController::new();
    controller
        .refresh(&FakeSource::ok(briefing(), Origin::Primary))
        .await;

    let screen = controller.screen(&Filters::default(), View::List);
    assert_eq!(article_titles(&screen.body), vec!["Newer", "Older", "X"]);

    // the unparsable date is shown as-is
    match &screen.body {
        BodyView::Articles(articles) => assert_eq!(articles[2].meta, "FinCEN · not-a-date"),
        other => panic!("expected articles, got {:?}", other),
    }
    assert_eq!(screen.header.sources, "Sources: FinCEN • OFAC");
    assert_eq!(screen.refresh.label, "Refresh briefing");
}

#[tokio::test]
async fn filters_rerender_without_refetching() {
    let source = FakeSource::ok(briefing(), Origin::Primary);
    let mut controller = RefreshController::new();
    controller.refresh(&source).await;

    let filters = Filters::new(Selection::Key("banking".to_string()), Selection::All);
    let screen = controller.screen(&filters, View::List);
    assert_eq!(article_titles(&screen.body), vec!["Older", "X"]);

    let filters = Filters::new(Selection::All, Selection::Key("sanctions".to_string()));
    match controller.screen(&filters, View::Grouped).body {
        BodyView::Grouped(sections) => {
            assert_eq!(sections.len(), 1);
            assert_eq!(sections[0].heading, "Crypto");
            assert_eq!(sections[0].segments[0].heading, "Sanctions");
        }
        other => panic!("expected grouped view, got {:?}", other),
    }

    let filters = Filters::new(
        Selection::Key("crypto".to_string()),
        Selection::Key("aml".to_string()),
    );
    assert_eq!(
        controller.screen(&filters, View::List).body,
        BodyView::Empty(render::NO_MATCHES.to_string())
    );

    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn empty_payload_shows_single_empty_state() {
    let payload: BriefingPayload = serde_json::from_value(json!({
        "generated_at": null,
        "summary": {"sources": []},
        "sections": []
    }))
    .unwrap();
    let mut controller = RefreshController::new();
    controller
        .refresh(&FakeSource::ok(payload, Origin::Primary))
        .await;

    for view in [View::List, View::Grouped] {
        let screen = controller.screen(&Filters::default(), view);
        assert_eq!(screen.body, BodyView::Empty(render::EMPTY_STATE.to_string()));
        assert_eq!(screen.header.total_items, "0");
    }
}

#[tokio::test]
async fn fallback_payload_renders_offline_preview() {
    let mut controller = RefreshController::new();
    controller
        .refresh(&FakeSource::ok(briefing(), Origin::Fallback))
        .await;

    let header = controller.screen(&Filters::default(), View::List).header;
    assert_eq!(header.notice.as_deref(), Some(render::OFFLINE_NOTICE));
    assert!(header.sources.starts_with("Sample sources:"));
    assert!(header.generated_at.starts_with("Sample snapshot"));
}
