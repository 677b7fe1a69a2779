//! Refresh controller - the single owner of the loaded briefing.
//!
//! Two phases, `Idle` and `Loading`. A trigger while loading is dropped, so at
//! most one load is ever in flight and only the settling load writes state.

use crate::config::View;
use crate::filter::{self, FilterOptions, Filters};
use crate::loader::{BriefingSource, CombinedError, Loaded};
use crate::normalize;
use crate::render::{self, BodyView, RefreshButton, Screen};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
}

/// Result of the last settled load
#[derive(Debug)]
enum Held {
    Nothing,
    Briefing(Loaded),
    Failed(CombinedError),
}

#[derive(Debug)]
pub struct RefreshController {
    phase: Phase,
    held: Held,
}

impl Default for RefreshController {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshController {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            held: Held::Nothing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// The currently held briefing, if the last load succeeded
    pub fn briefing(&self) -> Option<&Loaded> {
        match &self.held {
            Held::Briefing(loaded) => Some(loaded),
            _ => None,
        }
    }

    /// The error of the last load, if it failed
    pub fn failure(&self) -> Option<&CombinedError> {
        match &self.held {
            Held::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Start a load. Returns `false`, changing nothing, if one is in flight.
    pub fn trigger(&mut self) -> bool {
        if self.phase == Phase::Loading {
            debug!("refresh already in flight, ignoring trigger");
            return false;
        }
        self.phase = Phase::Loading;
        debug!("refresh started");
        true
    }

    /// Finish the in-flight load with its outcome
    pub fn settle(&mut self, outcome: Result<Loaded, CombinedError>) {
        if self.phase != Phase::Loading {
            warn!("load settled while no refresh was in flight, ignoring");
            return;
        }

        self.held = match outcome {
            Ok(loaded) => {
                info!(
                    items = loaded.payload.item_count(),
                    fallback = loaded.used_fallback(),
                    "briefing refreshed"
                );
                Held::Briefing(loaded)
            }
            Err(err) => {
                error!(error = %err, "briefing refresh failed");
                Held::Failed(err)
            }
        };
        self.phase = Phase::Idle;
    }

    /// Trigger, load from `source` and settle.
    ///
    /// Returns `false` without calling `source` when a load is already in flight.
    pub async fn refresh<S>(&mut self, source: &S) -> bool
    where
        S: BriefingSource + ?Sized,
    {
        if !self.trigger() {
            return false;
        }
        let outcome = source.load().await;
        self.settle(outcome);
        true
    }

    /// Filter values offered by the held briefing
    pub fn filter_options(&self) -> FilterOptions {
        self.briefing()
            .map(|loaded| filter::filter_options(&loaded.payload))
            .unwrap_or_default()
    }

    /// Describe what should be on screen for the current state
    pub fn screen(&self, filters: &Filters, view: View) -> Screen {
        let loading = self.is_loading();

        let (header, body) = match &self.held {
            Held::Failed(_) if !loading => return render::render_failure(loading),
            Held::Failed(_) => (render::render_failure_summary(), None),
            Held::Nothing => (render::render_pending_summary(), None),
            Held::Briefing(loaded) => {
                let header = render::render_summary(&loaded.payload, loaded.used_fallback());
                let body = match view {
                    View::List => {
                        let items = filter::apply(normalize::normalize(&loaded.payload), filters);
                        match render::render_list(&items) {
                            BodyView::Empty(_) if loaded.payload.item_count() > 0 => {
                                BodyView::Empty(render::NO_MATCHES.to_string())
                            }
                            body => body,
                        }
                    }
                    View::Grouped => filter::render_grouped(&loaded.payload, filters),
                };
                (header, Some(body))
            }
        };

        let body = match body {
            Some(body) if !loading => body,
            _ => BodyView::Loading(render::LOADING.to_string()),
        };

        Screen {
            header,
            body,
            refresh: RefreshButton::new(loading),
        }
    }
}
