//! # Briefing
//!
//! A terminal client for the compliance news briefing feed.
//!
//! ## Features
//!
//! - **Fallback Loading**: Fetches `latest.json`, falling back to the bundled `sample.json`
//! - **Normalization**: Flattens sections and segments into one newest-first list
//! - **Filtering**: By vertical and compliance focus, in a flat or grouped view
//! - **Pure Rendering**: Views are plain values, drawn by the CLI or the TUI

pub mod config;
pub mod controller;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod payload;
pub mod render;
pub mod ui;

pub use config::{Config, View};
pub use controller::{Phase, RefreshController};
pub use filter::{FilterOptions, Filters, Selection};
pub use loader::{BriefingSource, CombinedError, DataSource, FeedLoader, FetchError, Loaded, Origin};
pub use payload::BriefingPayload;
pub use render::Screen;
