//! Loading of the briefing payload with a single fallback attempt.
//!
//! Uses reqwest for HTTP sources; local files are read directly so a freshly
//! generated `artifacts/data/latest.json` can be previewed without a server.

use crate::config::{ConfigError, SourceConfig};
use crate::payload::BriefingPayload;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("briefing/", env!("CARGO_PKG_VERSION"));

/// Default timeout for HTTP requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: StatusCode },
    #[error("invalid briefing payload from {location}: {source}")]
    Decode {
        location: String,
        source: serde_json::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Both the primary and the fallback source failed
#[derive(Error, Debug)]
#[error("primary source failed ({primary}); fallback source failed ({fallback})")]
pub struct CombinedError {
    pub primary: FetchError,
    pub fallback: FetchError,
}

/// Which source produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Primary,
    Fallback,
}

/// A payload together with the source it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub payload: BriefingPayload,
    pub origin: Origin,
}

impl Loaded {
    pub fn used_fallback(&self) -> bool {
        self.origin == Origin::Fallback
    }
}

/// Where a payload lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Http(Url),
    File(PathBuf),
}

impl DataSource {
    /// Resolve a configured location.
    ///
    /// Absolute `http(s)` URLs are used as-is, `file://` URLs become paths,
    /// and anything else is joined onto `base` when given, or read from disk.
    pub fn resolve(base: Option<&Url>, location: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidLocation {
            location: location.to_string(),
            reason,
        };

        if let Ok(url) = Url::parse(location) {
            return match url.scheme() {
                "http" | "https" => Ok(DataSource::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(DataSource::File)
                    .map_err(|_| invalid("not a local file URL".to_string())),
                other => Err(invalid(format!("unsupported scheme '{}'", other))),
            };
        }

        match base {
            Some(base) => base
                .join(location)
                .map(DataSource::Http)
                .map_err(|e| invalid(e.to_string())),
            None => Ok(DataSource::File(PathBuf::from(location))),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Http(url) => write!(f, "{}", url),
            DataSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Anything that can produce a briefing payload
#[async_trait]
pub trait BriefingSource: Send + Sync {
    async fn load(&self) -> Result<Loaded, CombinedError>;
}

/// Run `primary`; only if it fails, run `secondary`.
///
/// Returns the first successful value with its origin, or both errors.
pub async fn with_fallback<T, P, PF, S, SF>(
    primary: P,
    secondary: S,
) -> Result<(T, Origin), CombinedError>
where
    P: FnOnce() -> PF,
    PF: Future<Output = Result<T, FetchError>>,
    S: FnOnce() -> SF,
    SF: Future<Output = Result<T, FetchError>>,
{
    let primary_err = match primary().await {
        Ok(value) => return Ok((value, Origin::Primary)),
        Err(e) => e,
    };

    warn!(error = %primary_err, "primary source failed, trying fallback");

    match secondary().await {
        Ok(value) => Ok((value, Origin::Fallback)),
        Err(fallback_err) => Err(CombinedError {
            primary: primary_err,
            fallback: fallback_err,
        }),
    }
}

/// Loads the live payload, falling back to the bundled sample
#[derive(Debug, Clone)]
pub struct FeedLoader {
    client: Client,
    primary: DataSource,
    fallback: DataSource,
}

/// Create a configured HTTP client
fn create_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

impl FeedLoader {
    pub fn new(
        primary: DataSource,
        fallback: DataSource,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = create_client(timeout)?;
        Ok(Self {
            client,
            primary,
            fallback,
        })
    }

    /// Build a loader from the `[source]` configuration table
    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        let base = config.base_url()?;
        let primary = DataSource::resolve(base.as_ref(), &config.primary)?;
        let fallback = DataSource::resolve(base.as_ref(), &config.fallback)?;
        Self::new(primary, fallback, config.timeout())
    }

    pub fn primary(&self) -> &DataSource {
        &self.primary
    }

    pub fn fallback(&self) -> &DataSource {
        &self.fallback
    }

    /// Fetch the live payload only
    pub async fn fetch_primary(&self) -> Result<BriefingPayload, FetchError> {
        self.fetch(&self.primary).await
    }

    /// Fetch the sample payload only
    pub async fn fetch_fallback(&self) -> Result<BriefingPayload, FetchError> {
        self.fetch(&self.fallback).await
    }

    /// Fetch and decode one payload with caching disabled
    pub async fn fetch(&self, source: &DataSource) -> Result<BriefingPayload, FetchError> {
        match source {
            DataSource::Http(url) => self.fetch_http(url).await,
            DataSource::File(path) => read_file(path).await,
        }
    }

    async fn fetch_http(&self, url: &Url) -> Result<BriefingPayload, FetchError> {
        debug!(%url, "fetching briefing");

        let response = self
            .client
            .get(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        let payload = BriefingPayload::from_slice(&body).map_err(|source| FetchError::Decode {
            location: url.to_string(),
            source,
        })?;

        info!(%url, items = payload.item_count(), "briefing fetched");
        Ok(payload)
    }

    /// Try the primary source, then the fallback
    pub async fn load_with_fallback(&self) -> Result<Loaded, CombinedError> {
        let (payload, origin) =
            with_fallback(|| self.fetch_primary(), || self.fetch_fallback()).await?;
        if origin == Origin::Fallback {
            info!(source = %self.fallback, "showing sample payload");
        }
        Ok(Loaded { payload, origin })
    }
}

#[async_trait]
impl BriefingSource for FeedLoader {
    async fn load(&self) -> Result<Loaded, CombinedError> {
        self.load_with_fallback().await
    }
}

async fn read_file(path: &Path) -> Result<BriefingPayload, FetchError> {
    debug!(path = %path.display(), "reading briefing file");

    let bytes = tokio::fs::read(path).await.map_err(|source| FetchError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    BriefingPayload::from_slice(&bytes).map_err(|source| FetchError::Decode {
        location: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn http_error(status: u16) -> FetchError {
        FetchError::Http {
            url: "http://localhost/data.json".to_string(),
            status: StatusCode::from_u16(status).unwrap(),
        }
    }

    #[tokio::test]
    async fn fallback_is_skipped_when_primary_succeeds() {
        let mut secondary_called = false;
        let result = with_fallback(
            || async { Ok::<_, FetchError>(1) },
            || {
                secondary_called = true;
                async { Ok(2) }
            },
        )
        .await
        .unwrap();

        assert_eq!(result, (1, Origin::Primary));
        assert!(!secondary_called);
    }

    #[tokio::test]
    async fn fallback_value_is_marked() {
        let result = with_fallback(|| async { Err(http_error(500)) }, || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(result, (2, Origin::Fallback));
    }

    #[tokio::test]
    async fn both_failures_are_reported() {
        let err = with_fallback::<u8, _, _, _, _>(
            || async { Err(http_error(500)) },
            || async { Err(http_error(404)) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err.primary, FetchError::Http { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert!(matches!(err.fallback, FetchError::Http { status, .. } if status == StatusCode::NOT_FOUND));
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("404"));
    }

    #[test]
    fn resolves_locations() {
        let base = Url::parse("https://example.org/briefing/").unwrap();

        assert_eq!(
            DataSource::resolve(Some(&base), "data/latest.json").unwrap(),
            DataSource::Http(Url::parse("https://example.org/briefing/data/latest.json").unwrap())
        );
        assert_eq!(
            DataSource::resolve(None, "data/latest.json").unwrap(),
            DataSource::File(PathBuf::from("data/latest.json"))
        );
        assert_eq!(
            DataSource::resolve(Some(&base), "https://cdn.example.org/latest.json").unwrap(),
            DataSource::Http(Url::parse("https://cdn.example.org/latest.json").unwrap())
        );
        assert!(matches!(
            DataSource::resolve(None, "ftp://example.org/latest.json"),
            Err(ConfigError::InvalidLocation { .. })
        ));
    }
}
