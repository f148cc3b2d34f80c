//! Stat source abstraction.

use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use super::types::{ApiResponse, Media, ServerInfo, Sessions};

/// The three sub-fetches of a scrape cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ApiMethod {
    #[strum(serialize = "GetServer")]
    Server,
    #[strum(serialize = "GetMedia")]
    Media,
    #[strum(serialize = "GetSessions")]
    Sessions,
}

impl ApiMethod {
    /// API path relative to the target's base address.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Server => "/flussonic/api/server",
            Self::Media => "/flussonic/api/media",
            Self::Sessions => "/flussonic/api/sessions",
        }
    }
}

/// Errors that can occur while fetching statistics from a target.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure (connect, TLS, reset, ...).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Non-2xx response.
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Body is not the expected JSON.
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_owned(),
            }
        } else {
            Self::Transport {
                url: url.to_owned(),
                source: err,
            }
        }
    }
}

/// Source of runtime statistics for one target.
///
/// Each call is an independent request; implementations must not retry.
#[async_trait::async_trait]
pub trait StatSource: Send + Sync + 'static {
    /// Server-wide statistics.
    async fn server(&self) -> Result<ApiResponse<ServerInfo>, FetchError>;

    /// Stream listing with per-stream statistics.
    async fn media(&self) -> Result<ApiResponse<Media>, FetchError>;

    /// Session listing aggregated per stream.
    async fn sessions(&self) -> Result<ApiResponse<Sessions>, FetchError>;
}
