pub mod client;
pub mod config;
pub mod feed;
pub mod normalize;
pub mod search;
pub mod token;

use mirrorlens_core::types::{Category, Provider};
use thiserror::Error;

/// Transport or shape failure talking to an upstream catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),
    #[error("upstream returned an empty body")]
    EmptyBody,
    #[error("upstream returned malformed JSON: {0}")]
    MalformedJson(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// The session credential could not be obtained.
///
/// Non-fatal: callers proceed without a `Cookie` header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Well-formed upstream response that signals the content does not exist.
    #[error("content not found")]
    NotFound,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Normalized detail record for a movie or series.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub id: String,
    pub provider: Provider,
    pub title: String,
    pub year: String,
    pub languages: Vec<String>,
    /// `languages` joined for display, or `"Unknown"`.
    pub language: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Vec<SeasonSummary>>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSummary {
    pub id: String,
    pub number: String,
    /// 0 means no source could tell; it is not an error.
    pub episode_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    #[serde(rename = "season")]
    pub season_number: String,
    #[serde(rename = "episode")]
    pub episode_number: String,
    pub description: String,
    #[serde(rename = "duration")]
    pub duration_label: String,
    #[serde(rename = "completed")]
    pub completed_flag: String,
}

/// One search result. `(provider, id)` identifies it within a response.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub provider: Provider,
    #[serde(rename = "poster")]
    pub poster_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_label: Option<String>,
}
