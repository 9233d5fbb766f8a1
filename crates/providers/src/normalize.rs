//! Maps raw upstream JSON into the shared [`ContentMetadata`], [`SearchHit`]
//! and [`Episode`] shapes.
//!
//! Upstream payloads are loosely typed: scalars arrive as strings or numbers,
//! label lists as bare strings or `{ "l": … }` objects, and episode counts
//! under any of several synonyms. All of that is resolved here and never
//! leaks past this module.

use futures::future::join_all;
use mirrorlens_core::types::{Category, Provider};
use serde_json::Value;
use tracing::debug;

use crate::client::CatalogApi;
use crate::config::{ProviderConfig, provider_config};
use crate::{ContentMetadata, Episode, NormalizeError, SearchHit, SeasonSummary};

const UNKNOWN: &str = "Unknown";

/// Language list fields, checked in order.
const LANGUAGE_FIELDS: &[&str] = &["lang", "d_lang"];

/// One entry of an upstream label list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LabelEntry {
    Text(String),
    Labelled(String),
}

impl LabelEntry {
    fn parse(v: &Value) -> Option<Self> {
        match v {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Object(map) => map
                .get("l")
                .and_then(Value::as_str)
                .map(|l| Self::Labelled(l.to_string())),
            _ => None,
        }
    }

    fn into_label(self) -> String {
        match self {
            Self::Text(s) | Self::Labelled(s) => unescape_html(s.trim()),
        }
    }
}

/// Accept an array of strings/labelled objects, or a single string.
fn labels(v: Option<&Value>) -> Vec<String> {
    let entries: Vec<LabelEntry> = match v {
        Some(Value::Array(items)) => items.iter().filter_map(LabelEntry::parse).collect(),
        Some(v @ Value::String(_)) => LabelEntry::parse(v).into_iter().collect(),
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .map(LabelEntry::into_label)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Non-empty string or number, as text.
fn scalar_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present scalar among `fields`.
fn first_text(raw: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| scalar_text(raw.get(*f)))
}

fn text_field(raw: &Value, fields: &[&str]) -> Option<String> {
    first_text(raw, fields).map(|s| unescape_html(&s))
}

/// Parse a count the lenient way upstream values need: leading digits of a
/// string, or an integral number. Zero and garbage are `None`.
fn positive_count(v: Option<&Value>) -> Option<u32> {
    let n = match v? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64))?,
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u64>().ok()?
        }
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

/// Undo the two entities upstream text is known to carry.
pub fn unescape_html(s: &str) -> String {
    s.replace("&amp;", "&").replace("&quot;", "\"")
}

/// `Series` iff the payload's season list is a non-empty array.
pub fn infer_category(raw: &Value) -> Category {
    match raw.get("season") {
        Some(Value::Array(seasons)) if !seasons.is_empty() => Category::Series,
        _ => Category::Movie,
    }
}

/// Whether a parseable payload signals that the content does not exist.
fn signals_absence(raw: &Value) -> bool {
    if !raw.is_object() {
        return true;
    }
    let has_title = raw
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());
    !has_title && raw.get("status").and_then(Value::as_str) != Some("y")
}

/// Episode count for one season, stopping at the first source that answers:
/// count fields, then an embedded episode list, then a live episodes fetch.
pub async fn resolve_episode_count(
    api: &dyn CatalogApi,
    cfg: &ProviderConfig,
    series_id: &str,
    season_id: &str,
    season: &Value,
) -> u32 {
    if let Some(n) = cfg.count_fields().find_map(|f| positive_count(season.get(f))) {
        return n;
    }

    if let Some(episodes) = season.get("episodes").and_then(Value::as_array) {
        if !episodes.is_empty() {
            return episodes.len() as u32;
        }
    }

    match api.fetch_episodes(series_id, season_id).await {
        Ok(raw) => raw
            .get("episodes")
            .and_then(Value::as_array)
            .map(|eps| eps.len() as u32)
            .unwrap_or(0),
        Err(e) => {
            debug!(
                provider = %cfg.provider,
                series_id,
                season_id,
                error = %e,
                "episode count fetch failed"
            );
            0
        }
    }
}

async fn normalize_season(
    api: &dyn CatalogApi,
    cfg: &ProviderConfig,
    series_id: &str,
    index: usize,
    season: &Value,
) -> SeasonSummary {
    let ordinal = (index + 1).to_string();
    let id = first_text(season, &["id", "sid"]).unwrap_or_else(|| ordinal.clone());
    let number = first_text(season, &["num", "number", "s"]).unwrap_or(ordinal);
    let episode_count = resolve_episode_count(api, cfg, series_id, &id, season).await;

    SeasonSummary {
        id,
        number,
        episode_count,
    }
}

/// Normalize a detail payload. Seasons resolve their counts concurrently and
/// keep upstream order.
pub async fn normalize_detail(
    api: &dyn CatalogApi,
    id: &str,
    raw: &Value,
) -> Result<ContentMetadata, NormalizeError> {
    if signals_absence(raw) {
        return Err(NormalizeError::NotFound);
    }

    let provider = api.provider();
    let cfg = provider_config(provider);
    let category = infer_category(raw);

    let languages = LANGUAGE_FIELDS
        .iter()
        .map(|f| labels(raw.get(*f)))
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let language = if languages.is_empty() {
        UNKNOWN.to_string()
    } else {
        languages.join(", ")
    };

    let genre = labels(raw.get("genre"));

    let seasons = match (category, raw.get("season").and_then(Value::as_array)) {
        (Category::Series, Some(items)) => Some(
            join_all(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, s)| normalize_season(api, cfg, id, i, s)),
            )
            .await,
        ),
        _ => None,
    };

    Ok(ContentMetadata {
        id: id.to_string(),
        provider,
        title: text_field(raw, &["title"]).unwrap_or_else(|| UNKNOWN.to_string()),
        year: first_text(raw, &["year"]).unwrap_or_else(|| UNKNOWN.to_string()),
        languages,
        language,
        category,
        genre: (!genre.is_empty()).then(|| genre.join(", ")),
        cast: text_field(raw, &["short_cast", "cast"]),
        rating: text_field(raw, &["ua"]),
        description: text_field(raw, &["desc"]),
        match_score: first_text(raw, &["match"]),
        runtime: first_text(raw, &["runtime"]),
        quality: first_text(raw, &["hdsd"]),
        creator: text_field(raw, &["creator"]),
        director: text_field(raw, &["director"]),
        content_warning: text_field(raw, &["m_reason"]),
        seasons,
    })
}

/// Normalize a search payload. A payload without a result list yields no hits.
pub fn normalize_search(provider: Provider, raw: &Value) -> Vec<SearchHit> {
    let cfg = provider_config(provider);
    let Some(items) = raw.get("searchResult").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = scalar_text(item.get("id"))?;
            Some(SearchHit {
                poster_url: cfg.poster_url(&id),
                title: text_field(item, &["t", "title"]).unwrap_or_else(|| UNKNOWN.to_string()),
                year: first_text(item, &["y", "year"]),
                duration_label: first_text(item, &["r"]),
                provider,
                id,
            })
        })
        .collect()
}

/// Normalize an episodes payload. No `episodes` array means nothing was found.
pub fn normalize_episodes(raw: &Value) -> Result<Vec<Episode>, NormalizeError> {
    let items = raw
        .get("episodes")
        .and_then(Value::as_array)
        .ok_or(NormalizeError::NotFound)?;

    Ok(items
        .iter()
        .map(|ep| Episode {
            id: first_text(ep, &["id"]).unwrap_or_default(),
            title: text_field(ep, &["t"]).unwrap_or_else(|| UNKNOWN.to_string()),
            season_number: first_text(ep, &["s"]).unwrap_or_else(|| UNKNOWN.to_string()),
            episode_number: first_text(ep, &["ep"]).unwrap_or_else(|| UNKNOWN.to_string()),
            description: text_field(ep, &["ep_desc"])
                .unwrap_or_else(|| "No description available".to_string()),
            duration_label: first_text(ep, &["time"]).unwrap_or_else(|| UNKNOWN.to_string()),
            completed_flag: first_text(ep, &["complate"]).unwrap_or_else(|| "0".to_string()),
        })
        .collect())
}
