//! Provider homepage feed: featured slider plus grouped poster id lists.

use mirrorlens_core::types::{FreshPoster, SliderItem};
use serde_json::Value;
use tracing::debug;

use crate::FetchError;
use crate::client::ProviderClient;
use crate::config::{MOBILE_USER_AGENT, ProviderConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterFeed {
    pub slider: Vec<SliderItem>,
    /// Every listed id in feed order. May contain duplicates across groups.
    pub items: Vec<FreshPoster>,
}

/// Fetch and parse the provider's homepage feed. `None` if it publishes none.
pub async fn fetch_poster_feed(client: &ProviderClient) -> Option<Result<PosterFeed, FetchError>> {
    let raw = client.fetch_homepage(MOBILE_USER_AGENT).await?;
    Some(raw.map(|raw| {
        let feed = parse_feed(client.config(), &raw);
        debug!(
            provider = %client.config().provider,
            slider = feed.slider.len(),
            items = feed.items.len(),
            "poster feed parsed"
        );
        feed
    }))
}

fn opt_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ids arrive as one comma-separated string (occasionally an array).
fn split_ids(v: Option<&Value>) -> Vec<String> {
    let joined = match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| opt_text(Some(i)))
            .collect::<Vec<_>>()
            .join(","),
        _ => return Vec::new(),
    };
    joined
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_feed(cfg: &ProviderConfig, raw: &Value) -> PosterFeed {
    let slider = raw
        .get("slider")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|s| SliderItem {
                    id: opt_text(s.get("id")),
                    poster: opt_text(s.get("img")),
                    desc: opt_text(s.get("desc")).unwrap_or_default(),
                    ua: opt_text(s.get("ua")).unwrap_or_default(),
                    namelogo: opt_text(s.get("namelogo")),
                })
                .collect()
        })
        .unwrap_or_default();

    let mut items = Vec::new();
    for group in raw.get("post").and_then(Value::as_array).into_iter().flatten() {
        let category = opt_text(group.get("cate"));
        for id in split_ids(group.get("ids")) {
            items.push(FreshPoster {
                poster: cfg.poster_url(&id),
                category: category.clone(),
                id,
            });
        }
    }

    PosterFeed { slider, items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::provider_config;
    use mirrorlens_core::types::Provider;
    use serde_json::json;

    #[test]
    fn flattens_groups_and_keeps_order() {
        let raw = json!({
            "slider": [
                {"id": "0A", "img": "https://cdn/x.jpg", "desc": "Top pick", "ua": "U/A 13+", "namelogo": "https://cdn/logo.png"},
                {"img": null}
            ],
            "post": [
                {"cate": "Trending", "ids": "1, 2,,3 "},
                {"cate": "", "ids": "3,4"},
                {"ids": null},
                null
            ]
        });

        let feed = parse_feed(provider_config(Provider::AmazonPrime), &raw);
        assert_eq!(feed.slider.len(), 2);
        assert_eq!(feed.slider[0].ua, "U/A 13+");
        assert_eq!(feed.slider[1], SliderItem::default());

        let ids: Vec<_> = feed.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "3", "4"]);
        assert_eq!(feed.items[0].category.as_deref(), Some("Trending"));
        assert_eq!(feed.items[3].category, None);
        assert!(feed.items[4].poster.ends_with("/pv/v/4.jpg&w=500"));
    }

    #[test]
    fn garbage_feed_is_empty() {
        let cfg = provider_config(Provider::AmazonPrime);
        assert_eq!(parse_feed(cfg, &json!("nope")), PosterFeed::default());
        assert_eq!(parse_feed(cfg, &json!({"post": {"ids": "1"}})), PosterFeed::default());
    }
}
