use serde::{Deserialize, Serialize};

/// Upstream catalog a piece of content comes from.
///
/// Declaration order is the merge order of aggregated search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "netflix")]
    Netflix,
    #[serde(rename = "amazon-prime")]
    AmazonPrime,
    #[serde(rename = "jio-hotstar")]
    JioHotstar,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Self::Netflix, Self::AmazonPrime, Self::JioHotstar];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Netflix => "netflix",
            Self::AmazonPrime => "amazon-prime",
            Self::JioHotstar => "jio-hotstar",
        }
    }

    /// Parse a route slug. Accepts the short aliases the UI also uses.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.trim().to_ascii_lowercase().as_str() {
            "netflix" => Some(Self::Netflix),
            "amazon-prime" | "prime" => Some(Self::AmazonPrime),
            "jio-hotstar" | "hotstar" => Some(Self::JioHotstar),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content category, inferred from the presence of seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Movie,
    Series,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Series => "Series",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Featured banner entry from a provider's poster feed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SliderItem {
    pub id: Option<String>,
    pub poster: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub ua: String,
    pub namelogo: Option<String>,
}

/// Poster listing as scraped from a feed, before merging into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshPoster {
    pub id: String,
    pub poster: String,
    #[serde(rename = "cate", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
