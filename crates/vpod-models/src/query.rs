//! Tiered search queries and the sensitive-query policy record.

use serde::{Deserialize, Serialize};

/// Priority rank of a search query or the asset it returned.
///
/// Tier 1 carries near-exact title phrases, Tier 2 extracted keywords,
/// Tier 3 generic safe fallbacks. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Title,
    Keyword,
    Generic,
}

impl Tier {
    /// Numeric rank (1 is highest precision).
    pub fn rank(self) -> u8 {
        match self {
            Tier::Title => 1,
            Tier::Keyword => 2,
            Tier::Generic => 3,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Tier::Title),
            2 => Ok(Tier::Keyword),
            3 => Ok(Tier::Generic),
            other => Err(format!("invalid tier: {}", other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(t: Tier) -> u8 {
        t.rank()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rank())
    }
}

/// One planned search query with its tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    pub tier: Tier,
    pub query: String,
}

impl QueryItem {
    pub fn new(tier: Tier, query: impl Into<String>) -> Self {
        Self {
            tier,
            query: query.into(),
        }
    }
}

/// Audit record of the sensitive-term filter applied to search queries.
///
/// Produced once per episode and recorded verbatim in the manifest.
/// The filter only affects search queries, never episode metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPolicy {
    pub sensitive_detected: bool,
    pub matched_terms: Vec<String>,
    pub location_prefix: String,
    pub queries_original: Vec<String>,
    pub queries_filtered: Vec<String>,
    pub queries_dropped: Vec<String>,
    pub proxy_queries_added: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Title < Tier::Keyword);
        assert!(Tier::Keyword < Tier::Generic);
        assert_eq!(Tier::try_from(2).unwrap(), Tier::Keyword);
        assert!(Tier::try_from(4).is_err());
    }

    #[test]
    fn test_tier_serde_roundtrip() {
        let item = QueryItem::new(Tier::Title, "city skyline");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"tier\":1"));
        let back: QueryItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
