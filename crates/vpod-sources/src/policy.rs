//! Sensitive-query policy.
//!
//! Stock-video providers reject or poorly serve queries containing
//! sensitive terms. The policy removes matched terms from search queries
//! and substitutes curated safe proxy queries, recording everything it
//! did for the manifest. It only affects search queries, never episode
//! metadata.

use vpod_models::{normalize_spaces, QueryPolicy};

const SENSITIVE_TERMS: &[&str] = &[
    "prostitution",
    "porn",
    "pornography",
    "sex",
    "sexual",
    "escort",
    "brothel",
    "nude",
    "nudity",
    "fetish",
    "trafficking",
    "onlyfans",
];

/// Curated safe replacements per sensitive term.
fn proxy_queries_for(term: &str) -> &'static [&'static str] {
    match term {
        "prostitution" => &[
            "city streets at night",
            "police patrol car lights",
            "courthouse steps",
            "social services office",
            "public safety community outreach",
            "subway station at night",
            "city skyline night",
            "interview microphone street",
        ],
        "trafficking" => &[
            "police investigation",
            "courthouse steps",
            "community outreach",
            "public safety",
        ],
        "sex" => &["city streets at night", "courthouse steps", "public safety"],
        "porn" => &["computer screen blur", "internet safety", "data privacy"],
        "nude" => &["city skyline", "street interview"],
        _ => &[],
    }
}

/// Sensitive terms found anywhere in the episode text, sorted and unique.
fn detect_sensitive_terms(title: &str, desc: &str) -> Vec<String> {
    let text = format!("{} {}", title, desc).to_lowercase();
    let mut found: Vec<String> = SENSITIVE_TERMS
        .iter()
        .filter(|t| text.contains(*t))
        .map(|t| t.to_string())
        .collect();
    found.sort();
    found.dedup();
    found
}

/// City name inferred from the episode text, used to anchor proxy queries.
fn infer_location_prefix(title: &str, desc: &str) -> &'static str {
    let text = format!("{} {}", title, desc).to_lowercase();
    if text.contains("new york") || text.contains("nyc") {
        "new york city"
    } else if text.contains("los angeles") || text.contains("la ") {
        "los angeles"
    } else if text.contains("washington dc") || text.contains("capitol") {
        "washington dc"
    } else {
        ""
    }
}

/// Remove `term` from `query` as a whole word. Returns the cleaned query
/// and whether anything was removed.
fn remove_whole_word(query: &str, term: &str) -> (String, bool) {
    let mut changed = false;
    let kept: Vec<&str> = query
        .split_whitespace()
        .filter(|w| {
            let word = w
                .trim_matches(|c: char| !c.is_ascii_alphanumeric())
                .to_lowercase();
            if word == term {
                changed = true;
                false
            } else {
                true
            }
        })
        .collect();
    (kept.join(" "), changed)
}

/// Filter unsafe search tokens and add safe proxy queries.
///
/// For each query containing a detected term the term is removed as a
/// whole word; queries reduced to a single token or nothing are dropped.
/// Proxy queries for every matched term are appended (city-prefixed when
/// a location is inferred), preferring filtered originals over proxies.
/// The result is capped at `max_queries`.
///
/// Filtering is idempotent: an already-filtered list passes through
/// unchanged for the same title/description.
pub fn apply_sensitive_query_policy(
    title: &str,
    desc: &str,
    queries: &[String],
    max_queries: usize,
) -> (Vec<String>, QueryPolicy) {
    let original: Vec<String> = queries
        .iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    let found = detect_sensitive_terms(title, desc);
    let prefix = infer_location_prefix(title, desc);

    let mut filtered: Vec<String> = Vec::new();
    let mut dropped: Vec<String> = Vec::new();

    for q in &original {
        let mut cleaned = q.clone();
        let mut changed = false;
        for term in &found {
            let (next, hit) = remove_whole_word(&cleaned, term);
            cleaned = next;
            changed |= hit;
        }
        let cleaned = normalize_spaces(&cleaned);
        if cleaned.is_empty() {
            dropped.push(q.clone());
            continue;
        }
        // A single leftover token is too generic to search on.
        if changed && cleaned.split(' ').count() < 2 {
            dropped.push(q.clone());
            continue;
        }
        if !filtered.contains(&cleaned) {
            filtered.push(cleaned);
        }
    }

    let mut proxies: Vec<String> = Vec::new();
    if !found.is_empty() {
        let mut seen: Vec<String> = Vec::new();
        for term in &found {
            for p in proxy_queries_for(term) {
                let mut pp = normalize_spaces(p);
                if pp.is_empty() {
                    continue;
                }
                if !prefix.is_empty() {
                    pp = normalize_spaces(&format!("{} {}", prefix, pp));
                }
                let key = pp.to_lowercase();
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);
                proxies.push(pp);
            }
        }
    }

    // Combine, preferring filtered originals over proxies.
    let mut combined: Vec<String> = Vec::new();
    for q in &filtered {
        if combined.len() >= max_queries {
            break;
        }
        combined.push(q.clone());
    }
    for p in &proxies {
        if combined.len() >= max_queries {
            break;
        }
        if !combined.contains(p) {
            combined.push(p.clone());
        }
    }

    let policy = QueryPolicy {
        sensitive_detected: !found.is_empty(),
        matched_terms: found,
        location_prefix: prefix.to_string(),
        queries_original: original,
        queries_filtered: combined.clone(),
        queries_dropped: dropped,
        proxy_queries_added: proxies,
    };
    (combined, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_episode_passes_through() {
        let queries = strings(&["city hall meeting", "budget hearing"]);
        let (filtered, policy) =
            apply_sensitive_query_policy("City budget", "annual review", &queries, 12);
        assert_eq!(filtered, queries);
        assert!(!policy.sensitive_detected);
        assert!(policy.proxy_queries_added.is_empty());
    }

    #[test]
    fn test_term_removed_as_whole_word() {
        let queries = strings(&["trafficking investigation downtown"]);
        let (filtered, policy) = apply_sensitive_query_policy(
            "Human trafficking investigation",
            "",
            &queries,
            12,
        );
        assert_eq!(filtered[0], "investigation downtown");
        assert!(policy.sensitive_detected);
        assert!(policy.matched_terms.contains(&"trafficking".to_string()));
    }

    #[test]
    fn test_single_token_residue_dropped_and_proxies_added() {
        let queries = strings(&["trafficking ring"]);
        let (filtered, policy) =
            apply_sensitive_query_policy("trafficking report", "", &queries, 12);
        assert!(policy.queries_dropped.contains(&"trafficking ring".to_string()));
        // Proxies fill in for the dropped query.
        assert!(filtered.contains(&"police investigation".to_string()));
    }

    #[test]
    fn test_location_prefix_on_proxies() {
        let queries = strings(&["trafficking ring"]);
        let (_, policy) =
            apply_sensitive_query_policy("NYC trafficking report", "", &queries, 12);
        assert_eq!(policy.location_prefix, "new york city");
        assert!(policy
            .proxy_queries_added
            .iter()
            .all(|p| p.starts_with("new york city ")));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let queries = strings(&[
            "trafficking investigation downtown",
            "city council session",
        ]);
        let title = "Human trafficking investigation";
        let (first, _) = apply_sensitive_query_policy(title, "", &queries, 12);
        let (second, _) = apply_sensitive_query_policy(title, "", &first, 12);
        assert_eq!(first, second);
    }

    #[test]
    fn test_substring_match_does_not_split_words() {
        // "sex" is detected in "sexual" but must not be cut out of the
        // middle of other words in queries.
        let queries = strings(&["sussex county fair"]);
        let (filtered, _) =
            apply_sensitive_query_policy("sexual health education", "", &queries, 12);
        assert!(filtered.contains(&"sussex county fair".to_string()));
    }
}
