//! Tiered search query planning.
//!
//! Tier 1 is high-precision title phrases, Tier 2 extracted keywords and
//! leftover short phrases, Tier 3 safe generic fallbacks. The planner is
//! total over any input: an empty title/description still yields the
//! generic queries.

use std::collections::HashMap;

use vpod_models::{normalize_spaces, QueryItem, Tier};

/// Generic fallbacks, tuned for podcast/news style episodes.
const GENERIC_QUERIES: &[&str] = &[
    "podcast microphone",
    "news studio",
    "city skyline",
    "world map",
    "finance chart",
    "crowd street",
];

const STOP_WORDS: &[&str] = &[
    "that", "this", "with", "from", "your", "about", "into", "have", "will", "they", "them",
    "what", "when", "where", "which", "their", "there", "were", "been", "also", "more", "over",
    "under", "than", "then", "very", "much", "most", "some", "just", "like", "because", "after",
    "before", "again", "today",
];

fn is_stop_word(w: &str) -> bool {
    STOP_WORDS.contains(&w)
}

/// Strip URLs, markup, and punctuation, leaving space-separated tokens.
fn clean_for_tokens(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for word in s.split_whitespace() {
        if word.starts_with("http://") || word.starts_with("https://") {
            out.push(' ');
            continue;
        }
        for c in word.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if in_tag => {}
                _ if c.is_ascii_alphanumeric() => out.push(c),
                _ => out.push(' '),
            }
        }
        out.push(' ');
    }
    normalize_spaces(&out)
}

/// Tier-1 phrases: the exact title first, then 4/3/2-word sliding
/// windows that are not mostly stop-words. Capped at `max_phrases`.
fn title_phrases(title: &str, max_phrases: usize) -> Vec<String> {
    let cleaned = clean_for_tokens(title);
    if cleaned.is_empty() {
        return Vec::new();
    }
    let words: Vec<&str> = cleaned.split(' ').collect();

    let mut phrases: Vec<String> = vec![title.trim().to_string()];
    for n in [4usize, 3, 2] {
        if words.len() < n {
            continue;
        }
        for window in words.windows(n) {
            let stops = window
                .iter()
                .filter(|w| is_stop_word(&w.to_lowercase()))
                .count();
            if stops >= n - 1 {
                continue;
            }
            let phrase = window.join(" ");
            if !phrase.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
            if phrases.len() >= max_phrases {
                return phrases;
            }
        }
    }
    phrases.truncate(max_phrases);
    phrases
}

/// Top keywords by frequency (ties alphabetical), at least four
/// characters and not stop-words.
fn keywords(text: &str, max_k: usize) -> Vec<String> {
    let cleaned = clean_for_tokens(text).to_lowercase();
    if cleaned.is_empty() {
        return Vec::new();
    }
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for w in cleaned.split(' ') {
        if w.len() >= 4 && !is_stop_word(w) {
            *freq.entry(w).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(max_k)
        .map(|(w, _)| w.to_string())
        .collect()
}

/// Build tiered search queries for an episode.
///
/// Every query is prefixed with `location_prefix` when supplied, then
/// deduplicated case-insensitively keeping the lowest tier, and
/// truncated to `max_queries`.
pub fn build_tiered_queries(
    title: &str,
    desc: &str,
    max_queries: usize,
    location_prefix: &str,
) -> Vec<QueryItem> {
    let title = title.trim();
    let desc = desc.trim();
    let prefix = normalize_spaces(location_prefix);

    let t1 = if title.is_empty() {
        Vec::new()
    } else {
        title_phrases(title, 6)
    };
    let kw = keywords(&format!("{} {}", title, desc), 10);

    let mut t2: Vec<String> = Vec::new();
    for w in kw {
        if !t2.contains(&w) {
            t2.push(w);
        }
    }
    // Prefer a few short phrases derived from the title.
    for ph in t1.iter().skip(1) {
        if !t2.contains(ph) {
            t2.push(ph.clone());
        }
    }

    let mut out: Vec<QueryItem> = Vec::new();
    for q in &t1 {
        out.push(QueryItem::new(Tier::Title, q.clone()));
    }
    for q in &t2 {
        out.push(QueryItem::new(Tier::Keyword, q.clone()));
    }
    for q in GENERIC_QUERIES {
        out.push(QueryItem::new(Tier::Generic, *q));
    }

    // Dedupe while keeping the best tier (entries are already tier-ordered).
    let mut seen: Vec<String> = Vec::new();
    let mut deduped: Vec<QueryItem> = Vec::new();
    for item in out {
        let mut q = normalize_spaces(&item.query);
        if !prefix.is_empty() {
            q = normalize_spaces(&format!("{} {}", prefix, q));
        }
        if q.is_empty() {
            continue;
        }
        let key = q.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        deduped.push(QueryItem::new(item.tier, q));
        if deduped.len() >= max_queries {
            break;
        }
    }
    deduped
}

/// Flat query list in tier order, for callers that ignore tiers.
pub fn text_queries(title: &str, desc: &str, max_queries: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in build_tiered_queries(title, desc, max_queries, "") {
        let q = item.query.trim().to_string();
        if !q.is_empty() && !out.contains(&q) {
            out.push(q);
        }
        if out.len() >= max_queries {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_is_first_tier1_entry() {
        let queries = build_tiered_queries("Title word word", "", 12, "");
        assert_eq!(queries[0].tier, Tier::Title);
        assert_eq!(queries[0].query, "Title word word");
    }

    #[test]
    fn test_empty_inputs_fall_back_to_generics() {
        let queries = build_tiered_queries("", "", 12, "");
        assert!(!queries.is_empty());
        assert!(queries.iter().all(|q| q.tier == Tier::Generic));
        assert_eq!(queries[0].query, "podcast microphone");
    }

    #[test]
    fn test_location_prefix_applied() {
        let queries = build_tiered_queries("City Budget Hearing", "", 12, "new york city");
        assert!(queries.iter().all(|q| q.query.starts_with("new york city ")));
    }

    #[test]
    fn test_max_queries_cap() {
        let queries = build_tiered_queries(
            "Mayor announces sweeping transit changes downtown",
            "subway buses ferries commuters transit downtown",
            5,
            "",
        );
        assert_eq!(queries.len(), 5);
    }

    #[test]
    fn test_dedup_keeps_lowest_tier() {
        // "city skyline" is both a generic fallback and a title phrase here.
        let queries = build_tiered_queries("city skyline", "", 12, "");
        let hits: Vec<_> = queries
            .iter()
            .filter(|q| q.query.eq_ignore_ascii_case("city skyline"))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tier, Tier::Title);
    }

    #[test]
    fn test_keywords_ranked_by_frequency_then_alpha() {
        let kw = keywords("apple banana banana cherry apple banana", 3);
        assert_eq!(kw, vec!["banana", "apple", "cherry"]);
    }

    #[test]
    fn test_stop_word_windows_skipped() {
        let phrases = title_phrases("there will been that", 6);
        // Only the raw title survives; every window is stop-words.
        assert_eq!(phrases.len(), 1);
    }

    #[test]
    fn test_urls_stripped_from_tokens() {
        assert_eq!(
            clean_for_tokens("listen https://example.com/x now!"),
            "listen now"
        );
    }
}
