//! Crisis keyword lexicon.
//!
//! Terms match case-insensitively on word boundaries, so "die" flags
//! "I want to die" but not "diet" or "studied". Typographic apostrophes are
//! folded to ASCII before matching.

/// Self-harm, hopelessness and suicidal-ideation terms, in report order.
pub const CRISIS_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "hurt myself",
    "self harm",
    "self-harm",
    "end my life",
    "ending my life",
    "can't go on",
    "cant go on",
    "hopeless",
    "worthless",
    "overdose",
    "cutting",
    "bleeding",
    "die",
    "want to die",
    "give up",
];

/// Crisis keywords found in `text`, in lexicon order.
#[must_use]
pub fn scan(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    CRISIS_KEYWORDS
        .iter()
        .filter(|kw| contains_term(&normalized, kw))
        .map(|kw| (*kw).to_owned())
        .collect()
}

/// Scan several texts and merge the hits, first occurrence wins.
#[must_use]
pub fn scan_all(texts: &[&str]) -> Vec<String> {
    let mut hits: Vec<String> = Vec::new();
    for text in texts {
        for keyword in scan(text) {
            if !hits.contains(&keyword) {
                hits.push(keyword);
            }
        }
    }
    hits
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
