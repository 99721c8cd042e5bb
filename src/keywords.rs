use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Topic id → representative keywords, read-only for the dashboard lifetime.
pub type TopicKeywords = BTreeMap<String, Vec<String>>;

/// Compiled-in fallback mirroring the upstream topic model's negative topics,
/// used when `topic_keywords.json` is absent.
pub fn default_topic_keywords() -> TopicKeywords {
    let mut map = BTreeMap::new();
    for (id, words) in [
        ("1", ["login", "app", "open", "otp", "verification"]),
        ("2", ["payment", "transaction", "money", "account", "bank"]),
        ("3", ["update", "version", "new", "work", "crash"]),
        ("4", ["reward", "point", "redeem", "offer", "discount"]),
    ] {
        map.insert(id.to_string(), words.iter().map(|s| s.to_string()).collect());
    }
    map
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "it", "to", "and", "of", "for", "in", "on", "with", "this",
        "that", "app", "i", "my", "me", "not", "very", "good", "bad", "nice", "like", "just",
        "now", "would", "could", "get", "go", "want", "see", "use",
    ]
    .into_iter()
    .collect()
});

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]{3,}\b").unwrap());
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

/// Top-n most frequent non-stop-word tokens across `texts`, as
/// `(token, count)`. Tokens are lowercase alphabetic runs of length ≥ 3;
/// ties keep first-encountered order.
pub fn top_keywords<S: AsRef<str>>(texts: &[S], n: usize) -> Vec<(String, u32)> {
    let mut counts: HashMap<String, (u32, usize)> = HashMap::new();
    let mut order = 0usize;

    for text in texts {
        let lowered = text.as_ref().to_lowercase();
        for m in TOKEN_RE.find_iter(&lowered) {
            let word = m.as_str();
            if STOP_WORDS.contains(word) {
                continue;
            }
            let entry = counts.entry(word.to_string()).or_insert_with(|| {
                order += 1;
                (0, order)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, u32, usize)> =
        counts.into_iter().map(|(w, (c, o))| (w, c, o)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(n);
    ranked.into_iter().map(|(w, c, _)| (w, c)).collect()
}

/// `"Topic 2"` → `"Topic 2 (payment, transaction, money...)"` when the id has
/// a keyword entry; missing labels render as `"Unknown"`, unmapped labels
/// pass through untouched.
pub fn format_topic_label(label: Option<&str>, keywords: &TopicKeywords) -> String {
    let label = match label {
        Some(l) if !l.trim().is_empty() => l,
        _ => return "Unknown".to_string(),
    };

    if let Some(m) = DIGITS_RE.find(label) {
        if let Some(words) = keywords.get(m.as_str()) {
            let head = words.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
            return format!("Topic {} ({}...)", m.as_str(), head);
        }
    }
    label.to_string()
}
