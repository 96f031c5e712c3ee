//! Word-level text helpers shared by the scorer, extractor and planner.

use mesh_core::ActionDescriptor;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("static pattern"));

/// Words that carry no intent.
pub(crate) const STOPWORDS: &[&str] = &[
    "a", "an", "the", "for", "of", "to", "with", "and", "or", "in", "on", "at", "by", "from",
    "as", "is", "are", "be", "was", "my", "our", "their", "his", "her", "its", "me", "we", "i",
    "you", "your", "they", "them", "it", "this", "that", "these", "those", "any", "all", "some",
    "if", "new", "existing", "id", "please", "based", "insurance", "s",
];

/// Verbs that introduce a request even though no description starts with them.
pub(crate) const VERB_SYNONYMS: &[&str] = &["show", "check", "find", "look"];

/// Words normalised to the verb descriptions actually use.
const SYNONYMS: &[(&str, &str)] = &[
    ("show", "get"),
    ("view", "get"),
    ("fetch", "get"),
    ("retrieve", "get"),
    ("find", "get"),
    ("display", "get"),
    ("look", "get"),
    ("file", "submit"),
    ("lodge", "submit"),
];

pub(crate) fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Light plural stemming: `policies` → `policy`, `claims` → `claim`.
pub(crate) fn stem(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if word.len() > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
    {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn normalise(word: &str) -> String {
    let stemmed = stem(word);
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == stemmed)
        .map(|(_, to)| to.to_string())
        .unwrap_or(stemmed)
}

/// Lowercase alphabetic words of `text`, in order.
pub(crate) fn words(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Stemmed, synonym-normalised words of `text` with stopwords removed.
pub(crate) fn content_words(text: &str) -> Vec<String> {
    words(text)
        .iter()
        .filter(|w| !is_stopword(w))
        .map(|w| normalise(w))
        .collect()
}

/// `getClaimsSummary` → `["get", "claims", "summary"]`.
pub(crate) fn split_camel(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if (c.is_uppercase() || c == '_') && !current.is_empty() {
            parts.push(current.to_lowercase());
            current.clear();
        }
        if c != '_' {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current.to_lowercase());
    }
    parts
}

/// The words a request has to share with an action to be about it.
pub(crate) fn descriptor_keywords(descriptor: &ActionDescriptor) -> BTreeSet<String> {
    let mut keywords: BTreeSet<String> = content_words(&descriptor.description)
        .into_iter()
        .collect();
    keywords.extend(content_words(&split_camel(&descriptor.name).join(" ")));
    keywords
}

/// First word of a description, lowercased: the action's verb.
pub(crate) fn leading_verb(description: &str) -> Option<String> {
    WORD.find(description).map(|m| m.as_str().to_lowercase())
}
