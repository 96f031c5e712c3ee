//! Pattern-based argument extraction.
//!
//! What to look for is decided per parameter from its kind and the words in
//! its name: `policyNumber` wants a `POL-…` identifier, `claimType` wants the
//! word before "claim", `age` wants "42 years old", and so on. Values are
//! typed by kind where possible; the registry coerces anything left as text.

use crate::text::{STOPWORDS, descriptor_keywords, split_camel, stem, words};
use mesh_core::{ActionDescriptor, ArgValue, Arguments, ParamKind, ParameterSpec};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::{LazyLock, Mutex, PoisonError};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect("static pattern"));
    };
}

pattern!(
    PERSON,
    r"\b(?:[Ff]or|[Nn]amed|[Aa]pplicant|[Cc]ustomer|[Cc]lient|[Ii]nsured)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"
);
pattern!(PERCENT, r"(?i)(\d+(?:\.\d+)?)\s*(?:%|percent\b)");
pattern!(
    AGE,
    r"(?i)\b(\d{1,3})[\s-]*(?:years?|yrs?)[\s-]*old\b|\baged?\s*:?\s*(\d{1,3})\b"
);
pattern!(
    YEARS,
    r"(?i)\b(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten|fifteen|twenty|thirty)[\s-]*(?:years?|yrs?)\b(\s*old)?"
);
pattern!(
    RATING,
    r"(?i)\b([0-5])\s*(?:/\s*5|stars?|out\s+of\s+5)|\brat(?:ed|ing)\s*(?:of\s*)?:?\s*([0-5])\b"
);
pattern!(
    MONEY,
    r"(?i)\$\s*(\d[\d,]*(?:\.\d+)?)(?:\s*(k|m|thousand|million)\b)?|\b(\d[\d,]*(?:\.\d+)?)\s*(?:dollars|usd)\b"
);
pattern!(
    BARE_NUMBER,
    r"(?i)\b(\d[\d,]*(?:\.\d+)?)(\s*(?:%|percent|years?|yrs?|stars?|old|days?|months?))?"
);
pattern!(QUOTED, r#""([^"]+)""#);
pattern!(
    REASON,
    r"(?i)\b(?:because(?:\s+of)?|due\s+to|reason(?:\s+being)?\s*[:=]?)\s+(.+?)\s*(?:[.;]|$)"
);
pattern!(
    DECISION,
    r"(?i)\b(approve|approved|accept|accepted|decline|declined|deny|denied|reject|rejected)\b"
);
pattern!(
    DATE,
    r"(?i)\b\d{4}-\d{2}-\d{2}\b|\b(?:tomorrow|today|next\s+(?:week|month|monday|tuesday|wednesday|thursday|friday|saturday|sunday)|(?:on\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b"
);
pattern!(
    METHOD,
    r"(?i)\b(credit\s+card|debit\s+card|bank\s+transfer|wire\s+transfer|direct\s+deposit|cheque|ach|paypal|cash)\b|\b(?:by|via|using)\s+(check)\b"
);
pattern!(
    FIELD,
    r"(?i)\b(?:update|change|set)\s+(?:the\s+|their\s+|my\s+|his\s+|her\s+)?(?:customer\s+|policy\s+)?([a-z]+)"
);
pattern!(
    NEW_VALUE,
    r"(?i)\bto\s+(.+?)(?:\s+for\s+(?:customer|policy|client)\b|[,;]|$)"
);
pattern!(
    NO_CONDITIONS,
    r"(?i)\b(?:no|without\s+(?:any\s+)?)\s*pre-?existing\s+conditions?\b"
);
pattern!(
    CONDITIONS,
    r"(?i)pre-?existing\s+conditions?\s*(?:of|:|=|including|like|such\s+as)?\s*([a-z][a-z ]*?)\s*(?:[,;.]|$)"
);
pattern!(FOR, r"(?i)\bfor\s+");
pattern!(ABOUT, r"(?i)\babout\s+(?:my\s+|their\s+|the\s+|a\s+|an\s+)?([a-z]+)");
pattern!(ABOUT_TAIL, r"(?i)\babout\s+(.+?)\s*[.?!]?$");
pattern!(ID_LIKE, r"\b[A-Z]{2,5}-\d");
pattern!(CLAUSE_SPLIT, r"[,;:]");

/// Patterns built from parameter names, compiled on first use.
static DERIVED: LazyLock<Mutex<HashMap<String, Regex>>> = LazyLock::new(Default::default);

fn derived(pattern: String) -> Option<Regex> {
    let mut cache = DERIVED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = cache.get(&pattern) {
        return Some(re.clone());
    }
    let re = Regex::new(&pattern).ok()?;
    cache.insert(pattern, re.clone());
    Some(re)
}

/// Words that never name a type, category or person.
const NOT_A_VALUE: &[&str] = &[
    "submit", "file", "create", "open", "get", "check", "show", "process", "approve", "deny",
    "cancel", "renew", "update", "list", "calculate", "pay", "make", "request", "assess",
    "evaluate", "generate", "set", "handle", "schedule", "pending", "active", "additional",
    "current", "recent", "total", "same", "each", "every", "another", "other", "more", "no",
    "policy", "claim", "customer", "client", "application", "need", "needs",
];

/// Words after "for" that point at a record rather than describe something.
const REFERENCE_WORDS: &[&str] = &["policy", "claim", "customer", "client", "application", "applicant"];

/// What a parameter is looking for.
#[derive(Debug, Clone, PartialEq)]
enum Role {
    Identifier(String),
    PersonName,
    Kind(String),
    Category(String),
    Percentage,
    Amount(Vec<String>),
    Age,
    Years,
    Rating,
    Number,
    Flag(String),
    Reason,
    Decision,
    Date,
    Method,
    Field,
    NewValue,
    Conditions,
    Narrative,
    FreeText,
}

impl Role {
    fn classify(spec: &ParameterSpec) -> Role {
        let words = split_camel(&spec.name);
        let has = |w: &str| words.iter().any(|x| x == w);
        let first = words.first().map(String::as_str).unwrap_or_default();
        let last = words.last().map(String::as_str).unwrap_or_default();

        match spec.kind {
            ParamKind::Boolean => Role::Flag(
                words
                    .iter()
                    .filter(|w| !matches!(w.as_str(), "is" | "has"))
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            ParamKind::Decimal if words.iter().any(|w| w.starts_with("percent")) => {
                Role::Percentage
            }
            ParamKind::Decimal => Role::Amount(
                words
                    .iter()
                    .filter(|w| w.as_str() != "amount")
                    .cloned()
                    .collect(),
            ),
            ParamKind::Integer if has("age") => Role::Age,
            ParamKind::Integer if has("rating") => Role::Rating,
            ParamKind::Integer if has("years") || has("year") || has("length") || has("term") => {
                Role::Years
            }
            ParamKind::Integer => Role::Number,
            ParamKind::String => match last {
                "id" | "number" if words.len() > 1 => Role::Identifier(id_prefix(first)),
                "name" => Role::PersonName,
                "type" => Role::Kind(first.to_string()),
                "status" | "category" | "level" if words.len() > 1 => {
                    Role::Category(first.to_string())
                }
                _ if has("reason") => Role::Reason,
                _ if has("decision") => Role::Decision,
                _ if has("date") => Role::Date,
                _ if has("method") => Role::Method,
                _ if has("value") => Role::NewValue,
                _ if has("conditions") || has("condition") => Role::Conditions,
                "field" => Role::Field,
                _ if has("description")
                    || has("comments")
                    || has("comment")
                    || has("question")
                    || has("notes") =>
                {
                    Role::Narrative
                }
                _ => Role::FreeText,
            },
        }
    }
}

/// Identifier prefix minted for an entity.
fn id_prefix(entity: &str) -> String {
    match entity {
        "policy" => "POL",
        "claim" => "CLM",
        "customer" | "client" => "CUST",
        "application" | "applicant" => "APP",
        "transaction" => "TXN",
        "document" => "DOC",
        "appointment" => "APT",
        "feedback" => "FDB",
        "ticket" => "TKT",
        "payment" => "PAY",
        other => return other.chars().take(3).collect::<String>().to_uppercase(),
    }
    .to_string()
}

/// Nouns that follow a type word: "medical claim", "life insurance".
fn kind_heads(entity: &str) -> Vec<String> {
    let mut heads = vec![entity.to_string()];
    heads.push(match entity.strip_suffix('y') {
        Some(root) => format!("{root}ies"),
        None => format!("{entity}s"),
    });
    match entity {
        "policy" => heads.extend(["insurance".to_string(), "coverage".to_string()]),
        "claim" => heads.push("insurance".to_string()),
        "inquiry" => heads.push("question".to_string()),
        "document" => heads.push("documentation".to_string()),
        "appointment" => heads.extend(["meeting".to_string(), "consultation".to_string()]),
        _ => {}
    }
    heads
}

fn number_word(word: &str) -> Option<i64> {
    let n = match word.to_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "fifteen" => 15,
        "twenty" => 20,
        "thirty" => 30,
        digits => return digits.parse().ok(),
    };
    Some(n)
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok().filter(|d| d.is_finite())
}

fn usable_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    !STOPWORDS.contains(&lower.as_str()) && !NOT_A_VALUE.contains(&lower.as_str())
}

/// Slice around a span, widened to char boundaries.
fn window<'a>(text: &'a str, span: &Range<usize>, before: usize, after: usize) -> &'a str {
    let mut start = span.start.saturating_sub(before);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (span.end + after).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

/// Does `word` look like a form of `label` ("approved" / "approve")?
fn same_root(word: &str, label: &str) -> bool {
    let root: String = label.chars().take(6).collect();
    word == label || word.starts_with(&root) || stem(word) == stem(label)
}

/// Does the parameter identify a record (`policyNumber`, `customerId`)?
pub(crate) fn names_a_record(spec: &ParameterSpec) -> bool {
    matches!(Role::classify(spec), Role::Identifier(_))
}

/// Extract whatever `text` says about each of the descriptor's parameters.
pub(crate) fn extract_arguments(text: &str, descriptor: &ActionDescriptor) -> Arguments {
    let mut extractor = Extractor::new(text, descriptor);
    extractor.explicit_pairs();
    extractor.by_role();
    extractor.numbers();
    extractor.leftover_clauses();
    extractor.args
}

struct Extractor<'a> {
    text: &'a str,
    params: Vec<(&'a ParameterSpec, Role)>,
    descriptor: &'a ActionDescriptor,
    taken: Vec<Range<usize>>,
    args: Arguments,
}

impl<'a> Extractor<'a> {
    fn new(text: &'a str, descriptor: &'a ActionDescriptor) -> Self {
        Self {
            text,
            params: descriptor
                .parameters
                .iter()
                .map(|p| (p, Role::classify(p)))
                .collect(),
            descriptor,
            taken: Vec::new(),
            args: Arguments::new(),
        }
    }

    fn is_taken(&self, span: &Range<usize>) -> bool {
        self.taken
            .iter()
            .any(|t| span.start < t.end && t.start < span.end)
    }

    fn set(&mut self, spec: &ParameterSpec, value: ArgValue) {
        let typed = value.coerce_to(spec.kind).unwrap_or(value);
        self.args.insert(spec.name.clone(), typed);
    }

    fn missing(&self) -> Vec<(&'a ParameterSpec, Role)> {
        self.params
            .iter()
            .filter(|(p, _)| !self.args.contains(&p.name))
            .cloned()
            .collect()
    }

    /// `policyNumber: POL-1`, `policy number = POL-1`, `reason: "fraud"`.
    fn explicit_pairs(&mut self) {
        for (spec, _) in self.params.clone() {
            let spaced = split_camel(&spec.name).join(" ");
            let pattern = format!(
                r#"(?i)\b(?:{}|{})\s*[:=]\s*(?:"([^"]*)"|([^,;\n]+))"#,
                regex::escape(&spec.name),
                regex::escape(&spaced)
            );
            let Some(re) = derived(pattern) else {
                continue;
            };
            if let Some(caps) = re.captures(self.text) {
                if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                    let value = value.as_str().trim();
                    if !value.is_empty() {
                        if let Some(whole) = caps.get(0) {
                            self.taken.push(whole.range());
                        }
                        self.set(spec, ArgValue::String(value.to_string()));
                    }
                }
            }
        }
    }

    fn by_role(&mut self) {
        for (spec, role) in self.missing() {
            let value = match &role {
                Role::Identifier(prefix) => self.identifier(prefix),
                Role::PersonName => self.person_name(),
                Role::Kind(entity) => self.kind(entity),
                Role::Category(subject) => self.category(subject),
                Role::Percentage => self.capture_number(&PERCENT).map(ArgValue::Decimal),
                Role::Age => self.age(),
                Role::Years => self.years(),
                Role::Rating => self.rating(),
                Role::Flag(word) => self.flag(word),
                Role::Reason => self.first_capture(&REASON, 1),
                Role::Decision => self.decision(),
                Role::Date => DATE.find(self.text).map(|m| {
                    ArgValue::String(m.as_str().trim_start_matches("on ").trim().to_string())
                }),
                Role::Method => METHOD.captures(self.text).and_then(|c| {
                    c.get(1)
                        .or_else(|| c.get(2))
                        .map(|m| ArgValue::String(m.as_str().to_lowercase()))
                }),
                Role::Field => self.field(),
                Role::NewValue => self.first_capture(&NEW_VALUE, 1),
                Role::Conditions => self.conditions(),
                Role::Narrative => self.quoted().or_else(|| self.narrative(&spec.name)),
                Role::FreeText => self.quoted(),
                Role::Amount(_) | Role::Number => None,
            };
            if let Some(value) = value {
                self.set(spec, value);
            }
        }
    }

    fn identifier(&mut self, prefix: &str) -> Option<ArgValue> {
        let re = derived(format!(r"(?i)\b{}-[A-Z0-9]+\b", regex::escape(prefix)))?;
        let m = re.find(self.text)?;
        self.taken.push(m.range());
        Some(ArgValue::String(m.as_str().to_uppercase()))
    }

    fn person_name(&self) -> Option<ArgValue> {
        PERSON
            .captures_iter(self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|name| {
                let first = name.split_whitespace().next().unwrap_or_default();
                usable_word(first) && !REFERENCE_WORDS.contains(&first.to_lowercase().as_str())
            })
            .map(|name| ArgValue::String(name.to_string()))
    }

    fn kind(&self, entity: &str) -> Option<ArgValue> {
        let heads = kind_heads(entity)
            .iter()
            .map(|h| regex::escape(h))
            .collect::<Vec<_>>()
            .join("|");
        let re = derived(format!(r"(?i)\b([a-z]+)[\s-]+(?:{heads})\b"))?;

        let found = re
            .captures_iter(self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|w| usable_word(w) && !kind_heads(entity).contains(&w.to_lowercase()));
        if let Some(word) = found {
            return Some(ArgValue::String(word.to_string()));
        }

        match entity {
            "inquiry" | "question" => ABOUT
                .captures(self.text)
                .and_then(|c| c.get(1))
                .filter(|m| usable_word(m.as_str()))
                .map(|m| ArgValue::String(m.as_str().to_lowercase())),
            "update" => self.field(),
            _ => None,
        }
    }

    fn category(&self, subject: &str) -> Option<ArgValue> {
        let subject = regex::escape(subject);
        let before = derived(format!(r"(?i)\b([a-z]+)\s+{subject}\b"))?;
        let after = derived(format!(
            r"(?i)\b{subject}\s+(?:category|status|level)?\s*(?:is|of|:|=)?\s*([a-z]+)\b"
        ))?;

        before
            .captures_iter(self.text)
            .chain(after.captures_iter(self.text))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|w| usable_word(w) && !matches!(w.to_lowercase().as_str(), "category" | "status" | "level" | "is"))
            .map(|w| ArgValue::String(w.to_string()))
    }

    fn capture_number(&mut self, re: &Regex) -> Option<f64> {
        for caps in re.captures_iter(self.text) {
            let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if self.is_taken(&whole.range()) {
                continue;
            }
            if let Some(value) = parse_decimal(num.as_str()) {
                self.taken.push(whole.range());
                return Some(value);
            }
        }
        None
    }

    fn age(&mut self) -> Option<ArgValue> {
        let caps = AGE.captures(self.text)?;
        let whole = caps.get(0)?;
        let n: i64 = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;
        self.taken.push(whole.range());
        Some(ArgValue::Integer(n))
    }

    fn years(&mut self) -> Option<ArgValue> {
        for caps in YEARS.captures_iter(self.text) {
            let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if caps.get(2).is_some() || self.is_taken(&whole.range()) {
                continue;
            }
            if let Some(n) = number_word(num.as_str()) {
                self.taken.push(whole.range());
                return Some(ArgValue::Integer(n));
            }
        }
        None
    }

    fn rating(&mut self) -> Option<ArgValue> {
        let caps = RATING.captures(self.text)?;
        let whole = caps.get(0)?;
        let n: i64 = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;
        self.taken.push(whole.range());
        Some(ArgValue::Integer(n))
    }

    fn flag(&self, word: &str) -> Option<ArgValue> {
        let word = regex::escape(word);
        let negative =
            derived(format!(r"(?i)\b(?:non[\s-]?|not\s+(?:a\s+)?|no\s+){word}s?\b"))?;
        if negative.is_match(self.text) {
            return Some(ArgValue::Boolean(false));
        }
        let positive = derived(format!(r"(?i)\b{word}s?\b"))?;
        positive
            .is_match(self.text)
            .then_some(ArgValue::Boolean(true))
    }

    fn decision(&self) -> Option<ArgValue> {
        let word = DECISION.find(self.text)?.as_str().to_lowercase();
        let decision = if word.starts_with("appro") || word.starts_with("accept") {
            "APPROVED"
        } else {
            "DECLINED"
        };
        Some(ArgValue::String(decision.to_string()))
    }

    fn field(&self) -> Option<ArgValue> {
        FIELD
            .captures_iter(self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
            .find(|w| {
                !matches!(
                    w.as_str(),
                    "information" | "info" | "customer" | "policy" | "details" | "record"
                        | "account" | "to"
                )
            })
            .map(ArgValue::String)
    }

    fn conditions(&self) -> Option<ArgValue> {
        if NO_CONDITIONS.is_match(self.text) {
            return Some(ArgValue::String("none".to_string()));
        }
        self.first_capture(&CONDITIONS, 1)
    }

    fn first_capture(&self, re: &Regex, group: usize) -> Option<ArgValue> {
        re.captures(self.text)
            .and_then(|c| c.get(group))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(|s| ArgValue::String(s.to_string()))
    }

    fn quoted(&self) -> Option<ArgValue> {
        let used: Vec<String> = self.string_values();
        QUOTED
            .captures_iter(self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .find(|q| !q.is_empty() && !used.contains(q))
            .map(ArgValue::String)
    }

    /// A trailing "for …" phrase, or "about …" for questions.
    fn narrative(&self, name: &str) -> Option<ArgValue> {
        if name.contains("question") {
            if let Some(value) = self.first_capture(&ABOUT_TAIL, 1) {
                return Some(value);
            }
        }

        let last_for = FOR.find_iter(self.text).last()?;
        let tail = self.text[last_for.end()..]
            .trim()
            .trim_end_matches(['.', '!', '?'])
            .trim();
        let first = tail.split_whitespace().next()?;
        let rejected = tail.starts_with('$')
            || first.starts_with(|c: char| c.is_ascii_digit())
            || ID_LIKE.is_match(tail)
            || REFERENCE_WORDS.contains(&first.to_lowercase().as_str())
            || first.starts_with(|c: char| c.is_uppercase());
        (!rejected).then(|| ArgValue::String(tail.to_string()))
    }

    /// Decimal amounts, then plain integers.
    ///
    /// An amount goes to the parameter whose name appears next to it
    /// ("$5000 deductible"); the rest are handed out in order.
    fn numbers(&mut self) {
        let missing = self.missing();
        let amount_params: Vec<(&ParameterSpec, Vec<String>)> = missing
            .iter()
            .filter_map(|(p, role)| match role {
                Role::Amount(labels) => Some((*p, labels.clone())),
                _ => None,
            })
            .collect();

        if !amount_params.is_empty() {
            let mut found = self.money();
            if found.is_empty() {
                found = self.bare_numbers();
            }

            let mut unassigned = Vec::new();
            for (spec, labels) in amount_params {
                let labelled = (!labels.is_empty())
                    .then(|| {
                        found.iter().position(|(span, _)| {
                            words(window(self.text, span, 30, 20))
                                .iter()
                                .any(|w| labels.iter().any(|l| same_root(w, l)))
                        })
                    })
                    .flatten();
                match labelled {
                    Some(i) => {
                        let (span, value) = found.remove(i);
                        self.taken.push(span);
                        self.set(spec, ArgValue::Decimal(value));
                    }
                    None => unassigned.push(spec),
                }
            }
            for spec in unassigned {
                if found.is_empty() {
                    break;
                }
                let (span, value) = found.remove(0);
                self.taken.push(span);
                self.set(spec, ArgValue::Decimal(value));
            }
        }

        for (spec, role) in missing {
            if role == Role::Number && !self.args.contains(&spec.name) {
                let next = self
                    .bare_numbers()
                    .into_iter()
                    .find(|(_, value)| value.fract() == 0.0);
                if let Some((span, value)) = next {
                    self.taken.push(span);
                    self.set(spec, ArgValue::Integer(value as i64));
                }
            }
        }
    }

    fn money(&self) -> Vec<(Range<usize>, f64)> {
        MONEY
            .captures_iter(self.text)
            .filter_map(|c| {
                let whole = c.get(0)?;
                if self.is_taken(&whole.range()) {
                    return None;
                }
                let raw = c.get(1).or_else(|| c.get(3))?;
                let multiplier = match c.get(2).map(|m| m.as_str().to_lowercase()).as_deref() {
                    Some("k") | Some("thousand") => 1_000.0,
                    Some("m") | Some("million") => 1_000_000.0,
                    _ => 1.0,
                };
                Some((whole.range(), parse_decimal(raw.as_str())? * multiplier))
            })
            .collect()
    }

    fn bare_numbers(&self) -> Vec<(Range<usize>, f64)> {
        BARE_NUMBER
            .captures_iter(self.text)
            .filter_map(|c| {
                let num = c.get(1)?;
                if c.get(2).is_some() || self.is_taken(&num.range()) {
                    return None;
                }
                let preceded_by_dash = self.text[..num.start()].ends_with('-');
                if preceded_by_dash {
                    return None;
                }
                Some((num.range(), parse_decimal(num.as_str())?))
            })
            .collect()
    }

    fn string_values(&self) -> Vec<String> {
        self.args
            .iter()
            .filter_map(|(_, v)| match v {
                ArgValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Comma-separated clauses nothing else claimed fill free-text parameters.
    fn leftover_clauses(&mut self) {
        let targets: Vec<&ParameterSpec> = self
            .missing()
            .into_iter()
            .filter(|(_, role)| matches!(role, Role::FreeText | Role::Narrative))
            .map(|(p, _)| p)
            .collect();
        if targets.is_empty() {
            return;
        }

        let clauses: Vec<&str> = CLAUSE_SPLIT
            .split(self.text)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if clauses.len() < 2 {
            return;
        }

        let mut blocked: HashSet<String> = descriptor_keywords(self.descriptor).into_iter().collect();
        for p in &self.descriptor.parameters {
            blocked.extend(split_camel(&p.name).iter().map(|w| stem(w)));
        }
        let used: Vec<String> = self
            .string_values()
            .iter()
            .map(|v| v.to_lowercase())
            .collect();

        let mut free = clauses[1..].iter().filter_map(|&clause| {
            let clause = clause
                .strip_prefix("and ")
                .or_else(|| clause.strip_prefix("then "))
                .unwrap_or(clause)
                .trim();
            let lower = clause.to_lowercase();
            let clause_words = words(clause);
            let usable = !clause.is_empty()
                && !clause.chars().any(|c| c.is_ascii_digit() || c == '$')
                && clause_words.len() <= 6
                && !clause_words.iter().any(|w| blocked.contains(&stem(w)))
                && !used.iter().any(|v| lower.contains(v.as_str()));
            usable.then(|| clause.to_string())
        });

        for spec in targets {
            match free.next() {
                Some(clause) => self.set(spec, ArgValue::String(clause)),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_policy() -> ActionDescriptor {
        ActionDescriptor::new("createPolicy", "Create a new insurance policy")
            .param("policyType", ParamKind::String)
            .param("customerName", ParamKind::String)
            .param("coverageAmount", ParamKind::Decimal)
    }

    fn submit_claim() -> ActionDescriptor {
        ActionDescriptor::new("submitClaim", "Submit a new insurance claim")
            .param("policyNumber", ParamKind::String)
            .param("claimType", ParamKind::String)
            .param("claimAmount", ParamKind::Decimal)
            .optional("description", ParamKind::String)
    }

    fn assess_risk() -> ActionDescriptor {
        ActionDescriptor::new("assessRisk", "Assess risk for an insurance application")
            .param("applicantName", ParamKind::String)
            .param("age", ParamKind::Integer)
            .param("healthStatus", ParamKind::String)
            .param("occupation", ParamKind::String)
            .param("smoker", ParamKind::Boolean)
    }

    #[test]
    fn extracts_policy_creation() {
        let args = extract_arguments(
            "Create a life insurance policy for John Doe with $500,000 coverage",
            &create_policy(),
        );
        assert_eq!(args.get("policyType"), Some(&ArgValue::from("life")));
        assert_eq!(args.get("customerName"), Some(&ArgValue::from("John Doe")));
        assert_eq!(args.get("coverageAmount"), Some(&ArgValue::Decimal(500_000.0)));
    }

    #[test]
    fn extracts_claim_with_trailing_description() {
        let args = extract_arguments(
            "Submit a medical claim for policy POL-12345, claim amount $5000, for emergency surgery",
            &submit_claim(),
        );
        assert_eq!(args.get("policyNumber"), Some(&ArgValue::from("POL-12345")));
        assert_eq!(args.get("claimType"), Some(&ArgValue::from("medical")));
        assert_eq!(args.get("claimAmount"), Some(&ArgValue::Decimal(5000.0)));
        assert_eq!(args.get("description"), Some(&ArgValue::from("emergency surgery")));
    }

    #[test]
    fn extracts_risk_profile() {
        let args = extract_arguments(
            "Assess risk for John Doe, 42 years old, good health, software engineer, non-smoker",
            &assess_risk(),
        );
        assert_eq!(args.get("applicantName"), Some(&ArgValue::from("John Doe")));
        assert_eq!(args.get("age"), Some(&ArgValue::Integer(42)));
        assert_eq!(args.get("healthStatus"), Some(&ArgValue::from("good")));
        assert_eq!(args.get("occupation"), Some(&ArgValue::from("software engineer")));
        assert_eq!(args.get("smoker"), Some(&ArgValue::Boolean(false)));
    }

    #[test]
    fn labelled_amounts_go_to_matching_parameters() {
        let payout = ActionDescriptor::new("calculateClaimPayout", "Calculate claim payout amount")
            .param("claimNumber", ParamKind::String)
            .param("claimAmount", ParamKind::Decimal)
            .param("deductible", ParamKind::Decimal)
            .param("coveragePercentage", ParamKind::Decimal);

        let args = extract_arguments(
            "Calculate payout for CLM-77 with a $500 deductible on a $10k claim at 80% coverage",
            &payout,
        );
        assert_eq!(args.get("claimNumber"), Some(&ArgValue::from("CLM-77")));
        assert_eq!(args.get("deductible"), Some(&ArgValue::Decimal(500.0)));
        assert_eq!(args.get("claimAmount"), Some(&ArgValue::Decimal(10_000.0)));
        assert_eq!(args.get("coveragePercentage"), Some(&ArgValue::Decimal(80.0)));
    }

    #[test]
    fn explicit_pairs_take_precedence() {
        let deny = ActionDescriptor::new("denyClaim", "Deny a claim")
            .param("claimNumber", ParamKind::String)
            .param("reason", ParamKind::String);

        let args = extract_arguments("deny claim number: CLM-9, reason: \"policy lapsed\"", &deny);
        assert_eq!(args.get("claimNumber"), Some(&ArgValue::from("CLM-9")));
        assert_eq!(args.get("reason"), Some(&ArgValue::from("policy lapsed")));
    }

    #[test]
    fn reasons_and_years() {
        let renew = ActionDescriptor::new("renewPolicy", "Renew an existing insurance policy")
            .param("policyNumber", ParamKind::String)
            .param("renewalYears", ParamKind::Integer);
        let cancel = ActionDescriptor::new("cancelPolicy", "Cancel an insurance policy")
            .param("policyNumber", ParamKind::String)
            .param("reason", ParamKind::String);

        let args = extract_arguments("Renew policy POL-42 for 2 years", &renew);
        assert_eq!(args.get("renewalYears"), Some(&ArgValue::Integer(2)));

        let args = extract_arguments("Cancel POL-42 because the car was sold", &cancel);
        assert_eq!(args.get("reason"), Some(&ArgValue::from("the car was sold")));
    }

    #[test]
    fn record_parameters_are_recognised() {
        let claim = submit_claim();
        let names: Vec<&str> = claim
            .parameters
            .iter()
            .filter(|p| names_a_record(p))
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["policyNumber"]);
    }

    #[test]
    fn derived_patterns_are_compiled_once() {
        let pattern = r"(?i)\bzzq-[A-Z0-9]+\b".to_string();
        let first = derived(pattern.clone()).unwrap();
        let second = derived(pattern.clone()).unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(DERIVED.lock().unwrap().contains_key(&pattern));
    }

    #[test]
    fn nothing_to_extract() {
        let args = extract_arguments("submit a claim", &submit_claim());
        assert!(args.is_empty());
    }
}
