use std::sync::LazyLock;

use regex::Regex;

/// Query keywords mapped to the canonical entity names stored with each
/// document. Matching is by case-insensitive containment, first hit wins.
static ENTITY_MAPPINGS: &[(&str, &str)] = &[
    (
        "oracle financial services",
        "Oracle Financial Services Software Ltd",
    ),
    ("oracle financial", "Oracle Financial Services Software Ltd"),
    ("ofss", "Oracle Financial Services Software Ltd"),
    ("microsoft", "Microsoft"),
    ("apple", "Apple"),
    ("google", "Google"),
    ("amazon", "Amazon"),
    ("meta", "Meta"),
    ("facebook", "Meta"),
    ("tesla", "Tesla"),
    ("nvidia", "NVIDIA"),
];

/// Metric identifiers with the query keywords that request them.
pub static METRIC_GROUPS: &[(&str, &[&str])] = &[
    ("revenue", &["revenue", "sales", "turnover"]),
    (
        "net_income",
        &["net income", "net profit", "profit", "earnings", "pat"],
    ),
    ("ebitda", &["ebitda"]),
    ("gross_profit", &["gross profit"]),
    (
        "operating_income",
        &["operating income", "operating profit", "ebit"],
    ),
    ("assets", &["assets", "total assets"]),
    ("equity", &["equity"]),
];

static FINANCIAL_KEYWORDS: &[&str] = &[
    "revenue", "income", "profit", "employee", "asset", "earning",
];

static QUERY_PERIOD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)FY\s*(\d{4})",
        r"(?i)fiscal\s+year\s+(\d{4})",
        r"\b(20\d{2})\b",
        r"\b(19\d{2})\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static MONTH_QUALIFIED_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})").unwrap());

// No lookaround in `regex`; the surrounding non-digit (or string edge) is
// matched explicitly so a longer number like `12023` never yields a year.
static BARE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])((?:19|20)\d{2})(?:[^0-9]|$)").unwrap());

/// Resolves a canonical entity name mentioned anywhere in the text.
pub fn canonical_entity(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();

    ENTITY_MAPPINGS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, canonical)| (*canonical).to_string())
}

/// Extracts the fiscal period requested by a query, normalized to `FYxxxx`.
pub fn extract_fiscal_period(text: &str) -> Option<String> {
    for pattern in QUERY_PERIOD_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(year) = captures.get(1) {
                return Some(format!("FY{}", year.as_str()));
            }
        }
    }

    None
}

/// Normalizes period spellings found in document paths and labels, e.g.
/// `2012-03` and `FY2012` both become `FY2012`.
pub fn normalize_fiscal_period(value: &str) -> Option<String> {
    let trimmed = value.trim();

    if let Some(captures) = MONTH_QUALIFIED_PERIOD.captures(trimmed) {
        let year = captures.get(1)?.as_str();
        return Some(format!("FY{year}"));
    }

    BARE_YEAR
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map(|year| format!("FY{}", year.as_str()))
}

/// Metric identifiers whose keywords occur in the text, in declaration order.
pub fn extract_metrics(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();

    METRIC_GROUPS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(metric, _)| *metric)
        .collect()
}

/// Keywords that request the given metric, if it is a known one.
pub fn metric_keywords(metric: &str) -> Option<&'static [&'static str]> {
    METRIC_GROUPS
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, keywords)| *keywords)
}

/// Rough check used to decide whether an answer should carry figures.
pub fn is_financial_question(text: &str) -> bool {
    let lowered = text.to_lowercase();

    FINANCIAL_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}
