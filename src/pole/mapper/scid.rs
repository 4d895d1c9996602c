//! Pole identifier (SCID) normalization.
//!
//! Survey exports spell the same pole differently between sheets: leading
//! zeros come and go, Excel prefixes text cells with an apostrophe, and letter
//! suffixes change case. Every id is normalized before poles are grouped or
//! routes are matched.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static SIMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([A-Za-z]*)$").expect("valid regex"));

static PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]*)(\d+)([A-Za-z]*)$").expect("valid regex"));

static LEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([A-Za-z]*)").expect("valid regex"));

/// Normalizes a SCID.
///
/// `"001A"` becomes `"1A"`, `"118 MISM013"` becomes `"118 MISM13"`, and any
/// other whitespace-separated part is upper-cased.
pub fn normalize_scid(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('\'').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(caps) = SIMPLE_RE.captures(trimmed) {
        return format!("{}{}", strip_zeros(&caps[1]), caps[2].to_uppercase());
    }

    trimmed
        .split_whitespace()
        .map(normalize_part)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_part(part: &str) -> String {
    if part.chars().all(|ch| ch.is_ascii_digit()) {
        return strip_zeros(part).to_string();
    }
    match PART_RE.captures(part) {
        Some(caps) => format!(
            "{}{}{}",
            caps[1].to_uppercase(),
            strip_zeros(&caps[2]),
            caps[3].to_uppercase()
        ),
        None => part.to_uppercase(),
    }
}

fn strip_zeros(digits: &str) -> &str {
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() { "0" } else { stripped }
}

/// Sort key ordering SCIDs by their leading number, then letter suffix.
/// Ids without a leading number sort after all numbered ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScidSortKey {
    number: Option<u64>,
    suffix: String,
}

impl ScidSortKey {
    pub fn new(scid: &str) -> Self {
        match LEADING_RE.captures(scid.trim()) {
            Some(caps) => Self {
                number: Some(caps[1].parse().unwrap_or(u64::MAX)),
                suffix: caps[2].to_string(),
            },
            None => Self {
                number: None,
                suffix: String::new(),
            },
        }
    }
}

impl Ord for ScidSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs).then_with(|| self.suffix.cmp(&other.suffix)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialOrd for ScidSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
