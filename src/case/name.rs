use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\u{0590}-\u{05FF}]{2}[0-9]{3})([\u{0590}-\u{05FF}])?$").unwrap()
});

/// Fixed order used to sort the members of a split case.
pub const SUFFIX_ORDER: &str = "אבגדהוזחטיכלמנסעפצקרשת";

/// Hebrew block, used both for case names and for directional repair.
pub fn is_rtl_char(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

/// Result of parsing a folder name. A name that is not a case has neither field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCase {
    pub base: Option<String>,
    pub suffix: Option<char>,
}

impl ParsedCase {
    pub fn is_case(&self) -> bool {
        self.base.is_some()
    }

    pub fn is_split_part(&self) -> bool {
        self.base.is_some() && self.suffix.is_some()
    }
}

/// Parse `name` into its base identifier and optional split suffix.
///
/// - `"ננ449"`  → base `"ננ449"`, no suffix
/// - `"ננ449א"` → base `"ננ449"`, suffix `'א'`
/// - anything else → not a case
pub fn parse(name: &str) -> ParsedCase {
    let Some(caps) = CASE_RE.captures(name) else {
        return ParsedCase::default();
    };
    ParsedCase {
        base: Some(caps[1].to_string()),
        suffix: caps.get(2).and_then(|m| m.as_str().chars().next()),
    }
}

/// Position of `suffix` in [`SUFFIX_ORDER`]; unknown or absent suffixes sort last.
pub fn suffix_key(suffix: Option<char>) -> usize {
    let last = SUFFIX_ORDER.chars().count() + 1;
    suffix
        .and_then(|s| SUFFIX_ORDER.chars().position(|c| c == s))
        .unwrap_or(last)
}

pub fn compare_suffixes(a: Option<char>, b: Option<char>) -> Ordering {
    suffix_key(a).cmp(&suffix_key(b))
}

// ── Tests ──
