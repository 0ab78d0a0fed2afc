//! Normalization rule tables.
//!
//! The tables are plain data so they can be listed, tested and extended
//! without touching the normalizer. [`RuleSet::default`] is the set used for
//! the medical encounter printouts; callers may build their own and compile
//! it with [`RuleSet::compile`].

use regex::Regex;
use serde::Serialize;

/// Repeated page headers and footers removed from the document.
/// Patterns are regexes, matched case-insensitively in multi-line mode.
pub const BOILERPLATE: &[&str] = &[
    r"-+\s*סודי רפואי\s*-+",
    r"תדפיס מפגש רופא",
    r"פרטי מטופל/נבדק",
    r"The following table:",
    r"פרטי המפגש נשלחו למרפאת האם של החייל",
];

/// Word that follows an encounter id (`123/45 מפגש`).
pub const SESSION_LABEL: &str = "מפגש";

/// Section headings promoted to `**<label>:**` markers.
pub const SECTION_LABELS: &[&str] = &[
    "אנמנזה",
    "ממצאים",
    "אבחנות",
    "דיון ותוכנית",
    "הפניות",
    "תרופות במפגש",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "effect", content = "label")]
pub enum Effect {
    /// Delete every match.
    Strip,
    /// Replace `<id> <label>` with a `=== <label> <id> - START ===` marker line.
    SessionBoundary(String),
    /// Replace the first match on each line with an emphasized label.
    SectionLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub pattern: String,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub boilerplate: Vec<String>,
    pub session_label: String,
    pub section_labels: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            boilerplate: BOILERPLATE.iter().map(|s| s.to_string()).collect(),
            session_label: SESSION_LABEL.to_string(),
            section_labels: SECTION_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RuleSet {
    /// The rules as an ordered pattern → effect table.
    pub fn table(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .boilerplate
            .iter()
            .map(|p| Rule {
                pattern: format!("(?im){p}"),
                effect: Effect::Strip,
            })
            .collect();
        rules.push(Rule {
            pattern: session_pattern(&self.session_label),
            effect: Effect::SessionBoundary(self.session_label.clone()),
        });
        rules.extend(self.section_labels.iter().map(|label| Rule {
            pattern: label_pattern(label),
            effect: Effect::SectionLabel(label.clone()),
        }));
        rules
    }

    pub fn compile(&self) -> Result<CompiledRules, regex::Error> {
        let rules = self
            .table()
            .into_iter()
            .map(|rule| Ok((Regex::new(&rule.pattern)?, rule.effect)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(CompiledRules { rules })
    }
}

/// A [`RuleSet`] with its regexes built, in application order.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub(crate) rules: Vec<(Regex, Effect)>,
}

impl CompiledRules {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn session_pattern(label: &str) -> String {
    format!(r"([0-9]{{3}}/[0-9]+)\s+{}", regex::escape(label))
}

/// Words of the label separated by any whitespace, then an optional colon.
fn label_pattern(label: &str) -> String {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    format!(r"(?i){}\s*:?", words.join(r"\s+"))
}

// ── Tests ──
