use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use thiserror::Error;

use super::rules::{CompiledRules, Effect, RuleSet};

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<[^>]+>").unwrap());
static PAGE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)--- PAGE \d+ ---").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());
static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

static DEFAULT_RULES: LazyLock<CompiledRules> =
    LazyLock::new(|| RuleSet::default().compile().unwrap());

/// Every page was missing or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no text found in document")]
pub struct EmptyDocument;

/// Normalize extracted pages with the default rule set.
pub fn normalize<I, S>(pages: I) -> Result<String, EmptyDocument>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    normalize_with(&DEFAULT_RULES, pages)
}

/// Join the non-blank pages, strip noise and re-annotate the structure.
pub fn normalize_with<I, S>(rules: &CompiledRules, pages: I) -> Result<String, EmptyDocument>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let pages: Vec<S> = pages
        .into_iter()
        .flatten()
        .filter(|p| !p.as_ref().trim().is_empty())
        .collect();
    if pages.is_empty() {
        return Err(EmptyDocument);
    }
    let joined = pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n");

    let mut text = MARKUP_RE.replace_all(&joined, "").into_owned();
    text = PAGE_MARKER_RE.replace_all(&text, "").into_owned();

    for (re, effect) in &rules.rules {
        text = match effect {
            Effect::Strip => re.replace_all(&text, "").into_owned(),
            Effect::SessionBoundary(label) => re
                .replace_all(&text, format!("\n\n=== {label} ${{1}} - START ===\n\n").as_str())
                .into_owned(),
            Effect::SectionLabel(label) => {
                let marker = format!("\n**{label}:**\n");
                text.split('\n')
                    .map(|line| re.replace(line, NoExpand(&marker)))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        };
    }

    Ok(collapse_whitespace(&text))
}

fn collapse_whitespace(text: &str) -> String {
    let text = BLANK_RUN_RE.replace_all(text, "\n\n");
    let text = text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n");
    SPACE_RUN_RE.replace_all(&text, " ").trim().to_string()
}

// ── Tests ──
