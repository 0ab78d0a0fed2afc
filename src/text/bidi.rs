//! Repair of right-to-left lines emitted in visual order.
//!
//! The extractor writes Hebrew lines with both the word order and the letter
//! order of each word inverted. A line is repaired by reversing its token
//! sequence and then reversing every token that holds a Hebrew letter.
//! Whitespace tokens and left-to-right tokens (numbers, Latin words,
//! punctuation) keep their characters as they are.

use serde::Serialize;

use crate::case::name::is_rtl_char;

/// Characters that split a line into tokens. Each one is a token on its own,
/// so spacing survives the reversal unchanged. Other Unicode whitespace stays
/// inside the surrounding token.
pub fn is_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAnomaly {
    /// The repaired line did not keep the characters or spacing of the input.
    ShapeMismatch,
}

/// What happened to one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRepair<'a> {
    /// No Hebrew letters; emitted as is.
    NoRtl(&'a str),
    Repaired(String),
    /// Repair was attempted and rejected; the original line is kept.
    FellBack {
        original: &'a str,
        anomaly: RepairAnomaly,
    },
}

impl LineRepair<'_> {
    pub fn text(&self) -> &str {
        match self {
            LineRepair::NoRtl(line) => *line,
            LineRepair::Repaired(line) => line.as_str(),
            LineRepair::FellBack { original, .. } => *original,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairStats {
    pub repaired: usize,
    pub unchanged: usize,
    pub fell_back: usize,
}

fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in line.char_indices() {
        if is_separator(c) {
            if start < i {
                tokens.push(&line[start..i]);
            }
            tokens.push(&line[i..i + c.len_utf8()]);
            start = i + c.len_utf8();
        }
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens
}

/// Reorder one line. `Err` means the line must be kept as it was.
pub fn try_repair_line(line: &str) -> Result<String, RepairAnomaly> {
    let mut out = String::with_capacity(line.len());
    for token in tokenize(line).into_iter().rev() {
        if token.chars().any(is_rtl_char) {
            out.extend(token.chars().rev());
        } else {
            out.push_str(token);
        }
    }

    // Internal sanity check: reversal keeps the byte length and mirrors the
    // separators for any input, so this only trips on a bug above.
    if out.len() != line.len() || !separators(&out).eq(separators(line).rev()) {
        return Err(RepairAnomaly::ShapeMismatch);
    }
    Ok(out)
}

fn separators(s: &str) -> impl DoubleEndedIterator<Item = char> + '_ {
    s.chars().filter(|c| is_separator(*c))
}

pub fn repair_line(line: &str) -> LineRepair<'_> {
    if !line.chars().any(is_rtl_char) {
        return LineRepair::NoRtl(line);
    }
    match try_repair_line(line) {
        Ok(fixed) => LineRepair::Repaired(fixed),
        Err(anomaly) => LineRepair::FellBack {
            original: line,
            anomaly,
        },
    }
}

/// Repair every line of `text`. Never fails.
pub fn repair(text: &str) -> String {
    repair_with_stats(text).0
}

pub fn repair_with_stats(text: &str) -> (String, RepairStats) {
    let mut stats = RepairStats::default();
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let outcome = repair_line(line);
            match &outcome {
                LineRepair::NoRtl(_) => stats.unchanged += 1,
                LineRepair::Repaired(_) => stats.repaired += 1,
                LineRepair::FellBack { .. } => stats.fell_back += 1,
            }
            outcome.text().to_string()
        })
        .collect();
    (lines.join("\n"), stats)
}

// ── Tests ──
