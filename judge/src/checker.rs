//! Checker module - output comparison and diff rendering
//!
//! Output is compared exactly after stripping a single trailing line
//! terminator. Existing test suites are authored against this rule, so no
//! other whitespace is normalised.
//!
//! On mismatch a line diff between expected and actual output is produced.
//! Each line is tagged and mapped to a colour hint; turning hints into markup
//! is left to whoever displays the result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on LCS table cells before falling back to a block diff
const MAX_TABLE_CELLS: usize = 4_000_000;

/// Strip exactly one trailing line terminator (`\n` or `\r\n`)
pub fn trim_output(output: &str) -> &str {
    output
        .strip_suffix("\r\n")
        .or_else(|| output.strip_suffix('\n'))
        .unwrap_or(output)
}

/// Result of comparing program output against the expected answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch(Vec<DiffLine>),
}

/// Compare actual output with expected output
pub fn compare_output(actual: &str, expected: &str) -> Comparison {
    let actual = trim_output(actual);
    let expected = trim_output(expected);

    if actual == expected {
        Comparison::Match
    } else {
        Comparison::Mismatch(line_diff(expected, actual))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffTag {
    /// Present in the expected output only
    Removed,
    /// Present in the actual output only
    Added,
    Unchanged,
}

impl DiffTag {
    pub fn hint(self) -> ColorHint {
        match self {
            DiffTag::Removed => ColorHint::Red,
            DiffTag::Added => ColorHint::Green,
            DiffTag::Unchanged => ColorHint::Grey,
        }
    }

    fn sigil(self) -> char {
        match self {
            DiffTag::Removed => '-',
            DiffTag::Added => '+',
            DiffTag::Unchanged => ' ',
        }
    }
}

/// Presentation hint attached to each diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorHint {
    Red,
    Green,
    Grey,
}

impl fmt::Display for ColorHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorHint::Red => "red",
            ColorHint::Green => "green",
            ColorHint::Grey => "grey",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

impl DiffLine {
    fn new(tag: DiffTag, text: &str) -> Self {
        Self {
            tag,
            text: text.to_string(),
        }
    }
}

/// A (text, hint) pair as handed to renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub text: String,
    pub hint: ColorHint,
}

/// Map diff lines to (text, hint) pairs
pub fn highlight(diff: &[DiffLine]) -> Vec<Highlight> {
    diff.iter()
        .map(|line| Highlight {
            text: line.text.clone(),
            hint: line.tag.hint(),
        })
        .collect()
}

/// Flatten a diff into a display string, one `-`/`+`/` ` prefixed line each
pub fn flatten(diff: &[DiffLine]) -> String {
    diff.iter()
        .map(|line| format!("{} {}", line.tag.sigil(), line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split text into lines; empty text has no lines at all
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// Line diff from `expected` (old) to `actual` (new)
///
/// Dropping the `Removed` lines yields `actual`, dropping the `Added` lines
/// yields `expected` (lines joined with `\n`).
pub fn line_diff(expected: &str, actual: &str) -> Vec<DiffLine> {
    diff_with_budget(&split_lines(expected), &split_lines(actual), MAX_TABLE_CELLS)
}

fn diff_with_budget(old: &[&str], new: &[&str], max_cells: usize) -> Vec<DiffLine> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let mut diff = Vec::with_capacity(old.len() + new.len());
    diff.extend(
        old[..prefix]
            .iter()
            .map(|l| DiffLine::new(DiffTag::Unchanged, l)),
    );
    lcs_diff(
        &old[prefix..old.len() - suffix],
        &new[prefix..new.len() - suffix],
        max_cells,
        &mut diff,
    );
    diff.extend(
        old[old.len() - suffix..]
            .iter()
            .map(|l| DiffLine::new(DiffTag::Unchanged, l)),
    );
    diff
}

fn lcs_diff(old: &[&str], new: &[&str], max_cells: usize, out: &mut Vec<DiffLine>) {
    let (n, m) = (old.len(), new.len());
    let cells = (n + 1).saturating_mul(m + 1);

    if n == 0 || m == 0 || cells > max_cells {
        out.extend(old.iter().map(|l| DiffLine::new(DiffTag::Removed, l)));
        out.extend(new.iter().map(|l| DiffLine::new(DiffTag::Added, l)));
        return;
    }

    // table[i * width + j] = LCS length of old[i..] and new[j..]
    let width = m + 1;
    let mut table = vec![0u32; cells];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(DiffLine::new(DiffTag::Unchanged, old[i]));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            out.push(DiffLine::new(DiffTag::Removed, old[i]));
            i += 1;
        } else {
            out.push(DiffLine::new(DiffTag::Added, new[j]));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|l| DiffLine::new(DiffTag::Removed, l)));
    out.extend(new[j..].iter().map(|l| DiffLine::new(DiffTag::Added, l)));
}
