//! Whitespace normalisation for extracted PDF text.
//!
//! PDF text extraction emits layout noise: runs of blank lines between
//! blocks, space-padded columns, indented lines. The model does not need any
//! of it, and it costs tokens. These rules are pure `&str → String` passes
//! and total over any input, including the empty string.
//!
//! ## Rule Order
//!
//! 1. Collapse 3+ consecutive newlines to exactly 2
//! 2. Collapse 2+ consecutive spaces to exactly 1
//! 3. Trim every line independently, rejoin with `\n`
//! 4. Collapse newline runs again: lines that held only whitespace are empty
//!    after rule 3 and can form fresh runs
//! 5. Trim the whole result
//!
//! Rule 4 is what makes [`clean_text`] idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static RE_SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Apply all cleanup rules to raw extracted text.
pub fn clean_text(input: &str) -> String {
    let s = collapse_newlines(input);
    let s = collapse_spaces(&s);
    let s = trim_lines(&s);
    let s = collapse_newlines(&s);
    s.trim().to_string()
}

fn collapse_newlines(input: &str) -> String {
    RE_NEWLINE_RUNS.replace_all(input, "\n\n").into_owned()
}

fn collapse_spaces(input: &str) -> String {
    RE_SPACE_RUNS.replace_all(input, " ").into_owned()
}

fn trim_lines(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
