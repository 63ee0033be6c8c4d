//! Post-processing: deterministic cleanup of recognised page text.
//!
//! Tesseract output carries a few mechanical artefacts that say nothing
//! about the page: CRLF or bare CR line endings, trailing spaces on every
//! line, zero-width characters copied from the PDF's text layer, and long
//! runs of empty lines where the page had whitespace or a figure.
//!
//! Rules run in this order: normalise line endings before trimming, so a
//! stray `\r` is not kept as trailing content, and collapse blank lines last,
//! after lines holding only whitespace or invisible characters have been
//! emptied.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of recognised text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Trim trailing whitespace per line
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, joiners)
/// 4. Collapse runs of three or more blank lines down to one
/// 5. Trim the whole page
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

// A line left holding only spaces by rule 3 still counts as blank.
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
