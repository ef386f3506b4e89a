//! Post-processing: deterministic cleanup of LLM replies.
//!
//! Two consumers:
//!
//! * [`split_problems`] turns the extraction reply into one problem per line.
//! * [`clean_solution`] tidies a solve reply before it is returned.
//!
//! Neither validates content. Whether a line is really a question is left to
//! the model.

use once_cell::sync::Lazy;
use regex::Regex;

/// Split the extraction reply into problems: one per non-blank line, trimmed,
/// in reply order.
pub fn split_problems(reply: &str) -> Vec<String> {
    let s = normalise_line_endings(reply);
    let s = remove_invisible_chars(&s);
    s.trim()
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Clean a solve reply.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip one outer code fence (```` ```latex ```` / ```` ```tex ```` / ```` ``` ````)
/// 3. Strip invisible Unicode
/// 4. Trim trailing whitespace per line
/// 5. Trim the whole reply
pub fn clean_solution(reply: &str) -> String {
    let s = normalise_line_endings(reply);
    let s = strip_outer_fence(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:latex|tex|math)?[ \t]*\n(.*?)\n?```$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed) {
        // A fence line inside the body means several blocks, not one wrapper.
        Some(caps) if !caps[1].lines().any(|l| l.trim_start().starts_with("```")) => {
            caps[1].to_string()
        }
        _ => input.to_string(),
    }
}

// ── Rule 3: Invisible Unicode ────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

// ── Rule 4: Trailing whitespace ──────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
