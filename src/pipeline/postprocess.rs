//! Post-processing: deterministic cleanup of model-generated prose.
//!
//! ## Why is post-processing necessary?
//!
//! Even well-prompted models occasionally introduce artefacts that carry no
//! meaning for the reader, for example:
//!
//! - Wrapping output in ` ```markdown ... ``` ` fences despite the contract
//!   saying "do not wrap in code fences"
//! - Using Windows-style `\r\n` line endings
//! - Padding with runs of blank lines or zero-width characters
//!
//! Each rule is a pure `&str → String` function and independently testable.
//! The same cleanup runs on interpretations and on text recognised from
//! images, so the translator and speech service never see these artefacts.
//!
//! ## Rule Order
//!
//! Normalise line endings before trimming, and strip fences first so the
//! fence regex sees the raw model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to raw model output.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 2+ consecutive blank lines down to 1
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 6. Trim the whole text
pub fn clean_text(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md|text)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n- Rent is due monthly\n```";
        assert_eq!(strip_markdown_fences(input), "- Rent is due monthly");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\nObligations\n- Pay rent\n```";
        assert_eq!(strip_markdown_fences(input), "Obligations\n- Pay rent");
    }

    #[test]
    fn test_inner_code_block_is_kept() {
        let input = "Intro\n```\nquoted clause\n```\nOutro";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  hello   \nworld  "), "  hello\nworld");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let input = "```markdown\r\nObligations   \r\n\r\n\r\n\r\n- Pay rent\u{200B}\r\n```\n";
        assert_eq!(clean_text(input), "Obligations\n\n- Pay rent");
    }

    #[test]
    fn test_clean_text_whitespace_only_is_empty() {
        assert_eq!(clean_text(" \n\t\u{FEFF}\n "), "");
    }
}
