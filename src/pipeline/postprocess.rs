//! Deterministic markdown polish.
//!
//! The LLM cleanup pass handles structure; this module fixes the cheap,
//! mechanical quirks models keep producing no matter what the prompt says:
//! output wrapped in ` ```markdown ` fences, CRLF line endings, trailing
//! whitespace, runs of blank lines, headings glued to the previous
//! paragraph, and invisible Unicode. Each rule is a pure `&str → String`
//! function applied in a fixed order (fences must come off before heading
//! detection; the final-newline rule runs last).

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every polish rule to a markdown fragment or document.
pub fn polish(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_whitespace(&s);
    let s = space_headings(&s);
    let s = strip_invisible(&s);
    finish_with_newline(&s)
}

static OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

/// Unwrap output the model disobediently fenced as a markdown code block.
fn strip_outer_fences(input: &str) -> String {
    match OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

/// One pass over the lines: CRLF → LF, trailing whitespace trimmed, and
/// runs of blank lines collapsed to a single blank line.
fn normalise_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut blank_run = 0usize;

    for line in input.replace("\r\n", "\n").replace('\r', "\n").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Ensure a blank line before every heading that follows body text.
fn space_headings(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 32);
    let mut prev_blank = true;

    for line in input.lines() {
        let is_heading = line.starts_with('#') && line.trim_start_matches('#').starts_with(' ');
        if is_heading && !prev_blank {
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
        prev_blank = line.trim().is_empty();
    }

    out
}

/// Remove zero-width and other invisible characters that break diffs and
/// downstream tooling.
fn strip_invisible(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

/// End with exactly one newline.
fn finish_with_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(
            strip_outer_fences("```markdown\n# Title\nbody\n```"),
            "# Title\nbody"
        );
        assert_eq!(strip_outer_fences("```\n# Title\n```"), "# Title");
    }

    #[test]
    fn unfenced_input_passes_through() {
        assert_eq!(strip_outer_fences("# Title\nbody"), "# Title\nbody");
    }

    #[test]
    fn inner_fences_survive() {
        let input = "text\n```rust\nfn main() {}\n```\nmore";
        assert_eq!(strip_outer_fences(input), input);
    }

    #[test]
    fn whitespace_normalised_in_one_pass() {
        let input = "a  \r\nb\r\n\r\n\r\n\r\nc";
        assert_eq!(normalise_whitespace(input), "a\nb\n\nc\n");
    }

    #[test]
    fn heading_gets_breathing_room() {
        let result = space_headings("text\n## Section\nmore");
        assert_eq!(result, "text\n\n## Section\nmore\n");
    }

    #[test]
    fn heading_after_blank_is_untouched() {
        let input = "text\n\n## Section\n";
        assert_eq!(space_headings(input), "text\n\n## Section\n");
    }

    #[test]
    fn hashtag_without_space_is_not_a_heading() {
        let input = "#hashtag\n";
        assert_eq!(space_headings(input), "#hashtag\n");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(strip_invisible("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn ends_with_single_newline() {
        assert_eq!(finish_with_newline("x"), "x\n");
        assert_eq!(finish_with_newline("x\n\n\n"), "x\n");
        assert_eq!(finish_with_newline(""), "\n");
    }

    #[test]
    fn full_polish() {
        let input = "```markdown\n# Title\r\n\r\n\r\nbody   \n## Section\ntext\n```";
        let result = polish(input);
        assert!(result.starts_with("# Title\n"));
        assert!(result.contains("\n\n## Section\n"));
        assert!(result.ends_with("text\n"));
        assert!(!result.contains("\r"));
    }
}
