//! The final cleanup pass (§4.5): a fixed sequence of regex substitutions
//! applied after link/template resolution.
//!
//! Every rule runs unconditionally in the documented order; the whole pass
//! is idempotent (`cleanup(cleanup(t)) == cleanup(t)`).

use std::sync::LazyLock;

use regex::Regex;

use super::tables::CLEANUP_TEMPLATE_REMNANTS;
use super::tables::MAGIC_WORD_LINE_PREFIXES;

/// Runs the full, fixed-order cleanup pass over already-transformed text.
pub fn cleanup(text: &str) -> String {
    let mut out = text.to_string();
    out = strip_empty_ref_pairs(&out);
    out = remove_structural_lines(&out);
    out = collapse_blank_runs(&out);
    out = collapse_inline_spaces(&out);
    out = remove_empty_parens(&out);
    out = remove_pipe_artefacts(&out);
    out = remove_template_remnant_lines(&out);
    out = fix_broken_file_fragments(&out);
    out = remove_magic_word_lines(&out);
    out = strip_interwiki_prefixes(&out);
    out = remove_authority_control_residue(&out);
    out = remove_category_and_sister_lines(&out);
    out = remove_lone_star_lines(&out);
    out = collapse_blank_runs(&out);
    out.trim().to_string() + "\n\n"
}

static EMPTY_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)\[ref\]\s*\[/ref\]").unwrap());

fn strip_empty_ref_pairs(s: &str) -> String {
    EMPTY_REF.replace_all(s, "").into_owned()
}

fn remove_structural_lines(s: &str) -> String {
    s.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with("File:")
                || trimmed.starts_with('|')
                || trimmed.starts_with("{{")
                || trimmed.starts_with("{|")
                || trimmed.starts_with("}}")
                || trimmed.starts_with("|}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:[ \t]*\n){3,}").unwrap());

fn collapse_blank_runs(s: &str) -> String {
    BLANK_RUN.replace_all(s, "\n\n").into_owned()
}

static INLINE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)(\S)[ \t]{2,}").unwrap());

fn collapse_inline_spaces(s: &str) -> String {
    INLINE_SPACES.replace_all(s, "$1 ").into_owned()
}

static EMPTY_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)|（\s*）|\[\s*\]").unwrap());

fn remove_empty_parens(s: &str) -> String {
    EMPTY_PARENS.replace_all(s, "").into_owned()
}

static PIPE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|{2,}").unwrap());
static TRAILING_PIPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)\|\s*$").unwrap());
static PURE_PIPE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\|.*$\n?").unwrap());
static INFOBOX_REMNANT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\w+\s*=\s*[^|\n]*(?:\|\s*\w+\s*=\s*[^|\n]*)+\s*$\n?").unwrap());

fn remove_pipe_artefacts(s: &str) -> String {
    let s = PIPE_RUN.replace_all(s, "|");
    let s = TRAILING_PIPE.replace_all(&s, "");
    let s = PURE_PIPE_LINE.replace_all(&s, "");
    INFOBOX_REMNANT_LINE.replace_all(&s, "").into_owned()
}

fn remove_template_remnant_lines(s: &str) -> String {
    s.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !CLEANUP_TEMPLATE_REMNANTS
                .iter()
                .any(|name| trimmed.starts_with(name) && !trimmed.contains("]]"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static PURE_IMAGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*(?:File|Image):[^\[\]\n]*$\n?").unwrap());
static INCOMPLETE_OPENER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\[\[[^\]\n]*$\n?").unwrap());
static ORPHAN_CAPTION_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(.*[^\]])\]\]\s*$").unwrap());
static STANDALONE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\]\]\s*$\n?").unwrap());
static ORPHAN_PIPE_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^([^\[\]\n|]*)\|([^\[\]\n]*)\]\]\s*$").unwrap());

fn fix_broken_file_fragments(s: &str) -> String {
    let s = PURE_IMAGE_LINE.replace_all(s, "");
    let s = INCOMPLETE_OPENER.replace_all(&s, "");
    let s = ORPHAN_PIPE_PAIR.replace_all(&s, "$1$2");
    let s = STANDALONE_CLOSE.replace_all(&s, "");
    ORPHAN_CAPTION_CLOSE.replace_all(&s, "$1").into_owned()
}

fn remove_magic_word_lines(s: &str) -> String {
    s.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !MAGIC_WORD_LINE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static INTERWIKI_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m):[a-z]{2,3}(?:-[a-z]+)?:(?=\S)").unwrap());

fn strip_interwiki_prefixes(s: &str) -> String {
    INTERWIKI_PREFIX.replace_all(s, "").into_owned()
}

fn remove_authority_control_residue(s: &str) -> String {
    s.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.starts_with("Normdaten")
                || trimmed.starts_with("Authority control")
                || trimmed.starts_with("Persondata"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static CATEGORY_OR_SISTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*(?:CATEGORIES?|COMMONSCAT|WIKIQUOTE|WIKISOURCE):.*$\n?").unwrap());

fn remove_category_and_sister_lines(s: &str) -> String {
    CATEGORY_OR_SISTER_LINE.replace_all(s, "").into_owned()
}

static LONE_STAR_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\*\s*$\n?").unwrap());

fn remove_lone_star_lines(s: &str) -> String {
    LONE_STAR_LINE.replace_all(s, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_triple_newlines_to_two() {
        let out = cleanup("Para one.\n\n\n\nPara two.");
        assert!(!out.contains("\n\n\n"));
        assert!(out.contains("Para one."));
        assert!(out.contains("Para two."));
    }

    #[test]
    fn removes_file_and_brace_lines() {
        let out = cleanup("Good line.\nFile:foo.jpg|thumb\n{{leftover\n");
        assert!(out.contains("Good line."));
        assert!(!out.contains("File:"));
        assert!(!out.contains("{{leftover"));
    }

    #[test]
    fn strips_lone_star_lines() {
        let out = cleanup("Item text\n*\nMore text\n");
        assert!(!out.lines().any(|l| l.trim() == "*"));
    }

    #[test]
    fn is_idempotent() {
        let once = cleanup("Text with   extra   spaces.\n\n\n\nAnother para.\n");
        let twice = cleanup(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn removes_empty_parens_both_widths() {
        let out = cleanup("Smith () and Jones （）done.");
        assert!(!out.contains("()"));
        assert!(!out.contains("（）"));
    }
}
