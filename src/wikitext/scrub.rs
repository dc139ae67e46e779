//! Input scrubbing (§4.1): normalises line endings, decodes HTML entities,
//! and rewrites `<ref>...</ref>` to the `[ref]...[/ref]` form the rest of the
//! pipeline expects, before the block parser ever sees the text.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Scrubs raw dump wikitext into the form the block parser promises its
/// input already is.
pub fn scrub(wikitext: &str) -> String {
    let normalised = normalise_line_endings(wikitext);
    let decoded = html_escape::decode_html_entities(&normalised);
    rewrite_ref_tags(&decoded)
}

/// Normalises CRLF/CR line endings to LF. Skips the rebuild entirely when no
/// `\r` is present, which is the common case for dumps already in Unix line
/// endings.
fn normalise_line_endings(s: &str) -> Cow<'_, str> {
    if memchr::memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}

static REF_OPEN_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ref(?:\s[^>]*)?>(.*?)</ref\s*>").unwrap());
static REF_SELF_CLOSING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<ref(?:\s[^>]*)?/>").unwrap());

/// Rewrites `<ref ...>...</ref>` to `[ref]...[/ref]` and self-closing
/// `<ref .../>` to the empty pair `[ref][/ref]`, which
/// `cleanup::strip_empty_ref_pairs` later collapses to nothing.
fn rewrite_ref_tags(s: &str) -> String {
    let s = REF_SELF_CLOSING.replace_all(s, "[ref][/ref]");
    REF_OPEN_CLOSE.replace_all(&s, "[ref]$1[/ref]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_html_entities() {
        assert_eq!(scrub("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(scrub("a&#160;b"), "a\u{a0}b");
    }

    #[test]
    fn rewrites_ref_tags_to_bracket_form() {
        let out = scrub("See<ref name=\"x\">Some citation.</ref> here.");
        assert!(out.contains("[ref]Some citation.[/ref]"));
        assert!(!out.contains("<ref"));
    }

    #[test]
    fn rewrites_self_closing_ref_to_empty_pair() {
        let out = scrub("Already cited.<ref name=\"x\" />");
        assert!(out.contains("[ref][/ref]"));
        assert!(!out.contains("<ref"));
    }

    #[test]
    fn normalises_crlf_line_endings() {
        let out = scrub("line one\r\nline two\r\n");
        assert!(!out.contains('\r'));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn leaves_unix_line_endings_untouched() {
        assert_eq!(scrub("already\nunix\n"), "already\nunix\n");
    }
}
