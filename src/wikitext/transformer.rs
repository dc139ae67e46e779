//! The wiki transformer (§4.2): `format_wiki` runs the fixed phase sequence
//! (marker application, complex-pattern cleanup, nowiki protection, link
//! resolution, template reduction, emphasis/directive removal) that turns
//! raw wikitext into near-plain text. The final regex cleanup pass (§4.5)
//! is a separate stage (`wikitext::cleanup`) applied by the caller.
//!
//! The input scrub stage (`wikitext::scrub`) rewrites `<ref>...</ref>` to
//! `[ref]...[/ref]` before any of this runs, so `format_wiki` protects those
//! bracket pairs the same way it protects `<nowiki>` spans: otherwise Phase D's
//! single-bracket link resolver would treat `[ref]`/`[/ref]` as bracketed
//! links and eat them.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{Config, MarkerKind};

use super::magic_words::PageContext;
use super::{nested, tables, templates};

/// Runs phases A–F over `text`, returning the transformed (but not yet
/// final-cleanup-passed) body.
pub fn format_wiki(text: &str, page: &PageContext<'_>, config: &Config) -> String {
    let text = phase_a_markers(text, config);
    let text = phase_b_complex_cleanup(&text);
    let (text, nowiki) = phase_c_protect_nowiki(&text);
    let (text, refs) = protect_ref_tags(&text);
    let text = phase_d_links(&text);
    let text = templates::reduce_all(&text, page, config);
    let text = phase_f_emphasis_and_tags(&text, config);
    let text = restore_ref_tags(&text, &refs);
    restore_nowiki(&text, &nowiki)
}

fn marker_or_empty(config: &Config, kind: MarkerKind) -> String {
    if config.markers.contains_kind(kind) { super::marker_placeholder(kind) } else { String::new() }
}

// ---------------------------------------------------------------------
// Phase A — marker application
// ---------------------------------------------------------------------

fn phase_a_markers(text: &str, config: &Config) -> String {
    let mut out = text.to_string();

    out = mark_tag_pair(&out, "math", MarkerKind::Math, config);
    out = mark_templates(&out, |n| n == "math" || n == "mvar", MarkerKind::Math, config);
    out = mark_tag_pair(&out, "syntaxhighlight", MarkerKind::CodeBlock, config);
    out = mark_tag_pair(&out, "source", MarkerKind::CodeBlock, config);
    out = mark_tag_pair(&out, "pre", MarkerKind::CodeBlock, config);
    out = mark_tag_pair(&out, "code", MarkerKind::Code, config);
    out = mark_tag_pair(&out, "chem", MarkerKind::Chem, config);
    out = mark_templates(&out, |n| n == "chem" || n == "ce", MarkerKind::Chem, config);
    out = mark_nested(&out, "{|", "|}", MarkerKind::Table, config);
    out = mark_tag_pair(&out, "score", MarkerKind::Score, config);
    out = mark_tag_pair(&out, "timeline", MarkerKind::Timeline, config);
    out = mark_tag_pair(&out, "graph", MarkerKind::Graph, config);
    out = mark_tag_pair(&out, "gallery", MarkerKind::Gallery, config);
    out = mark_tag_pair(&out, "mapframe", MarkerKind::Mapframe, config);
    out = mark_tag_pair(&out, "imagemap", MarkerKind::Imagemap, config);
    out = mark_templates(
        &out,
        |n| n == "ipa" || n.starts_with("ipa-") || n.starts_with("ipac-"),
        MarkerKind::Ipa,
        config,
    );
    out = mark_templates(
        &out,
        |n| tables::INFOBOX_PREFIXES.iter().any(|p| n.starts_with(p)),
        MarkerKind::Infobox,
        config,
    );
    out = mark_templates(
        &out,
        |n| tables::NAVBOX_PREFIXES.iter().any(|p| n.starts_with(p)),
        MarkerKind::Navbox,
        config,
    );
    out = mark_templates(
        &out,
        |n| tables::SIDEBAR_PREFIXES.iter().any(|p| n.starts_with(p)),
        MarkerKind::Sidebar,
        config,
    );
    out = mark_references(&out, config);
    out
}

/// Marks or deletes a `<tag ...>...</tag>` region (DOTALL, non-greedy).
fn mark_tag_pair(text: &str, tag: &str, kind: MarkerKind, config: &Config) -> String {
    let pattern = format!(r"(?is)<{tag}(?:\s[^>]*)?>.*?</{tag}\s*>");
    let re = Regex::new(&pattern).expect("static tag pattern is valid");
    if config.markers.contains_kind(kind) {
        let placeholder = super::marker_placeholder(kind);
        re.replace_all(text, regex::NoExpand(&placeholder)).into_owned()
    } else {
        re.replace_all(text, "").into_owned()
    }
}

/// Marks or deletes every `{{...}}` template whose (lowercased, trimmed)
/// name satisfies `predicate`, using the nested-brace matcher so nested
/// parameters survive.
fn mark_templates(text: &str, predicate: impl Fn(&str) -> bool, kind: MarkerKind, config: &Config) -> String {
    nested::reduce(text, "{{", "}}", |body| {
        let name = body.split('|').next().unwrap_or("").trim().to_lowercase();
        if predicate(&name) {
            marker_or_empty(config, kind)
        } else {
            format!("{{{{{body}}}}}")
        }
    })
}

/// As [`mark_templates`], but for a balanced non-template delimiter pair
/// (used for wiki tables, `{|...|}`).
fn mark_nested(text: &str, l: &str, r: &str, kind: MarkerKind, config: &Config) -> String {
    nested::reduce(text, l, r, |body| {
        if config.markers.contains_kind(kind) {
            super::marker_placeholder(kind)
        } else {
            let _ = body;
            String::new()
        }
    })
}

static REFERENCES_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<references\s*/>|<references(?:\s[^>]*)?>.*?</references\s*>").unwrap());
static REFBEGIN_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\{\{\s*refbegin[^}]*\}\}.*?\{\{\s*refend\s*\}\}").unwrap());

fn mark_references(text: &str, config: &Config) -> String {
    let text = REFERENCES_TAG.replace_all(text, |_: &regex::Captures| marker_or_empty(config, MarkerKind::References));
    let text =
        REFBEGIN_BLOCK.replace_all(&text, |_: &regex::Captures| marker_or_empty(config, MarkerKind::References));
    mark_templates(&text, |n| n == "reflist", MarkerKind::References, config)
}

// ---------------------------------------------------------------------
// Phase B — complex-pattern cleanup
// ---------------------------------------------------------------------

static ANGLE_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<<([^<>]*)>>").unwrap());

fn phase_b_complex_cleanup(text: &str) -> String {
    let text = ANGLE_QUOTE.replace_all(text, "《$1》");
    remove_unmarked_admin_templates(&text)
}

/// Safety net for administrative templates Phase A's marker rules don't
/// cover (they carry no MarkerKind): erased here so Phase E never has to
/// see them split across a `|`-rich body.
fn remove_unmarked_admin_templates(text: &str) -> String {
    nested::reduce(text, "{{", "}}", |body| {
        let name = body.split('|').next().unwrap_or("").trim().to_lowercase();
        if tables::REMOVE_TEMPLATES.contains(name.as_str()) {
            String::new()
        } else {
            format!("{{{{{body}}}}}")
        }
    })
}

// ---------------------------------------------------------------------
// Phase C — nowiki protection
// ---------------------------------------------------------------------

static NOWIKI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<nowiki\s*>(.*?)</nowiki\s*>").unwrap());

fn phase_c_protect_nowiki(text: &str) -> (String, Vec<String>) {
    let mut captured = Vec::new();
    let replaced = NOWIKI
        .replace_all(text, |caps: &regex::Captures| {
            captured.push(caps[1].to_string());
            format!("<nowiki-{}>", captured.len() - 1)
        })
        .into_owned();
    (replaced, captured)
}

fn restore_nowiki(text: &str, captured: &[String]) -> String {
    let mut out = text.to_string();
    for (i, original) in captured.iter().enumerate() {
        out = out.replace(&format!("<nowiki-{i}>"), original);
    }
    out
}

static REF_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)\[ref\](.*?)\[/ref\]").unwrap());

/// Shields `[ref]...[/ref]` pairs (written by the input scrub stage) from
/// Phase D's single-bracket link resolver, the same way [`phase_c_protect_nowiki`]
/// shields `<nowiki>` spans.
fn protect_ref_tags(text: &str) -> (String, Vec<String>) {
    let mut captured = Vec::new();
    let replaced = REF_PAIR
        .replace_all(text, |caps: &regex::Captures| {
            captured.push(caps[1].to_string());
            format!("<ref-{}>", captured.len() - 1)
        })
        .into_owned();
    (replaced, captured)
}

fn restore_ref_tags(text: &str, captured: &[String]) -> String {
    let mut out = text.to_string();
    for (i, original) in captured.iter().enumerate() {
        out = out.replace(&format!("<ref-{i}>"), &format!("[ref]{original}[/ref]"));
    }
    out
}

// ---------------------------------------------------------------------
// Phase D — link resolution
// ---------------------------------------------------------------------

fn phase_d_links(text: &str) -> String {
    let text = nested::reduce(text, "[[", "]]", resolve_double_bracket_link);
    nested::reduce(&text, "[", "]", resolve_single_bracket_link)
}

fn resolve_double_bracket_link(body: &str) -> String {
    let segments: Vec<&str> = body.split('|').collect();
    let first = segments[0].trim();
    let namespace = first.split_once(':').map(|(ns, _)| ns.trim().to_lowercase());

    if let Some(ns) = &namespace {
        if tables::CATEGORY_ALIASES.contains(ns.as_str()) {
            return String::new();
        }
        if tables::FILE_ALIASES.contains(ns.as_str()) {
            return resolve_file_caption(&segments);
        }
    }

    if segments.len() == 1 {
        return first.to_string();
    }
    if segments.len() == 2 && segments[1].trim().is_empty() {
        return pipe_trick(first);
    }
    segments[1..].join("|")
}

/// Scans File/Image link segments right-to-left for the first that looks
/// like a caption: non-empty, no `=`, not a `NNNpx` size spec, not a known
/// image parameter keyword.
fn resolve_file_caption(segments: &[&str]) -> String {
    for raw in segments[1..].iter().rev() {
        let normalised = raw.replace('\n', "|");
        let candidate = normalised.trim();
        if candidate.is_empty() || candidate.contains('=') {
            continue;
        }
        if is_size_spec(candidate) {
            continue;
        }
        if tables::IMAGE_PARAM_KEYWORDS.contains(candidate.to_lowercase().as_str()) {
            continue;
        }
        return candidate.to_string();
    }
    String::new()
}

fn is_size_spec(s: &str) -> bool {
    let Some(digits) = s.strip_suffix("px") else { return false };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// `[[NS:Page (disambig), extra|]]` → `Page`: strips a leading namespace,
/// then trailing `(...)` disambiguation, then a trailing `, ...` clause.
fn pipe_trick(target: &str) -> String {
    let without_ns = target.split_once(':').map_or(target, |(_, rest)| rest);
    let without_paren = strip_trailing_parenthetical(without_ns);
    without_paren.split_once(',').map_or(without_paren, |(head, _)| head).trim().to_string()
}

fn strip_trailing_parenthetical(s: &str) -> &str {
    let trimmed = s.trim_end();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            return trimmed[..open].trim_end();
        }
    }
    trimmed
}

fn resolve_single_bracket_link(body: &str) -> String {
    let surrounded_by_ws = body.starts_with(char::is_whitespace) && body.ends_with(char::is_whitespace);
    if surrounded_by_ws {
        return format!(" {} ", body.trim());
    }
    match body.split_once(' ') {
        Some((_, tail)) => tail.trim().to_string(),
        None => body.trim().to_string(),
    }
}

// ---------------------------------------------------------------------
// Phase F — emphasis/directive removal
// ---------------------------------------------------------------------

static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static BOLD_ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'{5}(.*?)'{5}").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'{3}(.*?)'{3}").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'{2}(.*?)'{2}").unwrap());
static BARE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</?(?:span|div|br|p|small|big|sup|sub|abbr|bdi)(?:\s[^>]*)?/?>").unwrap());

fn phase_f_emphasis_and_tags(text: &str, config: &Config) -> String {
    let text = HTML_COMMENT.replace_all(text, "");
    let text = if config.strip_emphasis {
        let t = BOLD_ITALIC.replace_all(&text, "$1");
        let t = BOLD.replace_all(&t, "$1");
        ITALIC.replace_all(&t, "$1").into_owned()
    } else {
        text.into_owned()
    };
    BARE_TAG.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerSet;

    fn page() -> PageContext<'static> {
        PageContext { title: "Test", namespace: "" }
    }

    #[test]
    fn pipe_trick_strips_namespace_and_disambiguation() {
        assert_eq!(pipe_trick("NS:Page (disambig)"), "Page");
        assert_eq!(pipe_trick("X, Y"), "X");
    }

    #[test]
    fn category_link_is_removed() {
        let config = Config::default();
        let out = format_wiki("See [[Category:People]] here.", &page(), &config);
        assert!(!out.contains("People"));
    }

    #[test]
    fn file_link_extracts_caption() {
        let config = Config::default();
        let out =
            format_wiki("[[File:Foo.jpg|thumb|right|200px|A lovely caption]]", &page(), &config);
        assert_eq!(out.trim(), "A lovely caption");
    }

    #[test]
    fn simple_link_yields_target() {
        let config = Config::default();
        let out = format_wiki("Visit [[Rust (language)|Rust]] today.", &page(), &config);
        assert!(out.contains("Rust"));
        assert!(!out.contains("[["));
    }

    #[test]
    fn emphasis_markers_are_stripped() {
        let config = Config::default();
        let out = format_wiki("This is '''bold''' and ''italic''.", &page(), &config);
        assert_eq!(out.trim(), "This is bold and italic.");
    }

    #[test]
    fn math_marker_applied_when_enabled() {
        let mut config = Config::default();
        config.markers = MarkerSet::MATH;
        let out = format_wiki("<math>x^2</math>", &page(), &config);
        assert!(out.contains("MATH"));
    }

    #[test]
    fn math_deleted_when_marker_disabled() {
        let config = Config::builder().markers(MarkerSet::empty()).build();
        let out = format_wiki("Before <math>x^2</math> after.", &page(), &config);
        assert!(!out.contains("MATH"));
        assert!(!out.contains("x^2"));
    }

    #[test]
    fn nowiki_region_survives_untouched() {
        let config = Config::default();
        let out = format_wiki("<nowiki>[[Not a link]]</nowiki>", &page(), &config);
        assert_eq!(out.trim(), "[[Not a link]]");
    }

    #[test]
    fn ref_pair_survives_link_resolution() {
        let config = Config::default();
        let out = format_wiki("Cited.[ref]See [[Smith (2001)|Smith]].[/ref]", &page(), &config);
        assert!(out.contains("[ref]"));
        assert!(out.contains("[/ref]"));
        assert!(out.contains("Smith"));
    }
}
