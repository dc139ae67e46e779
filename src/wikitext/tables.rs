//! Process-wide immutable lookup tables.
//!
//! These mirror the teacher's `wikitext::config` split between raw source
//! data and compiled regexes: every `phf` set/map here is built at compile
//! time, and every derived [`regex::Regex`]/[`fancy_regex::Regex`] is compiled
//! exactly once behind a [`std::sync::LazyLock`].

use std::sync::LazyLock;

/// Namespace aliases (lowercased) that mark a `[[...]]` link as a category
/// link rather than a page link.
pub static CATEGORY_ALIASES: phf::Set<&'static str> = phf::phf_set! {
    "category",
    "categoria",
    "catégorie",
    "categorie",
    "kategorie",
    "kategoria",
    "categoría",
    "категория",
    "カテゴリ",
    "分类",
};

/// Namespace aliases (lowercased) that mark a `[[...]]` link as a File/Image
/// link.
pub static FILE_ALIASES: phf::Set<&'static str> = phf::phf_set! {
    "file",
    "image",
    "fichier",
    "datei",
    "archivo",
    "immagine",
    "ファイル",
    "画像",
    "文件",
};

/// Known image-caption parameter keywords that are never the caption itself.
pub static IMAGE_PARAM_KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "thumb", "thumbnail", "frame", "frameless", "border",
    "right", "left", "center", "centre", "none",
    "baseline", "sub", "super", "top", "text-top", "middle", "bottom", "text-bottom",
    "link", "alt", "page", "class", "lang", "upright",
};

/// Localised `#REDIRECT`-style magic words (lowercased, without the `#`).
pub static REDIRECT_KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "redirect",
    "redirection",
    "weiterleitung",
    "reindirizzamento",
    "redirección",
    "перенаправление",
};

/// Template names (lowercased) that should be erased outright (Phase E
/// default-remove set).
pub static REMOVE_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "sfn", "efn", "efn-ua", "refn", "reflist", "notelist", "notelist-ua",
    "main", "see also", "further", "portal", "portal bar", "clear",
    "cite web", "cite news", "columns-list", "div col", "div col end",
    "formatnum", "authority control", "normdaten", "persondata",
    "short description", "use dmy dates", "use mdy dates", "pp-move-indef",
    "pp-semi-indef", "multiple issues", "citation needed", "self-published",
};

/// Template names (lowercased) that identify a citation and should be
/// formatted when `extract_citations` is enabled.
pub static CITATION_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "cite book", "cite journal", "cite magazine", "citation",
};

/// Template name prefixes (lowercased) that denote administrative boxes; a
/// name is treated as this marker kind if it *starts with* one of these
/// words.
pub static INFOBOX_PREFIXES: &[&str] = &["infobox"];
pub static NAVBOX_PREFIXES: &[&str] = &["navbox"];
pub static SIDEBAR_PREFIXES: &[&str] = &["sidebar"];

/// Country/organisation flag template names (lowercased) erased like the
/// remove-set, plus any bare 2-3 uppercase letter name (checked separately).
pub static FLAG_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "flag", "flagicon", "flagu", "flagcountry",
};

/// Ruby-annotation templates: `text（reading）`.
pub static RUBY_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "ruby", "ruby-ja",
};

/// Interwiki-link stub templates that resolve to their first positional
/// argument.
pub static INTERWIKI_LINK_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "ill", "仮リンク", "interlanguage link",
};

/// Formatting templates whose content positional argument is the whole
/// value; `nbsp` is handled specially (→ a single space).
pub static FORMATTING_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "small", "smaller", "bigger", "nowrap", "nbsp", "break",
};

/// Convert-family template names.
pub static CONVERT_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "convert", "cvt",
};

/// Date/age template names handled by the template expander.
pub static DATE_TEMPLATES: phf::Set<&'static str> = phf::phf_set! {
    "birth date", "birth date and age", "death date and age", "date",
    "start date", "end date", "birth year and age",
};

/// Lines beginning with these (case-sensitive) prefixes are administrative
/// residue dropped by the cleanup pass (rule 9).
pub static MAGIC_WORD_LINE_PREFIXES: &[&str] = &[
    "DEFAULTSORT:",
    "DISPLAYTITLE:",
    "__NOTOC__",
    "__TOC__",
    "__FORCETOC__",
    "__NOEDITSECTION__",
    "__NEWSECTIONLINK__",
    "__NOGALLERY__",
    "__HIDDENCAT__",
    "__EXPECTUNUSEDCATEGORY__",
    "__STATICREDIRECT__",
];

/// Template-name remnants (rule 7 of cleanup): bare `{{Name` fragments left
/// behind by a failed reduction, sourced from the same alias tables above.
pub static CLEANUP_TEMPLATE_REMNANTS: &[&str] = &[
    "Infobox", "Sfn", "Reflist", "Columns-list", "Formatnum", "See also",
    "Portal", "Refbegin", "Refend", "Div col", "Authority control", "Normdaten",
];

/// Compiles `words` (already escaped-friendly, lowercase identifiers) into a
/// case-insensitive alternation usable inside a larger pattern.
fn alternation(words: impl Iterator<Item = &'static str>) -> String {
    words
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

/// Matches a category-namespace wikilink: captures the category name.
pub static CATEGORY_LINK: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)\[\[\s*([^:\[\]\|]+?)\s*:\s*([^|\]]+?)\s*(?:\|[^\]]*)?\]\]").unwrap()
});

/// Matches a `#REDIRECT`-style directive line.
pub static REDIRECT_LINE: LazyLock<regex::Regex> = LazyLock::new(|| {
    let words = alternation(REDIRECT_KEYWORDS.into_iter().copied());
    regex::RegexBuilder::new(&format!(r"^\s*\#\s*(?:{words})\b"))
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Matches a heading line: `^=+...=+$`.
pub static HEADING_LINE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(=+)\s*(.*?)\s*(=+)\s*$").unwrap());

/// Matches an isolated balanced tag line `<tag ...>...</tag>` using a
/// backreference to require the same tag name at both ends; `regex` cannot
/// express this, so `fancy_regex` is used here specifically.
pub static ISOLATED_TAG_LINE: LazyLock<fancy_regex::Regex> = LazyLock::new(|| {
    fancy_regex::Regex::new(r"(?i)^\s*<(\w+)(?:\s[^>]*)?>.*</\1\s*>\s*$").unwrap()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_link_extracts_name() {
        let caps = CATEGORY_LINK.captures("[[Category:People]]").unwrap();
        assert_eq!(&caps[1].to_lowercase(), "category");
        assert_eq!(&caps[2], "People");
    }

    #[test]
    fn redirect_line_matches_localised_variants() {
        assert!(REDIRECT_LINE.is_match("#REDIRECT [[Target]]"));
        assert!(REDIRECT_LINE.is_match("#redirection [[Cible]]"));
        assert!(!REDIRECT_LINE.is_match("Not a redirect"));
    }

    #[test]
    fn heading_line_strips_equals_runs() {
        let caps = HEADING_LINE.captures("== Early life ==").unwrap();
        assert_eq!(caps[1].len(), 2);
        assert_eq!(&caps[2], "Early life");
        assert_eq!(caps[3].len(), 2);
    }

    #[test]
    fn isolated_tag_line_requires_matching_names() {
        assert!(ISOLATED_TAG_LINE.is_match("<ref>hello</ref>").unwrap());
        assert!(!ISOLATED_TAG_LINE.is_match("<ref>hello</cite>").unwrap());
    }
}
