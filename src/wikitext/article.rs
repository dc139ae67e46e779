//! The article data model: [`Element`], [`ElementKind`] and [`Article`].

use indexmap::IndexSet;

use super::block_parser;

/// The closed set of element kinds the block parser can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Heading(HeadingLevel),
    Paragraph,
    UnorderedItem,
    OrderedItem,
    DefinitionItem,
    PreformattedLine,
    Table,
    HtmlTable,
    InputBox,
    Source,
    Math,
    IsolatedTemplate,
    MultiLineTemplate,
    IsolatedTag,
    Link,
    MultiLineLink,
    Redirect,
    Blank,
}

/// A heading's nesting level, `1..=6`.
pub type HeadingLevel = u8;

/// One classified line (or run of lines, for open-mode elements) of an
/// article's wikitext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    /// The original source lines that produced this element, joined back
    /// together (including the newlines between them).
    pub payload: String,
}

impl Element {
    pub(crate) fn new(kind: ElementKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Whether this element's mode stays open across subsequent lines until
    /// its close pattern is matched.
    pub(crate) fn opens_mode(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::MultiLineTemplate
                | ElementKind::MultiLineLink
                | ElementKind::Table
                | ElementKind::InputBox
                | ElementKind::Source
                | ElementKind::Math
                | ElementKind::HtmlTable
        )
    }
}

/// A fully parsed article: its title, harvested categories, and the ordered
/// element sequence produced by the block parser.
#[derive(Clone, Debug)]
pub struct Article {
    pub title: String,
    /// Insertion-ordered, deduplicated category names.
    pub categories: IndexSet<String>,
    pub elements: Vec<Element>,
}

impl Article {
    /// Parses `wikitext` (already scrubbed to valid UTF-8) into an [`Article`].
    ///
    /// This never fails: malformed markup degrades to plain paragraphs or
    /// dangling open elements rather than raising an error (§4.1).
    pub fn parse(title: impl Into<String>, wikitext: &str) -> Self {
        Self::parse_with(title, wikitext, false)
    }

    /// As [`Article::parse`], but controls whether list-item markers (`*`,
    /// `#`, `;`, `:`) are stripped from their payload. Callers drive this
    /// from `Config::keep_list_markers`.
    pub fn parse_with(title: impl Into<String>, wikitext: &str, strip_markers: bool) -> Self {
        let (elements, categories) = block_parser::parse_with(wikitext, strip_markers);
        Self {
            title: title.into(),
            categories,
            elements,
        }
    }

    /// Joins every element's payload back together, reproducing the input's
    /// effective line stream modulo category-line removal (§3 invariant a).
    pub fn concatenated_payload(&self) -> String {
        self.elements.iter().map(|e| e.payload.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_concatenation_round_trips_blank_lines() {
        let article = Article::parse("T", "First para.\n\nSecond para.\n");
        let joined = article.concatenated_payload();
        assert!(joined.contains("First para."));
        assert!(joined.contains("Second para."));
    }
}
