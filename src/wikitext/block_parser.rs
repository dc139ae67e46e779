//! The line-classifying block parser (§4.1).
//!
//! Consumes a scrubbed wikitext string line-by-line with a single-slot mode
//! register, producing an ordered [`Element`] sequence plus the article's
//! harvested categories. Malformed markup never raises: a mode that never
//! closes simply rides to end of file as one large open element.

use indexmap::IndexSet;

use super::article::{Element, ElementKind, HeadingLevel};
use super::nested;
use super::tables::{self, CATEGORY_ALIASES};

/// The open-mode register. `Clear` means line classification runs fresh on
/// the next line; any other variant means the current line is appended to
/// the in-flight element and checked against that mode's close pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Clear,
    MlTemplate,
    MlLink,
    Table,
    InputBox,
    Source,
    Math,
    HtmlTable,
}

/// Parses `wikitext` into its element sequence and harvested categories.
///
/// `strip_markers`, when true, removes the leading list-marker run (`*`,
/// `#`, `;`, `:`) from list-item payloads.
pub fn parse(wikitext: &str) -> (Vec<Element>, IndexSet<String>) {
    parse_with(wikitext, false)
}

/// As [`parse`], with the `strip_markers` behaviour of rule 12 made explicit.
pub fn parse_with(wikitext: &str, strip_markers: bool) -> (Vec<Element>, IndexSet<String>) {
    let mut elements: Vec<Element> = Vec::new();
    let mut categories: IndexSet<String> = IndexSet::new();
    let mut mode = Mode::Clear;

    for line in wikitext.split('\n') {
        harvest_categories(line, &mut categories);

        if mode != Mode::Clear {
            append_to_open_element(&mut elements, line);
            if mode_should_close(mode, elements.last().unwrap()) {
                mode = Mode::Clear;
            }
            continue;
        }

        let (element, next_mode) = classify(line, strip_markers);
        elements.push(element);
        mode = next_mode;
    }

    (elements, categories)
}

/// Scans `line` for `[[Category:Name]]`-shaped links (or localised aliases)
/// and records the name, preserving first-seen order and deduplicating.
fn harvest_categories(line: &str, categories: &mut IndexSet<String>) {
    for caps in tables::CATEGORY_LINK.captures_iter(line) {
        let namespace = caps[1].trim().to_lowercase();
        if CATEGORY_ALIASES.contains(namespace.as_str()) {
            categories.insert(caps[2].trim().to_string());
        }
    }
}

/// Appends `line` (with a separating newline) to the payload of the most
/// recently emitted element.
fn append_to_open_element(elements: &mut [Element], line: &str) {
    let last = elements.last_mut().expect("mode is only non-Clear after an element was pushed");
    last.payload.push('\n');
    last.payload.push_str(line);
}

/// Checks whether the just-extended open element's mode should now close.
fn mode_should_close(mode: Mode, element: &Element) -> bool {
    match mode {
        Mode::MlTemplate => is_balanced(&element.payload, "{{", "}}"),
        Mode::MlLink => is_balanced(&element.payload, "[[", "]]"),
        Mode::Table => regex_close(&element.payload, r"\|\}\s*$"),
        Mode::InputBox => element.payload.to_lowercase().contains("</inputbox>"),
        Mode::Source => element.payload.to_lowercase().contains("</source>"),
        Mode::Math => element.payload.to_lowercase().contains("</math>"),
        Mode::HtmlTable => element.payload.to_lowercase().contains("</table>"),
        Mode::Clear => true,
    }
}

/// Uses the nested-structure processor to confirm `s` contains no unmatched
/// occurrence of `l`: every balanced pair reduces to nothing, so anything
/// left over after reduction is an unmatched opener.
fn is_balanced(s: &str, l: &str, r: &str) -> bool {
    !nested::reduce(s, l, r, |_| String::new()).contains(l)
}

fn regex_close(s: &str, pattern: &str) -> bool {
    // Only the last appended line matters for these single-level modes, but
    // checking the tail of the whole payload is equally correct and avoids
    // threading the current line through separately.
    regex::Regex::new(pattern).unwrap().is_match(s.lines().last().unwrap_or(""))
}

/// Classifies a single line when no mode is open. Returns the element to
/// emit and the mode it puts the parser into (`Mode::Clear` if the element
/// is immediately closed).
fn classify(line: &str, strip_markers: bool) -> (Element, Mode) {
    let trimmed = line.trim();

    // 1. Isolated template.
    if trimmed.starts_with("{{") && trimmed.ends_with("}}") && is_balanced(trimmed, "{{", "}}") {
        return (Element::new(ElementKind::IsolatedTemplate, line), Mode::Clear);
    }

    // 2. Isolated balanced-tag line.
    if tables::ISOLATED_TAG_LINE.is_match(line).unwrap_or(false) {
        return (Element::new(ElementKind::IsolatedTag, line), Mode::Clear);
    }

    // 3. Blank line.
    if trimmed.is_empty() {
        return (Element::new(ElementKind::Blank, "\n"), Mode::Clear);
    }

    // 4. Redirect directive.
    if tables::REDIRECT_LINE.is_match(line) {
        return (Element::new(ElementKind::Redirect, line), Mode::Clear);
    }

    // 5. Heading.
    if let Some(caps) = tables::HEADING_LINE.captures(line) {
        let level = caps[1].len().min(caps[3].len()).clamp(1, 6) as HeadingLevel;
        let text = &caps[2];
        return (
            Element::new(ElementKind::Heading(level), format!("\n{text}\n")),
            Mode::Clear,
        );
    }

    // 6. Inline <inputbox>...</inputbox>.
    if has_inline_tag_pair(trimmed, "inputbox") {
        return (Element::new(ElementKind::InputBox, line), Mode::Clear);
    }

    // 7. Unmatched {{ without balancing }}.
    if line.contains("{{") && !is_balanced(line, "{{", "}}") {
        return (Element::new(ElementKind::MultiLineTemplate, line), Mode::MlTemplate);
    }

    // 8. Unmatched [[ without balancing ]].
    if line.contains("[[") && !is_balanced(line, "[[", "]]") {
        return (Element::new(ElementKind::MultiLineLink, line), Mode::MlLink);
    }

    // 9. Open-without-close <inputbox>.
    if has_open_tag(trimmed, "inputbox") {
        return (Element::new(ElementKind::InputBox, line), Mode::InputBox);
    }

    // 10. <source>, <math>, <table> inline or open variants.
    if has_inline_tag_pair(trimmed, "source") {
        return (Element::new(ElementKind::Source, line), Mode::Clear);
    }
    if has_open_tag(trimmed, "source") {
        return (Element::new(ElementKind::Source, line), Mode::Source);
    }
    if has_inline_tag_pair(trimmed, "math") {
        return (Element::new(ElementKind::Math, line), Mode::Clear);
    }
    if has_open_tag(trimmed, "math") {
        return (Element::new(ElementKind::Math, line), Mode::Math);
    }
    if has_inline_tag_pair(trimmed, "table") {
        return (Element::new(ElementKind::HtmlTable, line), Mode::Clear);
    }
    if has_open_tag(trimmed, "table") {
        return (Element::new(ElementKind::HtmlTable, line), Mode::HtmlTable);
    }

    // 11. Wiki table opener.
    if regex::Regex::new(r"^\W*\{\|").unwrap().is_match(line) {
        return (Element::new(ElementKind::Table, line), Mode::Table);
    }

    // 12. List items.
    if let Some(first) = trimmed.chars().next() {
        let (kind, marker_set): (Option<ElementKind>, &[char]) = match first {
            '*' => (Some(ElementKind::UnorderedItem), &['*']),
            '#' => (Some(ElementKind::OrderedItem), &['#']),
            ';' | ':' => (Some(ElementKind::DefinitionItem), &[';', ':']),
            _ => (None, &[]),
        };
        if let Some(kind) = kind {
            let payload = if strip_markers {
                line.trim_start_matches(|c: char| marker_set.contains(&c))
            } else {
                line
            };
            return (Element::new(kind, payload), Mode::Clear);
        }
    }
    if line.starts_with(' ') {
        return (Element::new(ElementKind::PreformattedLine, line), Mode::Clear);
    }

    // 13. Bracketed link line.
    if trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.starts_with("[[") {
        return (Element::new(ElementKind::Link, line), Mode::Clear);
    }

    // 14. Paragraph.
    (Element::new(ElementKind::Paragraph, format!("\n{line}")), Mode::Clear)
}

/// Whether `s` contains both an opening and closing tag for `name` (a closed,
/// single-line construct).
fn has_inline_tag_pair(s: &str, name: &str) -> bool {
    has_open_tag(s, name) && s.to_lowercase().contains(&format!("</{name}>"))
}

/// Whether `s` contains an opening `<name` (with or without attributes).
fn has_open_tag(s: &str, name: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains(&format!("<{name}>")) || lower.contains(&format!("<{name} "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_produces_heading_element() {
        let (elements, _) = parse("== Early life ==\n");
        assert!(matches!(elements[0].kind, ElementKind::Heading(2)));
        assert!(elements[0].payload.contains("Early life"));
    }

    #[test]
    fn category_harvest_deduplicates_and_preserves_order() {
        let text = "Text.\n[[Category:People]]\n[[Category:People]]\n[[Category:Writers]]\n";
        let (_, categories) = parse(text);
        assert_eq!(
            categories.into_iter().collect::<Vec<_>>(),
            vec!["People".to_string(), "Writers".to_string()]
        );
    }

    #[test]
    fn blank_line_payload_is_single_newline() {
        let (elements, _) = parse("\n");
        assert_eq!(elements[0].kind, ElementKind::Blank);
        assert_eq!(elements[0].payload, "\n");
    }

    #[test]
    fn dangling_multiline_template_rides_to_eof() {
        let (elements, _) = parse("{{Infobox\n| name = Foo\n| born = 1990");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::MultiLineTemplate);
        assert!(elements[0].payload.contains("born = 1990"));
    }

    #[test]
    fn multiline_template_closes_on_balance() {
        let (elements, _) = parse("{{Infobox\n| name = Foo\n}}\nAfter.");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind, ElementKind::MultiLineTemplate);
        assert!(elements[0].payload.trim_end().ends_with("}}"));
        assert_eq!(elements[1].kind, ElementKind::Paragraph);
    }

    #[test]
    fn list_items_can_strip_markers() {
        let (elements, _) = parse_with("* item one", true);
        assert_eq!(elements[0].kind, ElementKind::UnorderedItem);
        assert_eq!(elements[0].payload, " item one");
    }

    #[test]
    fn redirect_directive_is_classified() {
        let (elements, _) = parse("#REDIRECT [[Target Page]]\n");
        assert_eq!(elements[0].kind, ElementKind::Redirect);
    }

    #[test]
    fn element_concatenation_reproduces_line_stream() {
        let text = "Para one.\n\n* item\n== Head ==\n";
        let (elements, _) = parse(text);
        let joined: String = elements.iter().map(|e| e.payload.as_str()).collect();
        assert!(joined.contains("Para one."));
        assert!(joined.contains("item"));
        assert!(joined.contains("Head"));
    }
}
