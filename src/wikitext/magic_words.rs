//! Magic words and string functions: `{{PAGENAME}}`, `{{CURRENTYEAR}}`,
//! `{{lc:}}`, `{{padleft:}}`, and friends.
//!
//! These are pure functions of `(title, reference_date)` plus their
//! arguments; none of them touch the filesystem or the network.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use time::Date;

/// Percent-encoding set matching MediaWiki's `wfUrlencode`: everything
/// outside `A-Za-z0-9-_.` is escaped, and a space becomes `_` beforehand
/// (handled by the caller, not this set).
const URL_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// The page identity a magic word expands against.
#[derive(Clone, Debug)]
pub struct PageContext<'a> {
    pub title: &'a str,
    pub namespace: &'a str,
}

/// Resolves a `{{...}}` magic word name (already lowercased by the caller's
/// dispatch, but compared case-insensitively here regardless) against the
/// page and date context. Returns `None` if `name` is not a recognised magic
/// word.
pub fn resolve(name: &str, page: &PageContext<'_>, reference_date: Date) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "pagename" => Some(page.title.to_string()),
        "pagenamee" => Some(url_title(page.title)),
        "fullpagename" => Some(full_title(page)),
        "fullpagenamee" => Some(url_title(&full_title(page))),
        "basepagename" => Some(base_title(page.title)),
        "rootpagename" => Some(root_title(page.title)),
        "subpagename" => Some(sub_title(page.title)),
        "namespace" => Some(page.namespace.to_string()),
        "talkpagename" => Some(format!("Talk:{}", page.title)),
        "currentyear" | "localyear" => Some(format!("{}", reference_date.year())),
        "currentmonth" | "localmonth" => Some(format!("{:02}", u8::from(reference_date.month()))),
        "currentday" | "localday" => Some(format!("{}", reference_date.day())),
        "currenttime" | "localtime" => Some("00:00".to_string()),
        "currenttimestamp" | "localtimestamp" => Some(format!(
            "{}{:02}{:02}000000",
            reference_date.year(),
            u8::from(reference_date.month()),
            reference_date.day()
        )),
        _ => None,
    }
}

/// Applies a string-function magic word (`{{lc:...}}`, `{{padleft:...}}`,
/// etc.) given its already-split pipe arguments (argument 0 is the function
/// name without the leading `#` or trailing `:`).
pub fn apply_string_function(name: &str, args: &[&str]) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let first = args.first().copied().unwrap_or("");
    match lower.as_str() {
        "lc" => Some(first.to_lowercase()),
        "uc" => Some(first.to_uppercase()),
        "lcfirst" => Some(lcfirst(first)),
        "ucfirst" => Some(ucfirst(first)),
        "urlencode" => Some(url_title(first)),
        "anchorencode" => Some(first.replace(' ', "_")),
        "formatnum" => Some(format_num(first)),
        "plural" | "grammar" | "gender" => Some(args.get(1).copied().unwrap_or("").to_string()),
        "int" => Some(first.to_string()),
        "padleft" => Some(pad(first, args.get(1), args.get(2), true)),
        "padright" => Some(pad(first, args.get(1), args.get(2), false)),
        _ => None,
    }
}

fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Inserts thousands separators into an integer-looking string, leaving
/// anything else untouched.
fn format_num(s: &str) -> String {
    let neg = s.starts_with('-');
    let digits = s.trim_start_matches('-');
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return s.to_string();
    }
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut result: String = grouped.chars().rev().collect();
    if !frac_part.is_empty() {
        result.push('.');
        result.push_str(frac_part);
    }
    if neg {
        format!("-{result}")
    } else {
        result
    }
}

fn pad(value: &str, width: Option<&&str>, padding: Option<&&str>, left: bool) -> String {
    let width: usize = width.and_then(|w| w.parse().ok()).unwrap_or(0);
    let padding = padding.map_or("0", |p| if p.is_empty() { "0" } else { p });
    if value.chars().count() >= width {
        return value.to_string();
    }
    let needed = width - value.chars().count();
    let pad_chars: String = padding.chars().cycle().take(needed).collect();
    if left {
        format!("{pad_chars}{value}")
    } else {
        format!("{value}{pad_chars}")
    }
}

/// URL-encodes `s` the way `PAGENAMEE` does: spaces become underscores before
/// percent-encoding.
fn url_title(s: &str) -> String {
    utf8_percent_encode(&s.replace(' ', "_"), URL_ENCODE).to_string()
}

fn full_title(page: &PageContext<'_>) -> String {
    if page.namespace.is_empty() {
        page.title.to_string()
    } else {
        format!("{}:{}", page.namespace, page.title)
    }
}

fn base_title(title: &str) -> String {
    title.rsplit_once('/').map_or(title, |(base, _)| base).to_string()
}

fn root_title(title: &str) -> String {
    title.split_once('/').map_or(title, |(root, _)| root).to_string()
}

fn sub_title(title: &str) -> String {
    title.rsplit_once('/').map_or(title, |(_, sub)| sub).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn ctx() -> PageContext<'static> {
        PageContext { title: "Rust (programming language)", namespace: "" }
    }

    #[test]
    fn pagename_and_url_variant() {
        let page = ctx();
        let date = Date::from_calendar_date(2024, Month::January, 1).unwrap();
        assert_eq!(resolve("PAGENAME", &page, date).unwrap(), "Rust (programming language)");
        assert_eq!(resolve("PAGENAMEE", &page, date).unwrap(), "Rust_%28programming_language%29");
    }

    #[test]
    fn subpage_family() {
        assert_eq!(base_title("Foo/Bar/Baz"), "Foo/Bar");
        assert_eq!(root_title("Foo/Bar/Baz"), "Foo");
        assert_eq!(sub_title("Foo/Bar/Baz"), "Baz");
    }

    #[test]
    fn string_functions() {
        assert_eq!(apply_string_function("uc", &["hello"]).unwrap(), "HELLO");
        assert_eq!(apply_string_function("padleft", &["7", "3", "0"]).unwrap(), "007");
        assert_eq!(apply_string_function("padright", &["7", "3"]).unwrap(), "700");
    }

    #[test]
    fn formatnum_groups_thousands() {
        assert_eq!(format_num("1234567"), "1,234,567");
        assert_eq!(format_num("1234.5"), "1,234.5");
    }
}
