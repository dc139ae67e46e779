//! The template reducer (§4.4): name-dispatch over `{{...}}` bodies already
//! isolated by the nested-structure processor, plus the parser-function and
//! magic-word entry points it delegates to.

use crate::config::{Config, MarkerKind};

use super::magic_words::{self, PageContext};
use super::{expr, nested};

/// One `{{...}}` parameter: named (`key=value`) or positional.
#[derive(Clone, Debug)]
struct Param {
    name: Option<String>,
    value: String,
}

/// A parsed template invocation: its lowercased name plus ordered params.
struct Invocation {
    name: String,
    /// The name before lowercasing, needed for case-sensitive checks like
    /// the bare-uppercase flag-abbreviation heuristic.
    raw_name: String,
    params: Vec<Param>,
}

impl Invocation {
    fn positional(&self, index: usize) -> Option<&str> {
        self.params
            .iter()
            .filter(|p| p.name.is_none())
            .nth(index)
            .map(|p| p.value.as_str())
    }

    fn named(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.as_deref() == Some(key))
            .map(|p| p.value.as_str())
    }

    fn all_positional(&self) -> Vec<&str> {
        self.params.iter().filter(|p| p.name.is_none()).map(|p| p.value.as_str()).collect()
    }
}

/// Repeatedly reduces every `{{...}}` region innermost-first, to a fixed
/// point or 10 passes, whichever comes first (§4.4 final paragraph).
pub fn reduce_all(text: &str, page: &PageContext<'_>, config: &Config) -> String {
    let mut current = text.to_string();
    for _ in 0..10 {
        let next = nested::reduce(&current, "{{", "}}", |body| reduce_template(body, page, config));
        if next == current {
            return next;
        }
        current = next;
    }
    current
}

/// Dispatches a single already-isolated `{{...}}` body (braces excluded).
fn reduce_template(body: &str, page: &PageContext<'_>, config: &Config) -> String {
    let segments = split_top_level(body, '|');
    let Some((raw_name, rest)) = segments.split_first() else {
        return String::new();
    };
    let trimmed_name = raw_name.trim();

    if let Some(stripped) = trimmed_name.strip_prefix('#') {
        return dispatch_parser_function(stripped, rest, page, config);
    }

    if let Some(resolved) = magic_words::resolve(trimmed_name, page, config.reference_date) {
        return resolved;
    }

    let invocation = Invocation {
        name: trimmed_name.to_lowercase(),
        raw_name: trimmed_name.to_string(),
        params: parse_params(rest),
    };
    dispatch_template(&invocation, config)
}

/// Splits `s` on top-level occurrences of `sep`, treating `{}`/`[]` as
/// depth-increasing so that nested template/link syntax inside a parameter
/// value never contributes a spurious split.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut depth = 0i32;
    let mut start = 0;
    let mut parts = Vec::new();
    for (i, c) in s.char_indices() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            c if c == sep && depth <= 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Parses the raw `key=value` or positional segments following a template
/// name.
fn parse_params(segments: &[&str]) -> Vec<Param> {
    segments
        .iter()
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) if is_plain_key(key) => {
                Param { name: Some(key.trim().to_string()), value: value.trim().to_string() }
            }
            _ => Param { name: None, value: segment.trim().to_string() },
        })
        .collect()
}

/// Whether `key` looks like a bare parameter name (`\A[\w\s]+\z`, no markup).
fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key.chars().all(|c| c.is_alphanumeric() || c.is_whitespace() || c == '_')
        && !key.contains(['[', ']', '{', '}', '<', '>'])
}

fn dispatch_template(inv: &Invocation, config: &Config) -> String {
    let name = inv.name.as_str();

    if is_ipa_name(name) {
        return marker_or(config, MarkerKind::Ipa, || inv.positional(0).unwrap_or("").to_string());
    }
    if name == "lang" || name.starts_with("lang-") || name == "fontsize" || name == "langwithname" {
        return inv.positional(1).or_else(|| inv.positional(0)).unwrap_or("").to_string();
    }
    if name == "math" || name == "mvar" || name == "chem" || name == "ce" {
        let kind = if name == "math" || name == "mvar" { MarkerKind::Math } else { MarkerKind::Chem };
        return marker_or(config, kind, || inv.positional(0).unwrap_or("").to_string());
    }
    if super::tables::CITATION_TEMPLATES.contains(name) {
        return if config.extract_citations { format_citation(inv) } else { String::new() };
    }
    if super::tables::REMOVE_TEMPLATES.contains(name) {
        return String::new();
    }
    if super::tables::FLAG_TEMPLATES.contains(name) || is_flag_abbreviation(&inv.raw_name) {
        return String::new();
    }
    if super::tables::RUBY_TEMPLATES.contains(name) {
        let text = inv.positional(0).unwrap_or("");
        let reading = inv.positional(1).unwrap_or("");
        return format!("{text}（{reading}）");
    }
    if super::tables::INTERWIKI_LINK_TEMPLATES.contains(name) {
        return inv.positional(0).unwrap_or("").to_string();
    }
    if name == "nihongo" {
        return format_nihongo(inv);
    }
    if name == "transl" {
        return inv.positional(1).or_else(|| inv.positional(0)).unwrap_or("").to_string();
    }
    if super::tables::CONVERT_TEMPLATES.contains(name) {
        return format_convert(inv);
    }
    if super::tables::DATE_TEMPLATES.contains(name) {
        return format_date_template(name, inv, config);
    }
    if super::tables::FORMATTING_TEMPLATES.contains(name) {
        return if name == "nbsp" { " ".to_string() } else { inv.positional(0).unwrap_or("").to_string() };
    }
    if name.starts_with("as of") {
        return format!("As of {}", inv.positional(0).unwrap_or(""));
    }

    if config.preserve_unknown {
        return format!("{{{{{}}}}}", reassemble(inv));
    }

    default_heuristic(inv)
}

fn marker_or(config: &Config, kind: MarkerKind, fallback: impl FnOnce() -> String) -> String {
    if config.markers.contains_kind(kind) {
        super::marker_placeholder(kind)
    } else {
        fallback()
    }
}

fn is_ipa_name(name: &str) -> bool {
    name == "ipa" || name.starts_with("ipa-") || name.starts_with("ipac-")
}

/// A bare 2-3 uppercase-letter template name, heuristically a country-code
/// flag template (`USA`, `GB`, ...).
fn is_flag_abbreviation(name: &str) -> bool {
    (2..=3).contains(&name.len()) && name.chars().all(|c| c.is_ascii_uppercase())
}

/// Missing fields are omitted entirely rather than rendered as empty
/// placeholders (decided open question, §4.4).
fn format_citation(inv: &Invocation) -> String {
    let author = inv.named("author").or_else(|| inv.named("last")).unwrap_or("");
    let title = inv.named("title").unwrap_or("");
    let year = inv.named("year").or_else(|| inv.named("date")).unwrap_or("");

    let mut out = String::new();
    if !author.is_empty() {
        out.push_str(author);
        out.push_str(". ");
    }
    if !title.is_empty() {
        out.push('"');
        out.push_str(title);
        out.push_str(".\" ");
    }
    if !year.is_empty() {
        out.push_str(year);
        out.push('.');
    }
    let trimmed = out.trim_end();
    trimmed.strip_suffix(' ').unwrap_or(trimmed).to_string()
}

fn format_nihongo(inv: &Invocation) -> String {
    let text = inv.positional(0).unwrap_or("");
    let kanji = inv.positional(1).unwrap_or("");
    let romaji = inv.positional(2).unwrap_or("");
    let parts: Vec<&str> = [kanji, romaji].into_iter().filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        text.to_string()
    } else {
        format!("{text} ({})", parts.join(", "))
    }
}

fn format_convert(inv: &Invocation) -> String {
    let number = inv.positional(0).unwrap_or("");
    let unit = inv.positional(1).unwrap_or("");
    if number.is_empty() {
        String::new()
    } else if unit.is_empty() {
        number.to_string()
    } else {
        format!("{number} {unit}")
    }
}

fn format_date_template(name: &str, inv: &Invocation, config: &Config) -> String {
    let df = inv.named("df").unwrap_or("");
    let year = inv.positional(0).unwrap_or("");
    let month = inv.positional(1).unwrap_or("");
    let day = inv.positional(2).unwrap_or("");

    let formatted = if df.eq_ignore_ascii_case("dmy") {
        format!("{day} {} {year}", month_name(month))
    } else {
        format!("{} {day}, {year}", month_name(month))
    };

    if name.ends_with("and age") {
        if let Some(age) = compute_age(year, month, day, config) {
            return format!("{formatted} (age {age})");
        }
    }
    formatted
}

fn month_name(month: &str) -> String {
    match month.parse::<u8>() {
        Ok(n) if (1..=12).contains(&n) => month_name_from_number(n).to_string(),
        _ => month.to_string(),
    }
}

fn month_name_from_number(n: u8) -> &'static str {
    const NAMES: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ];
    NAMES[usize::from(n.clamp(1, 12) - 1)]
}

fn compute_age(year: &str, month: &str, day: &str, config: &Config) -> Option<i32> {
    let birth_year: i32 = year.parse().ok()?;
    let birth_month: u8 = month.parse().ok()?;
    let birth_day: u8 = day.parse().ok()?;
    let reference = config.reference_date;
    let mut age = i32::from(reference.year()) - birth_year;
    let ref_month = u8::from(reference.month());
    if ref_month < birth_month || (ref_month == birth_month && reference.day() < birth_day) {
        age -= 1;
    }
    Some(age)
}

/// Default heuristic when no dispatch rule matches: the first non-`=`
/// positional argument; failing that, the first parameter's value; failing
/// that, empty.
fn default_heuristic(inv: &Invocation) -> String {
    if let Some(value) = inv.all_positional().first() {
        return (*value).to_string();
    }
    if let Some(param) = inv.params.first() {
        return param.value.clone();
    }
    String::new()
}

fn reassemble(inv: &Invocation) -> String {
    let mut parts = vec![inv.name.clone()];
    for p in &inv.params {
        match &p.name {
            Some(name) => parts.push(format!("{name}={}", p.value)),
            None => parts.push(p.value.clone()),
        }
    }
    parts.join("|")
}

/// Evaluates a `{{#...:...}}` parser function.
fn dispatch_parser_function(
    name: &str,
    args: &[&str],
    page: &PageContext<'_>,
    config: &Config,
) -> String {
    let args: Vec<&str> = args.iter().map(|a| a.trim()).collect();
    let arg = |i: usize| args.get(i).copied().unwrap_or("");

    match name {
        "if" => if !arg(0).trim().is_empty() { arg(1) } else { arg(2) }.to_string(),
        "ifeq" => if arg(0).trim() == arg(1).trim() { arg(2) } else { arg(3) }.to_string(),
        "switch" => eval_switch(arg(0), &args[1.min(args.len())..]),
        "expr" => expr::evaluate_to_string(arg(0)).unwrap_or_default(),
        "ifexpr" => match expr::evaluate(arg(0)) {
            Ok(v) if v != 0.0 => arg(1).to_string(),
            Ok(_) => arg(2).to_string(),
            Err(_) => String::new(),
        },
        "iferror" => match expr::evaluate(arg(0)) {
            Err(_) => arg(1).to_string(),
            Ok(_) if args.len() <= 2 => arg(0).to_string(),
            Ok(_) => arg(2).to_string(),
        },
        "len" => arg(0).chars().count().to_string(),
        "pos" => find_pos(arg(0), arg(1), arg(2)),
        "rpos" => rfind_pos(arg(0), arg(1)),
        "count" => count_occurrences(arg(0), arg(1)).to_string(),
        "sub" => substring(arg(0), arg(1), args.get(2).copied()),
        "replace" => arg(0).replace(arg(1), arg(2)),
        "explode" => explode(arg(0), arg(1), arg(2)),
        "urlencode" => magic_words::apply_string_function("urlencode", &[arg(0)]).unwrap_or_default(),
        "urldecode" => percent_encoding::percent_decode_str(arg(0)).decode_utf8_lossy().to_string(),
        "padleft" => magic_words::apply_string_function("padleft", &args).unwrap_or_default(),
        "padright" => magic_words::apply_string_function("padright", &args).unwrap_or_default(),
        "titleparts" => titleparts(page.title, arg(1), arg(2)),
        "time" => format_time(arg(0), config),
        _ => {
            if config.preserve_unknown {
                format!("{{{{#{name}:{}}}}}", args.join("|"))
            } else {
                String::new()
            }
        }
    }
}

fn eval_switch(subject: &str, cases: &[&str]) -> String {
    let subject = subject.trim();
    let mut default = "";
    for case in cases {
        if let Some((key, value)) = case.split_once('=') {
            let key = key.trim();
            if key == subject || key == "#default" {
                if key == subject {
                    return value.trim().to_string();
                }
                default = value.trim();
            }
        } else if case.trim() == subject {
            // A bare case with no '=' falls through to the next case's value
            // per MediaWiki semantics; approximated here as a direct match.
            return case.trim().to_string();
        }
    }
    default.to_string()
}

fn find_pos(haystack: &str, needle: &str, offset: &str) -> String {
    let offset: usize = offset.parse().unwrap_or(0);
    let start = haystack.char_indices().nth(offset).map_or(haystack.len(), |(i, _)| i);
    haystack
        .get(start..)
        .and_then(|tail| tail.find(needle))
        .map(|pos| haystack[..start + pos].chars().count().to_string())
        .unwrap_or_default()
}

fn rfind_pos(haystack: &str, needle: &str) -> String {
    haystack.rfind(needle).map(|pos| haystack[..pos].chars().count().to_string()).unwrap_or_default()
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

fn substring(s: &str, start: &str, length: Option<&str>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let mut start: i64 = start.parse().unwrap_or(0);
    if start < 0 {
        start = (len + start).max(0);
    }
    let start = start.min(len) as usize;
    let take = match length.and_then(|l| l.parse::<i64>().ok()) {
        Some(n) if n >= 0 => n as usize,
        Some(n) => (len - start as i64 + n).max(0) as usize,
        None => chars.len() - start,
    };
    chars[start..].iter().take(take).collect()
}

fn explode(s: &str, delim: &str, index: &str) -> String {
    if delim.is_empty() {
        return String::new();
    }
    let index: usize = index.parse().unwrap_or(0);
    s.split(delim).nth(index).unwrap_or("").to_string()
}

fn titleparts(title: &str, count: &str, offset: &str) -> String {
    let parts: Vec<&str> = title.split('/').collect();
    let offset: usize = offset.parse().unwrap_or(0);
    let count: usize = count.parse().unwrap_or(parts.len());
    parts.iter().skip(offset).take(count).copied().collect::<Vec<_>>().join("/")
}

/// Accepts ISO `YYYY-MM-DD`, then `DD Month YYYY`, then bare `YYYY`, in that
/// order (decided open question, §4.4/§9).
fn format_time(spec: &str, config: &Config) -> String {
    use time::Month;

    if spec.trim().is_empty() {
        return format!("{}", config.reference_date.year());
    }
    if let Ok(date) = time::Date::parse(
        spec,
        &time::format_description::parse("[year]-[month]-[day]").unwrap(),
    ) {
        let month_num = u8::from(date.month());
        return format!("{} {}, {}", month_name_from_number(month_num), date.day(), date.year());
    }
    let words: Vec<&str> = spec.split_whitespace().collect();
    if words.len() == 3 {
        if let (Ok(day), Some(month), Ok(year)) =
            (words[0].parse::<u8>(), parse_month_name(words[1]), words[2].parse::<i32>())
        {
            let _: Month = month;
            return format!("{day} {} {year}", words[1]);
        }
    }
    if let Ok(year) = spec.trim().parse::<i32>() {
        return year.to_string();
    }
    spec.to_string()
}

fn parse_month_name(s: &str) -> Option<time::Month> {
    use time::Month::*;
    const NAMES: [(time::Month, &str); 12] = [
        (January, "january"), (February, "february"), (March, "march"), (April, "april"),
        (May, "may"), (June, "june"), (July, "july"), (August, "august"),
        (September, "september"), (October, "october"), (November, "november"),
        (December, "december"),
    ];
    let lower = s.to_lowercase();
    NAMES.iter().find(|(_, name)| *name == lower).map(|(m, _)| *m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageContext<'static> {
        PageContext { title: "Rust", namespace: "" }
    }

    #[test]
    fn default_heuristic_picks_first_positional() {
        let config = Config::default();
        let out = reduce_all("{{unknown|hello|world}}", &page(), &config);
        assert_eq!(out, "hello");
    }

    #[test]
    fn remove_templates_vanish() {
        let config = Config::default();
        let out = reduce_all("{{reflist}}", &page(), &config);
        assert_eq!(out, "");
    }

    #[test]
    fn citation_omits_missing_fields() {
        let mut config = Config::default();
        config.extract_citations = true;
        let out = reduce_all("{{cite book|author=Jane Doe|title=A Book}}", &page(), &config);
        assert_eq!(out, "Jane Doe. \"A Book.\"");
    }

    #[test]
    fn parser_function_if_and_switch() {
        let config = Config::default();
        assert_eq!(reduce_all("{{#if:yes|A|B}}", &page(), &config), "A");
        assert_eq!(reduce_all("{{#if:|A|B}}", &page(), &config), "B");
        assert_eq!(reduce_all("{{#switch:b|a=1|b=2|c=3}}", &page(), &config), "2");
    }

    #[test]
    fn parser_function_expr() {
        let config = Config::default();
        assert_eq!(reduce_all("{{#expr:2+2}}", &page(), &config), "4");
    }

    #[test]
    fn nested_templates_reduce_innermost_first() {
        let config = Config::default();
        let out = reduce_all("{{#if:{{#if:1|yes}}|outer-yes|outer-no}}", &page(), &config);
        assert_eq!(out, "outer-yes");
    }

    #[test]
    fn convert_template_joins_number_and_unit() {
        let config = Config::default();
        assert_eq!(reduce_all("{{convert|5|km}}", &page(), &config), "5 km");
    }
}
