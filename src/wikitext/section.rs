//! The section extractor (§4.9): walks an already-parsed [`Article`]'s
//! element sequence and buffers content under requested section names.

use std::collections::HashMap;

use unicase::UniCase;

use crate::config::SectionConfig;

use super::article::{Article, ElementKind};

/// One requested section's resolved content, if found.
pub type SectionMap = HashMap<String, Option<String>>;

/// Extracts every section named in `config` (plus the reserved `summary`
/// key) from `article`. Always returns an entry for every requested name,
/// with `None` where no matching heading was found or the content fell
/// below `min_length`.
pub fn extract(article: &Article, config: &SectionConfig) -> SectionMap {
    let mut result: SectionMap = config.names.iter().map(|n| (n.clone(), None)).collect();

    if config.names.iter().any(|n| n.eq_ignore_ascii_case("summary")) {
        result.insert("summary".to_string(), Some(extract_summary(article)));
    }

    let mut current: Option<(String, u8, String)> = None; // (canonical name, level, buffer)

    for element in &article.elements {
        if let ElementKind::Heading(level) = element.kind {
            if let Some((name, _, buffer)) = current.take() {
                store(&mut result, &name, buffer, config);
            }
            let heading_text = element.payload.trim();
            if let Some(canonical) = resolve_name(heading_text, config) {
                current = Some((canonical, level, String::new()));
            }
        } else if let Some((_, _, buffer)) = current.as_mut() {
            buffer.push_str(&element.payload);
        }
    }
    if let Some((name, _, buffer)) = current {
        store(&mut result, &name, buffer, config);
    }

    if config.should_skip && result.values().all(Option::is_none) {
        return config.names.iter().map(|n| (n.clone(), None)).collect();
    }

    result
}

/// The lead: every element payload up to the first heading.
fn extract_summary(article: &Article) -> String {
    let mut buffer = String::new();
    for element in &article.elements {
        if matches!(element.kind, ElementKind::Heading(_)) {
            break;
        }
        buffer.push_str(&element.payload);
    }
    buffer.trim().to_string()
}

/// Resolves `heading` against the requested names, case-insensitively, then
/// falling back to the alias table.
fn resolve_name(heading: &str, config: &SectionConfig) -> Option<String> {
    let heading_ci = UniCase::new(heading);
    if let Some(name) = config.names.iter().find(|n| UniCase::new(n.as_str()) == heading_ci) {
        return Some(name.clone());
    }
    for (alias, canonical) in &config.aliases {
        if UniCase::new(alias.as_str()) == heading_ci
            && config.names.iter().any(|n| UniCase::new(n.as_str()) == UniCase::new(canonical.as_str()))
        {
            return Some(canonical.clone());
        }
    }
    None
}

fn store(result: &mut SectionMap, name: &str, buffer: String, config: &SectionConfig) {
    let trimmed = buffer.trim().to_string();
    if trimmed.len() < config.min_length {
        result.insert(name.to_string(), None);
    } else {
        result.insert(name.to_string(), Some(trimmed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(names: &[&str]) -> SectionConfig {
        SectionConfig {
            names: names.iter().map(|s| s.to_string()).collect(),
            min_length: 0,
            should_skip: false,
            aliases: HashMap::new(),
        }
    }

    #[test]
    fn extracts_summary_and_named_section() {
        let article = Article::parse(
            "T",
            "Lead paragraph.\n\n== Plot ==\nPlot text here.\n\n== Cast ==\nCast text.\n",
        );
        let map = extract(&article, &config(&["summary", "Plot"]));
        assert!(map["summary"].as_ref().unwrap().contains("Lead paragraph"));
        assert!(map["Plot"].as_ref().unwrap().contains("Plot text here"));
    }

    #[test]
    fn missing_section_is_none() {
        let article = Article::parse("T", "Lead.\n\n== Plot ==\nText.\n");
        let map = extract(&article, &config(&["Cast"]));
        assert_eq!(map["Cast"], None);
    }

    #[test]
    fn alias_resolves_to_canonical_name() {
        let mut config = config(&["Plot"]);
        config.aliases.insert("Synopsis".to_string(), "Plot".to_string());
        let article = Article::parse("T", "Lead.\n\n== Synopsis ==\nAlias text.\n");
        let map = extract(&article, &config);
        assert!(map["Plot"].as_ref().unwrap().contains("Alias text"));
    }

    #[test]
    fn totality_every_requested_name_present() {
        let article = Article::parse("T", "Lead.\n");
        let map = extract(&article, &config(&["Plot", "Cast", "summary"]));
        assert_eq!(map.len(), 3);
    }
}
