//! Per-article output records and their text/JSONL serialisation (§6).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Config;

/// A single article's output payload.
#[derive(Clone, Debug, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// A section-extraction result for one article.
#[derive(Clone, Debug, Serialize)]
pub struct SectionRecord {
    pub title: String,
    pub sections: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Renders `record` as a single text-mode block (§6 Outputs), honouring the
/// title/categories toggles.
pub fn render_article_text(record: &ArticleRecord, config: &Config) -> String {
    let mut out = String::new();
    if config.keep_titles {
        out.push_str("[[");
        out.push_str(&record.title);
        out.push_str("]]\n\n");
    }
    if let Some(text) = &record.text {
        out.push_str(text);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    if config.keep_categories {
        if let Some(categories) = &record.categories {
            if !categories.is_empty() {
                out.push('\n');
                out.push_str("CATEGORIES: ");
                out.push_str(&categories.join(", "));
                out.push('\n');
            }
        }
    }
    out.push('\n');
    out
}

/// Renders `record` as the section-extractor's text-mode block (§6 Outputs).
pub fn render_section_text(record: &SectionRecord, config: &Config) -> String {
    let mut out = String::new();
    out.push_str("TITLE: ");
    out.push_str(&record.title);
    out.push('\n');
    for (name, content) in &record.sections {
        out.push_str("SECTION [");
        out.push_str(name);
        out.push_str("]: ");
        out.push_str(content.as_deref().unwrap_or(""));
        out.push('\n');
    }
    if config.keep_categories {
        if let Some(categories) = &record.categories {
            out.push_str("CATEGORIES: ");
            out.push_str(&categories.join(", "));
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mode_omits_empty_categories() {
        let record = ArticleRecord {
            title: "Rust".into(),
            categories: Some(vec![]),
            text: Some("Body.".into()),
            redirect: None,
        };
        let rendered = render_article_text(&record, &Config::default());
        assert!(!rendered.contains("CATEGORIES"));
        assert!(rendered.starts_with("[[Rust]]"));
    }

    #[test]
    fn text_mode_lists_categories() {
        let record = ArticleRecord {
            title: "Rust".into(),
            categories: Some(vec!["Programming languages".into(), "Systems software".into()]),
            text: Some("Body.".into()),
            redirect: None,
        };
        let rendered = render_article_text(&record, &Config::default());
        assert!(rendered.contains("CATEGORIES: Programming languages, Systems software"));
    }

    #[test]
    fn jsonl_skips_absent_fields() {
        let record = ArticleRecord { title: "Stub".into(), categories: None, text: None, redirect: None };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"title":"Stub"}"#);
    }
}
