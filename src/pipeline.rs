//! The driver: fans article processing out across a rayon worker pool and
//! serialises results through the output writer (§5).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::config::{Config, ExtractMode, SectionConfig};
use crate::dump::Page;
use crate::output::{ArticleRecord, SectionRecord, Writer};
use crate::wikitext::article::{Article, ElementKind};
use crate::wikitext::magic_words::PageContext;
use crate::wikitext::{cleanup, scrub, section, transformer};

/// Namespace prefixes recognised when splitting a dump title into
/// `(namespace, bare title)` for magic-word resolution. Anything else is
/// treated as living in the main namespace.
const KNOWN_NAMESPACES: &[&str] = &[
    "Category", "File", "Image", "Template", "Help", "Portal", "Module", "Talk", "User", "User talk",
    "Wikipedia", "MediaWiki", "Special", "Media",
];

/// Outcome counters for one [`run`] invocation.
#[derive(Default, Debug, Clone, Copy)]
pub struct RunStats {
    pub processed: usize,
}

enum Output {
    Article(ArticleRecord),
    Sections(SectionRecord),
}

/// Processes `pages` against `config`, writing one record per article to
/// `writer`.
///
/// Formatting is data-parallel (one rayon task per article); the writer
/// serialises actual disk writes behind its own lock (§5 Shared resources).
/// With `ordered`, records are written back in `pages`' input order even
/// though formatting itself completes out of order; otherwise whichever
/// worker finishes first writes first. `cancel` stops new articles from
/// being dispatched — in-flight ones still complete and get written.
pub fn run(pages: &[Page], writer: &Writer, config: &Config, ordered: bool, cancel: &AtomicBool) -> RunStats {
    if ordered {
        let results: Vec<Option<Output>> = pages
            .par_iter()
            .map(|page| (!cancel.load(Ordering::Relaxed)).then(|| process_one(page, config)))
            .collect();
        let mut stats = RunStats::default();
        for result in results.into_iter().flatten() {
            write_result(&result, writer, config);
            stats.processed += 1;
        }
        stats
    } else {
        let processed = AtomicUsize::new(0);
        pages.par_iter().for_each(|page| {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let result = process_one(page, config);
            write_result(&result, writer, config);
            processed.fetch_add(1, Ordering::Relaxed);
        });
        RunStats { processed: processed.load(Ordering::Relaxed) }
    }
}

fn write_result(result: &Output, writer: &Writer, config: &Config) {
    let written = match result {
        Output::Article(record) => writer.write(record, config),
        Output::Sections(record) => writer.write_sections(record, config),
    };
    if let Err(err) = written {
        log::error!("output write failed: {err}");
    }
}

/// Runs one article through block parsing, the wiki transformer, and
/// cleanup, producing whichever record shape `config` asks for.
fn process_one(page: &Page, config: &Config) -> Output {
    let scrubbed = scrub::scrub(&page.wikitext);
    let article = Article::parse_with(page.title.clone(), &scrubbed, config.keep_list_markers);
    let (namespace, bare_title) = split_namespace(&article.title);
    let page_ctx = PageContext { title: &bare_title, namespace: &namespace };
    let categories: Vec<String> = article.categories.iter().cloned().collect();
    let redirect = config.keep_redirects.then(|| find_redirect(&article)).flatten();

    if let Some(section_config) = &config.sections {
        let raw = section::extract(&article, section_config);
        let sections: BTreeMap<String, Option<String>> = raw
            .into_iter()
            .map(|(name, content)| (name, content.map(|text| finish_text(&text, &page_ctx, config))))
            .collect();
        return Output::Sections(SectionRecord {
            title: article.title,
            sections,
            categories: config.keep_categories.then_some(categories),
        });
    }

    let text = match config.extract_mode {
        ExtractMode::CategoryOnly | ExtractMode::MetadataOnly => None,
        ExtractMode::SummaryOnly => extract_summary(&article, &page_ctx, config),
        ExtractMode::Full => Some(finish_text(&article.concatenated_payload(), &page_ctx, config)),
    };

    Output::Article(ArticleRecord {
        title: article.title,
        categories: config.keep_categories.then_some(categories),
        text,
        redirect,
    })
}

fn extract_summary(article: &Article, page_ctx: &PageContext<'_>, config: &Config) -> Option<String> {
    let summary_only = SectionConfig { names: vec!["summary".to_string()], ..SectionConfig::default() };
    section::extract(article, &summary_only)
        .remove("summary")
        .flatten()
        .map(|raw| finish_text(&raw, page_ctx, config))
}

fn finish_text(raw: &str, page_ctx: &PageContext<'_>, config: &Config) -> String {
    cleanup::cleanup(&transformer::format_wiki(raw, page_ctx, config))
}

fn find_redirect(article: &Article) -> Option<String> {
    article
        .elements
        .iter()
        .find(|el| el.kind == ElementKind::Redirect)
        .and_then(|el| extract_link_target(&el.payload))
}

fn extract_link_target(line: &str) -> Option<String> {
    let start = line.find("[[")? + 2;
    let rest = &line[start..];
    let end = rest.find("]]")?;
    let inner = &rest[..end];
    Some(inner.split('|').next().unwrap_or(inner).trim().to_string())
}

fn split_namespace(title: &str) -> (String, String) {
    if let Some((prefix, rest)) = title.split_once(':') {
        let candidate = prefix.trim();
        if KNOWN_NAMESPACES.iter().any(|ns| ns.eq_ignore_ascii_case(candidate)) {
            return (candidate.to_string(), rest.trim().to_string());
        }
    }
    (String::new(), title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    fn page(title: &str, wikitext: &str) -> Page {
        Page { title: title.to_string(), page_id: 1, wikitext: wikitext.to_string() }
    }

    #[test]
    fn redirect_target_is_extracted() {
        let article = Article::parse("Old Name", "#REDIRECT [[New Name|display]]\n");
        assert_eq!(find_redirect(&article), Some("New Name".to_string()));
    }

    #[test]
    fn namespace_split_recognises_known_prefixes() {
        assert_eq!(split_namespace("Category:Rust"), ("Category".to_string(), "Rust".to_string()));
        assert_eq!(split_namespace("Rust (programming language)"), (String::new(), "Rust (programming language)".to_string()));
    }

    #[test]
    fn run_writes_one_record_per_page() {
        let tmp = std::env::temp_dir().join(format!(
            "wikidump2text-pipeline-test-{:?}.txt",
            std::thread::current().id()
        ));
        let writer = Writer::new(&tmp, OutputFormat::Text, 0);
        let pages = vec![page("Rust", "Rust is a language.\n\n[[Category:Languages]]\n")];
        let config = Config::default();
        let cancel = AtomicBool::new(false);
        let stats = run(&pages, &writer, &config, true, &cancel);
        writer.close().unwrap();
        assert_eq!(stats.processed, 1);
        let contents = std::fs::read_to_string(&tmp).unwrap();
        assert!(contents.contains("[[Rust]]"));
        std::fs::remove_file(&tmp).ok();
    }
}
