#![warn(clippy::pedantic, missing_docs, rust_2018_idioms)]

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use config::{Config, ExtractMode, OutputFormat, SectionConfig};
use dump::{MultistreamIndex, Page, StreamReader};
use output::Writer;

mod cache;
mod config;
mod dump;
mod output;
mod pipeline;
mod wikitext;

/// Errors that may occur when parsing arguments.
#[derive(Debug, thiserror::Error)]
enum ArgsError {
    /// Missing the input dump path.
    #[error("missing <input> argument (a .xml, .xml.bz2, or directory of .xml files)")]
    Input,
    /// Unrecognised output format name.
    #[error("unknown output format '{0}' (should be 'text' or 'jsonl')")]
    Format(String),
    /// Unrecognised extract-mode name.
    #[error("unknown extract mode '{0}' (should be 'full', 'categories', 'summary', or 'metadata')")]
    Mode(String),
    /// Extra unknown junk on the command line.
    #[error("unknown arguments: {0:?}")]
    Extra(Vec<std::ffi::OsString>),
    /// Some other parsing error.
    #[error(transparent)]
    Pico(#[from] pico_args::Error),
}

/// Command-line arguments.
struct Args {
    /// The dump to read: a `.xml` file, a `.xml.bz2` file, a directory of
    /// `.xml` files, or (with `--index`) a `multistream.xml.bz2`.
    input: String,
    /// The bz2-compressed multistream index, if reading by offset.
    index: Option<String>,
    /// Output file path (or path stem, when rotating).
    output: PathBuf,
    format: OutputFormat,
    rotation_mb: u64,
    extract_mode: ExtractMode,
    extract_citations: bool,
    preserve_unknown: bool,
    /// Specific titles to extract (multistream mode only). Empty means "all".
    titles: Vec<String>,
    /// Caps how many articles (or, in multistream mode, how many streams) are read.
    limit: Option<usize>,
    /// Requested section names, if extracting sections instead of full bodies.
    sections: Vec<String>,
    min_section_length: usize,
    ordered: bool,
}

impl Args {
    fn new() -> Result<Args, ArgsError> {
        let mut args = pico_args::Arguments::from_env();

        let index = args.opt_value_from_str("--index")?;
        let output = args.opt_value_from_str("--output")?.unwrap_or_else(|| PathBuf::from("out.txt"));
        let format = match args.opt_value_from_str::<_, String>("--format")?.as_deref() {
            None => OutputFormat::Text,
            Some("text") => OutputFormat::Text,
            Some("jsonl") => OutputFormat::Jsonl,
            Some(other) => return Err(ArgsError::Format(other.to_string())),
        };
        let rotation_mb = args.opt_value_from_str("--rotation-mb")?.unwrap_or(0);
        let extract_mode = match args.opt_value_from_str::<_, String>("--mode")?.as_deref() {
            None | Some("full") => ExtractMode::Full,
            Some("categories") => ExtractMode::CategoryOnly,
            Some("summary") => ExtractMode::SummaryOnly,
            Some("metadata") => ExtractMode::MetadataOnly,
            Some(other) => return Err(ArgsError::Mode(other.to_string())),
        };
        let extract_citations = args.contains("--extract-citations");
        let preserve_unknown = args.contains("--preserve-unknown");
        let titles = args.values_from_str("--title")?;
        let limit = args.opt_value_from_str("--limit")?;
        let sections = args.values_from_str("--section")?;
        let min_section_length = args.opt_value_from_str("--min-section-length")?.unwrap_or(0);
        let ordered = args.contains("--ordered");

        let input = args.free_from_str().map_err(|_| ArgsError::Input)?;

        let rest = args.finish();
        if !rest.is_empty() {
            return Err(ArgsError::Extra(rest));
        }

        Ok(Self {
            input,
            index,
            output,
            format,
            rotation_mb,
            extract_mode,
            extract_citations,
            preserve_unknown,
            titles,
            limit,
            sections,
            min_section_length,
            ordered,
        })
    }
}

/// Command line usage instructions.
fn usage() {
    let exe = std::env::args().next().unwrap_or_default();
    eprintln!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    eprintln!("Usage: {exe} [options] <input>\n");
    eprintln!("<input> is a .xml dump, a .xml.bz2 dump, or a directory of .xml files.");
    eprintln!("With --index, <input> is instead a multistream.xml.bz2 paired with the index.\n");
    eprintln!("Options:");
    eprintln!("  --index <path>            bz2-compressed multistream index (offset:page_id:title)");
    eprintln!("  --output <path>           output file (default: out.txt)");
    eprintln!("  --format <text|jsonl>     output format (default: text)");
    eprintln!("  --rotation-mb <n>         rotate output every n MB (default: 0, no rotation)");
    eprintln!("  --mode <full|categories|summary|metadata>  what to extract (default: full)");
    eprintln!("  --title <name>            extract one title (repeatable; multistream only)");
    eprintln!("  --limit <n>               cap the number of articles (or streams) read");
    eprintln!("  --section <name>          extract one named section instead of the full body (repeatable)");
    eprintln!("  --min-section-length <n>  sections shorter than this are reported absent");
    eprintln!("  --extract-citations       render citation templates instead of dropping them");
    eprintln!("  --preserve-unknown        leave unrecognised templates untouched instead of erasing them");
    eprintln!("  --ordered                 write records in input order rather than completion order");
}

/// Reads every `Page` named by `args` from whichever input shape was given.
fn load_pages(args: &Args) -> anyhow::Result<Vec<Page>> {
    if let Some(index_path) = &args.index {
        let index = MultistreamIndex::from_file(index_path)
            .with_context(|| format!("loading multistream index from {index_path}"))?;
        log::info!("Loaded index with {} entries ({} malformed lines skipped)", index.len(), index.malformed_line_count());
        let reader = StreamReader::from_file(&args.input)
            .with_context(|| format!("opening multistream dump {}", args.input))?;
        let pages = if !args.titles.is_empty() {
            let titles: Vec<&str> = args.titles.iter().map(String::as_str).collect();
            reader.get_pages(&index, &titles)?
        } else {
            let stream_count = args.limit.unwrap_or_else(|| index.stream_offsets().len());
            reader.iter_first_streams(&index, stream_count)?
        };
        return Ok(pages);
    }

    let path = Path::new(&args.input);
    let mut pages = if path.is_dir() {
        let mut pages = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(path)
            .with_context(|| format!("reading directory {}", path.display()))?
            .filter_map(Result::ok)
            .collect();
        entries.sort_by_key(std::fs::DirEntry::path);
        for entry in entries {
            if entry.path().extension().and_then(OsStr::to_str) == Some("xml") {
                pages.extend(dump::read_xml_file(entry.path())?);
            }
        }
        pages
    } else if path.extension().and_then(OsStr::to_str) == Some("bz2") {
        dump::read_bz2_monolithic(path)?
    } else {
        dump::read_xml_file(path)?
    };

    if let Some(limit) = args.limit {
        pages.truncate(limit);
    }
    Ok(pages)
}

fn build_config(args: &Args, reference_date: time::Date) -> Config {
    let mut builder = Config::builder()
        .output(args.format)
        .rotation_mb(args.rotation_mb)
        .extract_mode(args.extract_mode)
        .extract_citations(args.extract_citations)
        .preserve_unknown(args.preserve_unknown)
        .reference_date(reference_date);
    if !args.sections.is_empty() {
        builder = builder.sections(SectionConfig {
            names: args.sections.clone(),
            min_length: args.min_section_length,
            should_skip: false,
            aliases: std::collections::HashMap::new(),
        });
    }
    builder.build()
}

fn run() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = match Args::new() {
        Ok(args) => args,
        Err(err) => {
            usage();
            return Err(err.into());
        }
    };

    log::info!("Starting up wikidump2text ...");

    let reference_date = time::OffsetDateTime::now_utc().date();
    let config = build_config(&args, reference_date);

    let pages = load_pages(&args)?;
    log::info!("Read {} article(s) from {}", pages.len(), args.input);

    let writer = Writer::new(args.output.clone(), config.output, config.rotation_mb);
    // No signal handler is wired up for this minimal driver; a caller
    // embedding `pipeline::run` in a longer-lived process can flip this from
    // another thread to cancel a run in flight.
    let cancel = AtomicBool::new(false);

    let stats = pipeline::run(&pages, &writer, &config, args.ordered, &cancel);
    writer.close().context("closing output writer")?;

    log::info!("Wrote {} record(s) to {}", stats.processed, args.output.display());
    Ok(())
}

/// Uses the [`Display`](core::fmt::Display) formatter for an error even when
/// the [`Debug`](core::fmt::Debug) formatter is requested.
struct DisplayError(Box<dyn std::error::Error>);

impl core::fmt::Debug for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl<E: Into<Box<dyn std::error::Error>>> From<E> for DisplayError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

fn main() -> Result<(), DisplayError> {
    run().map_err(Into::into)
}
