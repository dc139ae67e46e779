//! Configuration surface for the extraction pipeline.
//!
//! This is deliberately a plain, programmatically-built value type rather than
//! a file format: the YAML loader that would populate it from disk is an
//! out-of-scope external collaborator.

use std::collections::HashMap;

use bitflags::bitflags;

bitflags! {
    /// The subset of [`MarkerKind`] constructs that should be preserved (as a
    /// `«« KIND »»` placeholder) rather than deleted outright.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MarkerSet: u32 {
        const MATH        = 1 << 0;
        const CODE        = 1 << 1;
        const CODE_BLOCK  = 1 << 2;
        const CHEM        = 1 << 3;
        const TABLE       = 1 << 4;
        const SCORE       = 1 << 5;
        const TIMELINE    = 1 << 6;
        const GRAPH       = 1 << 7;
        const IPA         = 1 << 8;
        const INFOBOX     = 1 << 9;
        const NAVBOX      = 1 << 10;
        const GALLERY     = 1 << 11;
        const SIDEBAR     = 1 << 12;
        const MAPFRAME    = 1 << 13;
        const IMAGEMAP    = 1 << 14;
        const REFERENCES  = 1 << 15;
    }
}

/// A single kind of block content the transformer can either mark-and-preserve
/// or delete, depending on whether it is a member of the caller's
/// [`MarkerSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Math,
    Code,
    CodeBlock,
    Chem,
    Table,
    Score,
    Timeline,
    Graph,
    Ipa,
    Infobox,
    Navbox,
    Gallery,
    Sidebar,
    Mapframe,
    Imagemap,
    References,
}

impl MarkerKind {
    /// The placeholder label written between the guillemets, e.g. `MATH`.
    pub const fn label(self) -> &'static str {
        match self {
            MarkerKind::Math => "MATH",
            MarkerKind::Code => "CODE",
            MarkerKind::CodeBlock => "CODE",
            MarkerKind::Chem => "CHEM",
            MarkerKind::Table => "TABLE",
            MarkerKind::Score => "SCORE",
            MarkerKind::Timeline => "TIMELINE",
            MarkerKind::Graph => "GRAPH",
            MarkerKind::Ipa => "IPA",
            MarkerKind::Infobox => "INFOBOX",
            MarkerKind::Navbox => "NAVBOX",
            MarkerKind::Gallery => "GALLERY",
            MarkerKind::Sidebar => "SIDEBAR",
            MarkerKind::Mapframe => "MAPFRAME",
            MarkerKind::Imagemap => "IMAGEMAP",
            MarkerKind::References => "REFERENCES",
        }
    }

    /// The bit for this kind within a [`MarkerSet`].
    pub const fn bit(self) -> MarkerSet {
        match self {
            MarkerKind::Math => MarkerSet::MATH,
            MarkerKind::Code => MarkerSet::CODE,
            MarkerKind::CodeBlock => MarkerSet::CODE_BLOCK,
            MarkerKind::Chem => MarkerSet::CHEM,
            MarkerKind::Table => MarkerSet::TABLE,
            MarkerKind::Score => MarkerSet::SCORE,
            MarkerKind::Timeline => MarkerSet::TIMELINE,
            MarkerKind::Graph => MarkerSet::GRAPH,
            MarkerKind::Ipa => MarkerSet::IPA,
            MarkerKind::Infobox => MarkerSet::INFOBOX,
            MarkerKind::Navbox => MarkerSet::NAVBOX,
            MarkerKind::Gallery => MarkerSet::GALLERY,
            MarkerKind::Sidebar => MarkerSet::SIDEBAR,
            MarkerKind::Mapframe => MarkerSet::MAPFRAME,
            MarkerKind::Imagemap => MarkerSet::IMAGEMAP,
            MarkerKind::References => MarkerSet::REFERENCES,
        }
    }

    /// All kinds, in declaration order, for iterating a [`MarkerSet`].
    pub const ALL: [MarkerKind; 16] = [
        MarkerKind::Math,
        MarkerKind::Code,
        MarkerKind::CodeBlock,
        MarkerKind::Chem,
        MarkerKind::Table,
        MarkerKind::Score,
        MarkerKind::Timeline,
        MarkerKind::Graph,
        MarkerKind::Ipa,
        MarkerKind::Infobox,
        MarkerKind::Navbox,
        MarkerKind::Gallery,
        MarkerKind::Sidebar,
        MarkerKind::Mapframe,
        MarkerKind::Imagemap,
        MarkerKind::References,
    ];
}

impl MarkerSet {
    /// Whether `kind` is enabled in this set.
    pub const fn contains_kind(self, kind: MarkerKind) -> bool {
        self.contains(kind.bit())
    }
}

/// Requested sections plus the reserved `summary` key.
#[derive(Clone, Debug, Default)]
pub struct SectionConfig {
    /// The section names requested by the caller (case-insensitive match).
    /// `"summary"` is reserved for the unnamed lead.
    pub names: Vec<String>,
    /// Sections shorter than this (in bytes) are reported as absent.
    pub min_length: usize,
    /// When set, an article is suppressed entirely if every requested
    /// section is absent.
    pub should_skip: bool,
    /// Case-insensitive alias map, e.g. `"Synopsis" -> "Plot"`.
    pub aliases: HashMap<String, String>,
}

/// Output serialisation format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Jsonl,
}

/// What to extract per article.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractMode {
    #[default]
    Full,
    CategoryOnly,
    SummaryOnly,
    MetadataOnly,
}

/// The full, programmatically-constructed configuration for a pipeline run.
#[derive(Clone, Debug)]
pub struct Config {
    pub keep_titles: bool,
    pub keep_headings: bool,
    pub keep_lists: bool,
    pub keep_tables: bool,
    pub keep_preformatted: bool,
    pub keep_redirects: bool,
    pub keep_list_markers: bool,
    pub strip_emphasis: bool,
    pub keep_categories: bool,

    pub markers: MarkerSet,

    pub sections: Option<SectionConfig>,

    pub output: OutputFormat,
    /// Rotation threshold in megabytes; `0` disables rotation.
    pub rotation_mb: u64,

    pub extract_mode: ExtractMode,
    pub extract_citations: bool,
    pub expand_templates: bool,
    /// When true, templates with no dispatch rule are left untouched instead
    /// of being erased.
    pub preserve_unknown: bool,

    /// The reference instant used for `CURRENT*`/`LOCAL*` magic words and
    /// date-template age computation. Sampled once per run, not per article.
    pub reference_date: time::Date,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Starts building a [`Config`] with documented defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`]; every setter returns `self` for chaining.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    inner: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            inner: Config {
                keep_titles: true,
                keep_headings: true,
                keep_lists: true,
                keep_tables: false,
                keep_preformatted: false,
                keep_redirects: false,
                keep_list_markers: false,
                strip_emphasis: true,
                keep_categories: true,
                markers: MarkerSet::REFERENCES,
                sections: None,
                output: OutputFormat::Text,
                rotation_mb: 0,
                extract_mode: ExtractMode::Full,
                extract_citations: false,
                expand_templates: true,
                preserve_unknown: false,
                reference_date: today(),
            },
        }
    }
}

/// Returns today's UTC date, used as the one-shot `reference_date` default.
fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

macro_rules! bool_setter {
    ($name:ident) => {
        pub fn $name(mut self, value: bool) -> Self {
            self.inner.$name = value;
            self
        }
    };
}

impl ConfigBuilder {
    bool_setter!(keep_titles);
    bool_setter!(keep_headings);
    bool_setter!(keep_lists);
    bool_setter!(keep_tables);
    bool_setter!(keep_preformatted);
    bool_setter!(keep_redirects);
    bool_setter!(keep_list_markers);
    bool_setter!(strip_emphasis);
    bool_setter!(keep_categories);
    bool_setter!(extract_citations);
    bool_setter!(expand_templates);
    bool_setter!(preserve_unknown);

    pub fn markers(mut self, markers: MarkerSet) -> Self {
        self.inner.markers = markers;
        self
    }

    pub fn sections(mut self, sections: SectionConfig) -> Self {
        self.inner.sections = Some(sections);
        self
    }

    pub fn output(mut self, output: OutputFormat) -> Self {
        self.inner.output = output;
        self
    }

    pub fn rotation_mb(mut self, rotation_mb: u64) -> Self {
        self.inner.rotation_mb = rotation_mb;
        self
    }

    pub fn extract_mode(mut self, mode: ExtractMode) -> Self {
        self.inner.extract_mode = mode;
        self
    }

    pub fn reference_date(mut self, date: time::Date) -> Self {
        self.inner.reference_date = date;
        self
    }

    pub fn build(self) -> Config {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_markers_has_only_references() {
        let config = Config::default();
        assert!(config.markers.contains_kind(MarkerKind::References));
        assert!(!config.markers.contains_kind(MarkerKind::Math));
    }

    #[test]
    fn builder_chains() {
        let config = Config::builder()
            .keep_tables(true)
            .rotation_mb(500)
            .markers(MarkerSet::MATH | MarkerSet::REFERENCES)
            .build();
        assert!(config.keep_tables);
        assert_eq!(config.rotation_mb, 500);
        assert!(config.markers.contains_kind(MarkerKind::Math));
    }
}
