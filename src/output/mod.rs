//! Output serialisation and the rotating writer (§4.8).

pub mod record;
pub mod writer;

pub use record::{render_article_text, render_section_text, ArticleRecord, SectionRecord};
pub use writer::Writer;
