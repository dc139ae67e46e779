//! Reading the raw multistream dump: the bz2-streamed index (§4.7) and the
//! mmap'd, offset-seeking page extractor (§4.6).

pub mod index;
pub mod stream;

pub use index::{IndexEntry, MultistreamIndex};
pub use stream::{read_bz2_monolithic, read_xml_file, Page, StreamReader};
