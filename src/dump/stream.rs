//! Reads `<page>` elements out of a multistream bzip2 dump by byte offset
//! (§4.6), grounded directly on the teacher's
//! `db::article::ArticleDatabase::get_article`/`get_article_chunk`.

use std::collections::BTreeMap;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use bzip2_rs::DecoderReader;
use memmap2::Mmap;
use minidom::Element;

use super::index::MultistreamIndex;

/// Errors that may occur while decoding a stream or extracting a page.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{1}: I/O error: {0}")]
    Io(io::Error, PathBuf),
    #[error("{0}: does not look like a bzip2 multistream dump")]
    Format(PathBuf),
    #[error("bzip2 decompression failed: {0}")]
    Decompression(io::Error),
    #[error("malformed page XML: {0}")]
    Xml(#[from] minidom::Error),
    #[error("title not found in index")]
    NotFound,
}

/// One extracted article, prior to block-parsing or transformation.
#[derive(Clone, Debug)]
pub struct Page {
    pub title: String,
    pub page_id: u64,
    pub wikitext: String,
}

/// A memory-mapped, randomly-accessible multistream dump.
pub struct StreamReader {
    data: Mmap,
}

impl StreamReader {
    /// Opens `path` with [`memmap2::Mmap`], exactly as the teacher's
    /// `ArticleDatabase::from_file` does.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| Error::Io(err, path.into()))?;
        // SAFETY: the mapping is only ever read, never mutated, and the file
        // is not modified by any other process for the process lifetime.
        let data = unsafe { Mmap::map(&file) }.map_err(|err| Error::Io(err, path.into()))?;
        if data.len() < 10 || &data[0..2] != b"BZ" || &data[4..10] != b"\x31\x41\x59\x26\x53\x59" {
            return Err(Error::Format(path.into()));
        }
        Ok(Self { data })
    }

    /// Looks up `title` in `index`, decodes its stream, and returns the
    /// matching `Page`.
    pub fn get_page(&self, index: &MultistreamIndex, title: &str) -> Result<Page, Error> {
        let entry = index.find_by_title(title).ok_or(Error::NotFound)?;
        let next_offset = index.next_offset_after(entry.offset);
        let wrapped = self.decode_stream(entry.offset, next_offset)?;
        let root: Element = wrapped.parse()?;
        root.children()
            .filter(|el| el.name() == "page")
            .map(page_from_element)
            .find(|page| page.title == title)
            .ok_or(Error::NotFound)
    }

    /// Decodes every stream referenced by `titles`, grouped by offset so
    /// each stream is decompressed exactly once, then yields every matching
    /// `Page`.
    pub fn get_pages(&self, index: &MultistreamIndex, titles: &[&str]) -> Result<Vec<Page>, Error> {
        let mut wanted_by_offset: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
        for &title in titles {
            if let Some(entry) = index.find_by_title(title) {
                wanted_by_offset.entry(entry.offset).or_default().push(title);
            }
        }

        let mut pages = Vec::new();
        for (offset, wanted_titles) in wanted_by_offset {
            let next_offset = index.next_offset_after(offset);
            let wrapped = self.decode_stream(offset, next_offset)?;
            let root: Element = wrapped.parse()?;
            pages.extend(
                root.children()
                    .filter(|el| el.name() == "page")
                    .map(page_from_element)
                    .filter(|page| wanted_titles.contains(&page.title.as_str())),
            );
        }
        Ok(pages)
    }

    /// Iterates every `<page>` in the first `count` streams (per `index`'s
    /// stream-offset ordering), decoding each stream once.
    pub fn iter_first_streams(&self, index: &MultistreamIndex, count: usize) -> Result<Vec<Page>, Error> {
        let mut pages = Vec::new();
        let offsets: Vec<u64> = index.stream_offsets().iter().copied().take(count).collect();
        for (i, &offset) in offsets.iter().enumerate() {
            let next_offset = offsets.get(i + 1).copied();
            let wrapped = self.decode_stream(offset, next_offset)?;
            let root: Element = wrapped.parse()?;
            pages.extend(root.children().filter(|el| el.name() == "page").map(page_from_element));
        }
        Ok(pages)
    }

    /// Reads the byte range `[offset, next_offset)` (or to EOF) and feeds it
    /// through the bzip2 decoder, wrapped in the teacher's exact
    /// `<pages xmlns="">…</pages>` synthetic root element.
    fn decode_stream(&self, offset: u64, next_offset: Option<u64>) -> Result<String, Error> {
        let start = usize::try_from(offset).map_err(|_| Error::Format(PathBuf::new()))?;
        let end = match next_offset {
            Some(next) => usize::try_from(next).unwrap_or(self.data.len()).min(self.data.len()),
            None => self.data.len(),
        };
        let chunk = &self.data[start..end];

        let mut decoded = Vec::from(br#"<pages xmlns="">"#.as_slice());
        let mut reader = DecoderReader::new(chunk);
        io::copy(&mut reader, &mut decoded).map_err(Error::Decompression)?;
        decoded.extend(b"</pages>");
        // Invalid UTF-8 in the source revision text is scrubbed rather than
        // treated as fatal (§7 EncodingError).
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}

fn page_from_element(page: &Element) -> Page {
    let title = page.get_child("title", "").map(Element::text).unwrap_or_default();
    let page_id = page.get_child("id", "").and_then(|id| id.text().parse().ok()).unwrap_or(0);
    let wikitext = page
        .get_child("revision", "")
        .and_then(|rev| rev.get_child("text", ""))
        .map(Element::text)
        .unwrap_or_default();
    Page { title, page_id, wikitext }
}

/// Reads every `<page>` from a plain (uncompressed) XML dump (§6 input shape
/// b). Used for a single `.xml` file or each member of a directory of them.
pub fn read_xml_file(path: impl AsRef<Path>) -> Result<Vec<Page>, Error> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| Error::Io(err, path.into()))?;
    parse_pages(&String::from_utf8_lossy(&bytes))
}

/// Reads every `<page>` from a single monolithic (non-multistream) bzip2
/// dump by decoding the whole file in one pass (§6 input shape a).
pub fn read_bz2_monolithic(path: impl AsRef<Path>) -> Result<Vec<Page>, Error> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|err| Error::Io(err, path.into()))?;
    let mut decoded = Vec::new();
    let mut reader = DecoderReader::new(BufReader::new(file));
    io::copy(&mut reader, &mut decoded).map_err(Error::Decompression)?;
    parse_pages(&String::from_utf8_lossy(&decoded))
}

fn parse_pages(xml: &str) -> Result<Vec<Page>, Error> {
    let root: Element = xml.parse()?;
    Ok(root.children().filter(|el| el.name() == "page").map(page_from_element).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_bzip2_input() {
        let tmp = std::env::temp_dir().join(format!("wikidump2text-test-{:p}", &0u8));
        std::fs::write(&tmp, b"not a bzip2 file at all, but long enough").unwrap();
        let result = StreamReader::from_file(&tmp);
        std::fs::remove_file(&tmp).ok();
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn parses_plain_xml_dump() {
        let xml = r#"<mediawiki><page><title>Rust</title><id>1</id>
            <revision><text>'''Rust''' is a language.</text></revision>
        </page></mediawiki>"#;
        let pages = parse_pages(xml).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Rust");
        assert_eq!(pages[0].page_id, 1);
        assert!(pages[0].wikitext.contains("is a language"));
    }
}
