//! Streaming record cursor over annual archive XML
//!
//! The annual files hold hundreds of thousands of `case-file` elements, far
//! too many to load as one tree. [`CaseFileCursor`] walks the document with a
//! forward-only `quick_xml` reader and, each time it meets the start of a
//! record element, builds just that subtree as an [`XmlElement`] and yields
//! it. Memory use is bounded by the largest single record.
//!
//! The cursor is single-pass. Iterating again means opening the file again.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::error::{IngestError, Result};

const READ_BUFFER_BYTES: usize = 1024 * 1024;

/// Materialized record subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Character data directly inside this element
    pub fn text(&self) -> &str {
        &self.text
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlElement::text)
    }

    /// All children with the given name, in document order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Lazy sequence of record elements read from an XML source
pub struct CaseFileCursor<R: BufRead> {
    reader: Reader<R>,
    source: PathBuf,
    record_tag: Vec<u8>,
    buf: Vec<u8>,
    finished: bool,
}

impl CaseFileCursor<BufReader<File>> {
    /// Open `path` and stream its `record_element` elements
    pub fn open(path: &Path, record_element: &str) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);
        Ok(Self::from_reader(reader, path, record_element))
    }
}

impl<R: BufRead> CaseFileCursor<R> {
    /// Stream records from any buffered reader. `source` only labels errors.
    pub fn from_reader(reader: R, source: impl Into<PathBuf>, record_element: &str) -> Self {
        let reader = Reader::from_reader(reader);

        Self {
            reader,
            source: source.into(),
            record_tag: record_element.as_bytes().to_vec(),
            buf: Vec::with_capacity(8192),
            finished: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<XmlElement>> {
        enum Step {
            Open(String),
            Empty(String),
            Skip,
            Eof,
        }

        loop {
            self.buf.clear();
            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == self.record_tag.as_slice() => {
                    Step::Open(element_name(e.name().as_ref()))
                }
                Ok(Event::Empty(ref e)) if e.name().as_ref() == self.record_tag.as_slice() => {
                    Step::Empty(element_name(e.name().as_ref()))
                }
                Ok(Event::Eof) => Step::Eof,
                Ok(_) => Step::Skip,
                Err(e) => {
                    return Err(IngestError::xml(
                        &self.source,
                        format!("{} at byte {}", e, self.reader.buffer_position()),
                    ))
                }
            };

            match step {
                Step::Open(name) => {
                    let root = XmlElement::new(name);
                    return read_subtree(&mut self.reader, &mut self.buf, &self.source, root)
                        .map(Some);
                }
                Step::Empty(name) => return Ok(Some(XmlElement::new(name))),
                Step::Eof => return Ok(None),
                Step::Skip => continue,
            }
        }
    }
}

impl<R: BufRead> Iterator for CaseFileCursor<R> {
    type Item = Result<XmlElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_record() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for CaseFileCursor<R> {}

/// Open `path` and return its record elements as a lazy sequence
pub fn elements(path: &Path, record_element: &str) -> Result<CaseFileCursor<BufReader<File>>> {
    CaseFileCursor::open(path, record_element)
}

/// Consume events up to the end tag matching `root`, building the subtree.
fn read_subtree<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    source: &Path,
    root: XmlElement,
) -> Result<XmlElement> {
    let mut stack = vec![root];

    loop {
        buf.clear();
        let event = reader.read_event_into(buf).map_err(|e| {
            IngestError::xml(source, format!("{} at byte {}", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => stack.push(XmlElement::new(element_name(e.name().as_ref()))),
            Event::Empty(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlElement::new(element_name(e.name().as_ref())));
                }
            }
            Event::Text(e) => {
                let text = match e.unescape() {
                    Ok(text) => text,
                    Err(err) => {
                        trace!(error = %err, "Keeping undecodable text verbatim");
                        Cow::Owned(String::from_utf8_lossy(&e).into_owned())
                    }
                };
                // Indentation between elements; text nodes are otherwise kept verbatim
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                let Some(done) = stack.pop() else {
                    return Err(IngestError::xml(source, "unbalanced end tag"));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Ok(done),
                }
            }
            Event::Eof => {
                let open = stack.first().map(|e| e.name.clone()).unwrap_or_default();
                return Err(IngestError::xml(
                    source,
                    format!("document ended inside <{}>", open),
                ));
            }
            // Comments, processing instructions, declarations, DOCTYPE
            _ => {}
        }
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
