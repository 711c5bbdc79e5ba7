//! Zone, document and chunk types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Short planning zone identifier such as `H3` or `D18`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneCode(String);

impl ZoneCode {
    /// Wrap a zone code. Registry membership is the only validation.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// A zone paired with the URL of its regulation document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub zone: ZoneCode,
    pub url: String,
}

impl DocumentRef {
    pub fn new(zone: ZoneCode, url: impl Into<String>) -> Self {
        Self {
            zone,
            url: url.into(),
        }
    }
}

/// Bytes downloaded for one document reference
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Where the bytes came from
    pub source: DocumentRef,
    /// Response body
    pub bytes: Bytes,
    /// Content-Type header, when the server sent one
    pub content_type: Option<String>,
}

impl RawDocument {
    pub fn new(source: DocumentRef, bytes: impl Into<Bytes>) -> Self {
        Self {
            source,
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Page text decoded from a document, plus the joined stream
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Zone the document belongs to
    pub zone: ZoneCode,
    /// Page texts in document order
    pub pages: Vec<String>,
    /// Pages joined with a single newline
    pub text: String,
    /// SHA-256 of `text`, hex encoded
    pub content_hash: String,
}

impl ExtractedText {
    /// Join page texts in order with a single `\n` between pages
    pub fn from_pages(zone: ZoneCode, pages: Vec<String>) -> Self {
        let text = pages.join("\n");
        let content_hash = hash_content(&text);
        Self {
            zone,
            pages,
            text,
            content_hash,
        }
    }

    /// Length of the text stream in chars
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page produced any non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Contiguous slice of a zone's extracted text used as a retrieval unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source zone
    pub zone: ZoneCode,
    /// Position in the chunk sequence (0-based)
    pub index: u32,
    /// Chunk text
    pub content: String,
    /// First char offset (inclusive) in the extracted text
    pub char_start: usize,
    /// Last char offset (exclusive) in the extracted text
    pub char_end: usize,
}

impl Chunk {
    /// Length in chars
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Hash content for traceability of cached indexes
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
