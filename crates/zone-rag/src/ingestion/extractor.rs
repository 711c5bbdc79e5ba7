//! Raw document bytes to ordered text

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ingestion::decoder::DocumentDecoder;
use crate::types::{ExtractedText, RawDocument};

/// Runs a decoder on the blocking pool and assembles the text stream
pub struct TextExtractor {
    decoder: Arc<dyn DocumentDecoder>,
}

impl TextExtractor {
    pub fn new(decoder: Arc<dyn DocumentDecoder>) -> Self {
        Self { decoder }
    }

    pub fn decoder_name(&self) -> &str {
        self.decoder.name()
    }

    /// Decode `raw` into page texts joined by `\n`
    ///
    /// A document with no text on any page is a decode error, never an empty success.
    pub async fn extract(&self, raw: RawDocument) -> Result<ExtractedText> {
        let zone = raw.source.zone.clone();
        let decoder = Arc::clone(&self.decoder);
        let bytes = raw.bytes;

        let pages = tokio::task::spawn_blocking(move || decoder.decode(&bytes)).await??;

        let extracted = ExtractedText::from_pages(zone, pages);
        if extracted.is_blank() {
            return Err(Error::decode(format!(
                "document for zone {} contains no text",
                extracted.zone
            )));
        }

        tracing::info!(
            "Extracted {} chars from {} pages for zone {} ({})",
            extracted.char_len(),
            extracted.page_count(),
            extracted.zone,
            self.decoder.name()
        );

        Ok(extracted)
    }
}
