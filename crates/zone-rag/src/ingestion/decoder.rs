//! PDF decoders producing ordered page text

use regex::Regex;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::config::{DecoderConfig, DecoderKind};
use crate::error::{Error, Result};

/// Turns document bytes into page texts, in page order
///
/// Decoding is CPU bound; callers run it on the blocking pool.
pub trait DocumentDecoder: Send + Sync {
    /// Decode `data` into one string per page
    fn decode(&self, data: &[u8]) -> Result<Vec<String>>;

    /// Get decoder name for logging
    fn name(&self) -> &str;
}

/// Build the decoder selected in configuration
pub fn decoder_for(config: &DecoderConfig) -> Box<dyn DocumentDecoder> {
    match config.kind {
        DecoderKind::Native => Box::new(PdfDecoder::new(config.decode_timeout())),
        DecoderKind::Pdftotext => Box::new(PdftotextDecoder::new(
            config.pdftotext_path.clone(),
            config.decode_timeout(),
        )),
    }
}

/// Check for the `%PDF-` marker near the start of the data
fn ensure_pdf_header(data: &[u8]) -> Result<()> {
    let window = &data[..data.len().min(1024)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(Error::decode("data is not a PDF document (missing %PDF header)"))
    }
}

fn horizontal_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\u{00A0}]+").expect("valid whitespace pattern"))
}

/// Normalize ligatures and typographic punctuation, squeeze spaces, drop blank lines
pub(crate) fn cleanup_page_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace(&['\u{2010}', '\u{2011}', '\u{2013}'][..], "-")
        .replace('\u{2014}', "--")
        .replace(&['\u{2018}', '\u{2019}'][..], "'")
        .replace(&['\u{201C}', '\u{201D}'][..], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    text.lines()
        .map(|line| horizontal_space().replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// In-process decoder: lopdf per page, pdf-extract when lopdf finds no text
pub struct PdfDecoder {
    timeout: Duration,
}

impl PdfDecoder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Page-by-page extraction with lopdf
    fn extract_pages(data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::decode(format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for page_number in pages.keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => texts.push(cleanup_page_text(&text)),
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                    texts.push(String::new());
                }
            }
        }

        Ok(texts)
    }

    /// Whole-document extraction with pdf-extract, bounded by the decode timeout
    fn extract_with_timeout(&self, data: &[u8]) -> Result<Vec<String>> {
        use std::sync::mpsc;
        use std::thread;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(text)) => Ok(text
                .split('\u{000C}')
                .map(cleanup_page_text)
                .collect()),
            Ok(Err(e)) => Err(Error::decode(format!("pdf-extract failed: {}", e))),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The worker thread cannot be cancelled; it is left to finish on its own
                tracing::error!("PDF extraction timed out after {:?}", self.timeout);
                Err(Error::decode(format!(
                    "PDF extraction timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::decode("PDF extraction thread crashed"))
            }
        }
    }
}

impl DocumentDecoder for PdfDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<String>> {
        ensure_pdf_header(data)?;

        let pages = Self::extract_pages(data)?;
        if pages.iter().any(|p| !p.trim().is_empty()) {
            return Ok(pages);
        }

        tracing::warn!("lopdf found no text in {} pages, trying pdf-extract", pages.len());
        let pages = self.extract_with_timeout(data)?;
        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::decode(
                "PDF has no extractable text (it may be image-based or encrypted)",
            ));
        }
        Ok(pages)
    }

    fn name(&self) -> &str {
        "native-pdf"
    }
}

/// Decoder shelling out to poppler's `pdftotext`
///
/// Bytes are staged in a temporary directory that is removed when decoding
/// returns, whether it succeeded or not.
pub struct PdftotextDecoder {
    program: PathBuf,
    timeout: Duration,
    staging_root: PathBuf,
}

impl PdftotextDecoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            staging_root: std::env::temp_dir(),
        }
    }

    /// Stage documents under `root` instead of the system temp directory
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = root.into();
        self
    }

    /// Check if the configured pdftotext binary runs
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Wait for the child, killing it once the timeout passes
    fn wait_bounded(&self, child: &mut std::process::Child) -> Result<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::decode(format!(
                        "pdftotext timed out after {}s",
                        self.timeout.as_secs()
                    )));
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(25)),
                Err(e) => return Err(Error::internal(format!("pdftotext wait failed: {}", e))),
            }
        }
    }
}

impl DocumentDecoder for PdftotextDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<String>> {
        ensure_pdf_header(data)?;

        let staging = tempfile::Builder::new()
            .prefix("zone-rag-pdf-")
            .tempdir_in(&self.staging_root)
            .map_err(|e| Error::internal(format!("Failed to create temp dir: {}", e)))?;

        let input_path = staging.path().join("input.pdf");
        let output_path = staging.path().join("output.txt");
        let stderr_path = staging.path().join("stderr.log");

        std::fs::write(&input_path, data)
            .map_err(|e| Error::internal(format!("Failed to stage PDF: {}", e)))?;

        // stderr goes to a file: an undrained pipe would stall a chatty child until the deadline
        let stderr_file = std::fs::File::create(&stderr_path)
            .map_err(|e| Error::internal(format!("Failed to stage pdftotext log: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(["-layout", "-enc", "UTF-8"])
            .arg(&input_path)
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| Error::decode(format!("Failed to spawn pdftotext: {}", e)))?;

        let status = self.wait_bounded(&mut child)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(Error::decode(format!(
                "pdftotext exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let text = std::fs::read_to_string(&output_path)
            .map_err(|e| Error::decode(format!("Failed to read pdftotext output: {}", e)))?;

        // pdftotext ends every page with a form feed
        let mut pages: Vec<String> = text.split('\u{000C}').map(cleanup_page_text).collect();
        if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
            pages.pop();
        }

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::decode("pdftotext produced no output - PDF may be image-based"));
        }

        Ok(pages)
    }

    fn name(&self) -> &str {
        "pdftotext"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a small PDF with one text line per page
    pub(crate) fn sample_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 18.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_cleanup_page_text() {
        let cleaned = cleanup_page_text("  Maximum\u{00A0}height:   8 metres \n\n\u{201C}Site\u{201D} coverage \u{2013} 35%\0  ");
        assert_eq!(cleaned, "Maximum height: 8 metres\n\"Site\" coverage - 35%");
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let decoder = PdfDecoder::new(Duration::from_secs(5));
        match decoder.decode(b"<html>not a pdf</html>") {
            Err(Error::Decode(msg)) => assert!(msg.contains("%PDF")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_corrupt_pdf() {
        let decoder = PdfDecoder::new(Duration::from_secs(5));
        assert!(matches!(
            decoder.decode(b"%PDF-1.4\nthis is not a real document"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_decodes_pages_in_order() {
        let pdf = sample_pdf(&["Maximum height: 8 metres", "Site coverage: 35 percent"]);
        let decoder = PdfDecoder::new(Duration::from_secs(10));

        let pages = decoder.decode(&pdf).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("Maximum height: 8 metres"), "{:?}", pages);
        assert!(pages[1].contains("Site coverage: 35 percent"), "{:?}", pages);
    }

    #[test]
    fn test_pdftotext_missing_binary_is_decode_error() {
        let decoder = PdftotextDecoder::new("/nonexistent/pdftotext", Duration::from_secs(5));
        assert!(!decoder.is_available());
        let pdf = sample_pdf(&["Front yard: 3 metres"]);
        assert!(matches!(decoder.decode(&pdf), Err(Error::Decode(_))));
    }

    /// Entries left in a staging root after decoding
    fn staged_entries(root: &std::path::Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(root)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn test_pdftotext_releases_staging_on_failure() {
        let pdf = sample_pdf(&["Front yard: 3 metres"]);
        let root = tempfile::tempdir().unwrap();

        // missing binary, non-zero exit, and a clean exit that writes no output
        for program in ["/nonexistent/pdftotext", "false", "true"] {
            let decoder = PdftotextDecoder::new(program, Duration::from_secs(5))
                .with_staging_root(root.path());

            let result = decoder.decode(&pdf);
            assert!(matches!(result, Err(Error::Decode(_))), "{}: {:?}", program, result);
            assert!(
                staged_entries(root.path()).is_empty(),
                "{} left {:?}",
                program,
                staged_entries(root.path())
            );
        }
    }

    #[test]
    fn test_pdftotext_non_zero_exit_reports_status() {
        let decoder = PdftotextDecoder::new("false", Duration::from_secs(5));
        match decoder.decode(&sample_pdf(&["Side yard: 1 metre"])) {
            Err(Error::Decode(msg)) => assert!(msg.contains("exit"), "{}", msg),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_for_config() {
        let mut config = DecoderConfig::default();
        assert_eq!(decoder_for(&config).name(), "native-pdf");
        config.kind = DecoderKind::Pdftotext;
        assert_eq!(decoder_for(&config).name(), "pdftotext");
    }
}
