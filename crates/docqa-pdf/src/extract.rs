use std::fs;
use std::path::Path;

use lopdf::content::Content;
use tracing::{debug, info, warn};

use docqa_core::config::ExtractionSettings;
use docqa_core::{Document, DocumentId, ExtractionError, PageText};

use crate::content::{looks_decodable, text_runs};
use crate::fonts::page_font_table;
use crate::layout::assemble_lines;

/// Extracts page text from PDF files using layout-aware line assembly.
#[derive(Debug, Clone, Copy)]
pub struct PdfExtractor {
    x_tolerance: f32,
    y_tolerance: f32,
}

impl Default for PdfExtractor {
    fn default() -> Self { Self::new(&ExtractionSettings::default()) }
}

impl PdfExtractor {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self { x_tolerance: settings.x_tolerance, y_tolerance: settings.y_tolerance }
    }

    /// Read and extract a PDF from disk.
    pub fn extract_path(&self, path: impl AsRef<Path>) -> Result<Document, ExtractionError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ExtractionError::Open { path: path.display().to_string(), source })?;
        self.extract_bytes(&bytes, &path.display().to_string())
    }

    /// Extract every page of an in-memory PDF. `source` names the document in
    /// errors and logs. Pages without text are dropped, so a scanned PDF
    /// yields a document with no pages.
    pub fn extract_bytes(&self, bytes: &[u8], source: &str) -> Result<Document, ExtractionError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(map_load_error)?;
        if doc.is_encrypted() {
            return Err(ExtractionError::Encrypted);
        }

        let id = DocumentId::from_bytes(bytes);
        let mut pages = Vec::new();
        for (number, page_id) in doc.get_pages() {
            let text = self.page_text(&doc, number, page_id);
            if text.trim().is_empty() {
                debug!(page = number, "page has no text");
                continue;
            }
            pages.push(PageText { number, text });
        }

        if pages.is_empty() {
            warn!(source, "no extractable text");
        }
        info!(source, id = id.short(), pages = pages.len(), "extracted document");
        Ok(Document { id, source: source.to_string(), pages })
    }

    fn page_text(&self, doc: &lopdf::Document, number: u32, page_id: lopdf::ObjectId) -> String {
        let fonts = page_font_table(doc, page_id);
        let runs = doc
            .get_page_content(page_id)
            .ok()
            .and_then(|raw| Content::decode(&raw).ok())
            .map(|content| text_runs(&content, &fonts, self.x_tolerance))
            .unwrap_or_default();
        if looks_decodable(&runs) {
            return assemble_lines(runs, self.x_tolerance, self.y_tolerance);
        }
        // Composite fonts and encodings we don't map; lopdf knows how to use ToUnicode.
        match doc.extract_text(&[number]) {
            Ok(text) => text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n").trim().to_string(),
            Err(e) => {
                warn!(page = number, error = %e, "page text extraction failed");
                String::new()
            }
        }
    }
}

fn map_load_error(e: lopdf::Error) -> ExtractionError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("encrypt") || lower.contains("password") || lower.contains("decrypt") {
        ExtractionError::Encrypted
    } else {
        ExtractionError::Parse(msg)
    }
}
