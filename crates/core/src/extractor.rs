use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("pdf") {
            Some(DocumentKind::Pdf)
        } else if extension.eq_ignore_ascii_case("txt") {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    warn!(path = %path.display(), page = page_no, %error, "page has no extractable text");
                    continue;
                }
            };

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        Ok(pages)
    }
}

/// Concatenates page texts in page order, each followed by a newline.
pub fn join_pages(pages: &[PageText]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page.text);
        text.push('\n');
    }
    text
}

/// Decodes UTF-8, dropping invalid byte sequences instead of replacing them.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Loads the raw text of a PDF or TXT document.
pub fn load_document(path: &Path) -> Result<String, IngestError> {
    load_document_with(path, &LopdfExtractor)
}

pub fn load_document_with(path: &Path, pdf: &dyn PdfExtractor) -> Result<String, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let kind = DocumentKind::from_path(path)
        .ok_or_else(|| IngestError::UnsupportedFormat(path.to_path_buf()))?;

    let text = match kind {
        DocumentKind::Pdf => join_pages(&pdf.extract_pages(path)?),
        DocumentKind::Text => decode_lossy(&std::fs::read(path)?),
    };

    debug!(path = %path.display(), kind = ?kind, chars = text.len(), "document loaded");
    Ok(text)
}
