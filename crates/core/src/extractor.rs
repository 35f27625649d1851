use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

/// Extracts per-page text. Pages come back in document order, one entry per
/// page, with an empty string for pages that yield no text.
pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, IngestError> {
        let document = Document::load(path).map_err(|error| IngestError::PdfParse {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let pages = document
            .get_pages()
            .into_keys()
            .map(|page_no| match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    warn!(path = %path.display(), page = page_no, %error, "page has no extractable text");
                    String::new()
                }
            })
            .collect();

        Ok(pages)
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<String>, IngestError> {
    LopdfExtractor.extract_pages(path)
}
