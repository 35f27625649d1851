use crate::chunking::{chunk_text, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::models::DocumentChunk;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// PDF files directly inside `folder`, sorted by file name. A missing or
/// unreadable folder yields an empty list.
pub fn list_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.into_path());
        }
    }

    files.sort_unstable_by(|left, right| left.file_name().cmp(&right.file_name()));
    files
}

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for SkippedPdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub stored: usize,
    pub skipped_files: Vec<SkippedPdf>,
}

struct OpenDocument {
    source: String,
    pages: std::iter::Enumerate<std::vec::IntoIter<String>>,
}

/// Single-pass producer of chunks for every PDF in a folder.
///
/// Documents are opened one at a time in [`list_documents`] order and pages are
/// chunked one at a time, so a consumer can start storing before the folder has
/// been read. A document that fails to open yields one `Err(SkippedPdf)` and the
/// stream moves on to the next file.
pub struct ChunkStream<X = LopdfExtractor> {
    extractor: X,
    config: ChunkingConfig,
    files: std::vec::IntoIter<PathBuf>,
    current: Option<OpenDocument>,
    pending: VecDeque<DocumentChunk>,
}

impl ChunkStream<LopdfExtractor> {
    pub fn new(folder: &Path, config: ChunkingConfig) -> Self {
        Self::with_extractor(folder, config, LopdfExtractor)
    }
}

impl<X: PdfExtractor> ChunkStream<X> {
    pub fn with_extractor(folder: &Path, config: ChunkingConfig, extractor: X) -> Self {
        Self::from_files(list_documents(folder), config, extractor)
    }

    pub fn from_files(files: Vec<PathBuf>, config: ChunkingConfig, extractor: X) -> Self {
        Self {
            extractor,
            config,
            files: files.into_iter(),
            current: None,
            pending: VecDeque::new(),
        }
    }

    fn open(&self, path: &Path) -> Result<OpenDocument, IngestError> {
        let source = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
            .to_string();
        let pages = self.extractor.extract_pages(path)?;

        Ok(OpenDocument {
            source,
            pages: pages.into_iter().enumerate(),
        })
    }
}

impl<X: PdfExtractor> Iterator for ChunkStream<X> {
    type Item = Result<DocumentChunk, SkippedPdf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }

            if let Some(document) = self.current.as_mut() {
                if let Some((index, text)) = document.pages.next() {
                    let page = u32::try_from(index + 1).unwrap_or(u32::MAX);
                    self.pending.extend(chunk_text(&text, self.config).into_iter().map(
                        |text| DocumentChunk {
                            text,
                            source: document.source.clone(),
                            page,
                        },
                    ));
                    continue;
                }
                self.current = None;
            }

            let path = self.files.next()?;
            match self.open(&path) {
                Ok(document) => self.current = Some(document),
                Err(error) => {
                    return Some(Err(SkippedPdf {
                        path,
                        reason: error.to_string(),
                    }))
                }
            }
        }
    }
}

/// Lazily chunk every PDF in `folder`.
pub fn produce_chunks(folder: &Path, config: ChunkingConfig) -> ChunkStream {
    ChunkStream::new(folder, config)
}
