use crate::chunking::{prepare_document, ChunkingConfig, LabeledDocument};
use crate::error::IngestError;
use crate::extractor::{load_document_with, DocumentKind, LopdfExtractor, PdfExtractor};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Recursively lists every PDF and TXT file under `folder`, sorted by path.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentKind::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn document_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// Loads, cleans, chunks and labels each file in order.
///
/// Fails on the first unreadable file so that callers never index a partial
/// upload.
pub fn prepare_files(
    paths: &[PathBuf],
    config: ChunkingConfig,
) -> Result<Vec<LabeledDocument>, IngestError> {
    prepare_files_with(paths, config, &LopdfExtractor)
}

pub fn prepare_files_with(
    paths: &[PathBuf],
    config: ChunkingConfig,
    pdf: &dyn PdfExtractor,
) -> Result<Vec<LabeledDocument>, IngestError> {
    let mut documents = Vec::with_capacity(paths.len());

    for path in paths {
        let raw_text = load_document_with(path, pdf)?;
        let name = document_name(path)?;
        let document = prepare_document(&name, &raw_text, config);
        info!(document = %name, chunk_count = document.chunks.len(), "document chunked");
        documents.push(document);
    }

    Ok(documents)
}
