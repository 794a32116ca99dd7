//! Loading documents from a folder.
//!
//! [`FolderLoader`] reads the non-hidden files directly inside a folder (no
//! recursion), picks a [`DocumentParser`] by file extension, and turns each
//! file into one [`Document`]. A file that cannot be parsed is logged and
//! skipped.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Extracts plain text from one file.
pub trait DocumentParser: Send + Sync {
    /// Return the file's text with all pages concatenated.
    fn parse(&self, path: &Path) -> Result<String>;
}

/// Parses PDF files with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| RagError::DocumentParse {
            path: path.to_path_buf(),
            message: format!("failed to read file: {e}"),
        })?;
        // pdf-extract panics on some malformed fonts and object trees.
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        }));
        match outcome {
            Ok(extracted) => extracted.map_err(|e| RagError::DocumentParse {
                path: path.to_path_buf(),
                message: format!("PDF extraction error: {e}"),
            }),
            Err(panic) => Err(RagError::DocumentParse {
                path: path.to_path_buf(),
                message: format!("PDF extractor panicked: {}", panic_message(&*panic)),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown error"
    }
}

/// Reads UTF-8 text files as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| RagError::DocumentParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// A file that was skipped during loading.
#[derive(Debug)]
pub struct LoadFailure {
    /// The skipped file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub error: RagError,
}

/// The outcome of loading a folder.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully parsed documents, ordered by file name.
    pub documents: Vec<Document>,
    /// Files that were skipped.
    pub failures: Vec<LoadFailure>,
}

/// Loads every supported file directly inside a folder.
///
/// By default `.pdf` files go through [`PdfParser`] and `.txt` / `.md` files
/// through [`PlainTextParser`]. Extensions are matched case-insensitively.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FolderLoader;
///
/// let report = FolderLoader::new().load("sample_data/source/")?;
/// println!("{} documents, {} skipped", report.documents.len(), report.failures.len());
/// ```
#[derive(Clone)]
pub struct FolderLoader {
    parsers: HashMap<String, Arc<dyn DocumentParser>>,
}

impl Default for FolderLoader {
    fn default() -> Self {
        Self::empty()
            .with_parser("pdf", Arc::new(PdfParser))
            .with_parser("txt", Arc::new(PlainTextParser))
            .with_parser("md", Arc::new(PlainTextParser))
    }
}

impl FolderLoader {
    /// A loader with the default PDF and plain-text parsers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader with no parsers registered.
    pub fn empty() -> Self {
        Self { parsers: HashMap::new() }
    }

    /// Register `parser` for files ending in `.{extension}`.
    pub fn with_parser(mut self, extension: &str, parser: Arc<dyn DocumentParser>) -> Self {
        self.parsers.insert(extension.trim_start_matches('.').to_ascii_lowercase(), parser);
        self
    }

    /// Load and parse every file directly inside `folder`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] only if the folder itself cannot be listed.
    /// Per-file problems land in [`LoadReport::failures`].
    pub fn load(&self, folder: impl AsRef<Path>) -> Result<LoadReport> {
        let folder = folder.as_ref();
        info!(folder = %folder.display(), "reading documents");

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(folder)? {
            let path = entry?.path();
            let hidden = path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if path.is_file() && !hidden {
                paths.push(path);
            }
        }
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            match self.load_file(&path) {
                Ok(document) => {
                    let chars = document.text.chars().count();
                    info!(file = %document.id, chars, "loaded document");
                    report.documents.push(document);
                }
                Err(error) => {
                    warn!(file = %path.display(), error = %error, "skipping document");
                    report.failures.push(LoadFailure { path, error });
                }
            }
        }

        info!(
            documents = report.documents.len(),
            skipped = report.failures.len(),
            "finished reading documents"
        );
        Ok(report)
    }

    /// Parse a single file into a [`Document`].
    pub fn load_file(&self, path: &Path) -> Result<Document> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let parser = self
            .parsers
            .get(&extension)
            .ok_or_else(|| RagError::UnsupportedDocument { path: path.to_path_buf() })?;

        let text = parser.parse(path)?;
        if text.trim().is_empty() {
            return Err(RagError::DocumentParse {
                path: path.to_path_buf(),
                message: "no extractable text".to_string(),
            });
        }

        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Document {
            metadata: HashMap::from([("source".to_string(), path.display().to_string())]),
            source_uri: Some(path.display().to_string()),
            id,
            text,
        })
    }
}
