use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::debug;

use crate::error::{CleanError, Result};

/// Page-to-text capability. One entry per page; `None` when the page has no
/// extractable text.
pub trait PageSource: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Option<String>>>;
}

/// Text layer extraction through `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextSource;

impl PageSource for PdfTextSource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Option<String>>> {
        let data = std::fs::read(path).map_err(|source| CleanError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // pdf-extract panics on some malformed files instead of returning an error.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&data)
        }));
        let pages = match result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                return Err(CleanError::Extraction {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(CleanError::Extraction {
                    path: path.to_path_buf(),
                    reason: "extractor panicked (malformed document)".to_string(),
                })
            }
        };

        debug!(path = %path.display(), pages = pages.len(), "Extracted pages");
        Ok(pages
            .into_iter()
            .map(|p| if p.trim().is_empty() { None } else { Some(p) })
            .collect())
    }
}

// ── Tests ──
