use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CleanError>;

#[derive(Debug, Error)]
pub enum CleanError {
    /// Mother folder does not exist. Fatal to a batch run.
    #[error("folder not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Mother folder exists but holds no folder named like a case.
    #[error("no case folders found in {} (expected 2 Hebrew letters + 3 digits, optional Hebrew suffix)", .0.display())]
    NoCasesFound(PathBuf),

    #[error("PDF not found: {case}.pdf in {}", .folder.display())]
    DocumentNotFound { folder: PathBuf, case: String },

    #[error("no text found in {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("failed to extract text from {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid normalization rule: {0}")]
    Rules(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CleanError {
    /// Only a missing mother folder stops a run; everything else is reported.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CleanError::NotFound(_))
    }

    /// Short machine-friendly tag used in JSON summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            CleanError::NotFound(_) => "not_found",
            CleanError::NoCasesFound(_) => "no_cases_found",
            CleanError::DocumentNotFound { .. } => "document_not_found",
            CleanError::EmptyDocument(_) => "empty_document",
            CleanError::Extraction { .. } => "extraction",
            CleanError::Write { .. } => "write",
            CleanError::Rules(_) => "rules",
            CleanError::Io { .. } => "io",
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_mother_folder_is_fatal() {
        assert!(CleanError::NotFound(PathBuf::from("/nope")).is_fatal());
        assert!(!CleanError::NoCasesFound(PathBuf::from("/tmp")).is_fatal());
        assert!(!CleanError::EmptyDocument(PathBuf::from("a.pdf")).is_fatal());
    }

    #[test]
    fn document_not_found_message_names_expected_file() {
        let err = CleanError::DocumentNotFound {
            folder: PathBuf::from("/cases/אה456"),
            case: "אה456".to_string(),
        };
        assert!(err.to_string().contains("אה456.pdf"));
        assert_eq!(err.kind(), "document_not_found");
    }
}
