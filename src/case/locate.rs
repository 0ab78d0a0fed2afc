use std::path::{Path, PathBuf};

use tracing::debug;

/// Find `<case_name>.pdf` inside `folder`.
///
/// The exact name is tried first; otherwise the folder is scanned and the
/// first entry equal to it ignoring case is returned. The comparison is done
/// here rather than left to the filesystem, so the result is the same on
/// case-sensitive and case-insensitive volumes.
pub fn locate(folder: &Path, case_name: &str) -> Option<PathBuf> {
    locate_file(folder, &format!("{case_name}.pdf"))
}

/// Same lookup for an explicit file name (used when the document name is overridden).
pub fn locate_file(folder: &Path, file_name: &str) -> Option<PathBuf> {
    let exact = folder.join(file_name);
    if exact.is_file() {
        return Some(exact);
    }

    let wanted = file_name.to_lowercase();
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(folder = %folder.display(), error = %e, "Cannot list folder");
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|n| n.to_lowercase() == wanted)
                .unwrap_or(false)
                && entry.path().is_file()
        })
        .map(|entry| entry.path())
}

// ── Tests ──
