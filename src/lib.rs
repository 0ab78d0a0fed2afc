//! Cleanup of text extracted from Hebrew medical-report PDFs.
//!
//! A mother folder holds one subfolder per case (`אה456`), or several for a
//! case split across folders (`ננ449א`, `ננ449ב`). Each case PDF is turned
//! into `<case>_CLEANED.txt`: page text is normalized, sections are marked,
//! and right-to-left lines emitted in visual order are put back in reading
//! order. Split cases are also merged into `<base>_cleaned_merged.txt`.

pub mod case;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod text;

pub use error::{CleanError, Result};
pub use extract::{PageSource, PdfTextSource};
pub use pipeline::Pipeline;
pub use report::BatchSummary;
