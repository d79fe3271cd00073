use crate::models::Book;
use crate::note::{Formatting, Note, NoteOptions};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    pub formatting: Formatting,
    pub note: NoteOptions,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
}

/// Writes one note per book into `save_path`, creating it if needed.
/// Existing notes are left alone unless `overwrite` is set.
pub fn write_notes(
    books: &[Book],
    save_path: &Path,
    options: ExportOptions,
) -> Result<ExportSummary, ExportError> {
    std::fs::create_dir_all(save_path).map_err(|e| ExportError::CreateDir {
        path: save_path.display().to_string(),
        source: e,
    })?;

    let mut summary = ExportSummary::default();

    for book in books {
        if book.highlights.is_empty() {
            debug!("No highlights left for '{}', not writing a note", book.title);
            continue;
        }

        let note = Note::from_book(book, options.note);
        let file_name = note.file_name();
        let path = save_path.join(&file_name);

        if !options.overwrite && path.exists() {
            debug!("Skipping {} as it already exists", file_name);
            summary.skipped.push(file_name);
            continue;
        }

        std::fs::write(&path, note.render(options.formatting)).map_err(|e| ExportError::Write {
            path: path.display().to_string(),
            source: e,
        })?;

        debug!("Wrote {} highlights to {}", note.entries.len(), path.display());
        summary.written.push(file_name);
    }

    Ok(summary)
}
