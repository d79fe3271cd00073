use crate::models::{Book, ClippingKind, Highlight};
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::QueryFailed(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveSummary {
    pub inserted: usize,
    pub already_present: usize,
}

pub fn init_db(path: &Path) -> Result<Connection, DbError> {
    let conn = Connection::open(path)
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS highlights (
            id INTEGER PRIMARY KEY,
            book_title TEXT NOT NULL,
            book_author TEXT NOT NULL,
            kind TEXT NOT NULL,
            page INTEGER,
            location TEXT,
            text TEXT NOT NULL,
            added_on TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(book_title, book_author, kind, text)
        )",
        [],
    )?;

    Ok(conn)
}

fn kind_name(kind: ClippingKind) -> &'static str {
    match kind {
        ClippingKind::Highlight => "highlight",
        ClippingKind::Note => "note",
        ClippingKind::Bookmark => "bookmark",
    }
}

pub fn insert_highlight(
    conn: &Connection,
    highlight: &Highlight,
    book_title: &str,
    book_author: &str,
) -> Result<bool, DbError> {
    let added_on = highlight
        .added_on
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string());

    let rows = conn.execute(
        "INSERT OR IGNORE INTO highlights
         (book_title, book_author, kind, page, location, text, added_on)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            book_title,
            book_author,
            kind_name(highlight.kind),
            highlight.page,
            highlight.location,
            highlight.text,
            added_on,
        ],
    )?;

    Ok(rows > 0)
}

/// Archives every highlight of every book in a single transaction.
pub fn archive_books(conn: &mut Connection, books: &[Book]) -> Result<ArchiveSummary, DbError> {
    let tx = conn.transaction()?;
    let mut summary = ArchiveSummary::default();

    for book in books {
        for highlight in &book.highlights {
            if insert_highlight(&tx, highlight, &book.title, &book.author)? {
                summary.inserted += 1;
            } else {
                summary.already_present += 1;
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}
