use crate::models::{Book, Clipping, ClippingKind, Highlight};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// The line separating two entries in a clippings file.
pub const ENTRY_SEPARATOR: &str = "==========";

/// The name Kindle devices give their clippings export.
pub const CLIPPINGS_FILE_NAME: &str = "My Clippings.txt";

const ADDED_ON_FORMATS: [&str; 2] = [
    "%A, %B %d, %Y %I:%M:%S %p",
    "%A, %d %B %Y %H:%M:%S",
];

#[derive(Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Expected 3 non-empty lines in clipping, found {0}")]
    UnexpectedLineCount(usize),

    #[error("No author in parentheses: '{0}'")]
    MissingAuthor(String),

    #[error("Clipping has no title: '{0}'")]
    MissingTitle(String),
}

pub fn read_clippings(path: &Path) -> Result<Vec<Clipping>, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|e| ParseError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(parse_clippings(&content))
}

/// Parses every entry of a clippings file. Malformed entries are skipped.
pub fn parse_clippings(content: &str) -> Vec<Clipping> {
    let mut clippings = Vec::new();

    for raw in content.split(ENTRY_SEPARATOR) {
        if raw.trim().is_empty() {
            continue;
        }

        match parse_entry(raw) {
            Ok(clipping) => clippings.push(clipping),
            Err(e) => debug!("Skipping malformed clipping: {}", e),
        }
    }

    clippings
}

pub fn parse_entry(raw: &str) -> Result<Clipping, ParseError> {
    let lines: Vec<&str> = raw
        .lines()
        .map(|l| l.trim_start_matches('\u{feff}').trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() != 3 {
        return Err(ParseError::UnexpectedLineCount(lines.len()));
    }

    let (title, author) = split_title_author(lines[0])?;
    let highlight = parse_details(lines[1], lines[2]);

    Ok(Clipping {
        title,
        author,
        highlight,
    })
}

// Titles may contain parentheses of their own, so the author is the last group.
fn split_title_author(line: &str) -> Result<(String, String), ParseError> {
    let open = match matching_open_paren(line) {
        Some(idx) => idx,
        None => return Err(ParseError::MissingAuthor(line.to_string())),
    };

    let author = line[open + 1..line.len() - 1].trim();
    if author.is_empty() {
        return Err(ParseError::MissingAuthor(line.to_string()));
    }

    let title = line[..open].trim();
    if title.is_empty() {
        return Err(ParseError::MissingTitle(line.to_string()));
    }

    Ok((title.to_string(), author.to_string()))
}

// Index of the '(' balancing the ')' that ends the line.
fn matching_open_paren(line: &str) -> Option<usize> {
    if !line.ends_with(')') {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in line.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_details(details: &str, text: &str) -> Highlight {
    let details = details.trim_start_matches('-').trim();

    let mut kind = ClippingKind::Highlight;
    let mut page = None;
    let mut location = None;
    let mut added_on = None;

    for (idx, segment) in details.split('|').map(str::trim).enumerate() {
        // Lowercasing ASCII keeps byte offsets valid for the original segment.
        let lower = segment.to_ascii_lowercase();

        if idx == 0 {
            kind = parse_kind(&lower);
        }

        if let Some(rest) = lower.strip_prefix("added on") {
            added_on = parse_added_on(&segment[segment.len() - rest.len()..]);
            continue;
        }

        if let Some(pos) = lower.find("page") {
            page = parse_page(&segment[pos + "page".len()..]);
        }

        if let Some(pos) = lower.find("location") {
            location = segment[pos + "location".len()..]
                .split_whitespace()
                .next()
                .map(String::from);
        }
    }

    Highlight {
        kind,
        page,
        location,
        text: text.to_string(),
        added_on,
    }
}

fn parse_kind(segment: &str) -> ClippingKind {
    if segment.contains("bookmark") {
        ClippingKind::Bookmark
    } else if segment.contains("note") {
        ClippingKind::Note
    } else {
        ClippingKind::Highlight
    }
}

fn parse_page(s: &str) -> Option<u32> {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_added_on(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ADDED_ON_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Groups clippings by (author, title), keeping the order books and
/// highlights first appear in. Bookmarks carry no text and are dropped.
pub fn group_by_book(clippings: Vec<Clipping>, include_notes: bool) -> Vec<Book> {
    let mut books: Vec<Book> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for clipping in clippings {
        match clipping.highlight.kind {
            ClippingKind::Bookmark => continue,
            ClippingKind::Note if !include_notes => continue,
            _ => {}
        }

        let key = (clipping.author.clone(), clipping.title.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            books.push(Book {
                title: clipping.title,
                author: clipping.author,
                highlights: Vec::new(),
            });
            books.len() - 1
        });

        books[slot].highlights.push(clipping.highlight);
    }

    books
}

pub fn filter_by_date(
    highlights: Vec<Highlight>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<Highlight> {
    highlights
        .into_iter()
        .filter(|h| {
            h.added_on
                .map(|dt| dt.date())
                .is_some_and(|date| date >= from && date <= to)
        })
        .collect()
}

/// Applies [`filter_by_date`] to every book and drops books left empty.
pub fn filter_books_by_date(books: Vec<Book>, from: NaiveDate, to: NaiveDate) -> Vec<Book> {
    books
        .into_iter()
        .map(|book| Book {
            highlights: filter_by_date(book.highlights, from, to),
            ..book
        })
        .filter(|book| !book.highlights.is_empty())
        .collect()
}

pub fn find_clippings_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy() == CLIPPINGS_FILE_NAME)
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}
