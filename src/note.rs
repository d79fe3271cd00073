//! The per-book Markdown note.
//!
//! ```text
//! # <title>
//!
//! Author: <author>
//!
//! - <text> (Added on <Weekday, Month day, year> - Page <n>)
//! ```
//!
//! Notes are written once and may be read back with [`Note::parse`], which
//! skips list lines it cannot make sense of.

use crate::models::Book;
use chrono::NaiveDate;
use clap::ValueEnum;
use thiserror::Error;
use tracing::debug;

const DATE_DISPLAY_FORMAT: &str = "%A, %B %-d, %Y";
const DATE_PARSE_FORMAT: &str = "%A, %B %d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Formatting {
    /// Markdown list items
    #[default]
    Bullet,
    /// Markdown block quotes
    Quote,
    /// Plain paragraphs
    Paragraph,
}

impl Formatting {
    fn marker(self) -> &'static str {
        match self {
            Formatting::Bullet => "- ",
            Formatting::Quote => "> ",
            Formatting::Paragraph => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteOptions {
    pub add_date: bool,
    pub add_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteEntry {
    pub text: String,
    pub page: Option<u32>,
    pub added_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub title: String,
    pub author: String,
    pub entries: Vec<NoteEntry>,
}

#[derive(Debug, PartialEq, Error)]
pub enum NoteError {
    #[error("Note does not start with a '# <title>' heading")]
    MissingTitle,

    #[error("Note has no 'Author: <name>' line after the heading")]
    MissingAuthor,
}

impl Note {
    pub fn from_book(book: &Book, options: NoteOptions) -> Self {
        let entries = book
            .highlights
            .iter()
            .map(|h| NoteEntry {
                text: h.text.replace('\n', " "),
                page: h.page.filter(|_| options.add_page),
                added_on: h.added_on.map(|dt| dt.date()).filter(|_| options.add_date),
            })
            .collect();

        Note {
            title: book.title.clone(),
            author: book.author.clone(),
            entries,
        }
    }

    pub fn render(&self, formatting: Formatting) -> String {
        let mut out = format!("# {}\n\nAuthor: {}\n\n", self.title, self.author);

        for entry in &self.entries {
            out.push_str(formatting.marker());
            out.push_str(&entry.text);
            out.push_str(&render_suffix(entry));
            out.push('\n');
        }

        out
    }

    /// Reads a note without knowing its formatting: a leading `- ` or `> `
    /// is taken as a list or quote marker.
    pub fn parse(content: &str) -> Result<Self, NoteError> {
        Self::parse_lines(content, &["- ", "> "])
    }

    /// Reads a note written with `formatting`. Only that marker is stripped,
    /// so paragraph text starting with `- ` survives.
    pub fn parse_as(content: &str, formatting: Formatting) -> Result<Self, NoteError> {
        match formatting {
            Formatting::Paragraph => Self::parse_lines(content, &[]),
            other => Self::parse_lines(content, &[other.marker()]),
        }
    }

    fn parse_lines(content: &str, markers: &[&str]) -> Result<Self, NoteError> {
        let mut lines = content.lines().map(str::trim_end).filter(|l| !l.is_empty());

        let title = lines
            .next()
            .and_then(|l| l.strip_prefix("# "))
            .ok_or(NoteError::MissingTitle)?;

        let author = lines
            .next()
            .and_then(|l| l.strip_prefix("Author: "))
            .ok_or(NoteError::MissingAuthor)?;

        let mut entries = Vec::new();
        for line in lines {
            match parse_entry_line(line, markers) {
                Some(entry) => entries.push(entry),
                None => debug!("Skipping malformed note line: '{}'", line),
            }
        }

        Ok(Note {
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            entries,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.md", sanitize(&self.author), sanitize(&self.title))
    }
}

fn render_suffix(entry: &NoteEntry) -> String {
    let date = entry
        .added_on
        .map(|d| d.format(DATE_DISPLAY_FORMAT).to_string());

    match (date, entry.page) {
        (Some(date), Some(page)) => format!(" (Added on {} - Page {})", date, page),
        (Some(date), None) => format!(" (Added on {})", date),
        (None, Some(page)) => format!(" (Page {})", page),
        (None, None) => String::new(),
    }
}

fn parse_entry_line(line: &str, markers: &[&str]) -> Option<NoteEntry> {
    // A bare marker is what an empty item looks like after trim_end.
    if markers.iter().any(|m| line == m.trim_end()) {
        return None;
    }

    let body = markers
        .iter()
        .find_map(|m| line.strip_prefix(*m))
        .unwrap_or(line);

    let (text, added_on, page) = match split_suffix(body) {
        Some((text, added_on, page)) => (text, added_on, page),
        None => (body, None, None),
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(NoteEntry {
        text: text.to_string(),
        page,
        added_on,
    })
}

// A trailing parenthetical only counts as metadata when it parses as one.
fn split_suffix(body: &str) -> Option<(&str, Option<NaiveDate>, Option<u32>)> {
    let inner_end = body.strip_suffix(')')?;
    let open = inner_end.rfind('(')?;
    let inner = &inner_end[open + 1..];
    let text = body[..open].trim_end();

    if let Some(rest) = inner.strip_prefix("Added on ") {
        return match rest.split_once(" - Page ") {
            Some((date, page)) => Some((text, Some(parse_date(date)?), Some(page.parse().ok()?))),
            None => Some((text, Some(parse_date(rest)?), None)),
        };
    }

    let page = inner.strip_prefix("Page ")?.parse().ok()?;
    Some((text, None, Some(page)))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_PARSE_FORMAT).ok()
}

/// Keeps alphanumerics and spaces so the result is safe in a file name.
pub fn sanitize(component: &str) -> String {
    let kept: String = component
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    kept.trim_end().to_string()
}
