use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClippingKind {
    Highlight,
    Note,
    Bookmark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub kind: ClippingKind,
    pub page: Option<u32>,
    pub location: Option<String>,
    pub text: String,
    pub added_on: Option<NaiveDateTime>,
}

/// A single parsed entry of a clippings file, before grouping by book.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipping {
    pub title: String,
    pub author: String,
    pub highlight: Highlight,
}
