use kindle_highlights::clippings::{
    filter_books_by_date, find_clippings_files, group_by_book, read_clippings, ParseError,
};
use kindle_highlights::config::Config;
use kindle_highlights::db::{self, DbError};
use kindle_highlights::export::{self, ExportError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn, Level};

#[derive(Debug, Error)]
enum AppError {
    #[error("No clippings found at {}", .0.display())]
    NoClippings(PathBuf),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let level = if config.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), AppError> {
    let files = find_clippings_files(&config.clippings_path);
    if files.is_empty() {
        return Err(AppError::NoClippings(config.clippings_path.clone()));
    }

    let mut clippings = Vec::new();
    for file in &files {
        println!("\u{1f50d} Parsing highlights in {}...", file.display());
        let parsed = read_clippings(file)?;
        info!("Parsed {} clippings from {}", parsed.len(), file.display());
        clippings.extend(parsed);
    }

    let mut books = group_by_book(clippings, config.include_notes);
    if let Some((from, to)) = config.date_range {
        println!("From: {}  To: {}", from, to);
        books = filter_books_by_date(books, from, to);
    }

    if books.is_empty() {
        warn!("No highlights to export");
    }

    if let Some(database_path) = &config.database_path {
        let mut conn = db::init_db(database_path)?;
        let summary = db::archive_books(&mut conn, &books)?;
        println!(
            "\u{1f5c4} Archived {} new highlights ({} already present) in {}",
            summary.inserted,
            summary.already_present,
            database_path.display()
        );
    }

    println!("\n\u{1f4c1} Creating markdown files...");
    let summary = export::write_notes(&books, &config.save_path, config.export_options())?;
    for name in &summary.skipped {
        println!("- Skipping {} as it already exists.", name);
    }

    println!(
        "\n\u{1f680} Done! Wrote {} notes to '{}'.",
        summary.written.len(),
        config.save_path.display()
    );
    Ok(())
}
