use crate::export::ExportOptions;
use crate::note::{Formatting, NoteOptions};
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_CLIPPINGS_PATH: &str = "My Clippings.txt";
const DEFAULT_SAVE_PATH: &str = "books/";

#[derive(Parser, Debug)]
#[command(name = "kindle-highlights")]
#[command(about = "Turn Kindle highlights into one Markdown note per book")]
pub struct CliArgs {
    /// Clippings file, or a directory to search for 'My Clippings.txt'
    #[arg(short, long)]
    pub clippings_path: Option<String>,

    /// Directory the Markdown notes are written to
    #[arg(short, long)]
    pub save_path: Option<String>,

    /// How each highlight is laid out in the note
    #[arg(short, long, value_enum, default_value_t = Formatting::Bullet)]
    pub format: Formatting,

    /// Add the date the highlight was made
    #[arg(short, long)]
    pub date: bool,

    /// Add the page number of the highlight
    #[arg(short, long)]
    pub page: bool,

    /// Overwrite notes that already exist
    #[arg(short, long)]
    pub overwrite: bool,

    /// Include your own notes alongside highlights
    #[arg(long)]
    pub notes: bool,

    /// Also archive highlights into this SQLite database
    #[arg(long)]
    pub database_path: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Only highlights from the last N days (mutually exclusive with --from/--to)
    #[arg(short, long)]
    pub last: Option<u32>,

    /// Log what is parsed and skipped
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub clippings_path: PathBuf,
    pub save_path: PathBuf,
    pub database_path: Option<PathBuf>,
    pub formatting: Formatting,
    pub add_date: bool,
    pub add_page: bool,
    pub overwrite: bool,
    pub include_notes: bool,
    pub verbose: bool,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    #[error("Invalid date range: --from must be before or equal to --to")]
    InvalidDateRange,

    #[error("Use --from/--to OR --last, not both")]
    MutuallyExclusiveFlags,

    #[error("Use --from together with --to")]
    MissingFromDate,

    #[error("--last {0} reaches past the earliest supported date")]
    DateOutOfRange(u32),
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let cli = CliArgs::parse();
        Self::from_args(cli, |key| std::env::var(key).ok(), Local::now().date_naive())
    }

    /// Resolves paths as CLI flag, then `env(key)`, then the default.
    fn from_args<F>(cli: CliArgs, env: F, today: NaiveDate) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let date_range = resolve_dates(&cli, today)?;

        let clippings_path = cli
            .clippings_path
            .or_else(|| env("CLIPPINGS_PATH"))
            .unwrap_or_else(|| DEFAULT_CLIPPINGS_PATH.to_string());

        let save_path = cli
            .save_path
            .or_else(|| env("SAVE_PATH"))
            .unwrap_or_else(|| DEFAULT_SAVE_PATH.to_string());

        let database_path = cli.database_path.or_else(|| env("DATABASE_PATH"));

        Ok(Config {
            clippings_path: PathBuf::from(clippings_path),
            save_path: PathBuf::from(save_path),
            database_path: database_path.map(PathBuf::from),
            formatting: cli.format,
            add_date: cli.date,
            add_page: cli.page,
            overwrite: cli.overwrite,
            include_notes: cli.notes,
            verbose: cli.verbose,
            date_range,
        })
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            formatting: self.formatting,
            note: NoteOptions {
                add_date: self.add_date,
                add_page: self.add_page,
            },
            overwrite: self.overwrite,
        }
    }
}

fn resolve_dates(
    cli: &CliArgs,
    today: NaiveDate,
) -> Result<Option<(NaiveDate, NaiveDate)>, ConfigError> {
    let has_from_to = cli.from.is_some() || cli.to.is_some();
    let has_last = cli.last.is_some();

    if has_from_to && has_last {
        return Err(ConfigError::MutuallyExclusiveFlags);
    }

    if cli.to.is_some() && cli.from.is_none() {
        return Err(ConfigError::MissingFromDate);
    }

    let (from, to) = match (cli.last, &cli.from) {
        (Some(days), _) => compute_last_n_days(today, days)?,
        (None, Some(from_str)) => {
            let from = parse_date(from_str)?;
            let to = match &cli.to {
                Some(to_str) => parse_date(to_str)?,
                None => today - Duration::days(1), // yesterday
            };
            (from, to)
        }
        // No filter: every highlight in the file
        (None, None) => return Ok(None),
    };

    if from > to {
        return Err(ConfigError::InvalidDateRange);
    }

    Ok(Some((from, to)))
}

fn parse_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidDateFormat(s.to_string()))
}

fn compute_last_n_days(today: NaiveDate, days: u32) -> Result<(NaiveDate, NaiveDate), ConfigError> {
    let yesterday = today - Duration::days(1);
    let from = today
        .checked_sub_signed(Duration::days(days.into()))
        .ok_or(ConfigError::DateOutOfRange(days))?;
    Ok((from, yesterday))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_cli(
        from: Option<&str>,
        to: Option<&str>,
        last: Option<u32>,
    ) -> CliArgs {
        CliArgs {
            clippings_path: Some("My Clippings.txt".to_string()),
            save_path: Some("books/".to_string()),
            format: Formatting::Bullet,
            date: false,
            page: false,
            overwrite: false,
            notes: false,
            database_path: None,
            from: from.map(String::from),
            to: to.map(String::from),
            last,
            verbose: false,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn make_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_dates_means_no_filter() {
        let cli = make_cli(None, None, None);

        let config = Config::from_args(cli, no_env, date(2026, 2, 1)).unwrap();

        assert_eq!(config.date_range, None);
    }

    #[test]
    fn test_last_n_days() {
        let cli = make_cli(None, None, Some(7));
        let today = date(2026, 2, 1);

        let config = Config::from_args(cli, no_env, today).unwrap();

        assert_eq!(config.date_range, Some((date(2026, 1, 25), date(2026, 1, 31))));
    }

    #[test]
    fn test_last_zero_days_is_empty_range() {
        let cli = make_cli(None, None, Some(0));

        let result = Config::from_args(cli, no_env, date(2026, 2, 1));

        assert_eq!(result, Err(ConfigError::InvalidDateRange));
    }

    #[test]
    fn test_explicit_from_to() {
        let cli = make_cli(Some("2026-01-10"), Some("2026-01-20"), None);
        let today = date(2026, 2, 1);

        let config = Config::from_args(cli, no_env, today).unwrap();

        assert_eq!(config.date_range, Some((date(2026, 1, 10), date(2026, 1, 20))));
    }

    #[test]
    fn test_only_from_defaults_to_yesterday() {
        let cli = make_cli(Some("2026-01-10"), None, None);
        let today = date(2026, 2, 1);

        let config = Config::from_args(cli, no_env, today).unwrap();

        assert_eq!(config.date_range, Some((date(2026, 1, 10), date(2026, 1, 31))));
    }

    #[test]
    fn test_only_to_is_error() {
        let cli = make_cli(None, Some("2026-01-20"), None);

        let result = Config::from_args(cli, no_env, date(2026, 2, 1));

        assert_eq!(result, Err(ConfigError::MissingFromDate));
    }

    #[test]
    fn test_last_with_from_is_error() {
        let cli = make_cli(Some("2026-01-10"), None, Some(7));

        let result = Config::from_args(cli, no_env, date(2026, 2, 1));

        assert_eq!(result, Err(ConfigError::MutuallyExclusiveFlags));
    }

    #[test]
    fn test_invalid_date_range() {
        let cli = make_cli(Some("2026-01-20"), Some("2026-01-10"), None);

        let result = Config::from_args(cli, no_env, date(2026, 2, 1));

        assert_eq!(result, Err(ConfigError::InvalidDateRange));
    }

    #[test]
    fn test_invalid_date_format() {
        let cli = make_cli(Some("01/10/2026"), None, None);

        let result = Config::from_args(cli, no_env, date(2026, 2, 1));

        assert_eq!(
            result,
            Err(ConfigError::InvalidDateFormat("01/10/2026".to_string()))
        );
    }

    #[test]
    fn test_cli_flags_parsed() {
        let cli = CliArgs::parse_from([
            "kindle-highlights",
            "--save-path",
            "notes/",
            "-f",
            "quote",
            "-d",
            "-p",
            "--overwrite",
        ]);

        let config = Config::from_args(cli, no_env, date(2026, 2, 1)).unwrap();

        assert_eq!(config.save_path, PathBuf::from("notes/"));
        assert_eq!(config.formatting, Formatting::Quote);
        assert_eq!(
            config.export_options(),
            ExportOptions {
                formatting: Formatting::Quote,
                note: NoteOptions { add_date: true, add_page: true },
                overwrite: true,
            }
        );
    }

    #[test]
    fn test_last_beyond_supported_dates_is_error() {
        let cli = CliArgs::parse_from(["kindle-highlights", "--last", "4000000000"]);

        let result = Config::from_args(cli, no_env, date(2026, 2, 1));

        assert_eq!(result, Err(ConfigError::DateOutOfRange(4_000_000_000)));
    }

    #[test]
    fn test_default_paths() {
        let cli = CliArgs::parse_from(["kindle-highlights"]);

        let config = Config::from_args(cli, no_env, date(2026, 2, 1)).unwrap();

        assert_eq!(config.clippings_path, PathBuf::from("My Clippings.txt"));
        assert_eq!(config.save_path, PathBuf::from("books/"));
        assert_eq!(config.database_path, None);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let cli = CliArgs::parse_from(["kindle-highlights"]);
        let env = make_env(&[
            ("CLIPPINGS_PATH", "/Volumes/Kindle/documents"),
            ("SAVE_PATH", "vault/books"),
            ("DATABASE_PATH", "highlights.db"),
        ]);

        let config = Config::from_args(cli, env, date(2026, 2, 1)).unwrap();

        assert_eq!(config.clippings_path, PathBuf::from("/Volumes/Kindle/documents"));
        assert_eq!(config.save_path, PathBuf::from("vault/books"));
        assert_eq!(config.database_path, Some(PathBuf::from("highlights.db")));
    }

    #[test]
    fn test_cli_overrides_env() {
        let cli = CliArgs::parse_from([
            "kindle-highlights",
            "-c",
            "export.txt",
            "--save-path",
            "notes/",
            "--database-path",
            "cli.db",
        ]);
        let env = make_env(&[
            ("CLIPPINGS_PATH", "/Volumes/Kindle/documents"),
            ("SAVE_PATH", "vault/books"),
            ("DATABASE_PATH", "env.db"),
        ]);

        let config = Config::from_args(cli, env, date(2026, 2, 1)).unwrap();

        assert_eq!(config.clippings_path, PathBuf::from("export.txt"));
        assert_eq!(config.save_path, PathBuf::from("notes/"));
        assert_eq!(config.database_path, Some(PathBuf::from("cli.db")));
    }
}
