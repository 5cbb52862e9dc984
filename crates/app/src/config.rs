use std::path::{Path, PathBuf};

use crate::AppError;

pub const DB_URL_ENV: &str = "ACADEMY_DB_URL";
pub const DEFAULT_DB_URL: &str = "sqlite://academy.sqlite3";

/// `--db` wins over `ACADEMY_DB_URL`, which wins over the default.
///
/// # Errors
///
/// Returns `AppError::InvalidDbUrl` for a blank flag value.
pub fn resolve_db_url(flag: Option<String>) -> Result<String, AppError> {
    match flag {
        Some(raw) if raw.trim().is_empty() => Err(AppError::InvalidDbUrl { raw }),
        Some(raw) => Ok(normalize_sqlite_url(raw)),
        None => Ok(std::env::var(DB_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.to_owned(), normalize_sqlite_url)),
    }
}

/// Turn bare paths and `sqlite:` paths into absolute `sqlite://` URLs.
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its directory so the pool can open it.
///
/// # Errors
///
/// Returns `AppError::InvalidDbUrl` for URLs without a file path and
/// `AppError::Io` if the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), AppError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let invalid = || AppError::InvalidDbUrl {
        raw: db_url.to_owned(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
