//! Runtime configuration for the command-line front end.
use crate::models::UserId;
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DB_FILE_NAME: &str = "lingua-srs.sqlite3";
pub const DEFAULT_USER: &str = "local";

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub user: UserId,
    /// Schedule against the date stored in the database instead of the wall clock.
    pub simulated_clock: bool,
}

impl Config {
    pub fn new(db_path: Option<PathBuf>, user: Option<String>, simulated_clock: bool) -> Self {
        Self {
            db_path: db_path.unwrap_or_else(default_db_path),
            user: user
                .filter(|u| !u.trim().is_empty())
                .map(UserId::from)
                .unwrap_or_else(|| UserId::from(DEFAULT_USER)),
            simulated_clock,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None, false)
    }
}

/// Platform data directory, or the working directory when there is none.
pub fn default_db_path() -> PathBuf {
    ProjectDirs::from("", "", "lingua-srs")
        .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}
