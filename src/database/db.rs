//! SQLite persistence for scheduling state
//!
//! Handles database initialization, per-(user, item) review state reads and
//! upserts, due-item queries and the simulated "current date" used to
//! practise schedules without waiting for real days to pass.

use super::repository::ReviewRepository;
use crate::error::{Result, SrsError};
use crate::models::sm2::DAY_MS;
use crate::models::{ItemId, ReviewState, UserId};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};

const STATE_COLUMNS: &str =
    "item_id, easiness_factor, interval_days, repetitions, next_review_at";

/// Opens (or creates) the database file and makes sure the schema exists.
pub fn init_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    info!(path = %path.display(), "Database ready");
    Ok(conn)
}

/// Creates the tables on an already open connection.
///
/// Sets the simulated current date to now if it is not initialized yet.
pub fn init_schema(conn: &Connection) -> Result<()> {
    // One row per learner-item pair
    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_state (
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            easiness_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            next_review_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, item_id)
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_review_state_due
         ON review_state (user_id, next_review_at)",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp_millis().to_string()],
    )?;

    Ok(())
}

/// Retrieves the simulated current date
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let stored: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    stored
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| SrsError::InvalidInput(format!("corrupt current_date '{}'", stored)))
}

pub fn set_current_date(at: DateTime<Utc>, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![at.timestamp_millis().to_string()],
    )?;
    Ok(())
}

/// Moves the simulated date forward by one scheduling day
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + Duration::milliseconds(DAY_MS);
    set_current_date(next_day, conn)?;
    info!(current_date = %next_day, "Advanced simulated date");
    Ok(next_day)
}

type StateRow = (String, f64, i64, i64, i64);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StateRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

/// Turns raw columns into a state, rejecting values the scheduler cannot use.
fn into_state((item_id, easiness_factor, interval, repetitions, next_ms): StateRow) -> Result<ReviewState> {
    let next_review_at = DateTime::<Utc>::from_timestamp_millis(next_ms).ok_or_else(|| {
        SrsError::InvalidInput(format!("timestamp for '{}' out of range: {}", item_id, next_ms))
    })?;
    ReviewState::from_parts(
        ItemId(item_id),
        easiness_factor,
        interval,
        repetitions,
        next_review_at,
    )
}

/// Retrieves the review state of one item, if it was ever reviewed
pub fn get_review_state(
    user: &UserId,
    item: &ItemId,
    conn: &Connection,
) -> Result<Option<ReviewState>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM review_state WHERE user_id = ?1 AND item_id = ?2",
                STATE_COLUMNS
            ),
            params![user.as_str(), item.as_str()],
            read_row,
        )
        .optional()?;

    row.map(into_state).transpose()
}

/// Inserts or overwrites the review state of an item
pub fn upsert_review_state(user: &UserId, state: &ReviewState, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO review_state
            (user_id, item_id, easiness_factor, interval_days, repetitions, next_review_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (user_id, item_id) DO UPDATE SET
            easiness_factor = excluded.easiness_factor,
            interval_days = excluded.interval_days,
            repetitions = excluded.repetitions,
            next_review_at = excluded.next_review_at",
        params![
            user.as_str(),
            state.item_id.as_str(),
            state.easiness_factor,
            state.interval,
            state.repetitions,
            state.next_review_at.timestamp_millis()
        ],
    )?;

    debug!(
        user = %user,
        item = %state.item_id,
        interval = state.interval,
        repetitions = state.repetitions,
        "Saved review state"
    );
    Ok(())
}

fn query_states(
    sql: &str,
    params: impl rusqlite::Params,
    conn: &Connection,
) -> Result<Vec<ReviewState>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, read_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(into_state).collect()
}

/// Retrieves states due for review
///
/// Returns states where next_review_at <= now, ordered by next_review_at
/// (oldest first).
pub fn get_states_due_for_review(
    user: &UserId,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<ReviewState>> {
    query_states(
        &format!(
            "SELECT {} FROM review_state
             WHERE user_id = ?1 AND next_review_at <= ?2
             ORDER BY next_review_at ASC, item_id ASC",
            STATE_COLUMNS
        ),
        params![user.as_str(), now.timestamp_millis()],
        conn,
    )
}

/// Retrieves every state of a user
pub fn get_all_states(user: &UserId, conn: &Connection) -> Result<Vec<ReviewState>> {
    query_states(
        &format!(
            "SELECT {} FROM review_state WHERE user_id = ?1
             ORDER BY next_review_at ASC, item_id ASC",
            STATE_COLUMNS
        ),
        params![user.as_str()],
        conn,
    )
}

/// Deletes the state of a removed item
pub fn delete_review_state(user: &UserId, item: &ItemId, conn: &Connection) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM review_state WHERE user_id = ?1 AND item_id = ?2",
        params![user.as_str(), item.as_str()],
    )?;
    if deleted > 0 {
        info!(user = %user, item = %item, "Removed review state");
    }
    Ok(deleted > 0)
}

/// [`ReviewRepository`] backed by a SQLite connection.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(init_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ReviewRepository for SqliteRepository {
    fn load(&self, user: &UserId, item: &ItemId) -> Result<Option<ReviewState>> {
        get_review_state(user, item, &self.conn)
    }

    fn save(&mut self, user: &UserId, state: &ReviewState) -> Result<()> {
        upsert_review_state(user, state, &self.conn)
    }

    fn due(&self, user: &UserId, now: DateTime<Utc>) -> Result<Vec<ReviewState>> {
        get_states_due_for_review(user, now, &self.conn)
    }

    fn all(&self, user: &UserId) -> Result<Vec<ReviewState>> {
        get_all_states(user, &self.conn)
    }

    fn remove(&mut self, user: &UserId, item: &ItemId) -> Result<bool> {
        delete_review_state(user, item, &self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap()
    }

    fn state(item: &str, due_in_days: i64, repetitions: u32) -> ReviewState {
        ReviewState {
            item_id: item.into(),
            easiness_factor: 2.36,
            interval: due_in_days.max(0) as u32,
            repetitions,
            next_review_at: now() + Duration::days(due_in_days),
        }
    }

    #[test]
    fn test_save_and_load() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let user: UserId = "ada".into();
        let saved = state("w1", 6, 2);
        repo.save(&user, &saved).unwrap();

        assert_eq!(repo.load(&user, &"w1".into()).unwrap(), Some(saved));
        assert_eq!(repo.load(&user, &"missing".into()).unwrap(), None);
        assert_eq!(repo.load(&"bob".into(), &"w1".into()).unwrap(), None);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let user: UserId = "ada".into();
        repo.save(&user, &state("w1", 1, 1)).unwrap();
        repo.save(&user, &state("w1", 6, 2)).unwrap();

        let all = repo.all(&user).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].repetitions, 2);
    }

    #[test]
    fn test_due_query() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let user: UserId = "ada".into();
        repo.save(&user, &state("future", 3, 2)).unwrap();
        repo.save(&user, &state("now", 0, 0)).unwrap();
        repo.save(&user, &state("overdue", -4, 1)).unwrap();

        let due: Vec<_> = repo
            .due(&user, now())
            .unwrap()
            .into_iter()
            .map(|s| s.item_id.0)
            .collect();
        assert_eq!(due, vec!["overdue", "now"]);
    }

    #[test]
    fn test_remove() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let user: UserId = "ada".into();
        repo.save(&user, &state("w1", 1, 1)).unwrap();

        assert!(repo.remove(&user, &"w1".into()).unwrap());
        assert!(!repo.remove(&user, &"w1".into()).unwrap());
    }

    #[test]
    fn test_corrupt_row_is_invalid_input() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.connection()
            .execute(
                "INSERT INTO review_state VALUES ('ada', 'w1', 2.5, -3, 0, 0)",
                (),
            )
            .unwrap();

        let result = repo.load(&"ada".into(), &"w1".into());
        assert!(matches!(result, Err(SrsError::InvalidInput(_))));
    }

    #[test]
    fn test_advance_day() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let conn = repo.connection();
        set_current_date(now(), conn).unwrap();

        let next = advance_day(conn).unwrap();
        assert_eq!(next, now() + Duration::days(1));
        assert_eq!(get_current_date(conn).unwrap(), next);
    }

    #[test]
    fn test_wall_clock_schedule_reloads_unchanged() {
        use crate::models::{Scheduler, SystemClock};

        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let user: UserId = "ada".into();
        let scheduled = Scheduler::new(SystemClock)
            .review(None, &"w1".into(), crate::models::Quality::new(4).unwrap())
            .unwrap();
        repo.save(&user, &scheduled).unwrap();

        assert_eq!(repo.load(&user, &"w1".into()).unwrap(), Some(scheduled));
    }

    #[test]
    fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("srs.sqlite3");
        let user: UserId = "ada".into();

        {
            let mut repo = SqliteRepository::open(&path).unwrap();
            repo.save(&user, &state("w1", 6, 2)).unwrap();
        }

        let repo = SqliteRepository::open(&path).unwrap();
        assert_eq!(repo.load(&user, &"w1".into()).unwrap(), Some(state("w1", 6, 2)));
    }
}
