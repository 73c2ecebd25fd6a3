//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use super::models::*;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
    #[error("website {0} is already monitored")]
    Duplicate(String),
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Writes are single statements or transactions.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.lock();
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    // --- Websites ---

    /// Add a new website and return it.
    pub fn add_website(&self, req: &NewWebsite) -> Result<Website, DbError> {
        let conn = self.lock();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM websites WHERE url = ?1 AND disabled = 0",
                params![req.url],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(DbError::Duplicate(req.url.clone()));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO websites (id, url, name, disabled, created_at) VALUES (?1, ?2, ?3, 0, ?4)",
            params![id, req.url, req.name, format_db_time(Utc::now())],
        )?;

        Ok(Website {
            id,
            url: req.url.clone(),
            name: req.name.clone(),
            ticks: Vec::new(),
        })
    }

    /// Get all enabled websites, each with its most recent `tick_limit` ticks.
    pub fn get_websites(&self, tick_limit: usize) -> Result<Vec<Website>, DbError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, url, name FROM websites WHERE disabled = 0 ORDER BY created_at ASC",
        )?;

        let mut websites = stmt
            .query_map([], |row| {
                Ok(Website {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    name: row.get(2)?,
                    ticks: Vec::new(),
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        for website in &mut websites {
            website.ticks = recent_ticks(&conn, &website.id, tick_limit)?;
        }

        Ok(websites)
    }

    /// Get an enabled website by ID.
    pub fn get_website(&self, id: &str, tick_limit: usize) -> Result<Website, DbError> {
        let conn = self.lock();
        let website = conn
            .query_row(
                "SELECT id, url, name FROM websites WHERE id = ?1 AND disabled = 0",
                params![id],
                |row| {
                    Ok(Website {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        name: row.get(2)?,
                        ticks: Vec::new(),
                    })
                },
            )
            .optional()?
            .ok_or(DbError::NotFound)?;

        let ticks = recent_ticks(&conn, &website.id, tick_limit)?;
        Ok(Website { ticks, ..website })
    }

    /// Stop monitoring a website. Its ticks are kept.
    pub fn disable_website(&self, id: &str) -> Result<(), DbError> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE websites SET disabled = 1 WHERE id = ?1 AND disabled = 0",
            params![id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // --- Ticks ---

    /// Append ticks for a website in one transaction. Returns the number inserted.
    pub fn add_ticks(&self, website_id: &str, ticks: &[NewTick]) -> Result<usize, DbError> {
        let conn = self.lock();

        let known: Option<String> = conn
            .query_row(
                "SELECT id FROM websites WHERE id = ?1 AND disabled = 0",
                params![website_id],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(DbError::NotFound);
        }

        if ticks.is_empty() {
            return Ok(0);
        }

        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ticks (id, website_id, created_at, status, latency) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            let now = Utc::now();
            for t in ticks {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    website_id,
                    format_db_time(t.created_at.unwrap_or(now)),
                    t.status.as_str(),
                    t.latency,
                ])?;
            }
        }
        tx.commit()?;

        Ok(ticks.len())
    }
}

/// Most recent `limit` ticks for a website, oldest first.
fn recent_ticks(conn: &Connection, website_id: &str, limit: usize) -> Result<Vec<Tick>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, status, latency FROM ticks
         WHERE website_id = ?1 ORDER BY created_at DESC LIMIT ?2",
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut ticks = stmt
        .query_map(params![website_id, limit], |row| {
            let id: String = row.get(0)?;
            let time_str: String = row.get(1)?;
            let status_str: String = row.get(2)?;
            Ok((id, time_str, status_str, row.get::<_, Option<f64>>(3)?))
        })?
        .collect::<SqlResult<Vec<_>>>()?
        .into_iter()
        .filter_map(|(id, time_str, status_str, latency)| {
            let created_at = parse_db_time(&time_str);
            let status = TickStatus::parse(&status_str);
            if created_at.is_none() || status.is_none() {
                tracing::warn!("Skipping malformed tick {} for website {}", id, website_id);
            }
            Some(Tick {
                id,
                created_at: created_at?,
                status: status?,
                latency,
            })
        })
        .collect::<Vec<_>>();

    ticks.reverse();
    Ok(ticks)
}

fn format_db_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        TIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::NamedTempFile;

    fn new_store() -> (NamedTempFile, Store) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        (tmp, store)
    }

    fn tick_at(created_at: DateTime<Utc>, status: TickStatus, latency: f64) -> NewTick {
        NewTick {
            created_at: Some(created_at),
            status,
            latency: Some(latency),
        }
    }

    #[test]
    fn test_website_lifecycle() {
        let (_tmp, store) = new_store();

        let req = NewWebsite::parse("https://example.com", Some("Example")).unwrap();
        let created = store.add_website(&req).unwrap();
        assert!(!created.id.is_empty());

        let fetched = store.get_website(&created.id, 100).unwrap();
        assert_eq!(fetched.url, "https://example.com");
        assert_eq!(fetched.name.as_deref(), Some("Example"));

        assert_eq!(store.get_websites(100).unwrap().len(), 1);

        store.disable_website(&created.id).unwrap();
        assert!(store.get_websites(100).unwrap().is_empty());
        assert!(matches!(store.get_website(&created.id, 100), Err(DbError::NotFound)));
        assert!(matches!(store.disable_website(&created.id), Err(DbError::NotFound)));
    }

    #[test]
    fn test_duplicate_url_rejected_until_disabled() {
        let (_tmp, store) = new_store();
        let req = NewWebsite::parse("https://example.com", None).unwrap();

        let first = store.add_website(&req).unwrap();
        assert!(matches!(store.add_website(&req), Err(DbError::Duplicate(_))));

        store.disable_website(&first.id).unwrap();
        assert!(store.add_website(&req).is_ok());
    }

    #[test]
    fn test_recent_ticks_are_bounded_and_ascending() {
        let (_tmp, store) = new_store();
        let site = store
            .add_website(&NewWebsite::parse("https://example.com", None).unwrap())
            .unwrap();

        let base = Utc::now() - ChronoDuration::hours(1);
        let ticks: Vec<NewTick> = (0..10)
            .map(|i| tick_at(base + ChronoDuration::seconds(i), TickStatus::Up, i as f64))
            .collect();
        assert_eq!(store.add_ticks(&site.id, &ticks).unwrap(), 10);

        let fetched = store.get_website(&site.id, 4).unwrap();
        assert_eq!(fetched.ticks.len(), 4);
        let latencies: Vec<f64> = fetched.ticks.iter().filter_map(|t| t.latency).collect();
        assert_eq!(latencies, vec![6.0, 7.0, 8.0, 9.0]);
        assert!(fetched.ticks.windows(2).all(|w| w[0].created_at < w[1].created_at));
    }

    #[test]
    fn test_add_ticks_unknown_website() {
        let (_tmp, store) = new_store();
        let ticks = vec![tick_at(Utc::now(), TickStatus::Down, 0.0)];
        assert!(matches!(store.add_ticks("missing", &ticks), Err(DbError::NotFound)));
    }

    #[test]
    fn test_add_ticks_disabled_website() {
        let (_tmp, store) = new_store();
        let site = store
            .add_website(&NewWebsite::parse("https://example.com", None).unwrap())
            .unwrap();
        store.disable_website(&site.id).unwrap();

        let ticks = vec![tick_at(Utc::now(), TickStatus::Up, 15.0)];
        assert!(matches!(store.add_ticks(&site.id, &ticks), Err(DbError::NotFound)));
    }

    #[test]
    fn test_tick_without_latency_round_trips_as_none() {
        let (_tmp, store) = new_store();
        let site = store
            .add_website(&NewWebsite::parse("https://example.com", None).unwrap())
            .unwrap();
        let tick = NewTick {
            created_at: None,
            status: TickStatus::Down,
            latency: None,
        };
        store.add_ticks(&site.id, &[tick]).unwrap();

        let fetched = store.get_website(&site.id, 100).unwrap();
        assert_eq!(fetched.ticks.len(), 1);
        assert_eq!(fetched.ticks[0].status, TickStatus::Down);
        assert_eq!(fetched.ticks[0].latency, None);
    }

    #[test]
    fn test_parse_db_time_formats() {
        assert!(parse_db_time("2024-05-01 12:00:00.123456789").is_some());
        assert!(parse_db_time("2024-05-01 12:00:00").is_some());
        assert!(parse_db_time("2024-05-01T12:00:00Z").is_some());
        assert!(parse_db_time("yesterday").is_none());
    }
}
