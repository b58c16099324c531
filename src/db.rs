use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, RecordError, Result};
use crate::parser::Candidate;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage client. Built once and handed to every operation.
pub struct Store {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub saved: bool,
    pub note_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordWithNote {
    #[serde(flatten)]
    pub record: Record,
    pub note: Option<Note>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilter {
    pub saved: Option<bool>,
}

/// Outcome of writing one batch of candidates.
#[derive(Debug, Default)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total: usize,
    pub saved: usize,
    pub with_notes: usize,
    pub notes: usize,
}

const RECORD_COLUMNS: &str = "id, title, link, saved, note_id, created_at";

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS notes (
                id         INTEGER PRIMARY KEY,
                body       TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS records (
                id         INTEGER PRIMARY KEY,
                title      TEXT NOT NULL,
                link       TEXT NOT NULL,
                saved      BOOLEAN NOT NULL DEFAULT 0,
                note_id    INTEGER REFERENCES notes(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(title, link)
            );
            CREATE INDEX IF NOT EXISTS idx_records_saved ON records(saved);
            ",
        )?;
        Ok(Store { conn })
    }

    // ── Scraping ──

    /// Find-or-create every candidate by `(title, link)`. Existing rows are
    /// left alone, so `saved` and `note_id` survive a re-scrape. A failing
    /// row is recorded and the rest of the batch still commits.
    pub fn upsert_records(&self, candidates: &[Candidate]) -> Result<PersistOutcome> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let mut outcome = PersistOutcome::default();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (title, link) VALUES (?1, ?2)
                 ON CONFLICT(title, link) DO NOTHING",
            )?;
            for c in candidates {
                match stmt.execute(params![c.title, c.link]) {
                    Ok(0) => outcome.skipped += 1,
                    Ok(_) => {
                        debug!("Inserted {}", c.link);
                        outcome.inserted += 1;
                    }
                    Err(e) => {
                        warn!("Failed to persist {}: {}", c.link, e);
                        outcome.errors.push(RecordError::Persistence {
                            title: c.title.clone(),
                            link: c.link.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    // ── Reading ──

    pub fn list_records(&self, filter: RecordFilter) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records WHERE (?1 IS NULL OR saved = ?1) ORDER BY id",
            RECORD_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![filter.saved], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_record(&self, id: i64) -> Result<Record> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
                [id],
                record_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound(id))
    }

    pub fn get_record_with_note(&self, id: i64) -> Result<RecordWithNote> {
        let record = self.get_record(id)?;
        let note = match record.note_id {
            Some(note_id) => self.find_note(note_id)?,
            None => None,
        };
        Ok(RecordWithNote { record, note })
    }

    pub fn get_note(&self, id: i64) -> Result<Note> {
        self.find_note(id)?.ok_or(Error::NoteNotFound(id))
    }

    fn find_note(&self, id: i64) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                "SELECT id, body, created_at FROM notes WHERE id = ?1",
                [id],
                |row| {
                    Ok(Note {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(note)
    }

    // ── User actions ──

    /// Create a note and point the record at it, in one transaction. A
    /// previous note stays in `notes` but is no longer referenced.
    pub fn attach_note(&self, record_id: i64, body: &str) -> Result<Record> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let exists = tx
            .query_row("SELECT 1 FROM records WHERE id = ?1", [record_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(Error::NotFound(record_id));
        }

        tx.execute("INSERT INTO notes (body) VALUES (?1)", [body])?;
        let note_id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE records SET note_id = ?1 WHERE id = ?2",
            params![note_id, record_id],
        )?;
        tx.commit()?;

        debug!("Linked note {} to record {}", note_id, record_id);
        self.get_record(record_id)
    }

    pub fn set_saved(&self, record_id: i64, saved: bool) -> Result<Record> {
        let changed = self.conn.execute(
            "UPDATE records SET saved = ?2 WHERE id = ?1",
            params![record_id, saved],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(record_id));
        }
        self.get_record(record_id)
    }

    // ── Stats ──

    pub fn stats(&self) -> Result<Stats> {
        let count = |sql: &str| -> Result<usize> {
            Ok(self.conn.query_row(sql, [], |r| r.get(0))?)
        };
        Ok(Stats {
            total: count("SELECT COUNT(*) FROM records")?,
            saved: count("SELECT COUNT(*) FROM records WHERE saved = 1")?,
            with_notes: count("SELECT COUNT(*) FROM records WHERE note_id IS NOT NULL")?,
            notes: count("SELECT COUNT(*) FROM notes")?,
        })
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        title: row.get(1)?,
        link: row.get(2)?,
        saved: row.get(3)?,
        note_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}
