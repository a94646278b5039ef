use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::backend::{
    BreakKind, BreakRecord, EmployeeDirectory, EmployeeId, SessionClose, SessionId, SessionStore,
    StoreError, StoreResult, UserId,
};
use crate::session::Reading;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    department TEXT NOT NULL,
    position TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS fatigue_sessions (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL REFERENCES employees(id),
    session_start TEXT NOT NULL,
    session_end TEXT,
    initial_fatigue_score INTEGER,
    final_fatigue_score INTEGER,
    keystrokes_count INTEGER,
    productivity_score INTEGER,
    break_count INTEGER NOT NULL DEFAULT 0,
    total_break_time INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS fatigue_readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES fatigue_sessions(id),
    fatigue_score INTEGER NOT NULL,
    typing_speed INTEGER,
    keystroke_count INTEGER,
    elapsed_secs INTEGER,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS breaks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES fatigue_sessions(id),
    break_type TEXT NOT NULL,
    reason TEXT,
    duration INTEGER,
    start_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_readings_session ON fatigue_readings(session_id);
CREATE INDEX IF NOT EXISTS idx_breaks_session ON breaks(session_id);
CREATE INDEX IF NOT EXISTS idx_sessions_start ON fatigue_sessions(session_start);
"#;

/// Fields needed to put someone in the employee directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub full_name: String,
    pub department: String,
    pub position: String,
}

/// A persisted session row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub id: SessionId,
    pub employee_name: String,
    pub start: DateTime<Local>,
    pub end: Option<DateTime<Local>>,
    pub initial_score: Option<u8>,
    pub final_score: Option<u8>,
    pub keystrokes: Option<u64>,
    pub productivity: Option<u8>,
    pub break_count: u32,
    pub total_break_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    pub reading: Reading,
    pub timestamp: DateTime<Local>,
}

/// SQLite-backed employee directory and session store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open the database under the state directory
    pub fn open_default() -> StoreResult<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("lull.db"));
        log::info!("using session database at {}", path.display());
        Self::open(path)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Add or update the employee linked to `user`
    pub fn enroll_employee(&self, user: &UserId, employee: &NewEmployee) -> StoreResult<EmployeeId> {
        if let Some(existing) = self.find_employee_by_user(user)? {
            self.conn.execute(
                "UPDATE employees SET full_name = ?1, department = ?2, position = ?3 WHERE id = ?4",
                params![
                    employee.full_name,
                    employee.department,
                    employee.position,
                    existing.0
                ],
            )?;
            return Ok(existing);
        }

        let id = EmployeeId(uuid::Uuid::new_v4().to_string());
        self.conn.execute(
            r#"
            INSERT INTO employees (id, user_id, full_name, department, position)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                id.0,
                user.0,
                employee.full_name,
                employee.department,
                employee.position
            ],
        )?;
        Ok(id)
    }

    /// Most recent sessions first
    pub fn recent_sessions(&self, limit: usize) -> StoreResult<Vec<StoredSession>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, e.full_name, s.session_start, s.session_end,
                   s.initial_fatigue_score, s.final_fatigue_score, s.keystrokes_count,
                   s.productivity_score, s.break_count, s.total_break_time
            FROM fatigue_sessions s
            JOIN employees e ON e.id = s.employee_id
            ORDER BY s.session_start DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let end: Option<String> = row.get(3)?;
            Ok(StoredSession {
                id: SessionId(row.get(0)?),
                employee_name: row.get(1)?,
                start: parse_timestamp(2, &row.get::<_, String>(2)?)?,
                end: end.map(|s| parse_timestamp(3, &s)).transpose()?,
                initial_score: row.get(4)?,
                final_score: row.get(5)?,
                keystrokes: row.get(6)?,
                productivity: row.get(7)?,
                break_count: row.get(8)?,
                total_break_secs: row.get(9)?,
            })
        })?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    pub fn readings_for(&self, session: &SessionId) -> StoreResult<Vec<StoredReading>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT fatigue_score, typing_speed, keystroke_count, elapsed_secs, timestamp
            FROM fatigue_readings
            WHERE session_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([&session.0], |row| {
            Ok(StoredReading {
                reading: Reading {
                    fatigue_score: row.get(0)?,
                    wpm: row.get(1)?,
                    keystroke_count: row.get(2)?,
                    elapsed_secs: row.get(3)?,
                },
                timestamp: parse_timestamp(4, &row.get::<_, String>(4)?)?,
            })
        })?;

        let mut readings = Vec::new();
        for reading in rows {
            readings.push(reading?);
        }
        Ok(readings)
    }

    pub fn breaks_for(&self, session: &SessionId) -> StoreResult<Vec<BreakRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT break_type, reason, duration FROM breaks WHERE session_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map([&session.0], |row| {
            let kind: String = row.get(0)?;
            Ok(BreakRecord {
                kind: if kind == "manual" {
                    BreakKind::Manual
                } else {
                    BreakKind::Automatic
                },
                reason: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                duration_secs: row.get::<_, Option<u32>>(2)?.unwrap_or(0),
            })
        })?;

        let mut breaks = Vec::new();
        for record in rows {
            breaks.push(record?);
        }
        Ok(breaks)
    }

    fn ensure_session(&self, session: &SessionId) -> StoreResult<()> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM fatigue_sessions WHERE id = ?1",
                [&session.0],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownSession(session.clone())),
        }
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), rusqlite::types::Type::Text)
        })
}

impl EmployeeDirectory for SqliteStore {
    fn find_employee_by_user(&self, user: &UserId) -> StoreResult<Option<EmployeeId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM employees WHERE user_id = ?1 AND status = 'active'",
                [&user.0],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id.map(EmployeeId))
    }
}

impl SessionStore for SqliteStore {
    fn create_session(
        &mut self,
        employee: &EmployeeId,
        start_time: DateTime<Local>,
    ) -> StoreResult<SessionId> {
        let id = SessionId(uuid::Uuid::new_v4().to_string());
        self.conn.execute(
            "INSERT INTO fatigue_sessions (id, employee_id, session_start) VALUES (?1, ?2, ?3)",
            params![id.0, employee.0, start_time.to_rfc3339()],
        )?;
        Ok(id)
    }

    fn append_reading(&mut self, session: &SessionId, reading: &Reading) -> StoreResult<()> {
        self.ensure_session(session)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO fatigue_readings
            (session_id, fatigue_score, typing_speed, keystroke_count, elapsed_secs, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.0,
                reading.fatigue_score,
                reading.wpm,
                reading.keystroke_count,
                reading.elapsed_secs,
                Local::now().to_rfc3339(),
            ],
        )?;
        // the first reading of a session doubles as its starting score
        tx.execute(
            r#"
            UPDATE fatigue_sessions
            SET initial_fatigue_score = COALESCE(initial_fatigue_score, ?1)
            WHERE id = ?2
            "#,
            params![reading.fatigue_score, session.0],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn record_break(&mut self, session: &SessionId, record: &BreakRecord) -> StoreResult<()> {
        self.ensure_session(session)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO breaks (session_id, break_type, reason, duration, start_time)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                session.0,
                record.kind.to_string(),
                record.reason,
                record.duration_secs,
                Local::now().to_rfc3339(),
            ],
        )?;
        tx.execute(
            r#"
            UPDATE fatigue_sessions
            SET break_count = break_count + 1, total_break_time = total_break_time + ?1
            WHERE id = ?2
            "#,
            params![record.duration_secs, session.0],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn close_session(&mut self, session: &SessionId, close: &SessionClose) -> StoreResult<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE fatigue_sessions
            SET session_end = ?1, final_fatigue_score = ?2, keystrokes_count = ?3,
                productivity_score = ?4
            WHERE id = ?5
            "#,
            params![
                close.end_time.to_rfc3339(),
                close.summary.final_score,
                close.summary.total_keystrokes,
                close.productivity_score(),
                session.0,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownSession(session.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSummary;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn enrolled() -> (SqliteStore, EmployeeId) {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .enroll_employee(
                &UserId("ana".into()),
                &NewEmployee {
                    full_name: "Ana Lima".into(),
                    department: "Support".into(),
                    position: "Agent".into(),
                },
            )
            .unwrap();
        (store, id)
    }

    fn reading(score: u8, elapsed: u64) -> Reading {
        Reading {
            fatigue_score: score,
            wpm: 42,
            keystroke_count: elapsed * 2,
            elapsed_secs: elapsed,
        }
    }

    #[test]
    fn directory_lookup() {
        let (store, id) = enrolled();
        assert_eq!(
            store.find_employee_by_user(&UserId("ana".into())).unwrap(),
            Some(id)
        );
        assert_eq!(
            store.find_employee_by_user(&UserId("bob".into())).unwrap(),
            None
        );
    }

    #[test]
    fn enrolling_twice_updates_in_place() {
        let (store, id) = enrolled();
        let again = store
            .enroll_employee(
                &UserId("ana".into()),
                &NewEmployee {
                    full_name: "Ana M. Lima".into(),
                    department: "Support".into(),
                    position: "Lead".into(),
                },
            )
            .unwrap();
        assert_eq!(id, again);
    }

    #[test]
    fn full_session_lifecycle() {
        let (mut store, employee) = enrolled();
        let session = store.create_session(&employee, Local::now()).unwrap();

        store.append_reading(&session, &reading(20, 30)).unwrap();
        store.append_reading(&session, &reading(55, 60)).unwrap();
        store
            .record_break(
                &session,
                &BreakRecord {
                    kind: BreakKind::Automatic,
                    reason: "fatigue score 81".into(),
                    duration_secs: 20,
                },
            )
            .unwrap();
        store
            .close_session(
                &session,
                &SessionClose {
                    end_time: Local::now(),
                    summary: SessionSummary {
                        final_score: 30,
                        total_keystrokes: 400,
                        elapsed_secs: 75,
                        break_count: 1,
                    },
                },
            )
            .unwrap();

        let sessions = store.recent_sessions(10).unwrap();
        assert_eq!(sessions.len(), 1);
        let stored = &sessions[0];
        assert_eq!(stored.id, session);
        assert_eq!(stored.employee_name, "Ana Lima");
        assert!(stored.end.is_some());
        assert_eq!(stored.initial_score, Some(20));
        assert_eq!(stored.final_score, Some(30));
        assert_eq!(stored.productivity, Some(70));
        assert_eq!(stored.keystrokes, Some(400));
        assert_eq!(stored.break_count, 1);
        assert_eq!(stored.total_break_secs, 20);

        let readings = store.readings_for(&session).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].reading, reading(55, 60));

        let breaks = store.breaks_for(&session).unwrap();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].kind, BreakKind::Automatic);
        assert_eq!(breaks[0].reason, "fatigue score 81");
    }

    #[test]
    fn writes_against_unknown_session_fail() {
        let (mut store, _) = enrolled();
        let ghost = SessionId("ghost".into());
        assert_matches!(
            store.append_reading(&ghost, &reading(1, 30)),
            Err(StoreError::UnknownSession(_))
        );
        assert_matches!(
            store.close_session(
                &ghost,
                &SessionClose {
                    end_time: Local::now(),
                    summary: SessionSummary {
                        final_score: 0,
                        total_keystrokes: 0,
                        elapsed_secs: 0,
                        break_count: 0,
                    },
                },
            ),
            Err(StoreError::UnknownSession(_))
        );
    }

    #[test]
    fn recent_sessions_are_newest_first_and_limited() {
        let (mut store, employee) = enrolled();
        let base = Local::now();
        let older = store
            .create_session(&employee, base - chrono::Duration::minutes(10))
            .unwrap();
        let newer = store.create_session(&employee, base).unwrap();

        let sessions = store.recent_sessions(5).unwrap();
        assert_eq!(sessions.iter().map(|s| s.id.clone()).collect::<Vec<_>>(), vec![newer.clone(), older]);
        assert!(sessions[0].end.is_none());
        assert_eq!(store.recent_sessions(1).unwrap()[0].id, newer);
    }

    #[test]
    fn file_store_persists_between_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .enroll_employee(
                    &UserId("kim".into()),
                    &NewEmployee {
                        full_name: "Kim".into(),
                        department: "Ops".into(),
                        position: "SRE".into(),
                    },
                )
                .unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened
            .find_employee_by_user(&UserId("kim".into()))
            .unwrap()
            .is_some());
    }
}
