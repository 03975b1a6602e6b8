use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Single-writer pool: check-then-write sections in the stores rely on
/// writes serializing through one connection.
pub async fn init_db(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

const SCHEMA: &[&str] = &[
    // status is derived from the nullable check_out, never stored
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id     INTEGER NOT NULL,
        site_id       INTEGER NOT NULL,
        division      TEXT    NOT NULL,
        check_in      TEXT    NOT NULL,
        check_out     TEXT,
        shift         TEXT,
        is_overtime   INTEGER NOT NULL DEFAULT 0,
        is_backup     INTEGER NOT NULL DEFAULT 0,
        gps_valid     INTEGER,
        lat           REAL,
        lng           REAL,
        photo_ref     TEXT,
        correction_id INTEGER
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_attendance_open
        ON attendance (person_id, site_id, division)
        WHERE check_out IS NULL
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attendance_check_in ON attendance (check_in)",
    r#"
    CREATE TABLE IF NOT EXISTS corrections (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id             INTEGER NOT NULL,
        site_id               INTEGER NOT NULL,
        division              TEXT    NOT NULL,
        date                  TEXT    NOT NULL,
        requested_check_in    TEXT,
        requested_check_out   TEXT,
        requested_shift       TEXT,
        requested_is_overtime INTEGER,
        requested_is_backup   INTEGER,
        reason                TEXT    NOT NULL,
        evidence_ref          TEXT,
        status                TEXT    NOT NULL DEFAULT 'PENDING',
        resolved_by           INTEGER,
        rejection_reason      TEXT,
        created_at            TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_corrections_status ON corrections (status, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS shift_slots (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id    INTEGER NOT NULL,
        division   TEXT    NOT NULL,
        area       TEXT,
        date       TEXT    NOT NULL,
        start_time TEXT    NOT NULL,
        end_time   TEXT    NOT NULL,
        person_id  INTEGER,
        status     TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_shift_slots_date ON shift_slots (date, site_id, division)",
    "CREATE INDEX IF NOT EXISTS idx_shift_slots_person ON shift_slots (person_id, date)",
    // owned by the external task collaborator; read-only here
    r#"
    CREATE TABLE IF NOT EXISTS checklist_items (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        kind      TEXT    NOT NULL,
        site_id   INTEGER NOT NULL,
        division  TEXT    NOT NULL,
        date      TEXT    NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0
    )
    "#,
    // append-only trail consumed by the external audit collaborator
    r#"
    CREATE TABLE IF NOT EXISTS audit_log (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        actor         INTEGER NOT NULL,
        action        TEXT    NOT NULL,
        entity        TEXT    NOT NULL,
        entity_id     INTEGER NOT NULL,
        before_status TEXT,
        after_status  TEXT,
        at            TEXT    NOT NULL
    )
    "#,
];
