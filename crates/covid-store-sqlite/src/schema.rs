//! SQL schema for the case-record store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Append-only history of case counts.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS case_records (
    record_id        INTEGER PRIMARY KEY,
    date             TEXT    NOT NULL,   -- YYYY-MM-DD
    state            TEXT,
    region_code      TEXT,
    region_name      TEXT    NOT NULL,
    province_code    TEXT    NOT NULL,
    province_name    TEXT    NOT NULL,
    province_acronym TEXT,
    latitude         REAL    NOT NULL DEFAULT 0.0,
    longitude        REAL    NOT NULL DEFAULT 0.0,
    total_cases      INTEGER NOT NULL CHECK (total_cases >= 0),
    note             TEXT,
    nuts_code_1      TEXT,
    nuts_code_2      TEXT,
    nuts_code_3      TEXT,
    UNIQUE (date, province_code)
);

CREATE INDEX IF NOT EXISTS case_records_date_idx     ON case_records(date);
CREATE INDEX IF NOT EXISTS case_records_region_idx   ON case_records(region_name);
CREATE INDEX IF NOT EXISTS case_records_province_idx ON case_records(province_name);

PRAGMA user_version = 1;
";
