//! SQL schema for the PCR SQLite store.
//!
//! Executed once at connection startup. Future migrations will be
//! gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS forms (
    form_id              TEXT PRIMARY KEY,
    kind                 TEXT NOT NULL,   -- 'individual' | 'department' | 'office'
    cycle_id             TEXT NOT NULL,
    subject_id           TEXT,            -- NULL for department/office forms
    unit_id              TEXT NOT NULL,
    status               TEXT NOT NULL DEFAULT 'draft',
    reviewer_id          TEXT,
    approver_id          TEXT,
    final_average_rating REAL,            -- set once, with the terminal transition
    adjectival_rating    TEXT,            -- band label discriminant; paired with the average
    remarks              TEXT,
    review_comments      TEXT,
    created_at           TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at           TEXT NOT NULL,
    submitted_at         TEXT,
    reviewed_at          TEXT,
    finalized_at         TEXT             -- doubles as approved_at for dept/office forms
);

-- Items are replaced wholesale on every save; no independent
-- item-level operations exist outside reconciliation.
CREATE TABLE IF NOT EXISTS line_items (
    item_id           TEXT PRIMARY KEY,
    form_id           TEXT NOT NULL REFERENCES forms(form_id) ON DELETE CASCADE,
    category          TEXT NOT NULL,      -- display ordering only
    sort_order        INTEGER NOT NULL DEFAULT 0,
    description       TEXT,
    success_indicator TEXT,
    accountable_party TEXT,
    accomplishment    TEXT,
    remarks           TEXT,
    rating_quantity   REAL,
    rating_efficiency REAL,
    rating_timeliness REAL,
    rating_average    REAL                -- written only by finalize/approve
);

CREATE INDEX IF NOT EXISTS forms_cycle_idx    ON forms(cycle_id);
CREATE INDEX IF NOT EXISTS forms_subject_idx  ON forms(subject_id);
CREATE INDEX IF NOT EXISTS forms_unit_idx     ON forms(unit_id);
CREATE INDEX IF NOT EXISTS forms_status_idx   ON forms(status);
CREATE INDEX IF NOT EXISTS line_items_form_idx ON line_items(form_id);

PRAGMA user_version = 1;
";
