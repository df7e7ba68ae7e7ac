pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS survey_answers (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    answers_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS completed_actions (
    action_id TEXT PRIMARY KEY,
    completed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS devices (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    hours_per_day REAL NOT NULL,
    kg_co2e_per_day REAL NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS footprint_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    survey_hash TEXT NOT NULL,
    total_kg REAL NOT NULL,
    breakdown_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_footprint_history_recorded
    ON footprint_history(recorded_at DESC);
"#;
