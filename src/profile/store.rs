use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::footprint::devices::{Device, DeviceCategory};
use crate::footprint::FootprintRecord;
use crate::profile::migrations::BASE_MIGRATION;
use crate::survey::SurveyAnswers;

/// Local profile: survey answers, completed actions, devices and footprint history.
pub struct ProfileStore {
    conn: Connection,
}

impl ProfileStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating data directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening profile database: {}", path.display()))?;
        let store = Self { conn };
        store.migrate()?;
        debug!("opened profile store at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    pub fn save_survey(&self, survey: &SurveyAnswers) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO survey_answers(id, answers_json, updated_at)
VALUES (1, ?1, ?2)
ON CONFLICT(id) DO UPDATE SET answers_json = excluded.answers_json, updated_at = excluded.updated_at
"#,
            params![serde_json::to_string(survey)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_survey(&self) -> Result<Option<SurveyAnswers>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT answers_json FROM survey_answers WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("stored survey answers are corrupt")?,
            )),
            None => Ok(None),
        }
    }

    /// Removes the stored survey so the next evaluation requires a retake.
    pub fn clear_survey(&self) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM survey_answers", [])?;
        Ok(removed > 0)
    }

    /// Returns false when the action was already completed.
    pub fn complete_action(&self, action_id: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO completed_actions(action_id, completed_at) VALUES (?1, ?2)",
            params![action_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    pub fn undo_action(&self, action_id: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM completed_actions WHERE action_id = ?1",
            params![action_id],
        )?;
        Ok(removed > 0)
    }

    pub fn load_completed_action_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT action_id FROM completed_actions ORDER BY completed_at, action_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn upsert_device(&self, device: &Device) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO devices(id, name, category, hours_per_day, kg_co2e_per_day, active)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
    name = excluded.name,
    category = excluded.category,
    hours_per_day = excluded.hours_per_day,
    kg_co2e_per_day = excluded.kg_co2e_per_day,
    active = excluded.active
"#,
            params![
                device.id,
                device.name,
                device.category.as_slug(),
                device.hours_per_day,
                device.kg_co2e_per_day,
                device.active
            ],
        )?;
        Ok(())
    }

    /// Returns false when no device has this id.
    pub fn set_device_active(&self, id: &str, active: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE devices SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(updated > 0)
    }

    pub fn remove_device(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM devices WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn load_devices(&self) -> Result<Vec<Device>> {
        self.query_devices(
            "SELECT id, name, category, hours_per_day, kg_co2e_per_day, active FROM devices ORDER BY id",
        )
    }

    pub fn load_active_devices(&self) -> Result<Vec<Device>> {
        self.query_devices(
            "SELECT id, name, category, hours_per_day, kg_co2e_per_day, active FROM devices WHERE active = 1 ORDER BY id",
        )
    }

    fn query_devices(&self, sql: &str) -> Result<Vec<Device>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, category, hours_per_day, kg_co2e_per_day, active) = row?;
            let category = DeviceCategory::from_str(&category)
                .with_context(|| format!("device {id} has an invalid category"))?;
            out.push(Device {
                id,
                name,
                category,
                hours_per_day,
                kg_co2e_per_day,
                active,
            });
        }
        Ok(out)
    }

    pub fn insert_footprint_record(&self, record: &FootprintRecord) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO footprint_history(recorded_at, survey_hash, total_kg, breakdown_json)
VALUES (?1, ?2, ?3, ?4)
"#,
            params![
                record.recorded_at.to_rfc3339(),
                record.survey_hash,
                record.total_kg,
                serde_json::to_string(&record.breakdown)?
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` records, oldest first.
    pub fn load_history(&self, limit: usize) -> Result<Vec<FootprintRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT recorded_at, survey_hash, total_kg, breakdown_json
FROM footprint_history
ORDER BY id DESC
LIMIT ?1
"#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (recorded_at, survey_hash, total_kg, breakdown_json) = row?;
            out.push(FootprintRecord {
                recorded_at: parse_timestamp(&recorded_at)?,
                survey_hash,
                total_kg,
                breakdown: serde_json::from_str(&breakdown_json)?,
            });
        }
        out.reverse();
        Ok(out)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp in history: {raw}"))?
        .with_timezone(&Utc))
}
