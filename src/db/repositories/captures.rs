use anyhow::{bail, Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    capture::day::{bucket_local, DayKey},
    db::{
        connection::Database,
        helpers::{format_datetime, parse_datetime, parse_day, parse_optional_datetime},
        models::CaptureRecord,
    },
};

const SELECT_COLUMNS: &str = "SELECT id, content, created_at, target_day, synced, synced_at
     FROM captures";

fn row_to_capture(row: &Row) -> Result<CaptureRecord> {
    let created_at: String = row.get("created_at")?;
    let target_day: String = row.get("target_day")?;
    let synced_at: Option<String> = row.get("synced_at")?;

    Ok(CaptureRecord {
        id: row.get("id")?,
        content: row.get("content")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        target_day: parse_day(&target_day, "target_day")?,
        synced: row.get("synced")?,
        synced_at: parse_optional_datetime(synced_at, "synced_at")?,
    })
}

fn query_captures(conn: &rusqlite::Connection, sql: &str) -> Result<Vec<CaptureRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut captures = Vec::new();
    while let Some(row) = rows.next()? {
        captures.push(row_to_capture(row)?);
    }
    Ok(captures)
}

impl Database {
    /// Persist a new unsynced capture bucketed into the local day of `reference`.
    /// Returns an error if `content` is blank after trimming.
    pub async fn append_capture(
        &self,
        content: &str,
        reference: DateTime<Utc>,
    ) -> Result<CaptureRecord> {
        self.append_capture_for_day(content, bucket_local(reference))
            .await
    }

    /// Persist a new unsynced capture targeting an explicit day.
    pub async fn append_capture_for_day(
        &self,
        content: &str,
        target_day: DayKey,
    ) -> Result<CaptureRecord> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            bail!("capture content is empty");
        }

        let record = CaptureRecord {
            id: Uuid::new_v4().to_string(),
            content: trimmed.to_string(),
            created_at: Utc::now().trunc_subsecs(6),
            target_day,
            synced: false,
            synced_at: None,
        };

        let row = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO captures (id, content, created_at, target_day, synced)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![
                    row.id,
                    row.content,
                    format_datetime(&row.created_at),
                    row.target_day.to_string(),
                ],
            )
            .with_context(|| "failed to insert capture")?;
            Ok(())
        })
        .await?;

        Ok(record)
    }

    /// All captures, oldest first. Captures sharing a timestamp keep insertion order.
    pub async fn list_ordered_by_creation(&self) -> Result<Vec<CaptureRecord>> {
        self.execute(|conn| {
            query_captures(
                conn,
                &format!("{SELECT_COLUMNS} ORDER BY created_at ASC, seq ASC"),
            )
        })
        .await
    }

    pub async fn list_unsynced(&self) -> Result<Vec<CaptureRecord>> {
        self.execute(|conn| {
            query_captures(
                conn,
                &format!("{SELECT_COLUMNS} WHERE synced = 0 ORDER BY created_at ASC, seq ASC"),
            )
        })
        .await
    }

    pub async fn get_capture(&self, capture_id: &str) -> Result<Option<CaptureRecord>> {
        let capture_id = capture_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            let capture = stmt
                .query_row(params![capture_id], |row| Ok(row_to_capture(row)))
                .optional()?
                .transpose()?;
            Ok(capture)
        })
        .await
    }

    pub async fn count_captures(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM captures", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    /// Mark captures as delivered. Already-synced and unknown ids are skipped.
    ///
    /// Runs in one transaction: either every requested capture is marked or,
    /// on failure, none are. Returns how many captures changed state.
    pub async fn mark_synced(&self, capture_ids: &[String]) -> Result<usize> {
        if capture_ids.is_empty() {
            return Ok(0);
        }

        let capture_ids = capture_ids.to_vec();
        self.execute(move |conn| {
            let synced_at = format_datetime(&Utc::now());
            let tx = conn
                .transaction()
                .context("failed to open mark-synced transaction")?;

            let mut changed = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE captures
                     SET synced = 1,
                         synced_at = ?1
                     WHERE id = ?2 AND synced = 0",
                )?;
                for capture_id in &capture_ids {
                    changed += stmt
                        .execute(params![synced_at, capture_id])
                        .with_context(|| format!("failed to mark capture {capture_id} synced"))?;
                }
            }

            tx.commit().context("failed to commit mark-synced")?;
            Ok(changed)
        })
        .await
    }
}
