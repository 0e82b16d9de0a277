//! Delivers unsynced captures to the journal, one URL per day.
//!
//! Each day is an independent delivery: a rejected day stays unsynced and is
//! retried whole on the next run, while other days proceed. Captures are only
//! marked synced after the opener accepted the URL carrying them.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    capture::day::DayKey,
    db::{CaptureRecord, Database},
};

use super::{
    delivery::{combine_payload, JournalTarget},
    opener::UrlOpener,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DeliveryOutcome {
    Delivered { records: usize },
    /// The opener refused the URL; nothing was marked.
    Rejected,
    /// The opener accepted the URL but marking the captures did not commit.
    PersistFailed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub day: DayKey,
    pub record_ids: Vec<String>,
    pub outcome: DeliveryOutcome,
}

impl DayReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub days: Vec<DayReport>,
}

impl SyncReport {
    /// True when there was nothing to deliver.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn delivered_records(&self) -> usize {
        self.days
            .iter()
            .map(|day| match day.outcome {
                DeliveryOutcome::Delivered { records } => records,
                _ => 0,
            })
            .sum()
    }

    /// Days whose notes are still waiting, so the user can be told and retry.
    pub fn failed_days(&self) -> Vec<DayKey> {
        self.days
            .iter()
            .filter(|day| !day.is_delivered())
            .map(|day| day.day)
            .collect()
    }

    pub fn outcome_for(&self, day: DayKey) -> Option<&DeliveryOutcome> {
        self.days
            .iter()
            .find(|report| report.day == day)
            .map(|report| &report.outcome)
    }
}

/// Group captures by target day, preserving their order within each day.
pub fn group_by_day(records: Vec<CaptureRecord>) -> BTreeMap<DayKey, Vec<CaptureRecord>> {
    let mut groups: BTreeMap<DayKey, Vec<CaptureRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.target_day).or_default().push(record);
    }
    groups
}

/// Deliver every unsynced capture, one append per target day.
///
/// Only a failure to read the store aborts the run; per-day failures are
/// reported in the returned `SyncReport`. Dropping the future mid-run keeps
/// days that were already marked and leaves the rest for the next run.
pub async fn sync_all(
    db: &Database,
    target: &JournalTarget,
    opener: &dyn UrlOpener,
) -> Result<SyncReport> {
    let unsynced: Vec<CaptureRecord> = db
        .list_ordered_by_creation()
        .await
        .context("failed to load captures for sync")?
        .into_iter()
        .filter(|record| !record.synced)
        .collect();

    if unsynced.is_empty() {
        return Ok(SyncReport::default());
    }

    let groups = group_by_day(unsynced);
    log_info!("Syncing {} day(s) of captures", groups.len());

    let mut report = SyncReport::default();
    for (day, records) in groups {
        report.days.push(deliver_day(db, target, opener, day, records).await);
    }

    Ok(report)
}

async fn deliver_day(
    db: &Database,
    target: &JournalTarget,
    opener: &dyn UrlOpener,
    day: DayKey,
    records: Vec<CaptureRecord>,
) -> DayReport {
    let payload = combine_payload(records.iter().map(|record| record.content.as_str()));
    let url = target.append_url(day, &payload);
    let record_ids: Vec<String> = records.into_iter().map(|record| record.id).collect();

    let outcome = if !opener.open(&url).await {
        log_warn!(
            "Delivery for {day} rejected; {} capture(s) stay unsynced",
            record_ids.len()
        );
        DeliveryOutcome::Rejected
    } else {
        match db.mark_synced(&record_ids).await {
            Ok(_) => {
                log_info!("Delivered {} capture(s) for {day}", record_ids.len());
                DeliveryOutcome::Delivered {
                    records: record_ids.len(),
                }
            }
            Err(err) => {
                log_error!("Delivered {day} but failed to mark captures synced: {err:#}");
                DeliveryOutcome::PersistFailed {
                    error: format!("{err:#}"),
                }
            }
        }
    };

    DayReport {
        day,
        record_ids,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::settings::JournalSettings;

    /// Records every URL and accepts unless the URL targets a rejected day.
    #[derive(Default)]
    struct RecordingOpener {
        reject_files: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingOpener {
        fn rejecting(day: DayKey) -> Self {
            Self {
                reject_files: vec![format!("file=daily%2F{day}")],
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UrlOpener for RecordingOpener {
        async fn open(&self, url: &str) -> bool {
            self.calls.lock().unwrap().push(url.to_string());
            !self.reject_files.iter().any(|file| url.contains(file.as_str()))
        }
    }

    fn open_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("inbox.sqlite3")).unwrap();
        (dir, db)
    }

    fn target() -> JournalTarget {
        JournalTarget::from(&JournalSettings::default())
    }

    fn day(d: u32) -> DayKey {
        DayKey::from_date(NaiveDate::from_ymd_opt(2025, 4, d).unwrap())
    }

    #[tokio::test]
    async fn nothing_to_sync_makes_no_calls() {
        let (_dir, db) = open_db();
        let opener = RecordingOpener::default();

        let report = sync_all(&db, &target(), &opener).await.unwrap();
        assert!(report.is_empty());
        assert!(opener.calls().is_empty());
    }

    #[tokio::test]
    async fn one_delivery_per_day_and_all_marked() {
        let (_dir, db) = open_db();
        db.append_capture_for_day("first", day(6)).await.unwrap();
        db.append_capture_for_day("second", day(7)).await.unwrap();
        db.append_capture_for_day("third", day(6)).await.unwrap();
        let opener = RecordingOpener::default();

        let report = sync_all(&db, &target(), &opener).await.unwrap();

        assert_eq!(opener.calls().len(), 2);
        assert_eq!(report.delivered_records(), 3);
        assert!(report.failed_days().is_empty());
        assert_eq!(
            report.outcome_for(day(6)),
            Some(&DeliveryOutcome::Delivered { records: 2 })
        );
        assert!(db.list_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reference_dates_on_two_days_make_two_deliveries() {
        let (_dir, db) = open_db();
        let now = chrono::Utc::now();
        db.append_capture("today", now).await.unwrap();
        db.append_capture("earlier", now - chrono::Duration::days(2))
            .await
            .unwrap();
        let opener = RecordingOpener::default();

        let report = sync_all(&db, &target(), &opener).await.unwrap();

        assert_eq!(opener.calls().len(), 2);
        assert_eq!(report.days.len(), 2);
        assert!(db
            .list_ordered_by_creation()
            .await
            .unwrap()
            .iter()
            .all(|record| record.synced));
    }

    #[tokio::test]
    async fn day_payload_joins_notes_in_creation_order() {
        let (_dir, db) = open_db();
        db.append_capture_for_day("first", day(6)).await.unwrap();
        db.append_capture_for_day("second", day(6)).await.unwrap();
        let opener = RecordingOpener::default();

        sync_all(&db, &target(), &opener).await.unwrap();

        let calls = opener.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("content=%0Afirst%0A%0Asecond&"));
        assert!(calls[0].contains("file=daily%2F2025-04-06"));
    }

    #[tokio::test]
    async fn rejected_day_stays_unsynced_while_others_deliver() {
        let (_dir, db) = open_db();
        let a = db.append_capture_for_day("day a", day(6)).await.unwrap();
        let b = db.append_capture_for_day("day b", day(7)).await.unwrap();
        let opener = RecordingOpener::rejecting(day(7));

        let report = sync_all(&db, &target(), &opener).await.unwrap();

        assert_eq!(opener.calls().len(), 2);
        assert!(db.get_capture(&a.id).await.unwrap().unwrap().synced);
        assert!(!db.get_capture(&b.id).await.unwrap().unwrap().synced);
        assert_eq!(report.outcome_for(day(7)), Some(&DeliveryOutcome::Rejected));
        assert_eq!(report.failed_days(), vec![day(7)]);
    }

    #[tokio::test]
    async fn rejected_day_is_retried_whole_next_run() {
        let (_dir, db) = open_db();
        db.append_capture_for_day("a1", day(6)).await.unwrap();
        db.append_capture_for_day("b1", day(7)).await.unwrap();

        sync_all(&db, &target(), &RecordingOpener::rejecting(day(7)))
            .await
            .unwrap();
        db.append_capture_for_day("b2", day(7)).await.unwrap();

        let opener = RecordingOpener::default();
        let report = sync_all(&db, &target(), &opener).await.unwrap();

        let calls = opener.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("content=%0Ab1%0A%0Ab2&"));
        assert_eq!(report.delivered_records(), 2);
    }

    #[tokio::test]
    async fn synced_records_are_not_delivered_again() {
        let (_dir, db) = open_db();
        db.append_capture_for_day("once", day(6)).await.unwrap();

        sync_all(&db, &target(), &RecordingOpener::default())
            .await
            .unwrap();
        let opener = RecordingOpener::default();
        let report = sync_all(&db, &target(), &opener).await.unwrap();

        assert!(report.is_empty());
        assert!(opener.calls().is_empty());
    }

    #[tokio::test]
    async fn mark_failure_is_reported_for_that_day_only() {
        let (_dir, db) = open_db();
        let a = db.append_capture_for_day("ok", day(6)).await.unwrap();
        let b = db.append_capture_for_day("stuck", day(7)).await.unwrap();

        let b_id = b.id.clone();
        db.execute(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TRIGGER fail_mark BEFORE UPDATE OF synced ON captures
                 WHEN NEW.id = '{b_id}'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;"
            ))?;
            Ok(())
        })
        .await
        .unwrap();

        let report = sync_all(&db, &target(), &RecordingOpener::default())
            .await
            .unwrap();

        assert!(db.get_capture(&a.id).await.unwrap().unwrap().synced);
        assert!(!db.get_capture(&b.id).await.unwrap().unwrap().synced);
        assert!(matches!(
            report.outcome_for(day(7)),
            Some(DeliveryOutcome::PersistFailed { .. })
        ));
        assert_eq!(report.failed_days(), vec![day(7)]);
    }

    #[test]
    fn grouping_keeps_store_order() {
        let record = |id: &str, d: u32| CaptureRecord {
            id: id.into(),
            content: id.into(),
            created_at: chrono::Utc::now(),
            target_day: day(d),
            synced: false,
            synced_at: None,
        };

        let groups = group_by_day(vec![record("a", 7), record("b", 6), record("c", 7)]);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, [day(6), day(7)]);

        let ids: Vec<_> = groups[&day(7)].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    /// Accepts every day except `stall_file`, whose delivery never completes.
    struct StallingOpener {
        stall_file: String,
    }

    #[async_trait]
    impl UrlOpener for StallingOpener {
        async fn open(&self, url: &str) -> bool {
            if url.contains(self.stall_file.as_str()) {
                std::future::pending::<bool>().await
            } else {
                true
            }
        }
    }

    #[tokio::test]
    async fn cancelled_run_keeps_finished_days_and_leaves_the_rest() {
        let (_dir, db) = open_db();
        let early = db.append_capture_for_day("early", day(6)).await.unwrap();
        let late = db.append_capture_for_day("late", day(7)).await.unwrap();
        let opener = StallingOpener {
            stall_file: format!("file=daily%2F{}", day(7)),
        };

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            sync_all(&db, &target(), &opener),
        )
        .await;
        assert!(outcome.is_err(), "stalled delivery should hit the timeout");

        assert!(db.get_capture(&early.id).await.unwrap().unwrap().synced);
        assert!(!db.get_capture(&late.id).await.unwrap().unwrap().synced);

        let retry = RecordingOpener::default();
        let report = sync_all(&db, &target(), &retry).await.unwrap();
        assert_eq!(retry.calls().len(), 1);
        assert_eq!(
            report.outcome_for(day(7)),
            Some(&DeliveryOutcome::Delivered { records: 1 })
        );
        assert!(db.list_unsynced().await.unwrap().is_empty());
    }
}
