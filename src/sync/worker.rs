use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::db::Database;

use super::{
    delivery::JournalTarget,
    engine::{sync_all, SyncReport},
    opener::UrlOpener,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Runs `sync_all` on a fixed interval in the background.
pub struct SyncController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    report_rx: Option<watch::Receiver<Option<SyncReport>>>,
}

impl SyncController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            report_rx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start syncing every `interval`, the first run immediately.
    pub fn start(
        &mut self,
        db: Database,
        target: JournalTarget,
        opener: Arc<dyn UrlOpener>,
        interval: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sync worker already active");
        }
        if interval.is_zero() {
            bail!("sync interval must be greater than zero");
        }

        let cancel_token = CancellationToken::new();
        let (report_tx, report_rx) = watch::channel(None);

        let handle = tokio::spawn(sync_loop(
            db,
            target,
            opener,
            interval,
            cancel_token.clone(),
            report_tx,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.report_rx = Some(report_rx);
        Ok(())
    }

    /// Report from the most recent run that had captures to deliver.
    pub fn latest_report(&self) -> Option<SyncReport> {
        self.report_rx
            .as_ref()
            .and_then(|rx| rx.borrow().clone())
    }

    pub fn subscribe(&self) -> Option<watch::Receiver<Option<SyncReport>>> {
        self.report_rx.clone()
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sync loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new()
    }
}

async fn sync_loop(
    db: Database,
    target: JournalTarget,
    opener: Arc<dyn UrlOpener>,
    interval: Duration,
    cancel_token: CancellationToken,
    report_tx: watch::Sender<Option<SyncReport>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sync_all(&db, &target, opener.as_ref()).await {
                    Ok(report) if report.is_empty() => {}
                    Ok(report) => {
                        let failed = report.failed_days();
                        if !failed.is_empty() {
                            log_warn!("sync left {} day(s) undelivered", failed.len());
                        }
                        let _ = report_tx.send(Some(report));
                    }
                    Err(err) => log_error!("sync run failed: {err:#}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sync loop shutting down");
                break;
            }
        }
    }
}
