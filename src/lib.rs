pub mod capture;
mod cli;
pub mod db;
pub mod logging;
pub mod markdown;
pub mod settings;
pub mod sync;

use std::{io::Read, path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::time::Duration;

use capture::Draft;
use cli::{joined_text, Cli, Command, ConfigArgs};
use db::Database;
use settings::{JournalSettings, SettingsStore};
use sync::{sync_all, DeliveryOutcome, JournalTarget, SyncController, SyncReport, SystemOpener};

pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("inbox.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        Ok(Self { db, settings })
    }

    pub fn journal_target(&self) -> JournalTarget {
        JournalTarget::from(&self.settings.journal())
    }
}

pub fn run() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let state = AppState::open(&cli.data_dir)?;
        execute(&state, cli.command).await
    })
}

async fn execute(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Capture { text } => {
            let text = match joined_text(&text) {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed to read note from stdin")?;
                    buffer
                }
            };
            let mut draft = Draft::new();
            draft.type_text(&text);
            finalize_and_print(&mut draft, &state.db).await
        }
        Command::Paste { text } => {
            let mut draft = Draft::new();
            let insertion = draft.paste(&text.join(" "));
            info!("Paste classified as {:?}", insertion.kind);
            finalize_and_print(&mut draft, &state.db).await
        }
        Command::List => {
            for record in state.db.list_ordered_by_creation().await? {
                let mark = if record.synced { "x" } else { " " };
                let first_line = record.content.lines().next().unwrap_or_default();
                let tasks = markdown::task_lines(&record.content).len();
                let suffix = if tasks > 0 {
                    format!("  ({tasks} task(s))")
                } else {
                    String::new()
                };
                println!(
                    "[{mark}] {}  {}  {first_line}{suffix}",
                    record.target_day, record.id
                );
            }
            Ok(())
        }
        Command::Sync => {
            let report = sync_all(&state.db, &state.journal_target(), &SystemOpener).await?;
            print_report(&report);
            Ok(())
        }
        Command::Watch => {
            let journal = state.settings.journal();
            let mut controller = SyncController::new();
            controller.start(
                state.db.clone(),
                JournalTarget::from(&journal),
                Arc::new(SystemOpener),
                Duration::from_secs(journal.auto_sync_secs),
            )?;
            info!("Syncing every {}s; press Ctrl-C to stop", journal.auto_sync_secs);

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            controller.stop().await?;
            if let Some(report) = controller.latest_report() {
                print_report(&report);
            }
            Ok(())
        }
        Command::Config(args) => {
            let journal = apply_config(&state.settings, args)?;
            println!("vault:          {}", journal.vault_name());
            println!("daily folder:   {}", journal.daily_folder);
            println!("silent:         {}", journal.silent);
            println!("auto sync secs: {}", journal.auto_sync_secs);
            Ok(())
        }
    }
}

/// Merge the given flags into the stored journal settings. Without flags the
/// settings are only read back.
fn apply_config(settings: &SettingsStore, args: ConfigArgs) -> Result<JournalSettings> {
    let mut journal = settings.journal();
    if args.is_empty() {
        return Ok(journal);
    }

    if let Some(vault) = args.vault {
        journal.vault = Some(vault);
    }
    if let Some(folder) = args.folder {
        journal.daily_folder = folder;
    }
    if let Some(silent) = args.silent {
        journal.silent = silent;
    }
    if let Some(secs) = args.auto_sync_secs {
        anyhow::ensure!(secs > 0, "auto sync interval must be greater than zero");
        journal.auto_sync_secs = secs;
    }

    settings.update_journal(journal.clone())?;
    info!("Journal settings updated");
    Ok(journal)
}

async fn finalize_and_print(draft: &mut Draft, db: &Database) -> Result<()> {
    match draft.finalize(db).await? {
        Some(record) => println!("captured {} for {}", record.id, record.target_day),
        None => println!("nothing to capture"),
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.is_empty() {
        println!("nothing to sync");
        return;
    }
    for day in &report.days {
        match &day.outcome {
            DeliveryOutcome::Delivered { records } => {
                println!("{}: delivered {records} note(s)", day.day)
            }
            DeliveryOutcome::Rejected => println!(
                "{}: not delivered, {} note(s) will be retried",
                day.day,
                day.record_ids.len()
            ),
            DeliveryOutcome::PersistFailed { error } => {
                println!("{}: delivered but not recorded ({error})", day.day)
            }
        }
    }
}
