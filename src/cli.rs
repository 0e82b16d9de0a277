use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "inbox", about = "Capture notes and append them to daily journal files")]
pub struct Cli {
    /// Directory holding the capture database and settings
    #[arg(long, global = true, env = "INBOX_DATA_DIR", default_value = ".inbox")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(about = "Save a note (reads stdin when no text is given)")]
    Capture { text: Vec<String> },

    #[command(about = "Save a note as if the text was pasted into an empty draft")]
    Paste {
        #[arg(required = true)]
        text: Vec<String>,
    },

    #[command(about = "Show captured notes, oldest first")]
    List,

    #[command(about = "Append unsynced notes to their daily journal files")]
    Sync,

    #[command(about = "Keep syncing on the configured interval until Ctrl-C")]
    Watch,

    #[command(about = "Show or change where notes are delivered")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// Vault to append to
    #[arg(long)]
    pub vault: Option<String>,

    /// Folder holding the daily notes
    #[arg(long)]
    pub folder: Option<String>,

    /// Suppress the journal app's own confirmation
    #[arg(long)]
    pub silent: Option<bool>,

    /// Seconds between background syncs in `watch`
    #[arg(long)]
    pub auto_sync_secs: Option<u64>,
}

impl ConfigArgs {
    pub fn is_empty(&self) -> bool {
        self == &ConfigArgs::default()
    }
}

/// Words given on the command line, joined back into one note.
pub fn joined_text(words: &[String]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capture_text() {
        let cli = Cli::try_parse_from(["inbox", "capture", "buy", "milk"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Capture {
                text: vec!["buy".into(), "milk".into()]
            }
        );

        let cli = Cli::try_parse_from(["inbox", "capture"]).unwrap();
        assert_eq!(cli.command, Command::Capture { text: vec![] });
    }

    #[test]
    fn paste_requires_text() {
        assert!(Cli::try_parse_from(["inbox", "paste"]).is_err());

        let cli = Cli::try_parse_from(["inbox", "paste", "https://example.com"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Paste {
                text: vec!["https://example.com".into()]
            }
        );
    }

    #[test]
    fn unknown_or_missing_command_is_rejected() {
        assert!(Cli::try_parse_from(["inbox"]).is_err());
        assert!(Cli::try_parse_from(["inbox", "frobnicate"]).is_err());
    }

    #[test]
    fn data_dir_flag_is_global() {
        let cli = Cli::try_parse_from(["inbox", "list", "--data-dir", "/tmp/notes"]).unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(cli.command, Command::List);
    }

    #[test]
    fn config_flags_are_optional() {
        let cli = Cli::try_parse_from(["inbox", "config"]).unwrap();
        let Command::Config(args) = cli.command else {
            panic!("expected config command");
        };
        assert!(args.is_empty());

        let cli = Cli::try_parse_from([
            "inbox", "config", "--vault", "MainVault", "--silent", "true",
        ])
        .unwrap();
        let Command::Config(args) = cli.command else {
            panic!("expected config command");
        };
        assert_eq!(args.vault.as_deref(), Some("MainVault"));
        assert_eq!(args.silent, Some(true));
        assert!(args.folder.is_none());
    }

    #[test]
    fn joined_text_is_none_without_words() {
        assert_eq!(joined_text(&[]), None);
        assert_eq!(
            joined_text(&["a".to_string(), "b".to_string()]),
            Some("a b".to_string())
        );
    }
}
