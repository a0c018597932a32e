//! CLI for chatex: list chats, export a chat with its media, show config.

mod commands;

use anyhow::{bail, Context, Result};
use chatex_core::archive::{
    parse_start_date, ChatSelector, FetchMode, DEFAULT_DIALOG_LIMIT, DEFAULT_LATEST_LIMIT,
};
use chatex_core::config::{self, ChatexConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use commands::{run_chats, run_config, run_export};

/// Top-level CLI for chatex.
#[derive(Debug, Parser)]
#[command(name = "chatex")]
#[command(about = "chatex: export chat history to HTML and download its media", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List chats in an archive.
    Chats {
        /// Chat archive (JSON).
        #[arg(long, value_name = "FILE")]
        archive: PathBuf,
        /// Maximum number of chats to list.
        #[arg(long, default_value_t = DEFAULT_DIALOG_LIMIT, value_name = "N")]
        limit: usize,
    },

    /// Export one chat to an HTML report and download its media.
    Export(ExportArgs),

    /// Show the config file path and the effective configuration.
    Config,
}

/// Where message iteration starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Whole history, oldest first.
    Earliest,
    /// From `--since`, oldest first.
    Date,
    /// After `--min-id`, oldest first.
    MessageId,
    /// The newest `--limit` messages.
    Latest,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Chat archive (JSON).
    #[arg(long, value_name = "FILE")]
    pub archive: PathBuf,

    /// Chat position as listed by `chatex chats` (1-based).
    #[arg(long, value_name = "N", required_unless_present = "chat_id", conflicts_with = "chat_id")]
    pub chat: Option<usize>,

    /// Chat id.
    #[arg(long, value_name = "ID", allow_negative_numbers = true)]
    pub chat_id: Option<i64>,

    #[arg(long, value_enum, default_value_t = ModeArg::Latest)]
    pub mode: ModeArg,

    /// Start date for `--mode date` (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339).
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Export messages after this id (`--mode message-id`).
    #[arg(long, value_name = "ID")]
    pub min_id: Option<i64>,

    /// Number of messages for `--mode latest`.
    #[arg(long, default_value_t = DEFAULT_LATEST_LIMIT, value_name = "N")]
    pub limit: usize,

    /// Maximum concurrent media downloads (overrides config; 0 skips media).
    #[arg(long, value_name = "K")]
    pub jobs: Option<usize>,

    /// Media directory (overrides config).
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Report path (overrides config; `.html` is forced).
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the report only.
    #[arg(long)]
    pub no_media: bool,

    /// Config file instead of the default location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ExportArgs {
    pub fn selector(&self) -> ChatSelector {
        match (self.chat, self.chat_id) {
            (_, Some(id)) => ChatSelector::Id(id),
            (Some(n), None) => ChatSelector::Index(n),
            // clap requires one of the two.
            (None, None) => ChatSelector::Index(1),
        }
    }

    pub fn fetch_mode(&self) -> Result<FetchMode> {
        Ok(match self.mode {
            ModeArg::Earliest => FetchMode::Earliest,
            ModeArg::Date => {
                let Some(since) = self.since.as_deref() else {
                    bail!("--mode date requires --since");
                };
                let date = parse_start_date(since)
                    .with_context(|| format!("invalid --since date: {}", since))?;
                FetchMode::FromDate(date)
            }
            ModeArg::MessageId => {
                let Some(min_id) = self.min_id else {
                    bail!("--mode message-id requires --min-id");
                };
                FetchMode::FromMessageId(min_id)
            }
            ModeArg::Latest => FetchMode::Latest(self.limit),
        })
    }

    fn load_config(&self) -> Result<ChatexConfig> {
        match self.config.as_deref() {
            Some(path) => config::load_from_path(path),
            None => config::load_or_init(),
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Chats { archive, limit } => run_chats(&archive, limit)?,
            CliCommand::Export(args) => {
                let cfg = args.load_config()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_export(&args, &cfg).await?;
            }
            CliCommand::Config => run_config()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
