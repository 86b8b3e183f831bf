mod cmd_config;
mod cmd_items;
mod cmd_listen;
mod cmd_weekly;
mod credential;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use time::Date;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medialog_core::{Direction, ItemEdit, MediaType, Status};
use medialog_journal::PeriodKey;
use medialog_session::{Session, SessionError};

use cmd_config::ConfigCmd;
use cmd_weekly::WeeklyCmd;

#[derive(Parser)]
#[command(
    name = "medialog",
    version,
    about = "Media backlog, weekly schedule and listening logs kept in a GitHub repository"
)]
struct Cli {
    /// Config file (default: {config_dir}/medialog/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage configuration (repo, token, paths)
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
    /// Show completion counters and backlog size
    Status {
        /// UTC offset used for year and month boundaries, in hours
        #[arg(long, default_value = "9", allow_hyphen_values = true)]
        utc_offset: i8,
    },
    /// List watchlist items
    List {
        /// Only items with this status (want, watching, done, hold)
        #[arg(long)]
        status: Option<Status>,
    },
    /// Items still to watch
    Backlog,
    /// Completed items, newest first
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Add an item to the watchlist
    Add {
        title: String,
        /// Media type (radio, tv, movie, streaming, anime, drama, game, book, manga)
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
    },
    /// Advance an item's status: want -> watching -> done -> hold -> want
    Cycle { index: usize },
    /// Count one more watched episode
    Progress { index: usize },
    /// Move an item up or down within its group
    Move { index: usize, direction: Direction },
    /// Edit an item's fields
    Edit {
        index: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "type")]
        media_type: Option<MediaType>,
        #[arg(long)]
        status: Option<Status>,
        /// Note; empty string clears it
        #[arg(long)]
        note: Option<String>,
        /// Image URL; empty string clears it
        #[arg(long)]
        image: Option<String>,
        /// Episode count; 0 clears it
        #[arg(long)]
        episodes: Option<u32>,
        #[arg(long)]
        current_episode: Option<u32>,
        /// Completion date (YYYY-MM-DD) when the status is done
        #[arg(long)]
        completed_on: Option<String>,
    },
    /// Remove an item from the watchlist
    Delete { index: usize },
    /// Return a completed item to the want list
    Undo { index: usize },
    /// Manage the weekly schedule
    Weekly {
        #[command(subcommand)]
        cmd: WeeklyCmd,
    },
    /// Record a listening session in the period log and calendar index
    Listen {
        /// Station id (e.g. TBS, QRR)
        station: String,
        #[arg(long)]
        title: Option<String>,
        /// Broadcast start, YYYYMMDDhhmmss
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        memo: Option<String>,
        /// "Title / Artist" (repeatable)
        #[arg(long = "song")]
        songs: Vec<String>,
        #[arg(long)]
        url: Option<String>,
        /// UTC offset of the save time, in hours
        #[arg(long, default_value = "9", allow_hyphen_values = true)]
        utc_offset: i8,
    },
    /// Mark a day in the calendar index directly
    Calendar {
        /// Period, YYYY-MM
        period: PeriodKey,
        day: u8,
        source: String,
    },
}

fn unauthorized_hint(from_env: bool) -> String {
    if from_env {
        format!(
            "GitHub rejected the token from {env}; the stored token was left untouched.\n\
             Fix or unset {env} and retry.",
            env = credential::TOKEN_ENV
        )
    } else {
        format!(
            "GitHub rejected the token or none is set; the stored token has been removed.\n\
             Run `medialog config set token <TOKEN>` (or set {}) and retry.",
            credential::TOKEN_ENV
        )
    }
}

/// Turn a session error into a user-facing one; a rejected credential
/// becomes a prompt to store a new token.
pub(crate) fn explain(e: SessionError) -> anyhow::Error {
    if e.is_unauthorized() {
        anyhow::anyhow!(unauthorized_hint(credential::env_token().is_some()))
    } else {
        anyhow::Error::new(e)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MEDIALOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_date(s: &str) -> anyhow::Result<Date> {
    let fmt = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(s, fmt).map_err(|_| anyhow::anyhow!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn open_session(config_path: &Path) -> anyhow::Result<Session> {
    let config = cmd_config::load_store_config(config_path)?;
    let credentials = Arc::new(credential::FileCredential::new(config_path.to_path_buf()));
    Ok(Session::github(config, credentials)?)
}

async fn dispatch(cmd: Command, config_path: &Path) -> anyhow::Result<()> {
    let session = match cmd {
        Command::Config { cmd } => return cmd_config::run(cmd, config_path),
        _ => open_session(config_path)?,
    };
    match cmd {
        Command::Config { .. } => Ok(()),
        Command::Status { utc_offset } => cmd_items::status(&session, utc_offset).await,
        Command::List { status } => cmd_items::list(&session, status).await,
        Command::Backlog => cmd_items::backlog(&session).await,
        Command::History { limit } => cmd_items::history(&session, limit).await,
        Command::Add { title, media_type } => cmd_items::add(&session, &title, media_type).await,
        Command::Cycle { index } => cmd_items::cycle(&session, index).await,
        Command::Progress { index } => cmd_items::progress(&session, index).await,
        Command::Move { index, direction } => cmd_items::move_item(&session, index, direction).await,
        Command::Edit {
            index,
            title,
            media_type,
            status,
            note,
            image,
            episodes,
            current_episode,
            completed_on,
        } => {
            let edit = ItemEdit {
                title,
                media_type,
                status,
                note,
                image,
                episodes,
                current_episode,
                completed_on: completed_on.as_deref().map(parse_date).transpose()?,
            };
            cmd_items::edit(&session, index, edit).await
        }
        Command::Delete { index } => cmd_items::delete(&session, index).await,
        Command::Undo { index } => cmd_items::undo(&session, index).await,
        Command::Weekly { cmd } => cmd_weekly::run(cmd, &session).await,
        Command::Listen {
            station,
            title,
            at,
            memo,
            songs,
            url,
            utc_offset,
        } => {
            let args = cmd_listen::ListenArgs {
                station,
                title,
                at,
                memo,
                songs,
                url,
                utc_offset_hours: utc_offset,
            };
            cmd_listen::listen(&session, args).await
        }
        Command::Calendar {
            period,
            day,
            source,
        } => cmd_listen::calendar(&session, period, day, &source).await,
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => cmd_config::default_path()?,
    };
    tokio::runtime::Runtime::new()?.block_on(dispatch(cli.cmd, &config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_hint_names_the_token_source() {
        let env = unauthorized_hint(true);
        assert!(env.contains("unset MEDIALOG_TOKEN"));
        assert!(!env.contains("has been removed"));
        let file = unauthorized_hint(false);
        assert!(file.contains("has been removed"));
        assert!(file.contains("medialog config set token"));
    }
}
