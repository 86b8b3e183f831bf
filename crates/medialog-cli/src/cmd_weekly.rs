use clap::Subcommand;
use time::OffsetDateTime;

use medialog_core::{Direction, MediaType, Weekday};
use medialog_session::Session;

use crate::explain;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum WeeklyCmd {
    /// Show the weekly schedule (one day or all)
    List {
        /// Day key (mon..sun)
        day: Option<Weekday>,
    },
    /// Add a show to a day
    Add {
        day: Weekday,
        name: String,
        /// Media type (radio, tv, anime, ...)
        #[arg(long = "type", default_value = "radio")]
        media_type: MediaType,
    },
    /// Rename or retype a show
    Edit {
        day: Weekday,
        index: usize,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        media_type: Option<MediaType>,
        /// Image URL; empty string clears it
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a show from a day
    Remove { day: Weekday, index: usize },
    /// Move a show up or down within its day
    Move {
        day: Weekday,
        index: usize,
        direction: Direction,
    },
    /// Log today's airing of a show as a completed watchlist item
    Record { day: Weekday, index: usize },
}

// ── Dispatch ──

pub async fn run(cmd: WeeklyCmd, session: &Session) -> anyhow::Result<()> {
    match cmd {
        WeeklyCmd::List { day } => list(session, day).await,
        WeeklyCmd::Add {
            day,
            name,
            media_type,
        } => {
            let idx = session
                .apply(|s| s.add_show(day, &name, media_type))
                .await
                .map_err(explain)?;
            println!("{day} #{idx}: {name}");
            Ok(())
        }
        WeeklyCmd::Edit {
            day,
            index,
            name,
            media_type,
            image,
        } => {
            session
                .apply(|s| s.edit_show(day, index, name, media_type, image))
                .await
                .map_err(explain)?;
            println!("Updated {day} #{index}");
            Ok(())
        }
        WeeklyCmd::Remove { day, index } => {
            let show = session
                .apply(|s| s.remove_show(day, index))
                .await
                .map_err(explain)?;
            println!("Removed {day}: {}", show.name);
            Ok(())
        }
        WeeklyCmd::Move {
            day,
            index,
            direction,
        } => {
            let moved = session
                .apply(|s| s.move_show(day, index, direction))
                .await
                .map_err(explain)?;
            if !moved {
                println!("{day} #{index} is already at the edge");
            }
            Ok(())
        }
        WeeklyCmd::Record { day, index } => {
            let now = OffsetDateTime::now_utc();
            let idx = session
                .apply(|s| s.record_show(day, index, now))
                .await
                .map_err(explain)?;
            println!("Recorded as watchlist #{idx}");
            Ok(())
        }
    }
}

async fn list(session: &Session, only: Option<Weekday>) -> anyhow::Result<()> {
    let state = session.load_state().await.map_err(explain)?;
    let days: Vec<Weekday> = match only {
        Some(day) => vec![day],
        None => Weekday::ALL.to_vec(),
    };
    for day in days {
        println!("{day}:");
        let shows = state.weekly.day(day);
        if shows.is_empty() {
            println!("  (none)");
        }
        for (i, show) in shows.iter().enumerate() {
            let emoji = show.media_type.as_ref().unwrap_or(&MediaType::Radio).emoji();
            println!("  {i:>2}  {emoji} {}", show.name);
        }
    }
    Ok(())
}
