use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use medialog_journal::{Annotation, ListeningEntry, PeriodKey, Song};
use medialog_session::{IndexOutcome, Session};

use crate::cmd_items::at_offset;
use crate::explain;

pub struct ListenArgs {
    pub station: String,
    pub title: Option<String>,
    pub at: Option<String>,
    pub memo: Option<String>,
    pub songs: Vec<String>,
    pub url: Option<String>,
    pub utc_offset_hours: i8,
}

/// `"Title / Artist"`; a missing artist is left empty.
fn parse_song(raw: &str) -> Song {
    let (title, artist) = match raw.rsplit_once(" / ") {
        Some((t, a)) => (t.trim(), a.trim()),
        None => (raw.trim(), ""),
    };
    Song {
        time: None,
        title: title.to_string(),
        artist: artist.to_string(),
    }
}

fn build_entry(args: ListenArgs, now: OffsetDateTime) -> anyhow::Result<ListeningEntry> {
    let saved_at = at_offset(now, args.utc_offset_hours)?.format(&Rfc3339)?;
    let url = match (&args.url, &args.at) {
        (Some(url), _) => url.clone(),
        (None, Some(at)) => format!("https://radiko.jp/#!/ts/{}/{at}", args.station),
        (None, None) => format!("https://radiko.jp/#!/live/{}", args.station),
    };
    Ok(ListeningEntry {
        station_id: args.station,
        program_title: args.title,
        program_time: args.at,
        saved_at,
        memo: args.memo,
        songs: args.songs.iter().map(|s| parse_song(s)).collect(),
        url,
    })
}

/// `medialog listen <station> ...`
pub async fn listen(session: &Session, args: ListenArgs) -> anyhow::Result<()> {
    let entry = build_entry(args, OffsetDateTime::now_utc())?;
    let outcome = session.record_listening(&entry).await.map_err(explain)?;
    println!(
        "Logged {} to {}",
        entry.station_id,
        session.config().log_path(&outcome.period.to_string())
    );
    match outcome.index {
        IndexOutcome::Updated(Annotation::Unmatched) => {
            eprintln!("warning: no calendar cell for {} matched; the index was not updated", outcome.day)
        }
        IndexOutcome::Updated(_) => {}
        IndexOutcome::Failed(e) => {
            eprintln!("warning: calendar index not updated: {}", explain(e))
        }
    }
    Ok(())
}

/// `medialog calendar <YYYY-MM> <day> <source>`
pub async fn calendar(session: &Session, period: PeriodKey, day: u8, source: &str) -> anyhow::Result<()> {
    let outcome = session
        .update_calendar_index(period, day, source)
        .await
        .map_err(explain)?;
    let what = match outcome {
        Annotation::Linked => "linked",
        Annotation::Added => "added",
        Annotation::AlreadyPresent => "already present",
        Annotation::Unmatched => "no matching cell, index unchanged",
    };
    println!("{period} day {day} {source}: {what}");
    Ok(())
}
