use medialog_core::{Direction, ItemEdit, MediaItem, MediaType, Status};
use medialog_session::Session;
use time::{OffsetDateTime, UtcOffset};

use crate::explain;

/// `now` shifted to a whole-hour UTC offset.
pub(crate) fn at_offset(now: OffsetDateTime, hours: i8) -> anyhow::Result<OffsetDateTime> {
    let offset = UtcOffset::from_hms(hours, 0, 0)
        .map_err(|_| anyhow::anyhow!("invalid UTC offset: {hours}"))?;
    Ok(now.to_offset(offset))
}

// ── Rendering ──

fn format_item(idx: usize, item: &MediaItem) -> String {
    let mut line = format!(
        "{idx:>3}  {} {} {}",
        item.status.symbol(),
        item.category().emoji(),
        item.title
    );
    if let (Some(total), current) = (item.episodes, item.current_episode.unwrap_or(0)) {
        line.push_str(&format!("  [{current}/{total}]"));
    }
    if let Some(done) = item.completed_at.as_deref().and_then(|s| s.get(..10)) {
        line.push_str(&format!("  ({done})"));
    }
    if let Some(note) = &item.note {
        line.push_str(&format!("  - {note}"));
    }
    line
}

fn print_items(items: &[(usize, &MediaItem)]) {
    if items.is_empty() {
        println!("(none)");
        return;
    }
    for (idx, item) in items {
        println!("{}", format_item(*idx, item));
    }
}

// ── Queries ──

/// `medialog status`; year and month boundaries follow `utc_offset_hours`.
pub async fn status(session: &Session, utc_offset_hours: i8) -> anyhow::Result<()> {
    let now = at_offset(OffsetDateTime::now_utc(), utc_offset_hours)?;
    let state = session.load_state().await.map_err(explain)?;
    let stats = state.stats(now);
    println!("Repository: {}", session.config().repo);
    println!("Done in {}: {}", stats.year, stats.done_this_year);
    println!("Done in {}/{}: {}", stats.year, stats.month, stats.done_this_month);
    println!("Backlog: {}", stats.backlog);
    let shows: usize = medialog_core::Weekday::ALL
        .into_iter()
        .map(|d| state.weekly.day(d).len())
        .sum();
    println!("Weekly shows: {shows}");
    Ok(())
}

/// `medialog list [--status S]`
pub async fn list(session: &Session, status: Option<Status>) -> anyhow::Result<()> {
    let state = session.load_state().await.map_err(explain)?;
    print_items(&state.filter(status));
    Ok(())
}

pub async fn backlog(session: &Session) -> anyhow::Result<()> {
    let state = session.load_state().await.map_err(explain)?;
    print_items(&state.backlog());
    Ok(())
}

pub async fn history(session: &Session, limit: usize) -> anyhow::Result<()> {
    let state = session.load_state().await.map_err(explain)?;
    let items = state.history();
    print_items(&items[..items.len().min(limit)]);
    Ok(())
}

// ── Mutations ──

pub async fn add(session: &Session, title: &str, media_type: MediaType) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    let idx = session
        .apply(|s| s.quick_add(title, media_type, now))
        .await
        .map_err(explain)?;
    println!("Added #{idx}: {title}");
    Ok(())
}

pub async fn cycle(session: &Session, idx: usize) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    let status = session
        .apply(|s| s.cycle_status(idx, now))
        .await
        .map_err(explain)?;
    println!("#{idx} -> {} {status}", status.symbol());
    Ok(())
}

pub async fn progress(session: &Session, idx: usize) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    let p = session
        .apply(|s| s.increment_progress(idx, now))
        .await
        .map_err(explain)?;
    if p.completed {
        println!("#{idx} episode {}/{} (completed)", p.current, p.total);
    } else {
        println!("#{idx} episode {}/{}", p.current, p.total);
    }
    Ok(())
}

pub async fn move_item(session: &Session, idx: usize, direction: Direction) -> anyhow::Result<()> {
    let moved = session
        .apply(|s| s.move_item(idx, direction))
        .await
        .map_err(explain)?;
    if !moved {
        println!("#{idx} is already at the edge of its group");
    }
    Ok(())
}

pub async fn edit(session: &Session, idx: usize, edit: ItemEdit) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();
    session
        .apply(|s| s.edit_item(idx, edit, now))
        .await
        .map_err(explain)?;
    println!("Updated #{idx}");
    Ok(())
}

pub async fn delete(session: &Session, idx: usize) -> anyhow::Result<()> {
    let removed = session
        .apply(|s| s.delete_item(idx))
        .await
        .map_err(explain)?;
    println!("Deleted: {}", removed.title);
    Ok(())
}

pub async fn undo(session: &Session, idx: usize) -> anyhow::Result<()> {
    session
        .apply(|s| s.undo_complete(idx))
        .await
        .map_err(explain)?;
    println!("#{idx} -> {} {}", Status::Want.symbol(), Status::Want);
    Ok(())
}
