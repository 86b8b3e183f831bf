//! Domain commands over [`ScheduleState`].
//!
//! Every command mutates the in-memory state synchronously. Persisting the
//! result is the caller's job and must follow immediately.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::types::{EpisodeRecord, MediaItem, MediaType, ScheduleState, ScheduledShow, Status, Weekday};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("no watchlist item at index {0}")]
    NoItem(usize),
    #[error("no show at {day} #{index}")]
    NoShow { day: Weekday, index: usize },
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("'{0}' has no episode count")]
    NoEpisodes(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown direction '{other}' (expected up or down)")),
        }
    }
}

/// Episode progress after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
    pub completed: bool,
}

/// Field changes for [`ScheduleState::edit_item`]. `None` leaves a field as is;
/// an empty string for `note`/`image` or `Some(0)` for `episodes` clears it.
#[derive(Debug, Clone, Default)]
pub struct ItemEdit {
    pub title: Option<String>,
    pub media_type: Option<MediaType>,
    pub status: Option<Status>,
    pub note: Option<String>,
    pub image: Option<String>,
    pub episodes: Option<u32>,
    pub current_episode: Option<u32>,
    pub completed_on: Option<Date>,
}

/// Counters shown on the status screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub year: i32,
    pub month: u8,
    pub done_this_year: usize,
    pub done_this_month: usize,
    pub backlog: usize,
}

/// Millisecond ISO-8601 timestamp in UTC, the format every client writes.
pub fn iso_timestamp(at: OffsetDateTime) -> String {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_default()
}

/// Parse a stored timestamp. Accepts RFC 3339 and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts);
    }
    let date = Date::parse(s.get(..10)?, format_description!("[year]-[month]-[day]")).ok()?;
    Some(date.midnight().assume_utc())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn mark_done(item: &mut MediaItem, now: OffsetDateTime) {
    item.status = Status::Done;
    if item.completed_at.is_none() {
        item.completed_at = Some(iso_timestamp(now));
    }
}

impl ScheduleState {
    fn item_mut(&mut self, idx: usize) -> Result<&mut MediaItem, CommandError> {
        self.watchlist.get_mut(idx).ok_or(CommandError::NoItem(idx))
    }

    fn show_mut(&mut self, day: Weekday, idx: usize) -> Result<&mut ScheduledShow, CommandError> {
        self.weekly
            .day_mut(day)
            .get_mut(idx)
            .ok_or(CommandError::NoShow { day, index: idx })
    }

    /// Append a new `want` item. Returns its index.
    pub fn quick_add(
        &mut self,
        title: &str,
        media_type: MediaType,
        now: OffsetDateTime,
    ) -> Result<usize, CommandError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CommandError::EmptyTitle);
        }
        let mut item = MediaItem::new(title, media_type);
        item.status = Status::Want;
        item.added_at = Some(iso_timestamp(now));
        self.watchlist.push(item);
        Ok(self.watchlist.len() - 1)
    }

    /// Advance an item through want -> watching -> done -> hold -> want.
    /// Entering `done` stamps `completedAt` if unset; leaving it clears the stamp.
    pub fn cycle_status(&mut self, idx: usize, now: OffsetDateTime) -> Result<Status, CommandError> {
        let item = self.item_mut(idx)?;
        let next = item.status.next();
        if next == Status::Done {
            mark_done(item, now);
        } else {
            item.status = next;
            item.completed_at = None;
        }
        Ok(next)
    }

    /// Count one more watched episode. Reaching the last episode completes the item.
    pub fn increment_progress(
        &mut self,
        idx: usize,
        now: OffsetDateTime,
    ) -> Result<Progress, CommandError> {
        let item = self.item_mut(idx)?;
        let total = match item.episodes {
            Some(n) if n > 0 => n,
            _ => return Err(CommandError::NoEpisodes(item.title.clone())),
        };
        let watched = item.current_episode.unwrap_or(0);
        if watched >= total {
            // Already capped; nothing to record.
            return Ok(Progress {
                current: total,
                total,
                completed: true,
            });
        }
        let current = watched + 1;
        item.current_episode = Some(current);
        item.episode_history
            .get_or_insert_with(Vec::new)
            .push(EpisodeRecord {
                episode: current,
                watched_at: iso_timestamp(now),
                note: None,
            });
        let completed = current >= total;
        if completed {
            item.status = Status::Done;
            item.completed_at = Some(iso_timestamp(now));
        }
        Ok(Progress {
            current,
            total,
            completed,
        })
    }

    /// Swap an item with its neighbor inside the same backlog category.
    /// Watching items form one category; other statuses group by type too.
    /// Returns `false` when the item is already at that edge.
    pub fn move_item(&mut self, idx: usize, direction: Direction) -> Result<bool, CommandError> {
        let item = self.watchlist.get(idx).ok_or(CommandError::NoItem(idx))?;
        let status = item.status;
        let category = item.category();
        let same: Vec<usize> = self
            .watchlist
            .iter()
            .enumerate()
            .filter(|(_, it)| {
                it.status == status && (status == Status::Watching || it.category() == category)
            })
            .map(|(i, _)| i)
            .collect();
        let Some(pos) = same.iter().position(|&i| i == idx) else {
            return Ok(false);
        };
        let target = match direction {
            Direction::Up if pos > 0 => same[pos - 1],
            Direction::Down if pos + 1 < same.len() => same[pos + 1],
            _ => return Ok(false),
        };
        self.watchlist.swap(idx, target);
        Ok(true)
    }

    pub fn delete_item(&mut self, idx: usize) -> Result<MediaItem, CommandError> {
        if idx >= self.watchlist.len() {
            return Err(CommandError::NoItem(idx));
        }
        Ok(self.watchlist.remove(idx))
    }

    /// Return a completed item to the want list.
    pub fn undo_complete(&mut self, idx: usize) -> Result<(), CommandError> {
        let item = self.item_mut(idx)?;
        item.status = Status::Want;
        item.completed_at = None;
        Ok(())
    }

    pub fn edit_item(
        &mut self,
        idx: usize,
        edit: ItemEdit,
        now: OffsetDateTime,
    ) -> Result<(), CommandError> {
        let item = self.item_mut(idx)?;
        if let Some(title) = edit.title {
            item.title = non_empty(title).ok_or(CommandError::EmptyTitle)?;
        }
        if let Some(t) = edit.media_type {
            item.media_type = Some(t);
        }
        if let Some(note) = edit.note {
            item.note = non_empty(note);
        }
        if let Some(image) = edit.image {
            item.image = non_empty(image);
        }
        match edit.episodes {
            Some(0) => {
                item.episodes = None;
                item.current_episode = None;
            }
            Some(total) => {
                item.episodes = Some(total);
                let current = edit.current_episode.or(item.current_episode).unwrap_or(0);
                item.current_episode = Some(current.min(total));
            }
            None => {
                if let (Some(current), Some(total)) = (edit.current_episode, item.episodes) {
                    item.current_episode = Some(current.min(total));
                }
            }
        }
        let status = edit.status.unwrap_or(item.status);
        if status == Status::Done {
            if let Some(date) = edit.completed_on {
                item.completed_at = Some(iso_timestamp(date.midnight().assume_utc()));
            }
            mark_done(item, now);
        } else {
            item.status = status;
            item.completed_at = None;
        }
        Ok(())
    }

    pub fn add_show(
        &mut self,
        day: Weekday,
        name: &str,
        media_type: MediaType,
    ) -> Result<usize, CommandError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandError::EmptyTitle);
        }
        let shows = self.weekly.day_mut(day);
        shows.push(ScheduledShow {
            name: name.to_string(),
            media_type: Some(media_type),
            ..ScheduledShow::default()
        });
        Ok(shows.len() - 1)
    }

    pub fn edit_show(
        &mut self,
        day: Weekday,
        idx: usize,
        name: Option<String>,
        media_type: Option<MediaType>,
        image: Option<String>,
    ) -> Result<(), CommandError> {
        let show = self.show_mut(day, idx)?;
        if let Some(name) = name {
            show.name = non_empty(name).ok_or(CommandError::EmptyTitle)?;
        }
        if let Some(t) = media_type {
            show.media_type = Some(t);
        }
        if let Some(image) = image {
            show.image = non_empty(image);
        }
        Ok(())
    }

    pub fn remove_show(&mut self, day: Weekday, idx: usize) -> Result<ScheduledShow, CommandError> {
        let shows = self.weekly.day_mut(day);
        if idx >= shows.len() {
            return Err(CommandError::NoShow { day, index: idx });
        }
        Ok(shows.remove(idx))
    }

    pub fn move_show(
        &mut self,
        day: Weekday,
        idx: usize,
        direction: Direction,
    ) -> Result<bool, CommandError> {
        let shows = self.weekly.day_mut(day);
        if idx >= shows.len() {
            return Err(CommandError::NoShow { day, index: idx });
        }
        match direction {
            Direction::Up if idx > 0 => shows.swap(idx - 1, idx),
            Direction::Down if idx + 1 < shows.len() => shows.swap(idx, idx + 1),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Log one airing of a scheduled show as a completed watchlist item.
    /// The weekly schedule itself is left untouched.
    pub fn record_show(
        &mut self,
        day: Weekday,
        idx: usize,
        now: OffsetDateTime,
    ) -> Result<usize, CommandError> {
        let show = self
            .weekly
            .day(day)
            .get(idx)
            .ok_or(CommandError::NoShow { day, index: idx })?;
        let mut item = MediaItem::new(
            show.name.clone(),
            show.media_type.clone().unwrap_or(MediaType::Radio),
        );
        item.image = show.image.clone();
        item.status = Status::Done;
        item.completed_at = Some(iso_timestamp(now));
        self.watchlist.push(item);
        Ok(self.watchlist.len() - 1)
    }

    /// Items still to watch, with their watchlist indices.
    pub fn backlog(&self) -> Vec<(usize, &MediaItem)> {
        self.watchlist
            .iter()
            .enumerate()
            .filter(|(_, it)| it.status.is_backlog())
            .collect()
    }

    /// Completed items, most recently completed first.
    pub fn history(&self) -> Vec<(usize, &MediaItem)> {
        let mut done: Vec<(usize, &MediaItem, OffsetDateTime)> = self
            .watchlist
            .iter()
            .enumerate()
            .filter(|(_, it)| it.status == Status::Done)
            .filter_map(|(i, it)| {
                let ts = parse_timestamp(it.completed_at.as_deref()?)?;
                Some((i, it, ts))
            })
            .collect();
        done.sort_by(|a, b| b.2.cmp(&a.2));
        done.into_iter().map(|(i, it, _)| (i, it)).collect()
    }

    pub fn filter(&self, status: Option<Status>) -> Vec<(usize, &MediaItem)> {
        self.watchlist
            .iter()
            .enumerate()
            .filter(|(_, it)| status.map_or(true, |s| it.status == s))
            .collect()
    }

    /// Completion counters for the year and month of `now`, in `now`'s offset.
    pub fn stats(&self, now: OffsetDateTime) -> Stats {
        let offset = now.offset();
        let completed: Vec<OffsetDateTime> = self
            .watchlist
            .iter()
            .filter(|it| it.status == Status::Done)
            .filter_map(|it| parse_timestamp(it.completed_at.as_deref()?))
            .map(|ts| ts.to_offset(offset))
            .filter(|ts| ts.year() == now.year())
            .collect();
        Stats {
            year: now.year(),
            month: u8::from(now.month()),
            done_this_year: completed.len(),
            done_this_month: completed
                .iter()
                .filter(|ts| ts.month() == now.month())
                .count(),
            backlog: self.watchlist.iter().filter(|it| it.status.is_backlog()).count(),
        }
    }
}
