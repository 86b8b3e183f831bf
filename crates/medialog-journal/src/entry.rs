use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::error::JournalError;
use crate::period::{DayKey, PeriodKey};

pub const UNKNOWN_PROGRAM: &str = "番組名不明";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// RFC 3339 timestamp of when the song aired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub title: String,
    pub artist: String,
}

/// One listening session of a radio program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningEntry {
    pub station_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_title: Option<String>,
    /// Broadcast start, `YYYYMMDDhhmmss` in station local time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_time: Option<String>,
    /// RFC 3339.
    pub saved_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default)]
    pub songs: Vec<Song>,
    pub url: String,
}

fn hh_mm(hour: u8, minute: u8) -> String {
    format!("{hour:02}:{minute:02}")
}

fn parse_rfc3339(s: &str) -> Result<OffsetDateTime, JournalError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|_| JournalError::InvalidTimestamp(s.to_string()))
}

impl ListeningEntry {
    fn broadcast_start(&self) -> Result<Option<PrimitiveDateTime>, JournalError> {
        let Some(raw) = self.program_time.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let fmt = format_description!("[year][month][day][hour][minute][second]");
        PrimitiveDateTime::parse(raw, fmt)
            .map(Some)
            .map_err(|_| JournalError::InvalidTimestamp(raw.to_string()))
    }

    /// The day the entry is filed under: broadcast date, else save date.
    pub fn date(&self) -> Result<Date, JournalError> {
        match self.broadcast_start()? {
            Some(start) => Ok(start.date()),
            None => Ok(parse_rfc3339(&self.saved_at)?.date()),
        }
    }

    pub fn period(&self) -> Result<PeriodKey, JournalError> {
        Ok(PeriodKey::of(self.date()?))
    }

    pub fn day(&self) -> Result<DayKey, JournalError> {
        Ok(DayKey::of(self.date()?))
    }

    /// `HH:MM` of the broadcast start, else of the save time.
    pub fn clock(&self) -> Result<String, JournalError> {
        match self.broadcast_start()? {
            Some(start) => Ok(hh_mm(start.hour(), start.minute())),
            None => {
                let saved = parse_rfc3339(&self.saved_at)?;
                Ok(hh_mm(saved.hour(), saved.minute()))
            }
        }
    }

    fn title(&self) -> Option<&str> {
        self.program_title.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Markdown block for the period log. Ends with a `---` rule and a blank line.
    pub fn render(&self) -> Result<String, JournalError> {
        let mut out = format!(
            "### {} - {} - {}\n\n",
            self.clock()?,
            self.station_id,
            self.title().unwrap_or(UNKNOWN_PROGRAM)
        );
        if let Some(memo) = self.memo.as_deref().filter(|m| !m.trim().is_empty()) {
            out.push_str(&format!("> {memo}\n\n"));
        }
        if !self.songs.is_empty() {
            out.push_str("**曲リスト:**\n");
            for song in &self.songs {
                let at = song
                    .time
                    .as_deref()
                    .and_then(|t| parse_rfc3339(t).ok())
                    .map(|t| hh_mm(t.hour(), t.minute()))
                    .unwrap_or_default();
                out.push_str(&format!("- {at} {} / {}\n", song.title, song.artist));
            }
            out.push('\n');
        }
        out.push_str(&format!("[番組リンク]({})\n\n---\n\n", self.url));
        Ok(out)
    }

    pub fn commit_message(&self) -> Result<String, JournalError> {
        let label = match self.title() {
            Some(title) => title.to_string(),
            None => self.clock()?,
        };
        Ok(format!("📻 {} - {label}", self.station_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ListeningEntry {
        ListeningEntry {
            station_id: "TBS".into(),
            program_title: Some("JUNK".into()),
            program_time: Some("20240211010000".into()),
            saved_at: "2024-02-12T03:15:00+09:00".into(),
            memo: None,
            songs: Vec::new(),
            url: "https://radiko.jp/#!/ts/TBS/20240211010000".into(),
        }
    }

    #[test]
    fn files_under_broadcast_date() {
        let e = entry();
        assert_eq!(e.period().unwrap().to_string(), "2024-02");
        assert_eq!(e.day().unwrap().to_string(), "2/11");
        assert_eq!(e.clock().unwrap(), "01:00");
    }

    #[test]
    fn falls_back_to_save_time() {
        let mut e = entry();
        e.program_time = None;
        assert_eq!(e.day().unwrap().to_string(), "2/12");
        assert_eq!(e.clock().unwrap(), "03:15");
    }

    #[test]
    fn renders_full_block() {
        let mut e = entry();
        e.memo = Some("great guest".into());
        e.songs = vec![
            Song {
                time: Some("2024-02-11T01:20:00+09:00".into()),
                title: "Song A".into(),
                artist: "Band".into(),
            },
            Song {
                time: None,
                title: "Song B".into(),
                artist: "Solo".into(),
            },
        ];
        assert_eq!(
            e.render().unwrap(),
            "### 01:00 - TBS - JUNK\n\n\
             > great guest\n\n\
             **曲リスト:**\n\
             - 01:20 Song A / Band\n\
             -  Song B / Solo\n\
             \n\
             [番組リンク](https://radiko.jp/#!/ts/TBS/20240211010000)\n\n---\n\n"
        );
    }

    #[test]
    fn untitled_program() {
        let mut e = entry();
        e.program_title = None;
        assert!(e.render().unwrap().starts_with("### 01:00 - TBS - 番組名不明\n\n[番組リンク]"));
        assert_eq!(e.commit_message().unwrap(), "📻 TBS - 01:00");
        assert_eq!(entry().commit_message().unwrap(), "📻 TBS - JUNK");
    }

    #[test]
    fn bad_program_time_is_an_error() {
        let mut e = entry();
        e.program_time = Some("2024-02-11".into());
        assert!(matches!(e.date(), Err(JournalError::InvalidTimestamp(_))));
    }

    #[test]
    fn deserializes_camel_case() {
        let e: ListeningEntry = serde_json::from_str(
            r#"{"stationId":"QRR","savedAt":"2024-02-11T10:00:00Z","url":"u"}"#,
        )
        .unwrap();
        assert_eq!(e.station_id, "QRR");
        assert!(e.songs.is_empty());
    }
}
