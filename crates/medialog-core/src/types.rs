use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit `null` the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of media an item refers to. Unknown kinds written by other clients
/// are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    Radio,
    Tv,
    Movie,
    Streaming,
    Anime,
    Drama,
    Game,
    Book,
    Manga,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Radio => "radio",
            MediaType::Tv => "tv",
            MediaType::Movie => "movie",
            MediaType::Streaming => "streaming",
            MediaType::Anime => "anime",
            MediaType::Drama => "drama",
            MediaType::Game => "game",
            MediaType::Book => "book",
            MediaType::Manga => "manga",
            MediaType::Other(s) => s,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MediaType::Radio => "📻",
            MediaType::Tv | MediaType::Drama => "📺",
            MediaType::Movie => "🎬",
            MediaType::Streaming => "🎧",
            MediaType::Anime => "🎌",
            MediaType::Game => "🎮",
            MediaType::Book => "📖",
            MediaType::Manga => "📚",
            MediaType::Other(_) => "•",
        }
    }

    /// Serial media that track episode progress.
    pub fn is_episodic(&self) -> bool {
        matches!(self, MediaType::Anime | MediaType::Drama | MediaType::Tv)
    }
}

impl From<String> for MediaType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "radio" => MediaType::Radio,
            "tv" => MediaType::Tv,
            "movie" => MediaType::Movie,
            "streaming" => MediaType::Streaming,
            "anime" => MediaType::Anime,
            "drama" => MediaType::Drama,
            "game" => MediaType::Game,
            "book" => MediaType::Book,
            "manga" => MediaType::Manga,
            _ => MediaType::Other(s),
        }
    }
}

impl From<MediaType> for String {
    fn from(t: MediaType) -> Self {
        t.as_str().to_string()
    }
}

impl std::str::FromStr for MediaType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MediaType::from(s.to_string()))
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backlog status of a watchlist item. Absent, empty or unknown means `want`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Want,
    Watching,
    Done,
    Hold,
}

impl Status {
    pub const CYCLE: [Status; 4] = [Status::Want, Status::Watching, Status::Done, Status::Hold];

    /// Next status in the want -> watching -> done -> hold -> want cycle.
    pub fn next(self) -> Status {
        let pos = Self::CYCLE.iter().position(|s| *s == self).unwrap_or(0);
        Self::CYCLE[(pos + 1) % Self::CYCLE.len()]
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Status::Want => "☆",
            Status::Watching => "👀",
            Status::Done => "✓",
            Status::Hold => "⏸",
        }
    }

    pub fn is_backlog(self) -> bool {
        matches!(self, Status::Want | Status::Watching)
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Want => "want",
            Status::Watching => "watching",
            Status::Done => "done",
            Status::Hold => "hold",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "want" => Ok(Status::Want),
            "watching" => Ok(Status::Watching),
            "done" => Ok(Status::Done),
            "hold" => Ok(Status::Hold),
            other => Err(format!(
                "unknown status '{other}' (expected want, watching, done or hold)"
            )),
        }
    }
}

/// One watched episode of a serial item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub episode: u32,
    pub watched_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A watchlist entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_history: Option<Vec<EpisodeRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Keys written by other clients, preserved on save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MediaItem {
    pub fn new(title: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            title: title.into(),
            media_type: Some(media_type),
            ..Self::default()
        }
    }

    /// Category type used for grouping; items without a type group as movies.
    pub fn category(&self) -> MediaType {
        self.media_type.clone().unwrap_or(MediaType::Movie)
    }
}

/// A recurring show on the weekly schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledShow {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Weekday keys of the weekly schedule, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    pub fn from_time(day: time::Weekday) -> Self {
        match day {
            time::Weekday::Monday => Weekday::Mon,
            time::Weekday::Tuesday => Weekday::Tue,
            time::Weekday::Wednesday => Weekday::Wed,
            time::Weekday::Thursday => Weekday::Thu,
            time::Weekday::Friday => Weekday::Fri,
            time::Weekday::Saturday => Weekday::Sat,
            time::Weekday::Sunday => Weekday::Sun,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|d| d.key() == s)
            .ok_or_else(|| format!("unknown weekday '{s}' (expected mon..sun)"))
    }
}

/// The seven weekday lists. Every key is always present after load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub mon: Vec<ScheduledShow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tue: Vec<ScheduledShow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wed: Vec<ScheduledShow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thu: Vec<ScheduledShow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fri: Vec<ScheduledShow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sat: Vec<ScheduledShow>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sun: Vec<ScheduledShow>,
}

impl WeeklySchedule {
    pub fn day(&self, day: Weekday) -> &Vec<ScheduledShow> {
        match day {
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
            Weekday::Sun => &self.sun,
        }
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut Vec<ScheduledShow> {
        match day {
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
            Weekday::Sun => &mut self.sun,
        }
    }
}

/// The shared application-state document (`schedule.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub watchlist: Vec<MediaItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weekly: WeeklySchedule,
    /// Challenge entries are owned by another client and kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenges: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
