use std::fmt;
use std::str::FromStr;

use time::{Date, Month};

use crate::error::JournalError;

/// A calendar month, rendered `YYYY-MM`. Names the log document and the
/// calendar grid for that month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodKey {
    year: i32,
    month: Month,
}

impl PeriodKey {
    pub fn new(year: i32, month: u8) -> Result<Self, JournalError> {
        let month = Month::try_from(month)
            .map_err(|_| JournalError::InvalidPeriod(format!("{year}-{month}")))?;
        if !(1..=9999).contains(&year) {
            return Err(JournalError::InvalidPeriod(format!("{year}-{}", month as u8)));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month as u8
    }

    /// `# 2024年2月`, the first line of a log document.
    pub fn log_title(&self) -> String {
        format!("# {}年{}月", self.year, self.month())
    }

    /// `## 2024年2月`, the section header of a calendar grid.
    pub fn calendar_header(&self) -> String {
        format!("## {}年{}月", self.year, self.month())
    }

    /// Column of day 1, Sunday = 0.
    pub fn first_weekday_offset(&self) -> u8 {
        Date::from_calendar_date(self.year, self.month, 1)
            .map(|d| d.weekday().number_days_from_sunday())
            .unwrap_or(0)
    }

    pub fn days_in_month(&self) -> u8 {
        self.month.length(self.year)
    }

    pub fn day(&self, day: u8) -> Result<DayKey, JournalError> {
        if day == 0 || day > self.days_in_month() {
            return Err(JournalError::DayOutsidePeriod {
                day: format!("{}/{day}", self.month()),
                period: self.to_string(),
            });
        }
        Ok(DayKey {
            month: self.month(),
            day,
        })
    }

    /// Does `day` belong to this period?
    pub fn contains(&self, day: DayKey) -> bool {
        day.month == self.month() && day.day >= 1 && day.day <= self.days_in_month()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month())
    }
}

impl FromStr for PeriodKey {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || JournalError::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

/// A day within a month, rendered `M/D` without padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayKey {
    month: u8,
    day: u8,
}

impl DayKey {
    pub fn of(date: Date) -> Self {
        Self {
            month: date.month() as u8,
            day: date.day(),
        }
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// `## 2/11`, the day-section header inside a log document.
    pub fn header(&self) -> String {
        format!("## {}/{}", self.month, self.day)
    }

    /// Fragment the rendered markdown gives the day header (`211` for `## 2/11`).
    pub fn anchor(&self) -> String {
        format!("{}{}", self.month, self.day)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.day)
    }
}

impl FromStr for DayKey {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || JournalError::InvalidDay(s.to_string());
        let (month, day) = s.trim().split_once('/').ok_or_else(invalid)?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let day: u8 = day.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }
        Ok(Self { month, day })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn period_round_trips_through_display() {
        let p: PeriodKey = "2024-02".parse().unwrap();
        assert_eq!(p.year(), 2024);
        assert_eq!(p.month(), 2);
        assert_eq!(p.to_string(), "2024-02");
        assert_eq!(p.log_title(), "# 2024年2月");
        assert_eq!(p.calendar_header(), "## 2024年2月");
    }

    #[test]
    fn period_rejects_garbage() {
        assert!("2024-13".parse::<PeriodKey>().is_err());
        assert!("2024".parse::<PeriodKey>().is_err());
        assert!("24-02".parse::<PeriodKey>().is_err());
        assert!("2024-002".parse::<PeriodKey>().is_err());
    }

    #[test]
    fn grid_geometry() {
        // 2023-11-01 was a Wednesday.
        let p = PeriodKey::new(2023, 11).unwrap();
        assert_eq!(p.first_weekday_offset(), 3);
        assert_eq!(p.days_in_month(), 30);
        assert_eq!(PeriodKey::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(PeriodKey::new(2024, 9).unwrap().first_weekday_offset(), 0);
    }

    #[test]
    fn day_headers_and_anchors() {
        let d = DayKey::of(date!(2024 - 02 - 11));
        assert_eq!(d.header(), "## 2/11");
        assert_eq!(d.anchor(), "211");
        assert_eq!("2/11".parse::<DayKey>().unwrap(), d);
        assert!("2/32".parse::<DayKey>().is_err());
    }

    #[test]
    fn day_must_fall_in_period() {
        let p = PeriodKey::new(2024, 2).unwrap();
        assert!(p.day(29).is_ok());
        assert!(p.day(30).is_err());
        assert!(p.contains("2/11".parse().unwrap()));
        assert!(!p.contains("3/11".parse().unwrap()));
        assert!(!p.contains("2/30".parse().unwrap()));
    }
}
