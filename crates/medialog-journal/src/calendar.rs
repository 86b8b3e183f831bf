use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use medialog_store::WriteCoordinator;

use crate::error::JournalError;
use crate::log::{find_blank_line, find_line};
use crate::period::PeriodKey;

pub const INDEX_TITLE: &str = "# Radiko 聴取ログ";

const HEADER_ROW: &str = "| 日 | 月 | 火 | 水 | 木 | 金 | 土 |";
const ALIGN_ROW: &str = "|:--:|:--:|:--:|:--:|:--:|:--:|:--:|";

// ── Grid ──

/// A Sunday-first month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarGrid {
    offset: u8,
    days: u8,
}

impl CalendarGrid {
    pub fn new(offset: u8, days: u8) -> Self {
        Self {
            offset: offset % 7,
            days,
        }
    }

    pub fn for_period(period: PeriodKey) -> Self {
        Self::new(period.first_weekday_offset(), period.days_in_month())
    }

    /// Week rows of seven cells; `None` is a blank cell.
    pub fn rows(&self) -> Vec<[Option<u8>; 7]> {
        let mut rows = Vec::new();
        let mut row = [None; 7];
        for d in 1..=self.days {
            let col = (self.offset as usize + d as usize - 1) % 7;
            row[col] = Some(d);
            if (self.offset as usize + d as usize) % 7 == 0 {
                rows.push(row);
                row = [None; 7];
            }
        }
        if row.iter().any(Option::is_some) {
            rows.push(row);
        }
        rows
    }

    /// Markdown table without a trailing line break.
    pub fn render(&self) -> String {
        let mut lines = vec![HEADER_ROW.to_string(), ALIGN_ROW.to_string()];
        for row in self.rows() {
            let mut line = String::from("|");
            for cell in row {
                match cell {
                    Some(d) => line.push_str(&format!(" {d} |")),
                    None => line.push_str("  |"),
                }
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

// ── Annotation ──

/// What happened to the day cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Bare cell turned into a link carrying the source.
    Linked,
    /// Source appended to an existing link.
    Added,
    /// Source already listed; nothing to write.
    AlreadyPresent,
    /// Neither a bare nor a linked cell matched; the index is left stale.
    Unmatched,
}

/// Byte range of the grid section for `period`: from its month header to the
/// next `---` rule or `## ` header.
fn grid_section(content: &str, period: PeriodKey) -> Option<(usize, usize)> {
    let start = find_line(content, &period.calendar_header())?;
    let mut offset = start;
    let mut lines = content[start..].split_inclusive('\n');
    if let Some(first) = lines.next() {
        offset += first.len();
    }
    for line in lines {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == "---" || bare.starts_with("## ") {
            return Some((start, offset));
        }
        offset += line.len();
    }
    Some((start, content.len()))
}

/// Insert a fresh grid for `period` right after the document title.
fn insert_grid(content: &mut String, period: PeriodKey) {
    let block = format!(
        "{}\n\n{}\n\n---\n\n",
        period.calendar_header(),
        CalendarGrid::for_period(period).render()
    );
    let at = match find_blank_line(content, 0) {
        Some(at) => at,
        None => {
            if !content.ends_with('\n') {
                content.push('\n');
            }
            content.push('\n');
            content.len()
        }
    };
    content.insert_str(at, &block);
}

/// Annotate the cell for `day` in `period`'s grid, generating the grid if the
/// document has none. Returns the new content and the outcome.
pub fn annotate(
    existing: Option<&str>,
    period: PeriodKey,
    day: u8,
    source_id: &str,
) -> (String, Annotation) {
    let mut content = match existing {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => format!("{INDEX_TITLE}\n\n"),
    };
    if find_line(&content, &period.calendar_header()).is_none() {
        debug!(period = %period, "generating calendar grid");
        insert_grid(&mut content, period);
    }
    let Some((start, end)) = grid_section(&content, period) else {
        return (content, Annotation::Unmatched);
    };

    let target = format!("{period}.md#{}{day}", period.month());
    let section = &content[start..end];

    let linked = Regex::new(&format!(
        r"\[{day}(?: ([^\]]*))?\]\({}\)",
        regex::escape(&target)
    ));
    if let Ok(linked) = linked {
        if let Some(caps) = linked.captures(section) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let mut ids: Vec<String> = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or("")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if ids.iter().any(|id| id == source_id) {
                return (content, Annotation::AlreadyPresent);
            }
            ids.push(source_id.to_string());
            let cell = format!("[{day} {}]({target})", ids.join(","));
            content.replace_range(start + whole.start..start + whole.end, &cell);
            return (content, Annotation::Added);
        }
    }

    let bare = format!("| {day} |");
    if let Some(rel) = section.find(&bare) {
        let cell = format!("| [{day} {source_id}]({target}) |");
        let at = start + rel;
        content.replace_range(at..at + bare.len(), &cell);
        return (content, Annotation::Linked);
    }

    (content, Annotation::Unmatched)
}

// ── Index document ──

/// Maintains the month calendars in the index document (`logs/README.md`).
pub struct CalendarIndex {
    coordinator: Arc<WriteCoordinator>,
    path: String,
}

impl CalendarIndex {
    pub fn new(coordinator: Arc<WriteCoordinator>, path: impl Into<String>) -> Self {
        Self {
            coordinator,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn update(
        &self,
        period: PeriodKey,
        day: u8,
        source_id: &str,
    ) -> Result<Annotation, JournalError> {
        if day == 0 || day > period.days_in_month() {
            return Err(JournalError::DayOutsidePeriod {
                day: format!("{}/{day}", period.month()),
                period: period.to_string(),
            });
        }
        let existing = self.coordinator.read(&self.path).await?;
        let before = existing.as_ref().map(|d| d.content.as_str());
        let (content, outcome) = annotate(before, period, day, source_id);

        if outcome == Annotation::Unmatched {
            warn!(path = %self.path, period = %period, day, source_id, "no calendar cell matched, index left stale");
        }
        if before == Some(content.as_str()) {
            debug!(path = %self.path, ?outcome, "calendar unchanged, skipping write");
            return Ok(outcome);
        }

        let message = format!("📅 Update calendar: {}/{day} {source_id}", period.month());
        self.coordinator.save(&self.path, &content, &message).await?;
        info!(path = %self.path, period = %period, day, source_id, ?outcome, "calendar updated");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medialog_store::MemoryBackend;

    fn nov_2023() -> PeriodKey {
        PeriodKey::new(2023, 11).unwrap()
    }

    #[test]
    fn grid_offset_three_thirty_days() {
        let grid = CalendarGrid::new(3, 30);
        let rows = grid.rows();
        assert_eq!(rows[0], [None, None, None, Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(rows.len(), 5);
        assert_eq!(
            rows[4],
            [Some(26), Some(27), Some(28), Some(29), Some(30), None, None]
        );
        assert_eq!(CalendarGrid::for_period(nov_2023()), grid);
    }

    #[test]
    fn grid_renders_markdown_table() {
        let rendered = CalendarGrid::new(3, 30).render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], HEADER_ROW);
        assert_eq!(lines[1], ALIGN_ROW);
        assert_eq!(lines[2], "|  |  |  | 1 | 2 | 3 | 4 |");
        assert_eq!(lines[6], "| 26 | 27 | 28 | 29 | 30 |  |  |");
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn month_ending_on_saturday_has_no_extra_row() {
        // 2024-08: starts Thursday (4), 31 days, ends on Saturday.
        let grid = CalendarGrid::new(4, 31);
        assert_eq!(grid.rows().len(), 5);
        assert!(grid.render().ends_with("| 25 | 26 | 27 | 28 | 29 | 30 | 31 |"));
    }

    #[test]
    fn generates_grid_under_title() {
        let (out, outcome) = annotate(None, nov_2023(), 11, "TBS");
        assert_eq!(outcome, Annotation::Linked);
        assert!(out.starts_with("# Radiko 聴取ログ\n\n## 2023年11月\n\n| 日 |"));
        assert!(out.contains("| [11 TBS](2023-11.md#1111) |"));
        assert!(out.ends_with("\n\n---\n\n"));
    }

    #[test]
    fn newer_month_goes_above_older_one() {
        let (oct, _) = annotate(None, PeriodKey::new(2023, 10).unwrap(), 1, "TBS");
        let (both, _) = annotate(Some(&oct), nov_2023(), 1, "TBS");
        assert!(both.find("## 2023年11月").unwrap() < both.find("## 2023年10月").unwrap());
    }

    #[test]
    fn crlf_index_gets_new_month_under_title() {
        let doc = "# Radiko 聴取ログ\r\n\r\n## 2023年10月\r\n\r\n| 1 |\r\n\r\n---\r\n\r\n";
        let (out, outcome) = annotate(Some(doc), nov_2023(), 11, "TBS");
        assert_eq!(outcome, Annotation::Linked);
        assert!(out.starts_with("# Radiko 聴取ログ\r\n\r\n## 2023年11月\n\n"));
        assert!(out.find("## 2023年11月").unwrap() < out.find("## 2023年10月").unwrap());
    }

    #[test]
    fn appends_second_source_once() {
        let (one, _) = annotate(None, nov_2023(), 11, "TBS");
        let (two, outcome) = annotate(Some(&one), nov_2023(), 11, "QRR");
        assert_eq!(outcome, Annotation::Added);
        assert!(two.contains("[11 TBS,QRR](2023-11.md#1111)"));
        let (again, outcome) = annotate(Some(&two), nov_2023(), 11, "QRR");
        assert_eq!(outcome, Annotation::AlreadyPresent);
        assert_eq!(again, two);
    }

    #[test]
    fn source_prefix_is_not_membership() {
        let (one, _) = annotate(None, nov_2023(), 11, "TBSX");
        let (two, outcome) = annotate(Some(&one), nov_2023(), 11, "TBS");
        assert_eq!(outcome, Annotation::Added);
        assert!(two.contains("[11 TBSX,TBS]"));
    }

    #[test]
    fn day_one_does_not_touch_day_eleven() {
        let (one, _) = annotate(None, nov_2023(), 11, "TBS");
        let (two, outcome) = annotate(Some(&one), nov_2023(), 1, "QRR");
        assert_eq!(outcome, Annotation::Linked);
        assert!(two.contains("[11 TBS](2023-11.md#1111)"));
        assert!(two.contains("| [1 QRR](2023-11.md#111) |"));
    }

    #[test]
    fn annotation_stays_inside_its_month() {
        let (oct, _) = annotate(None, PeriodKey::new(2023, 10).unwrap(), 5, "TBS");
        let (both, _) = annotate(Some(&oct), nov_2023(), 20, "TBS");
        let (out, outcome) = annotate(Some(&both), nov_2023(), 5, "QRR");
        assert_eq!(outcome, Annotation::Linked);
        assert!(out.contains("[5 TBS](2023-10.md#105)"));
        assert!(out.contains("[5 QRR](2023-11.md#115)"));
    }

    #[test]
    fn hand_edited_cell_is_unmatched() {
        let doc = "# Radiko 聴取ログ\n\n## 2023年11月\n\n| 日 | 月 |\n| **11** |\n\n---\n\n";
        let (out, outcome) = annotate(Some(doc), nov_2023(), 11, "TBS");
        assert_eq!(outcome, Annotation::Unmatched);
        assert_eq!(out, doc);
    }

    #[tokio::test]
    async fn update_skips_write_when_unchanged() {
        let backend = Arc::new(MemoryBackend::new());
        let index = CalendarIndex::new(
            Arc::new(WriteCoordinator::new(backend.clone())),
            "logs/README.md",
        );
        assert_eq!(index.update(nov_2023(), 11, "TBS").await.unwrap(), Annotation::Linked);
        assert_eq!(
            index.update(nov_2023(), 11, "TBS").await.unwrap(),
            Annotation::AlreadyPresent
        );
        assert_eq!(backend.put_calls(), 1);
        assert!(backend
            .content("logs/README.md")
            .unwrap()
            .contains("[11 TBS](2023-11.md#1111)"));
    }

    #[tokio::test]
    async fn update_rejects_day_out_of_range() {
        let backend = Arc::new(MemoryBackend::new());
        let index = CalendarIndex::new(Arc::new(WriteCoordinator::new(backend)), "logs/README.md");
        assert!(index.update(nov_2023(), 31, "TBS").await.is_err());
    }
}
