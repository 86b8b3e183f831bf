use std::sync::Arc;

use tracing::{debug, info};

use medialog_store::WriteCoordinator;

use crate::error::JournalError;
use crate::period::{DayKey, PeriodKey};

/// Byte offset of the first line equal to `line` (ignoring the line break).
pub(crate) fn find_line(content: &str, line: &str) -> Option<usize> {
    let mut offset = 0;
    for l in content.split_inclusive('\n') {
        if l.trim_end_matches(['\n', '\r']) == line {
            return Some(offset);
        }
        offset += l.len();
    }
    None
}

/// Byte offset just past the first blank line below the line starting at
/// `from`. Lines ending in `\r\n` count as blank when nothing precedes the break.
pub(crate) fn find_blank_line(content: &str, from: usize) -> Option<usize> {
    let mut lines = content[from..].split_inclusive('\n');
    let mut offset = from + lines.next()?.len();
    for l in lines {
        offset += l.len();
        if l.ends_with('\n') && l.trim_end_matches(['\n', '\r']).is_empty() {
            return Some(offset);
        }
    }
    None
}

/// Insert `entry` at the top of the day section, creating the document and
/// the section as needed. Entries within a day end up newest first. The
/// entry is closed with a blank line if it does not already end in one.
pub fn splice_entry(existing: Option<&str>, period: PeriodKey, day: DayKey, entry: &str) -> String {
    let block = if entry.ends_with("\n\n") {
        entry.to_string()
    } else {
        format!("{}\n\n", entry.trim_end_matches(['\n', '\r']))
    };

    let mut content = match existing {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => format!("{}\n\n", period.log_title()),
    };

    let header = day.header();
    let header_at = match find_line(&content, &header) {
        Some(at) => at,
        None => {
            if !content.ends_with('\n') {
                content.push('\n');
            }
            let at = content.len();
            content.push_str(&header);
            content.push_str("\n\n");
            at
        }
    };

    let insert_at = match find_blank_line(&content, header_at) {
        Some(at) => at,
        None => {
            // Header is the last line with no blank line after it.
            if !content.ends_with('\n') {
                content.push('\n');
            }
            content.push('\n');
            content.len()
        }
    };

    content.insert_str(insert_at, &block);
    content
}

/// Appends entries to the per-period log documents (`{logs_dir}/YYYY-MM.md`).
pub struct LogAppender {
    coordinator: Arc<WriteCoordinator>,
    logs_dir: String,
}

impl LogAppender {
    pub fn new(coordinator: Arc<WriteCoordinator>, logs_dir: impl Into<String>) -> Self {
        Self {
            coordinator,
            logs_dir: logs_dir.into(),
        }
    }

    pub fn path(&self, period: PeriodKey) -> String {
        format!("{}/{period}.md", self.logs_dir.trim_end_matches('/'))
    }

    pub async fn append_entry(
        &self,
        period: PeriodKey,
        day: DayKey,
        entry: &str,
    ) -> Result<String, JournalError> {
        let message = format!("📝 Update log: {day}");
        self.append_entry_with_message(period, day, entry, &message)
            .await
    }

    pub async fn append_entry_with_message(
        &self,
        period: PeriodKey,
        day: DayKey,
        entry: &str,
        message: &str,
    ) -> Result<String, JournalError> {
        if !period.contains(day) {
            return Err(JournalError::DayOutsidePeriod {
                day: day.to_string(),
                period: period.to_string(),
            });
        }
        let path = self.path(period);
        let existing = self.coordinator.read(&path).await?;
        if existing.is_none() {
            debug!(path = %path, "log document absent, synthesizing");
        }
        let content = splice_entry(existing.as_ref().map(|d| d.content.as_str()), period, day, entry);
        let version = self.coordinator.save(&path, &content, message).await?;
        info!(path = %path, day = %day, "log entry appended");
        Ok(version)
    }
}
