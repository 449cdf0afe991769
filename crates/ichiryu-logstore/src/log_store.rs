use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};

/// Returns the log file name for `channel` on `date`, without the leading `#`.
pub fn log_file_name(date: NaiveDate, channel: &str) -> String {
    format!(
        "{}-{}.log",
        date.format("%Y-%m-%d"),
        channel.strip_prefix('#').unwrap_or(channel)
    )
}

struct OpenLogFile {
    date: NaiveDate,
    file_name: String,
    path: PathBuf,
    file: File,
}

/// Rotating per-channel log writer.
pub struct LogStore {
    root: PathBuf,
    link_base: String,
    open_files: HashMap<String, OpenLogFile>,
}

impl LogStore {
    pub fn new(root: impl Into<PathBuf>, link_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            link_base: link_base.into(),
            open_files: HashMap::new(),
        }
    }

    /// Appends `[HH:MM:SS] {line}` to today's file for `channel`.
    pub fn append(&mut self, channel: &str, line: &str) -> Result<()> {
        self.append_at(channel, line, Local::now().naive_local())
    }

    /// Appends as if the wall clock read `at`, rotating first when `at`
    /// falls on a different date than the open file.
    pub fn append_at(&mut self, channel: &str, line: &str, at: NaiveDateTime) -> Result<()> {
        let date = at.date();
        let needs_rotation = self
            .open_files
            .get(channel)
            .map_or(true, |open| open.date != date);
        if needs_rotation {
            let opened = self.open_file(channel, date)?;
            if let Some(previous) = self.open_files.insert(channel.to_string(), opened) {
                tracing::debug!(
                    channel,
                    closed = %previous.path.display(),
                    "rotated channel log"
                );
            }
        }

        let open = self
            .open_files
            .get_mut(channel)
            .context("channel log missing after rotation")?;
        writeln!(open.file, "[{}] {line}", at.format("%H:%M:%S"))
            .with_context(|| format!("failed to append {}", open.path.display()))?;
        open.file
            .flush()
            .with_context(|| format!("failed to flush {}", open.path.display()))?;
        Ok(())
    }

    /// Public link to the file `channel` is currently writing, or to today's
    /// file when none is open yet.
    pub fn current_log_link(&self, channel: &str) -> String {
        let file_name = match self.open_files.get(channel) {
            Some(open) => open.file_name.clone(),
            None => log_file_name(Local::now().date_naive(), channel),
        };
        format!("{}{}", self.link_base, file_name)
    }

    pub fn current_log_path(&self, channel: &str) -> Option<&Path> {
        self.open_files.get(channel).map(|open| open.path.as_path())
    }

    /// Closes the open file for `channel`; the next append reopens it.
    pub fn close(&mut self, channel: &str) {
        self.open_files.remove(channel);
    }

    fn open_file(&self, channel: &str, date: NaiveDate) -> Result<OpenLogFile> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let file_name = log_file_name(date, channel);
        let path = self.root.join(&file_name);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(OpenLogFile {
            date,
            file_name,
            path,
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{log_file_name, LogStore};

    fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, min, sec))
            .expect("valid timestamp")
    }

    fn read(path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn unit_log_file_name_strips_channel_hash() {
        let date = NaiveDate::from_ymd_opt(2011, 3, 9).expect("date");
        assert_eq!(log_file_name(date, "#wonted"), "2011-03-09-wonted.log");
        assert_eq!(log_file_name(date, "wonted"), "2011-03-09-wonted.log");
    }

    #[test]
    fn functional_append_writes_timestamped_lines_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = LogStore::new(temp.path().join("logs"), "http://logs.example/");
        store
            .append_at("#wonted", "<alice> hi", at(2011, 3, 9, 8, 5, 1))
            .expect("first append");
        store
            .append_at("#wonted", "<bob> yo", at(2011, 3, 9, 8, 5, 2))
            .expect("second append");

        let contents = read(&temp.path().join("logs").join("2011-03-09-wonted.log"));
        assert_eq!(contents, "[08:05:01] <alice> hi\n[08:05:02] <bob> yo\n");
    }

    #[test]
    fn functional_append_rotates_when_date_changes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = LogStore::new(temp.path(), "http://logs.example/");
        store
            .append_at("#wonted", "late night", at(2011, 3, 9, 23, 59, 59))
            .expect("append day one");
        store
            .append_at("#wonted", "early morning", at(2011, 3, 10, 0, 0, 1))
            .expect("append day two");

        let day_one = read(&temp.path().join("2011-03-09-wonted.log"));
        let day_two = read(&temp.path().join("2011-03-10-wonted.log"));
        assert_eq!(day_one, "[23:59:59] late night\n");
        assert_eq!(day_two, "[00:00:01] early morning\n");
    }

    #[test]
    fn functional_current_log_link_tracks_rotation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = LogStore::new(temp.path(), "http://logs.example/");
        store
            .append_at("#wonted", "one", at(2011, 3, 9, 23, 59, 59))
            .expect("append");
        assert_eq!(
            store.current_log_link("#wonted"),
            "http://logs.example/2011-03-09-wonted.log"
        );
        store
            .append_at("#wonted", "two", at(2011, 3, 10, 0, 0, 0))
            .expect("append");
        assert_eq!(
            store.current_log_link("#wonted"),
            "http://logs.example/2011-03-10-wonted.log"
        );
    }

    #[test]
    fn functional_close_reopens_existing_file_in_append_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = LogStore::new(temp.path(), "http://logs.example/");
        store
            .append_at("#wonted", "[connected]", at(2011, 3, 9, 10, 0, 0))
            .expect("append");
        store.close("#wonted");
        assert!(store.current_log_path("#wonted").is_none());
        store
            .append_at("#wonted", "[connected again]", at(2011, 3, 9, 10, 0, 5))
            .expect("append after close");

        let contents = read(&temp.path().join("2011-03-09-wonted.log"));
        assert_eq!(contents, "[10:00:00] [connected]\n[10:00:05] [connected again]\n");
    }

    #[test]
    fn regression_append_surfaces_unwritable_log_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").expect("write blocker");
        let mut store = LogStore::new(blocker.join("logs"), "http://logs.example/");
        let error = store
            .append_at("#wonted", "lost", at(2011, 3, 9, 10, 0, 0))
            .expect_err("log root under a file must fail");
        assert!(format!("{error:#}").contains("failed to create"));
    }
}
