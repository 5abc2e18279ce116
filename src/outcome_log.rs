/// Append-only log of what every run did to every domain
///
/// The log file is stored in:
/// - Linux: ~/.local/share/dreamhostdns/dnsupdates.log
/// - macOS: ~/Library/Application Support/dreamhostdns/dnsupdates.log
/// - Windows: %APPDATA%\dreamhostdns\dnsupdates.log
///
/// One line per event: `<rfc3339 timestamp> <LEVEL> <text>`. When the file grows
/// past `max_bytes` it is moved to `dnsupdates.log.1` (older backups shift up to
/// `keep`) before the next line is written.
use crate::engine::{OutcomeRecorder, ReportEntry};
use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_KEEP: usize = 3;

pub struct FileRecorder {
    path: PathBuf,
    max_bytes: u64,
    keep: usize,
}

impl FileRecorder {
    /// Creates a recorder for `path`, or the platform default when `None`.
    /// The parent directory is created if it does not exist yet.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_log_path()?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            path,
            max_bytes: DEFAULT_MAX_BYTES,
            keep: DEFAULT_KEEP,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_log_path() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("dreamhostdns").join("dnsupdates.log"))
            .ok_or_else(|| Error::Config("Failed to determine log file location".into()))
    }

    pub fn info(&mut self, text: &str) {
        self.write_line("INFO", text);
    }

    pub fn error(&mut self, text: &str) {
        self.write_line("ERROR", text);
    }

    /// Write errors are reported on the console and otherwise ignored.
    fn write_line(&mut self, level: &str, text: &str) {
        if let Err(e) = self.try_write_line(level, text) {
            log::warn!("Could not write to {}: {}", self.path.display(), e);
        }
    }

    fn try_write_line(&mut self, level: &str, text: &str) -> Result<()> {
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(
            file,
            "{} {} {}",
            humantime::format_rfc3339_seconds(SystemTime::now()),
            level,
            text
        )?;
        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < self.max_bytes {
            return Ok(());
        }

        if self.keep == 0 {
            fs::remove_file(&self.path)?;
            return Ok(());
        }

        // dnsupdates.log.{keep} falls off the end
        let oldest = self.backup_path(self.keep);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.keep).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;
        log::debug!("Rotated {}", self.path.display());
        Ok(())
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }
}

impl OutcomeRecorder for FileRecorder {
    fn record(&mut self, entry: &ReportEntry) {
        let level = if entry.success { "OK" } else { "FAILED" };
        let text = format!("{} {}: {}", entry.action, entry.domain, entry.message);
        self.write_line(level, &text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Action;
    use tempfile::tempdir;

    fn entry(domain: &str, success: bool) -> ReportEntry {
        ReportEntry {
            domain: domain.to_string(),
            action: Action::Add,
            success,
            message: if success { "record_added" } else { "no_such_zone" }.to_string(),
        }
    }

    #[test]
    fn test_record_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("dnsupdates.log");
        let mut recorder = FileRecorder::new(Some(path.clone())).unwrap();

        recorder.info("IP address outside the NAT is 203.0.113.5");
        recorder.record(&entry("a.example.com", true));
        recorder.record(&entry("b.example.com", false));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("INFO IP address outside the NAT is 203.0.113.5"));
        assert!(lines[1].ends_with("OK Add a.example.com: record_added"));
        assert!(lines[2].ends_with("FAILED Add b.example.com: no_such_zone"));
    }

    #[test]
    fn test_existing_log_is_appended_not_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dnsupdates.log");
        fs::write(&path, "earlier run\n").unwrap();

        let mut recorder = FileRecorder::new(Some(path.clone())).unwrap();
        recorder.error("listing failed");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier run\n"));
        assert!(content.contains("ERROR listing failed"));
    }

    #[test]
    fn test_rotation_shifts_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dnsupdates.log");
        let mut recorder = FileRecorder {
            max_bytes: 10,
            keep: 2,
            ..FileRecorder::new(Some(path.clone())).unwrap()
        };

        fs::write(&path, "first generation, long enough\n").unwrap();
        recorder.info("second");
        assert!(recorder.backup_path(1).exists());
        assert!(fs::read_to_string(recorder.backup_path(1))
            .unwrap()
            .starts_with("first generation"));

        fs::write(&path, "second generation, long enough\n").unwrap();
        recorder.info("third");
        assert!(fs::read_to_string(recorder.backup_path(2))
            .unwrap()
            .starts_with("first generation"));
        assert!(fs::read_to_string(recorder.backup_path(1))
            .unwrap()
            .starts_with("second generation"));

        fs::write(&path, "third generation, long enough\n").unwrap();
        recorder.info("fourth");
        assert!(!dir.path().join("dnsupdates.log.3").exists());
        assert!(fs::read_to_string(recorder.backup_path(2))
            .unwrap()
            .starts_with("second generation"));

        let current = fs::read_to_string(&path).unwrap();
        assert!(current.ends_with("INFO fourth\n"));
    }

    #[test]
    fn test_small_file_is_not_rotated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dnsupdates.log");
        let mut recorder = FileRecorder::new(Some(path.clone())).unwrap();

        recorder.info("one");
        recorder.info("two");
        assert!(!recorder.backup_path(1).exists());
    }

    #[test]
    fn test_backup_path_naming() {
        let recorder = FileRecorder {
            path: PathBuf::from("/tmp/dnsupdates.log"),
            max_bytes: DEFAULT_MAX_BYTES,
            keep: DEFAULT_KEEP,
        };
        assert_eq!(recorder.backup_path(2), PathBuf::from("/tmp/dnsupdates.log.2"));
        assert_eq!(recorder.path(), Path::new("/tmp/dnsupdates.log"));
    }
}
