use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Appends timestamped lines to a log file.
///
/// The terminal belongs to the session while it runs, so nothing here ever
/// writes to stdout or stderr.
pub struct Observer {
    log_path: Option<PathBuf>,
    verbose: bool,
}

impl Observer {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            log_path,
            verbose: false,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Logs `msg` only when verbose mode is on.
    pub fn verbose_log(&self, msg: &str) {
        if self.verbose {
            let _ = self.append_log_line(&format!("{} DEBUG {msg}", Utc::now().to_rfc3339()));
        }
    }

    pub fn info_log(&self, msg: &str) {
        let _ = self.append_log_line(&format!("{} INFO {msg}", Utc::now().to_rfc3339()));
    }

    pub fn warn_log(&self, msg: &str) {
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let Some(path) = &self.log_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_lines_require_verbose_mode() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("logs").join("review.log");
        let mut observer = Observer::new(Some(path.clone()));

        observer.verbose_log("hidden");
        assert!(!path.exists());

        observer.set_verbose(true);
        observer.verbose_log("shown");
        observer.warn_log("careful");
        observer.info_log("done");

        let raw = fs::read_to_string(&path).expect("log");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("DEBUG shown"));
        assert!(lines[1].ends_with("WARN careful"));
        assert!(lines[2].ends_with("INFO done"));
        assert!(!raw.contains("hidden"));
    }

    #[test]
    fn log_directory_is_created_on_first_line() {
        let dir = tempfile::tempdir().expect("dir");
        let logs = dir.path().join("nested").join("logs");
        let observer = Observer::new(Some(logs.join("review.log")));
        assert!(!logs.exists());

        observer.info_log("session ended");
        assert!(logs.join("review.log").exists());

        Observer::new(None).warn_log("dropped");
    }
}
