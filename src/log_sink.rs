// Append-only text file holding one formatted line per chat turn.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` plus a newline. The file is opened and closed for every
    /// entry; nothing is buffered between calls.
    pub fn append(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        debug!(path = %self.path.display(), "Appended log entry");
        Ok(())
    }

    /// Returns the last `count` lines, or `None` if nothing has been logged yet.
    pub fn recent(&self, count: usize) -> io::Result<Option<Vec<String>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(count);
        Ok(Some(
            lines[start..]
                .iter()
                .map(|line| line.trim_end().to_string())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path().join("chat_logs.txt"));
        assert!(!sink.path().exists());

        sink.append("first entry").unwrap();

        assert!(sink.path().exists());
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "first entry\n");
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_logs.txt");
        fs::write(&path, "Initial log entry\n").unwrap();

        let sink = LogSink::new(&path);
        sink.append("Appended log entry").unwrap();
        sink.append("Another entry").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec!["Initial log entry", "Appended log entry", "Another entry"]
        );
    }

    #[test]
    fn test_recent_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path().join("missing.txt"));
        assert!(sink.recent(5).unwrap().is_none());
    }

    #[test]
    fn test_recent_returns_last_lines_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path().join("chat_logs.txt"));
        for i in 1..=7 {
            sink.append(&format!("entry {}   ", i)).unwrap();
        }

        let recent = sink.recent(5).unwrap().unwrap();
        assert_eq!(
            recent,
            vec!["entry 3", "entry 4", "entry 5", "entry 6", "entry 7"]
        );
    }

    #[test]
    fn test_recent_with_fewer_lines_than_requested() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path().join("chat_logs.txt"));
        sink.append("only").unwrap();
        assert_eq!(sink.recent(5).unwrap().unwrap(), vec!["only"]);
    }

    #[test]
    fn test_append_to_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path());
        assert!(sink.append("nope").is_err());
    }
}
