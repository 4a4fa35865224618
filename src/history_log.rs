use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Append-only record of submitted lines, one `<unix-seconds> <text>` per line.
#[derive(Clone, Debug)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, text: &str) -> Result<()> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file {}", self.path.display()))?;
        writeln!(file, "{stamp} {text}")
            .with_context(|| format!("Failed to write history file {}", self.path.display()))
    }

    /// Recorded texts, oldest first. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read history file {}", self.path.display()))
            }
        };

        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| strip_stamp(line).to_string())
            .collect())
    }
}

fn strip_stamp(line: &str) -> &str {
    match line.split_once(' ') {
        Some((stamp, text)) if !stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()) => {
            text
        }
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_then_load_returns_texts_in_order() {
        let temp = TempDir::new().expect("temp dir");
        let log = HistoryLog::new(temp.path().join("nested").join("history"));
        log.append("ls -la").expect("append");
        log.append("cd  spaced  ").expect("append");

        assert_eq!(
            log.load().expect("load"),
            vec!["ls -la".to_string(), "cd  spaced  ".to_string()]
        );

        let raw = fs::read_to_string(log.path()).expect("read raw");
        let first = raw.lines().next().expect("first line");
        let (stamp, text) = first.split_once(' ').expect("stamped line");
        assert!(stamp.parse::<u64>().is_ok());
        assert_eq!(text, "ls -la");
    }

    #[test]
    fn load_keeps_unstamped_lines_verbatim() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("history");
        fs::write(&path, "1700000000 git status\nmake test\n\n12ab echo\n").expect("seed");

        let log = HistoryLog::new(&path);
        assert_eq!(
            log.load().expect("load"),
            vec![
                "git status".to_string(),
                "make test".to_string(),
                "12ab echo".to_string()
            ]
        );
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let temp = TempDir::new().expect("temp dir");
        let log = HistoryLog::new(temp.path().join("absent"));
        assert!(log.load().expect("load").is_empty());
    }
}
