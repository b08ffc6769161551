//! Append-only flat-file notes.

use crate::clock;
use crate::Result;
use chrono::Local;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct NotesStore {
    path: PathBuf,
}

impl NotesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `[YYYY-MM-DD HH:MM] <text>` and returns the absolute path of the notes file.
    pub fn append(&self, text: &str) -> Result<PathBuf> {
        let line = format!("[{}] {}", clock::format_note_stamp(&Local::now()), text.trim());
        self.append_line(&line)
    }

    fn append_line(&self, line: &str) -> Result<PathBuf> {
        let mut content = match fs::read_to_string(&self.path) {
            Ok(existing) => existing,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(line);
        content.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, content)?;

        let resolved = fs::canonicalize(&self.path)?;
        tracing::debug!(path = %resolved.display(), "note saved");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_creates_file_with_stamped_line() {
        let dir = tempdir().unwrap();
        let store = NotesStore::new(dir.path().join("notes.txt"));

        let path = store.append("buy milk").unwrap();
        assert!(path.is_absolute());

        let content = fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        assert!(line.starts_with('['));
        assert_eq!(line.find("] ").unwrap(), 17);
        assert!(line.ends_with("buy milk"));
    }

    #[test]
    fn appends_keep_call_order() {
        let dir = tempdir().unwrap();
        let store = NotesStore::new(dir.path().join("notes.txt"));
        store.append("first").unwrap();
        store.append("second").unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }

    #[test]
    fn existing_content_without_newline_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hand written").unwrap();

        NotesStore::new(&path).append("later").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "hand written");
        assert!(lines[1].ends_with("later"));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let store = NotesStore::new(dir.path().join("a/b/notes.txt"));
        assert!(store.append("nested").is_ok());
    }
}
