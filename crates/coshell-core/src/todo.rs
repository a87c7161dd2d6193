//! Flat-file todo list.
//!
//! One item per line. Loading stops at the configured maximum; appending
//! re-opens the file for every item so that concurrent editors of the same
//! file see each line as soon as it is written.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur in todo list operations.
#[derive(Debug, Error)]
pub enum TodoError {
    /// The list already holds `max` items.
    #[error("Todo list is full (max: {max})")]
    Full { max: usize },

    /// The item is empty or spans multiple lines.
    #[error("Invalid todo item: {0}")]
    InvalidItem(String),

    /// Reading or writing the backing file failed.
    #[error("Todo file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A todo list persisted as a line-delimited text file.
///
/// The mutex guards the combined "append to file, then append in memory"
/// sequence so the file and the displayed list never diverge.
#[derive(Debug)]
pub struct TodoList {
    path: PathBuf,
    max_items: usize,
    items: Mutex<Vec<String>>,
}

impl TodoList {
    /// Loads the list from `path`, reading at most `max_items` lines.
    ///
    /// A missing file yields an empty list. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn load(path: impl Into<PathBuf>, max_items: usize) -> Result<Self, TodoError> {
        let path = path.into();

        let items = match fs::read(&path) {
            Ok(bytes) => {
                let items: Vec<String> = String::from_utf8_lossy(&bytes)
                    .lines()
                    .take(max_items)
                    .map(str::to_string)
                    .collect();
                debug!(path = %path.display(), count = items.len(), "Loaded todo list");
                items
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Todo file not found, starting empty");
                Vec::new()
            }
            Err(source) => return Err(TodoError::Io { path, source }),
        };

        Ok(Self {
            path,
            max_items,
            items: Mutex::new(items),
        })
    }

    /// Appends `item` to the file and to the in-memory list.
    ///
    /// On a file error the in-memory list is left unchanged.
    pub fn append(&self, item: &str) -> Result<(), TodoError> {
        if item.trim().is_empty() {
            return Err(TodoError::InvalidItem("item is empty".to_string()));
        }
        if item.contains('\n') || item.contains('\r') {
            return Err(TodoError::InvalidItem(
                "item must be a single line".to_string(),
            ));
        }

        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);

        if items.len() >= self.max_items {
            return Err(TodoError::Full {
                max: self.max_items,
            });
        }

        let write_result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{item}"));

        if let Err(source) = write_result {
            warn!(path = %self.path.display(), error = %source, "Failed to append todo item");
            return Err(TodoError::Io {
                path: self.path.clone(),
                source,
            });
        }

        items.push(item.to_string());
        debug!(count = items.len(), "Appended todo item");
        Ok(())
    }

    /// Returns a snapshot of the items in file order.
    pub fn items(&self) -> Vec<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = TodoList::load(dir.path().join("tasks.txt"), 100).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_load_strips_newlines_and_respects_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        fs::write(&path, "one\r\ntwo\nthree\nfour\n").unwrap();

        let list = TodoList::load(&path, 3).unwrap();
        assert_eq!(list.items(), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_load_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        fs::write(&path, b"ok\n\xff\xfe bad\n").unwrap();

        let items = TodoList::load(&path, 100).unwrap().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], "ok");
        assert!(items[1].ends_with(" bad"));
    }

    #[test]
    fn test_append_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");

        let list = TodoList::load(&path, 100).unwrap();
        list.append("write tests").unwrap();
        list.append("ship it").unwrap();
        assert_eq!(list.len(), 2);

        assert_eq!(fs::read_to_string(&path).unwrap(), "write tests\nship it\n");

        let reloaded = TodoList::load(&path, 100).unwrap();
        assert_eq!(reloaded.items(), list.items());
    }

    #[test]
    fn test_append_rejects_blank_and_multiline() {
        let dir = tempfile::tempdir().unwrap();
        let list = TodoList::load(dir.path().join("tasks.txt"), 100).unwrap();

        assert!(matches!(list.append("   "), Err(TodoError::InvalidItem(_))));
        assert!(matches!(list.append("a\nb"), Err(TodoError::InvalidItem(_))));
        assert!(list.is_empty());
    }

    #[test]
    fn test_append_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        let list = TodoList::load(&path, 2).unwrap();

        list.append("a").unwrap();
        list.append("b").unwrap();
        let err = list.append("c").unwrap_err();
        assert!(matches!(err, TodoError::Full { max: 2 }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_append_io_error_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let list = TodoList {
            path: dir.path().to_path_buf(),
            max_items: 100,
            items: Mutex::new(Vec::new()),
        };

        assert!(matches!(list.append("x"), Err(TodoError::Io { .. })));
        assert!(list.is_empty());
    }

    #[test]
    fn test_concurrent_appends_keep_file_and_memory_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        let list = Arc::new(TodoList::load(&path, 100).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for i in 0..10 {
                        list.append(&format!("task {t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let on_disk: Vec<String> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(on_disk.len(), 40);
        assert_eq!(on_disk, list.items());
    }
}
