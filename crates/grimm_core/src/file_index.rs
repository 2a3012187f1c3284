//! Best-effort discovery of view files.
//!
//! Layouts, partials and every bundle's views are found the same way: list a
//! directory once, keep the files a predicate accepts, and key them by their
//! name without the final extension. A missing or unreadable directory is a
//! normal outcome ([`Discovered::Absent`]), never an error.
//!
//! The index is built once and never refreshed; files added to disk later
//! need a restart to be picked up.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of a discovery that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered<T> {
    Found(T),
    Absent,
}

impl<T> Discovered<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Discovered::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Discovered::Found(value) => Some(value),
            Discovered::Absent => None,
        }
    }
}

impl<T: Default> Discovered<T> {
    pub fn unwrap_or_default(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// Predicate for HTML views.
pub fn html_files(file_name: &str) -> bool {
    file_name.ends_with(".html")
}

/// Mapping from a view's base name to its path on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileIndex {
    files: HashMap<String, PathBuf>,
}

impl FileIndex {
    /// Lists `dir` (non-recursively) and indexes the entries `filter` accepts.
    ///
    /// When two accepted files share a base name (`menu.html` and
    /// `menu.shtml` under a looser predicate) the one listed last wins. The
    /// listing order is whatever the filesystem returns, so callers must not
    /// rely on which one that is.
    pub async fn discover<F>(dir: impl AsRef<Path>, filter: F) -> Discovered<Self>
    where
        F: Fn(&str) -> bool,
    {
        let dir = dir.as_ref();

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No files indexed from {}: {}", dir.display(), e);
                return Discovered::Absent;
            }
        };

        let mut files = HashMap::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let file_name = entry.file_name();
                    let Some(name) = file_name.to_str() else {
                        continue;
                    };
                    if filter(name) {
                        files.insert(Self::base_name(name).to_string(), dir.join(name));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("Listing {} failed part way: {}", dir.display(), e);
                    return Discovered::Absent;
                }
            }
        }

        Discovered::Found(Self { files })
    }

    /// Same as [`FileIndex::discover`], treating absence as an empty index.
    pub async fn scan<F>(dir: impl AsRef<Path>, filter: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        Self::discover(dir, filter).await.unwrap_or_default()
    }

    /// `report.v2.html` -> `report.v2`; a name without a dot is kept whole.
    pub fn base_name(file_name: &str) -> &str {
        file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name)
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }
}

impl FromIterator<(String, PathBuf)> for FileIndex {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"<p></p>").expect("write test file");
    }

    #[tokio::test]
    async fn test_indexes_only_matching_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.html");
        touch(dir.path(), "b.html");
        touch(dir.path(), "c.txt");

        let index = FileIndex::scan(dir.path(), html_files).await;

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a"), Some(dir.path().join("a.html").as_path()));
        assert_eq!(index.get("b"), Some(dir.path().join("b.html").as_path()));
        assert!(!index.contains("c"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_not_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        assert_eq!(
            FileIndex::discover(&missing, html_files).await,
            Discovered::Absent
        );
        assert!(FileIndex::scan(&missing, html_files).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_directory_is_found() {
        let dir = TempDir::new().unwrap();

        let discovered = FileIndex::discover(dir.path(), html_files).await;

        assert!(discovered.is_found());
        assert!(discovered.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_only_the_last_extension_is_dropped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "report.v2.html");

        let index = FileIndex::scan(dir.path(), html_files).await;

        assert!(index.contains("report.v2"));
        assert!(!index.contains("report"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(FileIndex::base_name("front.html"), "front");
        assert_eq!(FileIndex::base_name("a.b.c"), "a.b");
        assert_eq!(FileIndex::base_name("README"), "README");
    }

    #[test]
    fn test_html_predicate() {
        assert!(html_files("index.html"));
        assert!(!html_files("index.htm"));
        assert!(!html_files("notes.txt"));
    }
}
