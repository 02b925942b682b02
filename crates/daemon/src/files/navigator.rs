//! Directory navigation: resolve, enumerate, sort and summarize.

use std::vec;

use indexfo_protocol::{Entry, Listing, ListingSummary};
use tracing::debug;

use super::classify::format_size;
use super::error::FileResult;
use super::indexer::{listing_order, DirectoryIndexer, EntryIter, IndexedEntry};
use super::resolver::{PathResolver, ResolvedPath};

/// Default number of entries above which `browse` switches to streaming.
pub const DEFAULT_ENTRY_THRESHOLD: usize = 10_000;

/// Result of [`Navigator::browse`].
#[derive(Debug)]
pub enum Browse {
    /// The directory was small enough to list and sort in full.
    Listing(Listing),
    /// The directory is large; entries follow in filesystem order.
    Stream(ListingStream),
}

/// Unsorted entries of a large directory, produced on demand.
///
/// Yields the entries read while sizing up the directory, then
/// continues reading the directory itself.
#[derive(Debug)]
pub struct ListingStream {
    /// Normalized logical path of the directory.
    pub path: String,
    /// Logical parent path, `None` at the root.
    pub parent: Option<String>,
    dir: ResolvedPath,
    buffered: vec::IntoIter<IndexedEntry>,
    rest: EntryIter,
}

impl Iterator for ListingStream {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.buffered.next() {
            Some(e) => e,
            None => self.rest.next()?,
        };
        Some(entry.to_protocol(&self.dir))
    }
}

/// Builds listings for logical directory paths.
#[derive(Debug, Clone)]
pub struct Navigator {
    resolver: PathResolver,
    indexer: DirectoryIndexer,
    entry_threshold: usize,
}

impl Navigator {
    /// Create a navigator over `resolver`'s root, enumerating with `indexer`.
    pub fn new(resolver: PathResolver, indexer: DirectoryIndexer) -> Self {
        Self {
            resolver,
            indexer,
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
        }
    }

    /// Set the streaming threshold used by [`browse`](Self::browse).
    pub fn with_entry_threshold(mut self, threshold: usize) -> Self {
        self.entry_threshold = threshold.max(1);
        self
    }

    /// Produce the full, sorted listing of a directory.
    pub fn navigate(&self, logical: &str) -> FileResult<Listing> {
        let dir = self.resolver.resolve_dir(logical)?;
        let entries = self.indexer.list(&dir)?;
        let listing = build_listing(&dir, entries);

        debug!(
            path = %listing.path,
            directories = listing.summary.directory_count,
            files = listing.summary.file_count,
            "Directory listed"
        );
        Ok(listing)
    }

    /// List a directory, streaming it unsorted if it exceeds the threshold.
    pub fn browse(&self, logical: &str) -> FileResult<Browse> {
        let dir = self.resolver.resolve_dir(logical)?;
        let mut iter = self.indexer.open(&dir)?;

        // One past the threshold is enough to know the directory is large.
        let mut prefix: Vec<IndexedEntry> = iter
            .by_ref()
            .take(self.entry_threshold.saturating_add(1))
            .collect();
        if prefix.len() > self.entry_threshold {
            debug!(path = %dir.logical(), threshold = self.entry_threshold, "Streaming large directory");
            return Ok(Browse::Stream(ListingStream {
                path: dir.logical(),
                parent: dir.parent_logical(),
                buffered: prefix.into_iter(),
                rest: iter,
                dir,
            }));
        }

        prefix.sort_by(listing_order);
        Ok(Browse::Listing(build_listing(&dir, prefix)))
    }
}

fn build_listing(dir: &ResolvedPath, entries: Vec<IndexedEntry>) -> Listing {
    let mut summary = ListingSummary::default();
    for entry in &entries {
        if entry.is_dir {
            summary.directory_count += 1;
        } else {
            summary.file_count += 1;
            summary.total_size += entry.size;
        }
    }
    summary.total_size_label = format_size(summary.total_size);

    Listing {
        path: dir.logical(),
        parent: dir.parent_logical(),
        entries: entries.iter().map(|e| e.to_protocol(dir)).collect(),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::error::FileError;
    use indexfo_protocol::EntryType;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn navigator(dir: &Path) -> Navigator {
        let resolver = PathResolver::new(dir).unwrap();
        let indexer = DirectoryIndexer::new(resolver.clone());
        Navigator::new(resolver, indexer)
    }

    #[test]
    fn test_directories_before_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("B")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"0123456789").unwrap();

        let listing = navigator(temp_dir.path()).navigate("").unwrap();

        assert_eq!(listing.path, "");
        assert!(!listing.has_parent());
        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].name, "B");
        assert_eq!(listing.entries[0].entry_type, EntryType::Directory);
        assert_eq!(listing.entries[1].name, "a.txt");
        assert_eq!(listing.entries[1].size_label.as_deref(), Some("10 B"));
    }

    #[test]
    fn test_summary() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("one")).unwrap();
        fs::create_dir_all(temp_dir.path().join("two")).unwrap();
        fs::write(temp_dir.path().join("a.bin"), vec![0u8; 1024]).unwrap();
        fs::write(temp_dir.path().join("b.bin"), vec![0u8; 512]).unwrap();

        let listing = navigator(temp_dir.path()).navigate("").unwrap();
        assert_eq!(listing.summary.directory_count, 2);
        assert_eq!(listing.summary.file_count, 2);
        assert_eq!(listing.summary.total_size, 1536);
        assert_eq!(listing.summary.total_size_label, "1.5 KB");
    }

    #[test]
    fn test_nested_paths_and_parent() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs/2024")).unwrap();
        fs::write(temp_dir.path().join("docs/2024/report.pdf"), b"pdf").unwrap();

        let nav = navigator(temp_dir.path());

        let listing = nav.navigate("/docs/2024/").unwrap();
        assert_eq!(listing.path, "docs/2024");
        assert_eq!(listing.parent.as_deref(), Some("docs"));
        assert_eq!(listing.entries[0].path, "docs/2024/report.pdf");

        let listing = nav.navigate("docs").unwrap();
        assert_eq!(listing.parent.as_deref(), Some(""));
        assert_eq!(listing.entries[0].path, "docs/2024");
    }

    #[test]
    fn test_navigate_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("dir")).unwrap();
        fs::write(temp_dir.path().join("x.txt"), b"x").unwrap();
        fs::write(temp_dir.path().join("Y.md"), b"y").unwrap();

        let nav = navigator(temp_dir.path());
        assert_eq!(nav.navigate("").unwrap(), nav.navigate("").unwrap());
    }

    #[test]
    fn test_navigate_file_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file.txt"), b"x").unwrap();

        let result = navigator(temp_dir.path()).navigate("file.txt");
        assert!(matches!(result, Err(FileError::NotADirectory { .. })));
    }

    #[test]
    fn test_navigate_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let result = navigator(temp_dir.path()).navigate("../..");
        assert!(matches!(result, Err(FileError::PathTraversal { .. })));
    }

    #[test]
    fn test_browse_small_directory_is_sorted_listing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir_all(temp_dir.path().join("z")).unwrap();

        let nav = navigator(temp_dir.path()).with_entry_threshold(3);
        match nav.browse("").unwrap() {
            Browse::Listing(listing) => {
                let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(names, vec!["z", "a.txt", "b.txt"]);
                assert_eq!(listing, nav.navigate("").unwrap());
            }
            Browse::Stream(_) => panic!("expected a full listing"),
        }
    }

    #[test]
    fn test_browse_large_directory_streams_everything() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..25 {
            fs::write(temp_dir.path().join(format!("file{i:02}.txt")), b"x").unwrap();
        }

        let nav = navigator(temp_dir.path()).with_entry_threshold(10);
        match nav.browse("").unwrap() {
            Browse::Stream(stream) => {
                assert_eq!(stream.path, "");
                assert!(stream.parent.is_none());
                let mut names: Vec<String> = stream.map(|e| e.name).collect();
                names.sort();
                names.dedup();
                assert_eq!(names.len(), 25);
            }
            Browse::Listing(_) => panic!("expected a stream"),
        }
    }

    #[test]
    fn test_browse_with_unbounded_threshold() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let nav = navigator(temp_dir.path()).with_entry_threshold(usize::MAX);
        match nav.browse("").unwrap() {
            Browse::Listing(listing) => assert_eq!(listing.entries.len(), 2),
            Browse::Stream(_) => panic!("expected a full listing"),
        }
    }
}
