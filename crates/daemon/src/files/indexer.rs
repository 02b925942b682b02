//! Directory enumeration.
//!
//! The indexer reads one directory level at a time and yields entries
//! lazily, straight off `fs::read_dir`. Nothing is cached: each call
//! observes the live filesystem.

use std::cmp::Ordering;
use std::fs::{self, Metadata, ReadDir};
use std::path::PathBuf;
use std::time::SystemTime;

use indexfo_protocol::{Entry, EntryType};
use tracing::debug;

use super::classify::{classify, format_size};
use super::error::{FileError, FileResult};
use super::resolver::{PathResolver, ResolvedPath};
use super::transfer::is_upload_artifact;

/// A directory child as seen by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modified timestamp.
    pub modified: SystemTime,
}

impl IndexedEntry {
    fn from_metadata(name: String, metadata: &Metadata) -> Self {
        let is_dir = metadata.is_dir();
        Self {
            name,
            is_dir,
            size: if is_dir { 0 } else { metadata.len() },
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// Modification time as Unix epoch seconds.
    pub fn modified_secs(&self) -> u64 {
        self.modified
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Convert to a protocol `Entry` located in `dir`.
    pub fn to_protocol(&self, dir: &ResolvedPath) -> Entry {
        let (entry_type, size_label, kind) = if self.is_dir {
            (EntryType::Directory, None, None)
        } else {
            (
                EntryType::File,
                Some(format_size(self.size)),
                Some(classify(&self.name)),
            )
        };

        Entry {
            name: self.name.clone(),
            path: dir.child_logical(&self.name),
            entry_type,
            size: self.size,
            size_label,
            kind,
            modified: self.modified_secs(),
        }
    }
}

/// Listing order: directories first, then files; within each group by
/// lowercased name, ties broken by the exact name.
pub fn listing_order(a: &IndexedEntry, b: &IndexedEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Enumerates directory children below a root.
#[derive(Debug, Clone)]
pub struct DirectoryIndexer {
    resolver: PathResolver,
    show_hidden: bool,
}

impl DirectoryIndexer {
    /// Create an indexer bounded by `resolver`'s root.
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            show_hidden: true,
        }
    }

    /// Set whether dot-files are listed.
    pub fn show_hidden(mut self, show: bool) -> Self {
        self.show_hidden = show;
        self
    }

    /// Open a lazy iterator over the children of `dir`.
    pub fn open(&self, dir: &ResolvedPath) -> FileResult<EntryIter> {
        let logical = dir.logical();

        let metadata = fs::metadata(dir.as_path()).map_err(|e| FileError::from_io(&e, &logical))?;
        if !metadata.is_dir() {
            return Err(FileError::NotADirectory { path: logical });
        }

        let read_dir = fs::read_dir(dir.as_path()).map_err(|e| FileError::from_io(&e, &logical))?;

        Ok(EntryIter {
            read_dir,
            root: self.resolver.root().to_path_buf(),
            logical,
            show_hidden: self.show_hidden,
        })
    }

    /// Read every child of `dir`, in listing order.
    pub fn list(&self, dir: &ResolvedPath) -> FileResult<Vec<IndexedEntry>> {
        let mut entries: Vec<IndexedEntry> = self.open(dir)?.collect();
        entries.sort_by(listing_order);
        Ok(entries)
    }
}

/// Lazy, finite, single-pass sequence of directory children.
///
/// Children that disappear mid-enumeration, special files, non-UTF-8
/// names, symlinks leaving the root and in-flight upload artifacts are
/// skipped.
#[derive(Debug)]
pub struct EntryIter {
    read_dir: ReadDir,
    root: PathBuf,
    logical: String,
    show_hidden: bool,
}

impl EntryIter {
    fn stat(&self, entry: &fs::DirEntry) -> Option<Metadata> {
        let file_type = entry.file_type().ok()?;

        if file_type.is_symlink() {
            let target = match fs::canonicalize(entry.path()) {
                Ok(t) => t,
                Err(e) => {
                    debug!(dir = %self.logical, error = %e, "Skipping dangling symlink");
                    return None;
                }
            };
            if !target.starts_with(&self.root) {
                debug!(dir = %self.logical, "Skipping symlink leaving the root");
                return None;
            }
            return fs::metadata(target).ok();
        }

        match entry.metadata() {
            Ok(m) => Some(m),
            Err(e) => {
                debug!(dir = %self.logical, error = %e, "Skipping entry that could not be stat'ed");
                None
            }
        }
    }
}

impl Iterator for EntryIter {
    type Item = IndexedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.read_dir.next()? {
                Ok(e) => e,
                Err(e) => {
                    debug!(dir = %self.logical, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };

            if is_upload_artifact(&name) || (!self.show_hidden && name.starts_with('.')) {
                continue;
            }

            let Some(metadata) = self.stat(&entry) else {
                continue;
            };

            if !metadata.is_dir() && !metadata.is_file() {
                continue;
            }

            return Some(IndexedEntry::from_metadata(name, &metadata));
        }
    }
}
