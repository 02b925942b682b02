//! Logical path resolution with root containment.
//!
//! Clients address files with slash-separated paths relative to the shared
//! root. The resolver normalizes those strings lexically, joins them onto the
//! canonical root and canonicalizes the result, so `..` segments and symlinks
//! are both resolved before the containment check runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{FileError, FileResult};
use super::transfer::is_upload_artifact;

/// A filesystem path proven to lie within the root.
///
/// Only [`PathResolver`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    real: PathBuf,
    segments: Vec<String>,
}

impl ResolvedPath {
    /// The canonical filesystem path.
    pub fn as_path(&self) -> &Path {
        &self.real
    }

    /// The normalized logical path ("" for the root).
    pub fn logical(&self) -> String {
        self.segments.join("/")
    }

    /// Logical path of the parent, `None` at the root.
    pub fn parent_logical(&self) -> Option<String> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.segments[..self.segments.len() - 1].join("/"))
        }
    }

    /// Logical path of a direct child named `name`.
    pub fn child_logical(&self, name: &str) -> String {
        if self.segments.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.logical(), name)
        }
    }

    /// Whether this is the root itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last logical segment, or `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

/// Destination of an upload: an existing directory plus a validated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// The directory that will receive the file.
    pub dir: ResolvedPath,
    /// The requested file name.
    pub name: String,
}

impl UploadTarget {
    /// Logical path the file will have once stored.
    pub fn logical(&self) -> String {
        self.dir.child_logical(&self.name)
    }
}

/// Maps logical paths onto the filesystem below a fixed root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`.
    ///
    /// The root is canonicalized once here and must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> FileResult<Self> {
        let root = fs::canonicalize(root.as_ref()).map_err(|e| FileError::from_io(&e, ""))?;

        let metadata = fs::metadata(&root).map_err(|e| FileError::from_io(&e, ""))?;
        if !metadata.is_dir() {
            return Err(FileError::NotADirectory {
                path: String::new(),
            });
        }

        debug!(root = ?root, "Path resolver ready");
        Ok(Self { root })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether an already-canonical path lies within the root.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }

    /// Resolve an existing path.
    pub fn resolve(&self, logical: &str) -> FileResult<ResolvedPath> {
        let segments = normalize(logical)?;
        let normalized = segments.join("/");

        let mut joined = self.root.clone();
        joined.extend(&segments);

        let real = fs::canonicalize(&joined).map_err(|e| match e.kind() {
            // A file used as an intermediate directory.
            io::ErrorKind::NotADirectory => FileError::NotFound {
                path: normalized.clone(),
            },
            _ => FileError::from_io(&e, &normalized),
        })?;

        if !self.contains(&real) {
            warn!(path = %normalized, "Rejected path resolving outside the root");
            return Err(FileError::PathTraversal { path: normalized });
        }

        Ok(ResolvedPath { real, segments })
    }

    /// Resolve an existing directory.
    pub fn resolve_dir(&self, logical: &str) -> FileResult<ResolvedPath> {
        let resolved = self.resolve(logical)?;
        let metadata =
            fs::metadata(resolved.as_path()).map_err(|e| FileError::from_io(&e, &resolved.logical()))?;
        if !metadata.is_dir() {
            return Err(FileError::NotADirectory {
                path: resolved.logical(),
            });
        }
        Ok(resolved)
    }

    /// Resolve the destination of a new file.
    ///
    /// The parent must exist and be a directory; the file itself may not
    /// exist yet.
    pub fn resolve_for_create(&self, parent: &str, name: &str) -> FileResult<UploadTarget> {
        let dir = self.resolve_dir(parent)?;
        validate_file_name(name, &dir)?;
        Ok(UploadTarget {
            dir,
            name: name.to_string(),
        })
    }
}

/// Split a logical path into normalized segments.
///
/// Leading separators are stripped and one trailing separator is tolerated.
/// `.` is dropped, `..` pops the previous segment. Empty interior segments,
/// backslashes, NUL bytes, and `..` above the root are rejected.
pub fn normalize(logical: &str) -> FileResult<Vec<String>> {
    let traversal = || FileError::PathTraversal {
        path: logical.to_string(),
    };

    if logical.contains('\0') || logical.contains('\\') {
        return Err(traversal());
    }

    let trimmed = logical.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments: Vec<String> = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" => return Err(traversal()),
            "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(traversal());
                }
            }
            other => segments.push(other.to_string()),
        }
    }

    Ok(segments)
}

/// Check that `name` is a single plain path segment usable as a file name.
pub fn validate_file_name(name: &str, dir: &ResolvedPath) -> FileResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || is_upload_artifact(name);

    if invalid {
        return Err(FileError::PathTraversal {
            path: dir.child_logical(name),
        });
    }
    Ok(())
}
