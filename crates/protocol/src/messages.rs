//! Wire types for Indexfo.
//!
//! These are the structured values the engine hands to whatever transport
//! sits in front of it. They are plain data; serialization (JSON by default)
//! and status-code framing are the caller's concern.

use serde::{Deserialize, Serialize};

// ============================================================================
// Listing Messages
// ============================================================================

/// The ordered children of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Normalized logical path of the directory ("" for the root).
    pub path: String,
    /// Logical path of the parent directory. `None` only at the root.
    pub parent: Option<String>,
    /// Entries, directories first, then files.
    pub entries: Vec<Entry>,
    /// Aggregate counts over `entries`.
    pub summary: ListingSummary,
}

impl Listing {
    /// Whether the listed directory has a navigable parent.
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Iterate over directory entries only.
    pub fn directories(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_directory())
    }

    /// Iterate over file entries only.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_directory())
    }
}

/// Aggregate information about a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSummary {
    /// Number of subdirectories.
    pub directory_count: u64,
    /// Number of files.
    pub file_count: u64,
    /// Sum of file sizes in bytes.
    pub total_size: u64,
    /// `total_size` in human units.
    pub total_size_label: String,
}

/// A single child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry name (not full path).
    pub name: String,
    /// Logical path of the entry, relative to the root.
    pub path: String,
    /// Entry type.
    pub entry_type: EntryType,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Size in human units (files only).
    pub size_label: Option<String>,
    /// Presentation category (files only).
    pub kind: Option<FileKind>,
    /// Last modified timestamp (Unix epoch seconds).
    pub modified: u64,
}

impl Entry {
    /// Whether this entry is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self.entry_type, EntryType::Directory)
    }
}

/// Type of a listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Directory.
    Directory,
    /// Regular file.
    File,
}

/// Presentation category for a file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
    Text,
    Code,
    Archive,
    Video,
    Audio,
    Executable,
    /// Anything without a known extension.
    Generic,
}

impl FileKind {
    /// Every kind, in display order.
    pub const ALL: [FileKind; 9] = [
        FileKind::Image,
        FileKind::Document,
        FileKind::Text,
        FileKind::Code,
        FileKind::Archive,
        FileKind::Video,
        FileKind::Audio,
        FileKind::Executable,
        FileKind::Generic,
    ];

    /// Stable icon key used by front ends.
    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Document => "document",
            FileKind::Text => "text",
            FileKind::Code => "code",
            FileKind::Archive => "archive",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Executable => "executable",
            FileKind::Generic => "file",
        }
    }
}

// ============================================================================
// Transfer Messages
// ============================================================================

/// Metadata describing a download, for the caller to turn into headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadHeader {
    /// Suggested file name for `Content-Disposition`.
    pub file_name: String,
    /// Guessed MIME type.
    pub content_type: String,
    /// Size of the whole file in bytes.
    pub total_size: u64,
    /// Inclusive byte bounds when a range was requested.
    pub range: Option<(u64, u64)>,
    /// Number of bytes the stream will produce.
    pub content_length: u64,
}

impl DownloadHeader {
    /// `Content-Range` value for partial responses.
    pub fn content_range(&self) -> Option<String> {
        self.range
            .map(|(start, end)| format!("bytes {}-{}/{}", start, end, self.total_size))
    }
}

/// Result of a committed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Final file name (may differ from the requested one under auto-rename).
    pub name: String,
    /// Logical path of the stored file.
    pub path: String,
    /// Bytes written.
    pub size: u64,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
}

// ============================================================================
// Error Messages
// ============================================================================

/// User-safe error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Error code for programmatic handling.
    pub code: ErrorCode,
    /// Human-readable error message. Never contains host paths.
    pub message: String,
    /// Logical path the error refers to.
    pub path: Option<String>,
}

/// Error codes for engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    PathTraversal,
    NotFound,
    NotADirectory,
    IsADirectory,
    PermissionDenied,
    InvalidRange,
    TransferInterrupted,
    UploadTooLarge,
    NameConflict,
    /// Unclassified I/O failure.
    InternalError,
}

impl ErrorCode {
    /// Conventional HTTP status for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::PathTraversal => 400,
            ErrorCode::NotADirectory | ErrorCode::IsADirectory => 400,
            ErrorCode::PermissionDenied => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::NameConflict => 409,
            ErrorCode::UploadTooLarge => 413,
            ErrorCode::InvalidRange => 416,
            ErrorCode::TransferInterrupted | ErrorCode::InternalError => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_listing() -> Listing {
        Listing {
            path: "docs".to_string(),
            parent: Some(String::new()),
            entries: vec![
                Entry {
                    name: "B".to_string(),
                    path: "docs/B".to_string(),
                    entry_type: EntryType::Directory,
                    size: 0,
                    size_label: None,
                    kind: None,
                    modified: 1704067200,
                },
                Entry {
                    name: "a.txt".to_string(),
                    path: "docs/a.txt".to_string(),
                    entry_type: EntryType::File,
                    size: 10,
                    size_label: Some("10 B".to_string()),
                    kind: Some(FileKind::Text),
                    modified: 1704067200,
                },
            ],
            summary: ListingSummary {
                directory_count: 1,
                file_count: 1,
                total_size: 10,
                total_size_label: "10 B".to_string(),
            },
        }
    }

    #[test]
    fn test_listing_json_shape() {
        let json = serde_json::to_value(sample_listing()).unwrap();

        assert_eq!(json["path"], "docs");
        assert_eq!(json["entries"][0]["entry_type"], "directory");
        assert_eq!(json["entries"][1]["kind"], "text");
        assert_eq!(json["entries"][1]["size_label"], "10 B");
        assert!(json["entries"][0]["kind"].is_null());
    }

    #[test]
    fn test_listing_parent_helpers() {
        let mut listing = sample_listing();
        assert!(listing.has_parent());
        assert_eq!(listing.directories().count(), 1);
        assert_eq!(listing.files().count(), 1);

        listing.parent = None;
        assert!(!listing.has_parent());
    }

    #[test]
    fn test_file_kind_icons_are_unique() {
        let mut icons: Vec<&str> = FileKind::ALL.iter().map(|k| k.icon()).collect();
        icons.sort_unstable();
        icons.dedup();
        assert_eq!(icons.len(), FileKind::ALL.len());
        assert_eq!(FileKind::Generic.icon(), "file");
    }

    #[test]
    fn test_content_range() {
        let header = DownloadHeader {
            file_name: "a.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            total_size: 10,
            range: Some((0, 3)),
            content_length: 4,
        };
        assert_eq!(header.content_range().as_deref(), Some("bytes 0-3/10"));

        let full = DownloadHeader { range: None, content_length: 10, ..header };
        assert!(full.content_range().is_none());
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::InvalidRange.http_status(), 416);
        assert_eq!(ErrorCode::UploadTooLarge.http_status(), 413);
        assert_eq!(ErrorCode::NameConflict.http_status(), 409);
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
    }

    #[test]
    fn test_error_code_serializes_snake_case() {
        let msg = ErrorMessage {
            code: ErrorCode::TransferInterrupted,
            message: "transfer interrupted".to_string(),
            path: Some("a.bin".to_string()),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"transfer_interrupted\""));
    }
}
