//! Filesystem indexing and transfer.
//!
//! This module provides:
//! - Logical path resolution contained within a single root
//! - Lazy directory enumeration and sorted listings
//! - File kind classification and human-readable sizes
//! - Ranged chunked downloads and atomic uploads
//!
//! # Security
//!
//! Every client path goes through [`PathResolver`], which canonicalizes it
//! and rejects anything that ends up outside the root, including symlinks
//! pointing elsewhere. Errors only ever carry the client's logical path.

pub mod classify;
pub mod error;
pub mod indexer;
pub mod navigator;
pub mod resolver;
pub mod transfer;

pub use classify::{classify, format_size};
pub use error::{FileError, FileResult};
pub use indexer::{DirectoryIndexer, EntryIter, IndexedEntry};
pub use navigator::{Browse, ListingStream, Navigator};
pub use resolver::{PathResolver, ResolvedPath, UploadTarget};
pub use transfer::{ByteRange, ConflictPolicy, Download, DownloadStream, FileTransfer, UploadSink};
