//! Streaming file transfer with bounded chunks and atomic uploads.
//!
//! This module provides:
//! - Ranged downloads read in bounded chunks, aborting if the file changes
//! - Uploads written to a hidden temp file and renamed into place on commit
//! - Incremental upload size limits and SHA-256 digests

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use indexfo_protocol::{DownloadHeader, UploadReceipt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{FileError, FileResult};
use super::resolver::{validate_file_name, ResolvedPath, UploadTarget};

/// Default chunk size for transfers (64KB).
pub const DEFAULT_CHUNK_SIZE: u32 = 64 * 1024;

/// Maximum chunk size (1MB).
pub const MAX_CHUNK_SIZE: u32 = 1024 * 1024;

/// Name prefix of in-flight upload files.
pub const UPLOAD_PREFIX: &str = ".indexfo-";

/// Name suffix of in-flight upload files.
pub const UPLOAD_SUFFIX: &str = ".part";

/// Highest ` (n)` suffix tried when auto-renaming.
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Whether `name` is a temporary upload artifact.
pub fn is_upload_artifact(name: &str) -> bool {
    name.starts_with(UPLOAD_PREFIX) && name.ends_with(UPLOAD_SUFFIX)
}

/// What to do when an upload's final name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail with `NameConflict`.
    #[default]
    Reject,
    /// Atomically replace the existing file.
    Overwrite,
    /// Store under `name (n).ext` with the first free `n`.
    Rename,
}

/// A requested byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `start..=end`.
    FromTo(u64, u64),
    /// `start..` to the end of the file.
    From(u64),
    /// The last `n` bytes.
    Suffix(u64),
}

impl ByteRange {
    /// Parse a single-range header value such as `bytes=0-3`.
    ///
    /// Returns `None` for anything that is not one well-formed range;
    /// multi-range requests are not supported.
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.trim().strip_prefix("bytes=")?.trim();
        if spec.contains(',') {
            return None;
        }
        let (start, end) = spec.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (false, false) => Some(ByteRange::FromTo(start.parse().ok()?, end.parse().ok()?)),
            (false, true) => Some(ByteRange::From(start.parse().ok()?)),
            (true, false) => Some(ByteRange::Suffix(end.parse().ok()?)),
            (true, true) => None,
        }
    }

    /// Inclusive bounds within a file of `size` bytes, or `None` if
    /// unsatisfiable. Requires `start <= end < size`.
    pub fn resolve(&self, size: u64) -> Option<(u64, u64)> {
        match *self {
            ByteRange::FromTo(start, end) if start <= end && end < size => Some((start, end)),
            ByteRange::From(start) if start < size => Some((start, size - 1)),
            ByteRange::Suffix(len) if len > 0 && size > 0 => Some((size - len.min(size), size - 1)),
            _ => None,
        }
    }
}

/// Identity of a file at the moment a download opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileSnapshot {
    len: u64,
    modified: Option<SystemTime>,
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

impl FileSnapshot {
    fn capture(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        use std::os::unix::fs::MetadataExt;

        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
            #[cfg(unix)]
            dev: metadata.dev(),
            #[cfg(unix)]
            ino: metadata.ino(),
        }
    }
}

/// Transfer settings shared by all sessions.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    chunk_size: u32,
    max_upload_bytes: Option<u64>,
    on_conflict: ConflictPolicy,
}

impl Default for FileTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTransfer {
    /// Create a transfer handler with default settings.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_upload_bytes: None,
            on_conflict: ConflictPolicy::Reject,
        }
    }

    /// Set the chunk size, clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Limit upload size.
    pub fn with_max_upload_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Set the name collision policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    /// The configured chunk size.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Open a file for streaming, optionally restricted to `range`.
    pub fn open_download(
        &self,
        path: &ResolvedPath,
        range: Option<ByteRange>,
    ) -> FileResult<Download> {
        let logical = path.logical();

        let metadata = fs::metadata(path.as_path()).map_err(|e| FileError::from_io(&e, &logical))?;
        if metadata.is_dir() {
            return Err(FileError::IsADirectory { path: logical });
        }
        if !metadata.is_file() {
            return Err(FileError::NotFound { path: logical });
        }

        let mut file = File::open(path.as_path()).map_err(|e| FileError::from_io(&e, &logical))?;
        let opened = file.metadata().map_err(|e| FileError::from_io(&e, &logical))?;
        let total_size = opened.len();

        let (start, end, echoed) = match range {
            Some(range) => {
                let (start, end) = range.resolve(total_size).ok_or(FileError::InvalidRange {
                    path: logical.clone(),
                    size: total_size,
                })?;
                (start, end, Some((start, end)))
            }
            None => (0, total_size.saturating_sub(1), None),
        };
        let content_length = if total_size == 0 { 0 } else { end - start + 1 };

        if start > 0 {
            file.seek(SeekFrom::Start(start))
                .map_err(|e| FileError::from_io(&e, &logical))?;
        }

        let file_name = path.file_name().unwrap_or("download").to_string();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();

        debug!(path = %logical, start, content_length, "Opened download");

        Ok(Download {
            header: DownloadHeader {
                file_name,
                content_type,
                total_size,
                range: echoed,
                content_length,
            },
            stream: DownloadStream {
                file,
                path: path.as_path().to_path_buf(),
                logical,
                snapshot: FileSnapshot::capture(&opened),
                remaining: content_length,
                chunk_size: self.chunk_size as u64,
                unchecked: 0,
            },
        })
    }

    /// Start an upload into `target`.
    ///
    /// Creates the hidden temp file next to the destination. Under the
    /// `Reject` policy an existing destination fails immediately.
    pub fn open_upload(&self, target: &UploadTarget) -> FileResult<UploadSink> {
        validate_file_name(&target.name, &target.dir)?;
        let logical = target.logical();
        let dir = target.dir.as_path().to_path_buf();

        if self.on_conflict == ConflictPolicy::Reject && exists(&dir.join(&target.name)) {
            return Err(FileError::NameConflict { path: logical });
        }

        let temp_name = format!("{}{}{}", UPLOAD_PREFIX, Uuid::new_v4().simple(), UPLOAD_SUFFIX);
        let temp_path = dir.join(temp_name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| FileError::from_io(&e, &logical))?;

        debug!(path = %logical, "Opened upload");

        Ok(UploadSink {
            file: Some(file),
            temp_path,
            dir,
            target: target.clone(),
            written: 0,
            limit: self.max_upload_bytes,
            policy: self.on_conflict,
            hasher: Sha256::new(),
            finished: false,
        })
    }
}

/// An opened download: header metadata plus the byte stream.
#[derive(Debug)]
pub struct Download {
    /// Metadata for response framing.
    pub header: DownloadHeader,
    /// The bounded content stream.
    pub stream: DownloadStream,
}

/// Byte stream over one file range.
///
/// Before reading each chunk the stream re-checks the file at its path; a
/// file that was removed, replaced, resized or touched fails the read with
/// `TransferInterrupted`. The handle closes on drop.
#[derive(Debug)]
pub struct DownloadStream {
    file: File,
    path: PathBuf,
    logical: String,
    snapshot: FileSnapshot,
    remaining: u64,
    chunk_size: u64,
    unchecked: u64,
}

impl DownloadStream {
    /// Bytes still to be produced.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the next chunk, `None` once the range is exhausted.
    pub fn next_chunk(&mut self) -> FileResult<Option<Bytes>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let want = self.remaining.min(self.chunk_size);
        let result = self.verify_unchanged().and_then(|()| {
            let mut buf = Vec::with_capacity(want as usize);
            (&mut self.file)
                .take(want)
                .read_to_end(&mut buf)
                .map_err(|e| FileError::interrupted(&self.logical, format!("read failed: {}", e.kind())))?;
            if (buf.len() as u64) < want {
                return Err(FileError::interrupted(&self.logical, "unexpected end of file"));
            }
            Ok(buf)
        });

        match result {
            Ok(buf) => {
                self.remaining -= want;
                self.unchecked = 0;
                Ok(Some(Bytes::from(buf)))
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn verify_unchanged(&self) -> FileResult<()> {
        match fs::metadata(&self.path) {
            Ok(current) if FileSnapshot::capture(&current) == self.snapshot => Ok(()),
            Ok(_) => Err(FileError::interrupted(&self.logical, "file changed during transfer")),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileError::interrupted(&self.logical, "file was removed"))
            }
            Err(e) => Err(FileError::interrupted(
                &self.logical,
                format!("stat failed: {}", e.kind()),
            )),
        }
    }

    fn fail(&mut self, err: &FileError) {
        warn!(path = %self.logical, error = %err, "Download aborted");
        self.remaining = 0;
    }
}

impl Iterator for DownloadStream {
    type Item = FileResult<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl Read for DownloadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        // Re-check once per chunk's worth of bytes.
        if self.unchecked == 0 || self.unchecked >= self.chunk_size {
            if let Err(e) = self.verify_unchanged() {
                self.fail(&e);
                return Err(e.into());
            }
            self.unchecked = 0;
        }

        let want = (buf.len() as u64).min(self.remaining).min(self.chunk_size) as usize;
        let n = match self.file.read(&mut buf[..want]) {
            Ok(0) => {
                let e = FileError::interrupted(&self.logical, "unexpected end of file");
                self.fail(&e);
                return Err(e.into());
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
            Err(e) => {
                let e = FileError::interrupted(&self.logical, format!("read failed: {}", e.kind()));
                self.fail(&e);
                return Err(e.into());
            }
        };

        self.remaining -= n as u64;
        self.unchecked += n as u64;
        Ok(n)
    }
}

/// Receiving end of one upload.
///
/// Data lands in a hidden temp file in the destination directory.
/// [`commit`](Self::commit) renames it to the final name; every other exit
/// (error, [`abort`](Self::abort), drop) removes it.
#[derive(Debug)]
pub struct UploadSink {
    file: Option<File>,
    temp_path: PathBuf,
    dir: PathBuf,
    target: UploadTarget,
    written: u64,
    limit: Option<u64>,
    policy: ConflictPolicy,
    hasher: Sha256,
    finished: bool,
}

impl UploadSink {
    /// Bytes received so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Logical path of the requested destination.
    pub fn logical(&self) -> String {
        self.target.logical()
    }

    /// Append `data` to the upload.
    pub fn write_chunk(&mut self, data: &[u8]) -> FileResult<()> {
        let logical = self.target.logical();

        if self.finished {
            return Err(FileError::interrupted(&logical, "upload already closed"));
        }

        if let Some(limit) = self.limit {
            if self.written + data.len() as u64 > limit {
                self.discard();
                warn!(path = %logical, limit, "Upload exceeded size limit");
                return Err(FileError::UploadTooLarge { path: logical, limit });
            }
        }

        let result = match self.file.as_mut() {
            Some(file) => file.write_all(data),
            None => Err(io::Error::other("file handle not available")),
        };
        if let Err(e) = result {
            self.discard();
            return Err(FileError::interrupted(&logical, format!("write failed: {}", e.kind())));
        }

        self.hasher.update(data);
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flush, sync and move the upload to its final name.
    pub fn commit(mut self) -> FileResult<UploadReceipt> {
        let logical = self.target.logical();

        if self.finished {
            return Err(FileError::interrupted(&logical, "upload already closed"));
        }

        let synced = match self.file.take() {
            Some(mut file) => file.flush().and_then(|()| file.sync_all()),
            None => Err(io::Error::other("file handle not available")),
        };
        if let Err(e) = synced {
            self.discard();
            return Err(FileError::interrupted(&logical, format!("sync failed: {}", e.kind())));
        }

        let final_name = match self.publish() {
            Ok(name) => name,
            Err(e) => {
                self.discard();
                return Err(e);
            }
        };
        let final_logical = self.target.dir.child_logical(&final_name);

        // Linked publishes leave the temp name behind.
        if self.policy != ConflictPolicy::Overwrite {
            self.remove_temp();
        }
        self.finished = true;

        let sha256 = hex::encode(self.hasher.clone().finalize());
        info!(path = %final_logical, size = self.written, "Upload committed");

        Ok(UploadReceipt {
            name: final_name,
            path: final_logical,
            size: self.written,
            sha256,
        })
    }

    /// Cancel the upload and remove the temp file.
    pub fn abort(mut self) {
        debug!(path = %self.target.logical(), "Upload aborted");
        self.discard();
    }

    /// Make the synced temp file visible under its final name.
    ///
    /// `Overwrite` renames over the destination. `Reject` and `Rename`
    /// hard-link instead, which fails with `AlreadyExists` rather than
    /// replacing a file another upload committed in the meantime.
    fn publish(&self) -> FileResult<String> {
        let name = &self.target.name;

        match self.policy {
            ConflictPolicy::Overwrite => {
                let destination = self.dir.join(name);
                if destination.is_dir() {
                    return Err(FileError::NameConflict {
                        path: self.target.logical(),
                    });
                }
                fs::rename(&self.temp_path, &destination)
                    .map_err(|e| FileError::from_io(&e, &self.target.logical()))?;
                Ok(name.clone())
            }
            ConflictPolicy::Reject => {
                fs::hard_link(&self.temp_path, self.dir.join(name))
                    .map_err(|e| FileError::from_io(&e, &self.target.logical()))?;
                Ok(name.clone())
            }
            ConflictPolicy::Rename => {
                for candidate in rename_candidates(name) {
                    match fs::hard_link(&self.temp_path, self.dir.join(&candidate)) {
                        Ok(()) => return Ok(candidate),
                        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                        Err(e) => {
                            return Err(FileError::from_io(
                                &e,
                                &self.target.dir.child_logical(&candidate),
                            ))
                        }
                    }
                }
                Err(FileError::NameConflict {
                    path: self.target.logical(),
                })
            }
        }
    }

    fn discard(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        drop(self.file.take());
        self.remove_temp();
    }

    fn remove_temp(&self) {
        match fs::remove_file(&self.temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.target.logical(), error = %e, "Failed to remove temp upload file")
            }
        }
    }
}

impl Write for UploadSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        if !self.finished {
            debug!(path = %self.target.logical(), "Upload dropped before commit");
            self.discard();
        }
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// `name`, then `stem (1).ext`, `stem (2).ext`, ... up to the attempt limit.
fn rename_candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    let as_path = Path::new(name);
    let stem = as_path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let ext = as_path.extension().and_then(|e| e.to_str());

    let numbered = (1..=MAX_RENAME_ATTEMPTS).map(move |n| match ext {
        Some(ext) => format!("{} ({}).{}", stem, n, ext),
        None => format!("{} ({})", stem, n),
    });
    std::iter::once(name.to_string()).chain(numbered)
}
