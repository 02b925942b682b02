//! The file engine facade.
//!
//! [`FileEngine`] bundles the resolver, navigator and transfer settings for
//! one root. It holds no mutable state; clone it freely and hand a copy to
//! each request or task. All operations perform blocking filesystem I/O, so
//! async callers should run them under `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::Arc;

use indexfo_protocol::Listing;
use tracing::{debug, info};

use crate::config::{Config, ListingConfig, TransferConfig};
use crate::files::{
    Browse, ByteRange, DirectoryIndexer, Download, FileResult, FileTransfer, Navigator,
    PathResolver, ResolvedPath, UploadSink,
};

#[derive(Debug)]
struct EngineInner {
    resolver: PathResolver,
    navigator: Navigator,
    transfer: FileTransfer,
}

/// Entry point for browsing, downloading and uploading below one root.
#[derive(Debug, Clone)]
pub struct FileEngine {
    inner: Arc<EngineInner>,
}

impl FileEngine {
    /// Build an engine for `root`.
    ///
    /// The root is canonicalized here and must be an existing directory.
    pub fn new(
        root: impl AsRef<Path>,
        listing: &ListingConfig,
        transfer: &TransferConfig,
    ) -> FileResult<Self> {
        let resolver = PathResolver::new(root)?;
        let indexer = DirectoryIndexer::new(resolver.clone()).show_hidden(listing.show_hidden);
        let navigator = Navigator::new(resolver.clone(), indexer)
            .with_entry_threshold(listing.entry_threshold);
        let transfer = FileTransfer::new()
            .with_chunk_size(transfer.chunk_size)
            .with_max_upload_bytes(transfer.max_upload_bytes)
            .with_conflict_policy(transfer.on_conflict);

        info!(
            root = ?resolver.root(),
            chunk_size = transfer.chunk_size(),
            "File engine ready"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                resolver,
                navigator,
                transfer,
            }),
        })
    }

    /// Build an engine from a loaded configuration.
    pub fn from_config(config: &Config) -> FileResult<Self> {
        Self::new(&config.server.root, &config.listing, &config.transfer)
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        self.inner.resolver.root()
    }

    /// Resolve a logical path to a contained filesystem path.
    pub fn resolve(&self, logical: &str) -> FileResult<ResolvedPath> {
        self.inner.resolver.resolve(logical)
    }

    /// List a directory in full.
    pub fn navigate(&self, logical: &str) -> FileResult<Listing> {
        self.inner.navigator.navigate(logical)
    }

    /// List a directory, streaming it if it is large.
    pub fn browse(&self, logical: &str) -> FileResult<Browse> {
        self.inner.navigator.browse(logical)
    }

    /// Open a file for download.
    pub fn open_download(&self, logical: &str, range: Option<ByteRange>) -> FileResult<Download> {
        let path = self.inner.resolver.resolve(logical)?;
        let download = self.inner.transfer.open_download(&path, range)?;
        debug!(
            path = %path.logical(),
            length = download.header.content_length,
            "Download started"
        );
        Ok(download)
    }

    /// Start an upload of `name` into the directory `parent`.
    pub fn open_upload(&self, parent: &str, name: &str) -> FileResult<UploadSink> {
        let target = self.inner.resolver.resolve_for_create(parent, name)?;
        let sink = self.inner.transfer.open_upload(&target)?;
        debug!(path = %target.logical(), "Upload started");
        Ok(sink)
    }
}
