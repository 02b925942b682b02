//! # Indexfo Library
//!
//! Filesystem indexing and transfer engine for exposing one directory tree
//! to remote clients.
//!
//! ## Overview
//!
//! - **Path Resolution**: Map untrusted logical paths onto the shared root
//! - **Navigation**: Sorted directory listings with kinds and size labels
//! - **Downloads**: Chunked, optionally ranged streams that abort if the file changes
//! - **Uploads**: Temp-file writes renamed into place on commit
//!
//! The engine takes an already-decoded request and returns a structured
//! result or a byte stream. HTTP framing lives in front of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   FileEngine                      │
//! ├──────────────────────────────────────────────────┤
//! │                                                   │
//! │  ┌──────────────┐          ┌──────────────────┐  │
//! │  │  Navigator   │          │   FileTransfer   │  │
//! │  └──────┬───────┘          └────────┬─────────┘  │
//! │         │                           │            │
//! │  ┌──────┴───────┐  ┌────────────┐   │            │
//! │  │   Indexer    │  │ Classifier │   │            │
//! │  └──────┬───────┘  └────────────┘   │            │
//! │         │                           │            │
//! │  ┌──────┴───────────────────────────┴─────────┐  │
//! │  │               PathResolver                  │  │
//! │  └─────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use indexfo::{Config, FileEngine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let engine = FileEngine::from_config(&config)?;
//!
//!     let listing = engine.navigate("")?;
//!     for entry in &listing.entries {
//!         println!("{} {}", entry.name, entry.size_label.as_deref().unwrap_or("-"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`engine`]: The [`FileEngine`] facade
//! - [`files`]: Resolver, indexer, classifier, navigator and transfers
//! - [`logging`]: Subscriber setup

pub mod config;
pub mod engine;
pub mod files;
pub mod logging;

pub use indexfo_protocol as protocol;

pub use config::{Config, ConfigError};
pub use engine::FileEngine;
pub use files::{Browse, ByteRange, ConflictPolicy, FileError, FileResult};
