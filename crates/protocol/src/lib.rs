//! # Indexfo Protocol Library
//!
//! Wire types shared between the Indexfo engine and the transport in front
//! of it.
//!
//! ## Overview
//!
//! - **Listings**: [`Listing`], [`Entry`], [`ListingSummary`], [`FileKind`]
//! - **Transfers**: [`DownloadHeader`], [`UploadReceipt`]
//! - **Errors**: [`ErrorMessage`], [`ErrorCode`] with conventional HTTP statuses
//!
//! ## Example Usage
//!
//! ```rust
//! use indexfo_protocol::{to_json, ErrorCode, ErrorMessage};
//!
//! let msg = ErrorMessage {
//!     code: ErrorCode::NotFound,
//!     message: "not found: docs/missing.txt".to_string(),
//!     path: Some("docs/missing.txt".to_string()),
//! };
//! assert_eq!(msg.code.http_status(), 404);
//! let body = to_json(&msg).unwrap();
//! assert!(body.contains("not_found"));
//! ```

pub mod error;
pub mod messages;

pub use error::{from_json, to_json, ProtocolError, Result};
pub use messages::{
    DownloadHeader, Entry, EntryType, ErrorCode, ErrorMessage, FileKind, Listing,
    ListingSummary, UploadReceipt,
};
