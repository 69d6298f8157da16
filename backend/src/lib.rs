//! # tableconverter - streaming wide-to-long reshaping
//!
//! Converts tables with one column per measurement into long format: one
//! row per measurement, keyed by a generated `eventid` and a chosen set of
//! fixed (identifier) columns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Upload    │────▶│   Parser    │────▶│   Session   │────▶│    Melt     │
//! │ (multipart) │     │ (to UTF-8)  │     │ (temp file) │     │ (streaming) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tableconverter::melt;
//!
//! let input = "plot, jan ,feb\nA,3,4\n";
//! let mut output = Vec::new();
//! melt(input.as_bytes(), &mut output, &mut ["plot".to_string()], ",").unwrap();
//!
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "eventid,plot,measurementType,measurementValue\n1,A,jan,3\n1,A,feb,4\n"
//! );
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`reshape`] - Melt core: delimiter, header validation, streaming rewrite
//! - [`parser`] - Upload encoding detection and decoding
//! - [`session`] - Pending-upload sessions with expiry
//! - [`config`] - Service configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod reshape;

// Uploads
pub mod parser;
pub mod session;

// Service
pub mod api;
pub mod config;
pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ReshapeError, ReshapeResult, ServerError, ServerResult, SessionError, SessionResult,
    UploadError, UploadResult,
};

// =============================================================================
// Re-exports - Melt core
// =============================================================================

pub use reshape::{
    contains, index_of, melt, melt_with_plan, read_labels, validate, ColumnPlan, Delimiter,
    MeltStats,
};

// =============================================================================
// Re-exports - Uploads and sessions
// =============================================================================

pub use parser::{decode_content, detect_encoding, normalize_upload, NormalizedUpload};

pub use session::{
    spawn_sweeper, Clock, InMemorySessionStore, ManualClock, PendingUpload, SessionStore,
    SystemClock,
};

// =============================================================================
// Re-exports - Service
// =============================================================================

pub use config::{ConfigError, ServerConfig};

pub use api::types::{error_response, ConvertRequest, Label, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
