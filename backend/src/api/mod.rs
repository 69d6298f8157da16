//! HTTP API module.
//!
//! The server, its request/response types, the streaming response body and
//! the SSE log feed.

pub mod logs;
pub mod server;
pub mod stream;
pub mod types;

pub use logs::*;
pub use server::{router, session_key, start_server, AppState};
pub use stream::{melt_to_body, ChannelWriter};
pub use types::*;
