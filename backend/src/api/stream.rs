//! Streaming a melt into an HTTP response body.
//!
//! The melt core is synchronous, so it runs on a blocking thread and writes
//! into a channel; the receiving end is the response body. Backpressure
//! comes from the bounded channel, and a client that goes away closes the
//! channel, which the melt sees as a write error.

use std::io::{self, Write};

use axum::body::{Body, Bytes};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::logs::{log_error, log_success};
use crate::reshape::{melt_with_plan, ColumnPlan};
use crate::session::PendingUpload;

/// Chunks buffered between the melt thread and the response.
const CHANNEL_CAPACITY: usize = 16;

/// `io::Write` adapter sending each write as one body chunk.
///
/// Must only be used from a blocking context.
pub struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self { tx }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Melt the staged upload with `plan`, streaming CSV into the returned body.
///
/// A failure after streaming started ends the body with an error, which
/// aborts the response instead of truncating it silently. Progress is
/// logged to `session`'s feed.
pub fn melt_to_body(upload: PendingUpload, plan: ColumnPlan, session: String) -> Body {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let result = upload
            .open()
            .map_err(|e| format!("cannot open staged upload: {e}"))
            .and_then(|file| {
                melt_with_plan(file, ChannelWriter::new(tx.clone()), &plan, upload.delimiter)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(stats) => log_success(
                &session,
                format!(
                    "Converted {}: {} rows → {} records",
                    upload.file_name.as_deref().unwrap_or("upload"),
                    stats.rows,
                    stats.records
                ),
            ),
            Err(message) => {
                log_error(&session, format!("Conversion aborted: {message}"));
                let _ = tx.blocking_send(Err(io::Error::other(message)));
            }
        }
    });

    Body::from_stream(ReceiverStream::new(rx))
}
