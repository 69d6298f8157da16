//! Staged uploads waiting for a conversion request.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempPath;

use crate::error::{ReshapeResult, UploadResult};
use crate::parser::normalize_upload;
use crate::reshape::{read_labels, ColumnPlan, Delimiter};

/// An uploaded table staged on disk as UTF-8.
///
/// The staged file is deleted when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    path: Arc<TempPath>,
    /// Field delimiter chosen at upload time.
    pub delimiter: Delimiter,
    /// Trimmed header labels, in column order.
    pub labels: Vec<String>,
    /// Client-side file name, if the form sent one.
    pub file_name: Option<String>,
    /// Encoding the upload was decoded from.
    pub encoding: String,
    pub created_at: DateTime<Utc>,
}

impl PendingUpload {
    /// Decode `bytes` to UTF-8, write them to a temp file under `dir` and
    /// read the header labels.
    ///
    /// Fails if the upload has no header or its header repeats a label.
    pub fn stage(
        dir: &Path,
        bytes: &[u8],
        delimiter: Delimiter,
        file_name: Option<String>,
    ) -> UploadResult<Self> {
        Self::stage_at(dir, bytes, delimiter, file_name, Utc::now())
    }

    /// [`PendingUpload::stage`] stamped with `created_at` instead of the system time.
    pub fn stage_at(
        dir: &Path,
        bytes: &[u8],
        delimiter: Delimiter,
        file_name: Option<String>,
        created_at: DateTime<Utc>,
    ) -> UploadResult<Self> {
        let upload = normalize_upload(bytes);
        let labels = read_labels(upload.text.as_bytes(), delimiter)?;
        crate::reshape::validate(&labels, &[] as &[&str])?;

        let mut staged = tempfile::Builder::new()
            .prefix("tableconverter")
            .suffix(".csv")
            .tempfile_in(dir)?;
        staged.write_all(upload.text.as_bytes())?;
        staged.flush()?;

        Ok(Self {
            path: Arc::new(staged.into_temp_path()),
            delimiter,
            labels,
            file_name,
            encoding: upload.encoding,
            created_at,
        })
    }

    /// Location of the staged copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the staged copy for a fresh pass from its first byte.
    pub fn open(&self) -> io::Result<File> {
        File::open(self.path())
    }

    /// Validate `fixed` against the staged header.
    pub fn column_plan(&self, fixed: Vec<String>) -> ReshapeResult<ColumnPlan> {
        ColumnPlan::new(self.labels.clone(), fixed)
    }
}
