//! REST API types and error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, SessionError, UploadError};
use crate::session::PendingUpload;

/// A header label offered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Column position, 0-based.
    pub id: usize,
    pub value: String,
}

/// Response to an upload: the session and the columns to choose from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: String,

    /// Always "ready"; failures use [`error_response`].
    pub status: String,

    pub file_name: Option<String>,

    /// Delimiter spec the upload is parsed with ("tab" or one character).
    pub delimiter: String,

    /// Encoding the upload was decoded from.
    pub encoding: String,

    pub labels: Vec<Label>,

    /// Seconds until the session expires.
    pub expires_in: u64,
}

impl UploadResponse {
    pub fn new(session_id: String, upload: &PendingUpload, expires_in: u64) -> Self {
        Self {
            session_id,
            status: "ready".to_string(),
            file_name: upload.file_name.clone(),
            delimiter: upload.delimiter.to_spec(),
            encoding: upload.encoding.clone(),
            labels: upload
                .labels
                .iter()
                .enumerate()
                .map(|(id, value)| Label {
                    id,
                    value: value.clone(),
                })
                .collect(),
            expires_in,
        }
    }
}

/// Body of a conversion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// Columns kept as identifiers on every output row, in output order.
    #[serde(default)]
    pub fixed: Vec<String>,
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Session(SessionError::NotFound) => StatusCode::NOT_FOUND,
            ServerError::Session(SessionError::MissingCookie) => StatusCode::BAD_REQUEST,
            ServerError::Session(SessionError::Poisoned) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Upload(UploadError::MissingFile(_) | UploadError::Multipart(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Upload(UploadError::Reshape(e)) | ServerError::Reshape(e) => {
                if e.is_validation_error() || e.is_read_error() {
                    StatusCode::UNPROCESSABLE_ENTITY
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReshapeError;
    use crate::reshape::Delimiter;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::from(SessionError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::from(ReshapeError::FixedColumnNotFound(vec!["c".into()])).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServerError::from(UploadError::TooLarge { size: 10, max: 5 }).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServerError::from(UploadError::MissingFile("file".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_upload_response_labels() {
        let dir = tempfile::tempdir().unwrap();
        let upload = PendingUpload::stage(
            dir.path(),
            b"id\tvalue\n1\t2\n",
            Delimiter::TAB,
            Some("t.tsv".into()),
        )
        .unwrap();
        let response = UploadResponse::new("abc".into(), &upload, 3600);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["delimiter"], "tab");
        assert_eq!(json["labels"][1]["id"], 1);
        assert_eq!(json["labels"][1]["value"], "value");
        assert_eq!(json["expiresIn"], 3600);
    }

    #[test]
    fn test_convert_request_defaults_to_no_fixed_columns() {
        let request: ConvertRequest = serde_json::from_str("{}").unwrap();
        assert!(request.fixed.is_empty());
    }
}
