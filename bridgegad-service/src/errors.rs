use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bridgegad_core::errors::CoreError;
use bridgegad_io::IoError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("temporary file {path:?} failed: {source}")]
    TempFile {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
    #[error("export task aborted: {0}")]
    Join(String),
}

impl ExportError {
    /// 参数错误属于调用方问题，其余均为服务端失败。
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExportError::Core(CoreError::InvalidParameter { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "导出失败");
        } else {
            warn!(error = %self, "导出请求被拒绝");
        }
        detail_response(status, format!("Export failed: {self}"))
    }
}

pub(crate) fn detail_response(status: StatusCode, detail: String) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server terminated: {0}")]
    Server(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_parameters_map_to_unprocessable() {
        let invalid = ExportError::from(CoreError::invalid_parameter("scale1", "must be > 0"));
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        for err in [
            ExportError::from(CoreError::UnknownLayer("PIER".into())),
            ExportError::from(CoreError::DuplicateLayer("GRID".into())),
            ExportError::from(IoError::Encoding("undeclared layer".into())),
            ExportError::Join("panicked".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{err}");
        }
    }
}
