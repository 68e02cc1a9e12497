use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::scans::dto::ValidationError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Body refused before it could be read as JSON (too large, wrong media type).
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Upstream model error: {0:#}")]
    Upstream(anyhow::Error),

    #[error("Persistence error: {0:#}")]
    Persistence(anyhow::Error),
}

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::InvalidInput {
            message: e.message,
            field: e.field,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            status @ (StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNSUPPORTED_MEDIA_TYPE) => {
                AppError::Rejected {
                    status,
                    message: rejection.body_text(),
                }
            }
            _ => AppError::InvalidInput {
                message: rejection.body_text(),
                field: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InvalidInput { message, field } => {
                tracing::warn!(%message, field = ?field, "invalid input");
                (StatusCode::BAD_REQUEST, ErrorBody { message, field })
            }
            AppError::Rejected { status, message } => {
                tracing::warn!(%status, %message, "request rejected");
                (status, ErrorBody { message, field: None })
            }
            AppError::Upstream(e) => {
                tracing::error!(error = ?e, "upstream model error");
                (StatusCode::INTERNAL_SERVER_ERROR, internal_body())
            }
            AppError::Persistence(e) => {
                tracing::error!(error = ?e, "persistence error");
                (StatusCode::INTERNAL_SERVER_ERROR, internal_body())
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal_body() -> ErrorBody {
    ErrorBody {
        message: INTERNAL_MESSAGE.to_string(),
        field: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_input_is_400_with_field() {
        let res = AppError::InvalidInput {
            message: "Image data is required".into(),
            field: Some("image".into()),
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["message"], "Image data is required");
        assert_eq!(json["field"], "image");
    }

    #[tokio::test]
    async fn invalid_input_without_field_omits_key() {
        let res = AppError::InvalidInput {
            message: "bad json".into(),
            field: None,
        }
        .into_response();

        let json = body_json(res).await;
        assert!(json.get("field").is_none());
    }

    #[tokio::test]
    async fn rejected_keeps_its_status() {
        let res = AppError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "Failed to buffer the request body: length limit exceeded".into(),
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(res).await;
        assert!(json["message"].as_str().is_some_and(|m| m.contains("length limit")));
        assert!(json.get("field").is_none());
    }

    #[tokio::test]
    async fn upstream_and_persistence_collapse_to_generic_500() {
        for err in [
            AppError::Upstream(anyhow::anyhow!("connection reset by peer")),
            AppError::Persistence(anyhow::anyhow!("relation \"scans\" does not exist")),
        ] {
            let res = err.into_response();
            assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let json = body_json(res).await;
            assert_eq!(json, serde_json::json!({ "message": "Internal server error" }));
        }
    }
}
