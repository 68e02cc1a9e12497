use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opaque model output, kept verbatim apart from reading `foodName`.
pub type Analysis = serde_json::Map<String, serde_json::Value>;

/// A stored scan as returned by `GET /api/scans`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: i32,
    pub food_name: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub analysis: Analysis,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Insert payload; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScan {
    pub food_name: String,
    pub image_url: Option<String>,
    pub analysis: Analysis,
}

/// Body of `POST /api/scan`. `image` stays untyped until `validate` so a
/// wrong type is reported against the field.
#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub food_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub field: Option<String>,
}

impl ScanRequest {
    #[cfg(test)]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: Some(serde_json::Value::String(image.into())),
        }
    }

    /// Returns the image payload, or the reason it cannot be used.
    pub fn validate(self) -> Result<String, ValidationError> {
        match self.image {
            Some(serde_json::Value::String(image)) if !image.is_empty() => Ok(image),
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) => {
                Err(image_error("Image data is required"))
            }
            Some(_) => Err(image_error("Image must be a string")),
        }
    }
}

fn image_error(message: &str) -> ValidationError {
    ValidationError {
        message: message.into(),
        field: Some("image".into()),
    }
}
