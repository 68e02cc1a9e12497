use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use super::dto::{Analysis, NewScan, ScanRecord, ScanRequest, ScanResponse};
use super::repo::ScanStore;
use crate::{error::AppError, vision::VisionClient};

pub const UNKNOWN_FOOD: &str = "Unknown Food";

pub const IDENTIFY_FOOD_PROMPT: &str = "Identify the food in this image. Return ONLY a JSON object \
with a 'foodName' field. If no food is detected, return 'Unknown Food'.";

const DATA_URL_SCHEME: &str = "data:";
const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Dish name plus the document it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub food_name: String,
    pub analysis: Analysis,
}

#[derive(Clone)]
pub struct ScanService {
    vision: Arc<dyn VisionClient>,
    store: Arc<dyn ScanStore>,
    image_inline_limit: usize,
}

impl ScanService {
    pub fn new(
        vision: Arc<dyn VisionClient>,
        store: Arc<dyn ScanStore>,
        image_inline_limit: usize,
    ) -> Self {
        Self {
            vision,
            store,
            image_inline_limit,
        }
    }

    #[instrument(skip_all)]
    pub async fn process(&self, req: ScanRequest) -> Result<ScanResponse, AppError> {
        let image = req.validate()?;
        let image_url = normalize_image(image);

        let content = self
            .vision
            .complete_with_image(IDENTIFY_FOOD_PROMPT, &image_url)
            .await
            .map_err(AppError::Upstream)?;

        let Identification {
            food_name,
            analysis,
        } = interpret_model_output(&content)?;

        let stored_image = inline_image_url(image_url, self.image_inline_limit);
        let inlined = stored_image.is_some();

        let record = self
            .store
            .create_scan(NewScan {
                food_name: food_name.clone(),
                image_url: stored_image,
                analysis: analysis.clone(),
            })
            .await
            .map_err(AppError::Persistence)?;

        info!(scan_id = record.id, food_name = %record.food_name, inlined, "scan stored");
        Ok(ScanResponse {
            food_name,
            analysis: Some(analysis),
        })
    }

    #[instrument(skip_all)]
    pub async fn list(&self) -> Result<Vec<ScanRecord>, AppError> {
        self.store.list_scans().await.map_err(AppError::Persistence)
    }
}

/// Wraps a bare base64 payload in a JPEG data URL; data URLs pass through.
pub fn normalize_image(image: String) -> String {
    if image.starts_with(DATA_URL_SCHEME) {
        image
    } else {
        format!("{JPEG_DATA_URL_PREFIX}{image}")
    }
}

/// Reads the dish name out of the model reply. Text that is not JSON at all is
/// kept as `{ "foodName": <text> }` instead of failing the scan; JSON that is
/// not an object is kept under `value` and names nothing.
pub fn interpret_model_output(content: &str) -> Result<Identification, AppError> {
    if content.is_empty() {
        return Err(AppError::Upstream(anyhow::anyhow!(
            "no content received from model"
        )));
    }

    let analysis = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut analysis = Analysis::new();
            analysis.insert("value".into(), other);
            analysis
        }
        Err(_) => {
            warn!(content_len = content.len(), "model reply is not JSON; using raw text");
            food_name_only(content.to_string())
        }
    };

    let food_name = match analysis.get("foodName") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => UNKNOWN_FOOD.to_string(),
    };

    Ok(Identification {
        food_name,
        analysis,
    })
}

/// Keeps the image only while it is small enough for the text column.
pub fn inline_image_url(image_url: String, limit: usize) -> Option<String> {
    (image_url.len() <= limit).then_some(image_url)
}

fn food_name_only(name: String) -> Analysis {
    let mut analysis = Analysis::new();
    analysis.insert("foodName".into(), Value::String(name));
    analysis
}
