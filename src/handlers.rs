use std::sync::Arc;

use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::PredictError;
use crate::models::{PredictionResponse, Verdict};
use crate::preprocess::preprocess;

pub const HEALTH_MESSAGE: &str = "Brain Tumor Detection API is running!";
const FILE_FIELD: &str = "file";

/// Shared across workers. `classifier` is `None` when the model failed to load at startup.
pub struct AppState {
    pub classifier: Option<Arc<dyn Classifier>>,
    pub config: Config,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health_check)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(HEALTH_MESSAGE)
}

pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    let span = tracing::info_span!("predict", request_id = %Uuid::new_v4());
    run_prediction(state, payload).instrument(span).await
}

async fn run_prediction(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    let classifier = match &state.classifier {
        Some(classifier) => Arc::clone(classifier),
        None => {
            tracing::error!("prediction requested but no model is loaded");
            return Err(PredictError::ModelNotLoaded);
        }
    };

    let upload = read_upload(payload, state.config.max_upload_bytes)
        .await
        .map_err(|e| {
            tracing::warn!("rejected upload: {}", e);
            e
        })?;

    let opts = state.config.preprocess;
    let score = web::block(move || -> Result<f32, PredictError> {
        let input = preprocess(&upload, &opts)?;
        Ok(classifier.predict(input)?)
    })
    .await?
    .map_err(|e| {
        tracing::error!("error during prediction: {}", e);
        e
    })?;

    let verdict = Verdict::from_score(score, state.config.threshold, &state.config.labels);
    tracing::info!("raw prediction score: {:.4}", score);
    tracing::info!("result: {} ({:.2}%)", verdict.label, verdict.confidence);

    Ok(HttpResponse::Ok().json(PredictionResponse::from(verdict)))
}

/// Filename of `field` if it is the upload to classify. Form values without a
/// filename, other field names, and any `file` field after the first are not.
fn upload_filename(field: &Field, taken: bool) -> Option<String> {
    if taken {
        return None;
    }
    let disposition = field.content_disposition();
    if disposition.get_name() != Some(FILE_FIELD) {
        return None;
    }
    disposition.get_filename().map(str::to_owned)
}

/// Pulls the bytes of the first `file` field out of the multipart stream.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, PredictError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let filename = match upload_filename(&field, upload.is_some()) {
            Some(filename) => filename,
            None => {
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
                continue;
            }
        };

        if filename.is_empty() {
            return Err(PredictError::EmptyFilename);
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > limit {
                return Err(PredictError::TooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        tracing::debug!(filename = %filename, bytes = data.len(), "received upload");
        upload = Some(data);
    }

    upload.ok_or(PredictError::NoFile)
}
