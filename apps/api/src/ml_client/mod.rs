//! ML Client: HTTP adapter for the satellite-imagery classification service.
//!
//! The service classifies the image patch around a coordinate as built-up (1)
//! or not (0) and reports the positive-class probability. The recommendation
//! engine talks to it through the `PredictionService` trait only.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::recommendation::candidates::CandidateSite;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ML service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed prediction: {0}")]
    Malformed(String),

    #[error("Prediction timed out after {0:?}")]
    Timeout(Duration),

    #[error("candidate {index}: {source}")]
    Candidate {
        index: usize,
        #[source]
        source: Box<MlError>,
    },

    #[error("Prediction task failed: {0}")]
    Task(String),
}

/// One model output for one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 = built-up, 0 = not built-up.
    pub prediction: u8,
    pub probability: f64,
}

impl Prediction {
    /// Rejects outputs outside the model's contract.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.prediction > 1 {
            return Err(MlError::Malformed(format!(
                "prediction must be 0 or 1, got {}",
                self.prediction
            )));
        }
        if !self.probability.is_finite() || !(0.0..=1.0).contains(&self.probability) {
            return Err(MlError::Malformed(format!(
                "probability must be within [0, 1], got {}",
                self.probability
            )));
        }
        Ok(())
    }
}

/// Per-coordinate model predictions, optionally batched.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, site: CandidateSite, patch_size: u32) -> Result<Prediction, MlError>;

    /// Must return one prediction per input, in input order.
    async fn predict_batch(
        &self,
        sites: &[CandidateSite],
        patch_size: u32,
    ) -> Result<Vec<Prediction>, MlError>;

    fn supports_batch(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    latitude: f64,
    longitude: f64,
    patch_size: u32,
}

#[derive(Debug, Serialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct BatchPredictRequest {
    locations: Vec<Location>,
    patch_size: u32,
}

#[derive(Debug, Deserialize)]
struct BatchPredictResponse {
    predictions: Vec<Prediction>,
}

/// Liveness report from `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlHealth {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

/// Metadata recorded when the classifier was exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    #[serde(default)]
    pub model_type: Option<String>,
    /// Either a number or the literal "unknown" when not recorded at export.
    #[serde(default)]
    pub accuracy: Option<serde_json::Value>,
    #[serde(default)]
    pub trained_on: Option<String>,
    #[serde(default)]
    pub n_estimators: Option<u32>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

/// HTTP client for the ML prediction service.
///
/// Prediction requests carry no client-side deadline: `MlScorer` bounds each
/// call with `ML_TIMEOUT_SECS` and a batch with its scaled budget. Only the
/// status endpoints use a fixed request timeout.
#[derive(Clone)]
pub struct MlClient {
    client: Client,
    base_url: String,
    batch_enabled: bool,
    status_timeout: Duration,
}

impl MlClient {
    pub fn new(base_url: &str, batch_enabled: bool) -> Result<Self, MlError> {
        Ok(Self {
            client: Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_enabled,
            status_timeout: STATUS_TIMEOUT,
        })
    }

    pub fn with_status_timeout(mut self, status_timeout: Duration) -> Self {
        self.status_timeout = status_timeout;
        self
    }

    pub async fn health(&self) -> Result<MlHealth, MlError> {
        self.get_json("/health").await
    }

    pub async fn model_info(&self) -> Result<ModelInfo, MlError> {
        self.get_json("/model/info").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, MlError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .timeout(self.status_timeout)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| MlError::Malformed(format!("{path}: {e}")))
    }
}

#[async_trait]
impl PredictionService for MlClient {
    async fn predict(&self, site: CandidateSite, patch_size: u32) -> Result<Prediction, MlError> {
        let body = PredictRequest {
            latitude: site.latitude,
            longitude: site.longitude,
            patch_size,
        };
        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| MlError::Malformed(e.to_string()))?;
        prediction.validate()?;

        debug!(
            "Prediction at ({:.5}, {:.5}): class={} p={:.3}",
            site.latitude, site.longitude, prediction.prediction, prediction.probability
        );
        Ok(prediction)
    }

    async fn predict_batch(
        &self,
        sites: &[CandidateSite],
        patch_size: u32,
    ) -> Result<Vec<Prediction>, MlError> {
        let body = BatchPredictRequest {
            locations: sites
                .iter()
                .map(|s| Location {
                    latitude: s.latitude,
                    longitude: s.longitude,
                })
                .collect(),
            patch_size,
        };
        let response = self
            .client
            .post(format!("{}/predict/batch", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let batch: BatchPredictResponse = response
            .json()
            .await
            .map_err(|e| MlError::Malformed(e.to_string()))?;

        if batch.predictions.len() != sites.len() {
            return Err(MlError::Malformed(format!(
                "batch returned {} predictions for {} locations",
                batch.predictions.len(),
                sites.len()
            )));
        }
        for prediction in &batch.predictions {
            prediction.validate()?;
        }

        debug!("Batch prediction returned {} results", batch.predictions.len());
        Ok(batch.predictions)
    }

    fn supports_batch(&self) -> bool {
        self.batch_enabled
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, MlError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(MlError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn site(latitude: f64, longitude: f64) -> CandidateSite {
        CandidateSite {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_prediction_validation() {
        assert!(Prediction { prediction: 1, probability: 0.9 }.validate().is_ok());
        assert!(Prediction { prediction: 2, probability: 0.9 }.validate().is_err());
        assert!(Prediction { prediction: 0, probability: 1.2 }.validate().is_err());
        assert!(Prediction { prediction: 0, probability: f64::NAN }.validate().is_err());
    }

    #[tokio::test]
    async fn test_predict_sends_coordinate_and_patch_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(body_partial_json(json!({"latitude": -1.95, "longitude": 30.06, "patch_size": 64})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"prediction": 1, "probability": 0.87})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), false).unwrap();
        let prediction = client.predict(site(-1.95, 30.06), 64).await.unwrap();
        assert_eq!(prediction.prediction, 1);
        assert!((prediction.probability - 0.87).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_predict_rejects_out_of_range_probability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"prediction": 1, "probability": 3.0})),
            )
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), false).unwrap();
        let err = client.predict(site(-1.95, 30.06), 64).await.unwrap_err();
        assert!(matches!(err, MlError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_predict_surfaces_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), false).unwrap();
        let err = client.predict(site(-1.95, 30.06), 64).await.unwrap_err();
        match err {
            MlError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model not loaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_timeout_does_not_cap_predictions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"prediction": 1, "probability": 0.8}))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ok", "model_loaded": true}))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), false)
            .unwrap()
            .with_status_timeout(Duration::from_millis(150));

        let prediction = client.predict(site(-1.95, 30.06), 64).await.unwrap();
        assert_eq!(prediction.prediction, 1);

        match client.health().await.unwrap_err() {
            MlError::Http(e) => assert!(e.is_timeout(), "got {e}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_length_mismatch_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{"prediction": 1, "probability": 0.7}]
            })))
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), true).unwrap();
        let err = client
            .predict_batch(&[site(-1.95, 30.06), site(-1.96, 30.07)], 64)
            .await
            .unwrap_err();
        assert!(matches!(err, MlError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [
                    {"prediction": 1, "probability": 0.91},
                    {"prediction": 0, "probability": 0.12}
                ]
            })))
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), true).unwrap();
        let predictions = client
            .predict_batch(&[site(-1.95, 30.06), site(-1.96, 30.07)], 64)
            .await
            .unwrap();
        assert_eq!(predictions[0].prediction, 1);
        assert_eq!(predictions[1].prediction, 0);
    }

    #[tokio::test]
    async fn test_model_info_accepts_unknown_accuracy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/model/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": "1.0.0",
                "model_type": "RandomForestClassifier",
                "accuracy": "unknown",
                "feature_names": ["R_mean", "R_std", "NDVI_mean", "NDVI_std"]
            })))
            .mount(&server)
            .await;

        let client = MlClient::new(&server.uri(), true).unwrap();
        let info = client.model_info().await.unwrap();
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.feature_names.len(), 4);
        assert_eq!(info.accuracy, Some(json!("unknown")));
    }
}
