//! Suitability scoring, ML path.
//!
//! Every candidate gets exactly one score or the whole path fails with
//! `MlServiceUnavailable`. Partial results never leave this module.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ml_client::{MlError, Prediction, PredictionService};
use crate::models::recommendation::ConfidenceTier;
use crate::recommendation::candidates::CandidateSite;
use crate::recommendation::errors::RecommendError;
use crate::recommendation::RecommendConfig;

/// Binary land classification returned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedClass {
    BuiltUp,
    NonBuilt,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityScore {
    pub candidate: CandidateSite,
    pub predicted_class: PredictedClass,
    pub probability: f64,
    pub confidence_tier: ConfidenceTier,
}

impl SuitabilityScore {
    /// Caller must have validated `prediction`.
    pub fn from_prediction(candidate: CandidateSite, prediction: Prediction) -> Self {
        let predicted_class = if prediction.prediction == 1 {
            PredictedClass::BuiltUp
        } else {
            PredictedClass::NonBuilt
        };
        Self {
            candidate,
            predicted_class,
            probability: prediction.probability,
            confidence_tier: ConfidenceTier::from_probability(prediction.probability),
        }
    }
}

/// Scores candidates against the ML prediction service.
pub struct MlScorer {
    service: Arc<dyn PredictionService>,
    patch_size: u32,
    call_timeout: Duration,
    max_concurrency: usize,
}

impl MlScorer {
    pub fn new(service: Arc<dyn PredictionService>, config: &RecommendConfig) -> Self {
        Self {
            service,
            patch_size: config.patch_size,
            call_timeout: config.call_timeout,
            max_concurrency: config.max_concurrent_predictions.max(1),
        }
    }

    /// Returns one score per candidate, in candidate order.
    pub async fn score(
        &self,
        candidates: &[CandidateSite],
    ) -> Result<Vec<SuitabilityScore>, RecommendError> {
        let predictions = if self.service.supports_batch() {
            self.predict_batched(candidates).await
        } else {
            self.predict_concurrently(candidates).await
        }
        .map_err(|e| RecommendError::MlServiceUnavailable(e.to_string()))?;

        info!("ML scored {} candidates", predictions.len());

        Ok(candidates
            .iter()
            .zip(predictions)
            .map(|(site, prediction)| SuitabilityScore::from_prediction(*site, prediction))
            .collect())
    }

    async fn predict_batched(&self, candidates: &[CandidateSite]) -> Result<Vec<Prediction>, MlError> {
        // Same worst-case budget as running the candidates through the pool.
        let waves = candidates.len().div_ceil(self.max_concurrency).max(1);
        let budget = self.call_timeout.saturating_mul(waves as u32);

        let predictions = tokio::time::timeout(
            budget,
            self.service.predict_batch(candidates, self.patch_size),
        )
        .await
        .map_err(|_| MlError::Timeout(budget))??;

        if predictions.len() != candidates.len() {
            return Err(MlError::Malformed(format!(
                "batch returned {} predictions for {} candidates",
                predictions.len(),
                candidates.len()
            )));
        }
        for (index, prediction) in predictions.iter().enumerate() {
            prediction
                .validate()
                .map_err(|e| MlError::Candidate {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(predictions)
    }

    /// One call per candidate on a bounded pool. Results land in the slot of
    /// the originating candidate index; the first failure aborts the rest.
    async fn predict_concurrently(
        &self,
        candidates: &[CandidateSite],
    ) -> Result<Vec<Prediction>, MlError> {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, site) in candidates.iter().copied().enumerate() {
            let service = Arc::clone(&self.service);
            let permits = Arc::clone(&permits);
            let patch_size = self.patch_size;
            let call_timeout = self.call_timeout;

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (index, Err(MlError::Task("prediction pool closed".to_string())))
                    }
                };
                let result = tokio::time::timeout(call_timeout, service.predict(site, patch_size))
                    .await
                    .unwrap_or(Err(MlError::Timeout(call_timeout)));
                (index, result)
            });
        }

        let mut slots: Vec<Option<Prediction>> = vec![None; candidates.len()];

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tasks.abort_all();
                    return Err(MlError::Task(e.to_string()));
                }
            };

            match result.and_then(|p| p.validate().map(|_| p)) {
                Ok(prediction) => {
                    debug!("Candidate {index} scored p={:.3}", prediction.probability);
                    slots[index] = Some(prediction);
                }
                Err(e) => {
                    tasks.abort_all();
                    warn!("ML prediction failed for candidate {index}: {e}");
                    return Err(MlError::Candidate {
                        index,
                        source: Box::new(e),
                    });
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| MlError::Task(format!("no prediction for candidate {index}")))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::ml_client::{MlError, Prediction, PredictionService};
    use crate::recommendation::candidates::CandidateSite;

    #[derive(Debug, Clone, Copy)]
    pub enum StubOutcome {
        Predict(u8, f64),
        /// Responds after the given delay.
        Slow(u8, f64, Duration),
        Hang,
        Fail,
        /// Fails after the given delay.
        FailAfter(Duration),
    }

    /// Counts a call as in flight until its future is dropped.
    struct InFlightGuard(Arc<AtomicUsize>);

    impl InFlightGuard {
        fn enter(counter: &Arc<AtomicUsize>) -> Self {
            counter.fetch_add(1, Ordering::SeqCst);
            Self(Arc::clone(counter))
        }
    }

    impl Drop for InFlightGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Prediction service answering per candidate position.
    pub struct StubPredictor {
        pub sites: Vec<CandidateSite>,
        pub outcomes: Vec<StubOutcome>,
        pub batch: bool,
        pub calls: AtomicUsize,
        in_flight: Arc<AtomicUsize>,
    }

    impl StubPredictor {
        pub fn new(sites: Vec<CandidateSite>, outcomes: Vec<StubOutcome>) -> Self {
            Self {
                sites,
                outcomes,
                batch: false,
                calls: AtomicUsize::new(0),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn batched(mut self) -> Self {
            self.batch = true;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Calls whose futures have started and not yet been dropped.
        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Yields until every aborted call has been dropped by the runtime.
        pub async fn wait_for_release(&self) {
            for _ in 0..64 {
                if self.in_flight() == 0 {
                    return;
                }
                tokio::task::yield_now().await;
            }
        }

        fn outcome_for(&self, site: &CandidateSite) -> StubOutcome {
            self.sites
                .iter()
                .position(|s| s == site)
                .and_then(|i| self.outcomes.get(i).copied())
                .unwrap_or(StubOutcome::Fail)
        }
    }

    #[async_trait]
    impl PredictionService for StubPredictor {
        async fn predict(&self, site: CandidateSite, _patch_size: u32) -> Result<Prediction, MlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _guard = InFlightGuard::enter(&self.in_flight);
            match self.outcome_for(&site) {
                StubOutcome::Predict(prediction, probability) => Ok(Prediction {
                    prediction,
                    probability,
                }),
                StubOutcome::Slow(prediction, probability, delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Prediction {
                        prediction,
                        probability,
                    })
                }
                StubOutcome::Hang => std::future::pending().await,
                StubOutcome::Fail => Err(MlError::Api {
                    status: 503,
                    message: "model not loaded".to_string(),
                }),
                StubOutcome::FailAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(MlError::Api {
                        status: 503,
                        message: "model not loaded".to_string(),
                    })
                }
            }
        }

        async fn predict_batch(
            &self,
            sites: &[CandidateSite],
            patch_size: u32,
        ) -> Result<Vec<Prediction>, MlError> {
            let mut out = Vec::with_capacity(sites.len());
            for site in sites {
                out.push(self.predict(*site, patch_size).await?);
            }
            Ok(out)
        }

        fn supports_batch(&self) -> bool {
            self.batch
        }
    }
}
