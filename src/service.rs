//! Prediction service: validate → derive → assemble → infer → shape.

use crate::artifacts::FeatureContract;
use crate::error::{InferenceError, ServiceError};
use crate::features::{assemble, FeatureDeriver, FeatureVector};
use crate::metrics::{RequestKind, ServiceMetrics};
use crate::models::ChurnModel;
use crate::types::{AttributionResult, Driver, PredictionResult, RawCustomerRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Stateless request orchestration over the shared contract and model.
///
/// Every dependency is injected at construction; nothing here is mutated
/// after startup apart from the metrics counters.
pub struct PredictionService {
    contract: Arc<FeatureContract>,
    model: Arc<dyn ChurnModel>,
    deriver: FeatureDeriver,
    threshold: f64,
    max_drivers: usize,
    metrics: Arc<ServiceMetrics>,
}

impl PredictionService {
    pub fn new(
        contract: Arc<FeatureContract>,
        model: Arc<dyn ChurnModel>,
        deriver: FeatureDeriver,
        threshold: f64,
        max_drivers: usize,
    ) -> Self {
        Self {
            contract,
            model,
            deriver,
            threshold,
            max_drivers,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn contract(&self) -> &FeatureContract {
        &self.contract
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Validate the record and build its model input.
    pub fn feature_vector(&self, raw: &RawCustomerRecord) -> Result<FeatureVector, ServiceError> {
        if let Err(e) = raw.validate() {
            self.metrics.record_validation_failure();
            warn!(error = %e, "Customer record rejected");
            return Err(e.into());
        }

        let derived = self.deriver.derive(raw);
        Ok(assemble(raw, &derived, &self.contract))
    }

    /// Churn probability and decision for one customer.
    pub fn predict(&self, raw: &RawCustomerRecord) -> Result<PredictionResult, ServiceError> {
        let start = Instant::now();
        let vector = self.feature_vector(raw)?;

        let probability = self
            .model
            .predict(&vector)
            .map_err(|e| self.inference_failed(e))?;
        let result = PredictionResult::from_probability(probability, self.threshold);

        self.metrics
            .record_success(RequestKind::Predict, start.elapsed(), Some(probability));
        if result.is_churn {
            self.metrics.record_churn_flagged();
        }

        debug!(
            probability = result.probability,
            is_churn = result.is_churn,
            latency_us = start.elapsed().as_micros(),
            "Prediction served"
        );

        Ok(result)
    }

    /// Top feature-level drivers of one customer's prediction.
    pub fn explain_prediction(
        &self,
        raw: &RawCustomerRecord,
    ) -> Result<AttributionResult, ServiceError> {
        let start = Instant::now();
        let vector = self.feature_vector(raw)?;

        let scores = self
            .model
            .explain(&vector)
            .map_err(|e| self.inference_failed(e))?;
        if scores.len() != vector.len() {
            return Err(self.inference_failed(InferenceError::AttributionShape {
                expected: vector.len(),
                actual: scores.len(),
            }));
        }

        let top_drivers = rank_drivers(&vector, &scores, self.max_drivers);

        self.metrics
            .record_success(RequestKind::Explain, start.elapsed(), None);
        debug!(
            drivers = top_drivers.len(),
            latency_us = start.elapsed().as_micros(),
            "Explanation served"
        );

        Ok(AttributionResult { top_drivers })
    }

    fn inference_failed(&self, e: InferenceError) -> ServiceError {
        self.metrics.record_inference_failure();
        error!(model = %self.model.name(), error = %e, "Inference failed");
        e.into()
    }
}

/// Pair columns with their values and scores, drop non-finite scores, sort
/// by descending absolute score (ties keep contract order) and keep `limit`.
pub fn rank_drivers(vector: &FeatureVector, scores: &[f64], limit: usize) -> Vec<Driver> {
    let mut drivers: Vec<Driver> = vector
        .iter()
        .zip(scores)
        .filter(|(_, score)| score.is_finite())
        .map(|((feature, value), &impact)| Driver {
            feature: feature.to_string(),
            value: value.to_json_scalar(),
            impact,
        })
        .collect();

    drivers.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    drivers.truncate(limit);
    drivers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_contract, sample_record, sample_service};
    use crate::types::FeatureValue;

    struct FixedModel {
        probability: f64,
        scores: Vec<f64>,
    }

    impl ChurnModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _vector: &FeatureVector) -> Result<f64, InferenceError> {
            crate::models::inference::checked_probability(self.probability)
        }

        fn explain(&self, _vector: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
            Ok(self.scores.clone())
        }
    }

    fn service_with(model: FixedModel) -> PredictionService {
        PredictionService::new(
            Arc::new(sample_contract()),
            Arc::new(model),
            FeatureDeriver::default(),
            0.5,
            5,
        )
    }

    #[test]
    fn test_reference_customer_prediction() {
        let service = sample_service();
        let result = service.predict(&sample_record()).unwrap();

        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(result.is_churn, result.probability >= 0.5);
        assert_eq!(service.predict(&sample_record()).unwrap(), result);
    }

    #[test]
    fn test_threshold_boundary() {
        let service = service_with(FixedModel {
            probability: 0.5,
            scores: vec![],
        });
        assert!(service.predict(&sample_record()).unwrap().is_churn);
    }

    #[test]
    fn test_invalid_record_never_reaches_model() {
        let service = sample_service();
        let mut record = sample_record();
        record.tenure = -3;

        assert!(matches!(
            service.predict(&record),
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(service.metrics().snapshot().validation_failures, 1);
        assert_eq!(service.metrics().snapshot().predictions, 0);
    }

    #[test]
    fn test_model_failure_surfaces_as_inference_error() {
        let service = service_with(FixedModel {
            probability: f64::NAN,
            scores: vec![],
        });

        assert!(matches!(
            service.predict(&sample_record()),
            Err(ServiceError::Inference(InferenceError::InvalidProbability(_)))
        ));
        assert_eq!(service.metrics().snapshot().inference_failures, 1);
    }

    #[test]
    fn test_misaligned_attributions_rejected() {
        let service = service_with(FixedModel {
            probability: 0.2,
            scores: vec![0.1, 0.2],
        });

        assert!(matches!(
            service.explain_prediction(&sample_record()),
            Err(ServiceError::Inference(InferenceError::AttributionShape { .. }))
        ));
    }

    #[test]
    fn test_explanation_is_ranked_and_truncated() {
        let service = sample_service();
        let result = service.explain_prediction(&sample_record()).unwrap();

        assert!(result.top_drivers.len() <= 5);
        assert!(!result.top_drivers.is_empty());
        for pair in result.top_drivers.windows(2) {
            assert!(pair[0].impact.abs() >= pair[1].impact.abs());
        }
        assert!(result.top_drivers.iter().all(|d| d.impact.is_finite()));
    }

    #[test]
    fn test_rank_drivers_filters_non_finite() {
        let vector = FeatureVector::from_parts(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                FeatureValue::Number(1.0),
                FeatureValue::Number(f64::NAN),
                FeatureValue::text("x"),
                FeatureValue::Missing,
            ],
        );
        let scores = [0.1, -0.9, f64::NAN, f64::INFINITY];

        let drivers = rank_drivers(&vector, &scores, 5);

        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].feature, "b");
        assert_eq!(drivers[0].value, serde_json::Value::Null);
        assert_eq!(drivers[1].feature, "a");
    }

    #[test]
    fn test_rank_drivers_ties_keep_order() {
        let vector = FeatureVector::from_parts(
            (0..7).map(|i| format!("f{i}")).collect(),
            (0..7).map(|_| FeatureValue::Number(0.0)).collect(),
        );
        let scores = [0.1, -0.3, 0.3, 0.05, 0.2, -0.2, 0.01];

        let names: Vec<_> = rank_drivers(&vector, &scores, 5)
            .into_iter()
            .map(|d| d.feature)
            .collect();
        assert_eq!(names, vec!["f1", "f2", "f4", "f5", "f0"]);
    }
}
