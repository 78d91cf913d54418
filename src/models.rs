use serde::{Deserialize, Serialize};

/// Human-readable names for the two sides of the decision threshold.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Labels {
    pub negative: String,
    pub positive: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            negative: "No Tumor".to_string(),
            positive: "Tumor Detected".to_string(),
        }
    }
}

/// A thresholded model score.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: String,
    /// Percentage in `[0, 100]` for the side of the threshold the score fell on.
    pub confidence: f64,
    pub raw_score: f64,
}

impl Verdict {
    /// Threshold comparison happens on the model's f32 output; the percentage
    /// is computed in f64 so the rounded strings are stable.
    pub fn from_score(score: f32, threshold: f32, labels: &Labels) -> Self {
        let positive = score >= threshold;
        let score = f64::from(score);
        let (label, confidence) = if positive {
            (&labels.positive, score * 100.0)
        } else {
            (&labels.negative, (1.0 - score) * 100.0)
        };

        Self {
            label: label.clone(),
            confidence,
            raw_score: score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub prediction: String,
    pub confidence: String,
    pub raw_score: String,
}

impl From<Verdict> for PredictionResponse {
    fn from(verdict: Verdict) -> Self {
        Self {
            prediction: verdict.label,
            confidence: format!("{:.2}%", verdict.confidence),
            raw_score: format!("{:.4}", verdict.raw_score),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_score_is_positive() {
        let verdict = Verdict::from_score(0.9, 0.5, &Labels::default());
        assert_eq!(verdict.label, "Tumor Detected");
        assert!((verdict.confidence - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_low_score_reports_negative_side() {
        let verdict = Verdict::from_score(0.1, 0.5, &Labels::default());
        assert_eq!(verdict.label, "No Tumor");
        assert!((verdict.confidence - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let verdict = Verdict::from_score(0.5, 0.5, &Labels::default());
        assert_eq!(verdict.label, "Tumor Detected");
        assert!((verdict.confidence - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_custom_threshold() {
        let verdict = Verdict::from_score(0.6, 0.7, &Labels::default());
        assert_eq!(verdict.label, "No Tumor");
        assert!((verdict.confidence - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_response_formatting() {
        let response = PredictionResponse::from(Verdict::from_score(0.98761, 0.5, &Labels::default()));
        assert_eq!(
            response,
            PredictionResponse {
                prediction: "Tumor Detected".to_string(),
                confidence: "98.76%".to_string(),
                raw_score: "0.9876".to_string(),
            }
        );
    }

    #[test]
    fn test_confidence_rounds_in_double_precision() {
        let response = PredictionResponse::from(Verdict::from_score(
            0.0010500087,
            0.5,
            &Labels::default(),
        ));
        assert_eq!(response.prediction, "No Tumor");
        assert_eq!(response.confidence, "99.89%");
        assert_eq!(response.raw_score, "0.0011");
    }

    #[test]
    fn test_response_serializes_expected_keys() {
        let response = PredictionResponse::from(Verdict::from_score(0.0, 0.5, &Labels::default()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["prediction"], "No Tumor");
        assert_eq!(json["confidence"], "100.00%");
        assert_eq!(json["raw_score"], "0.0000");
    }
}
