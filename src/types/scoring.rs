//! Scoring request/result and risk bands

use serde::{Deserialize, Serialize};
use crate::{RISK_THRESHOLD_HIGH, RISK_THRESHOLD_MEDIUM};

/// Body text sent for classification. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    pub body_text: String,
}

impl ScoringRequest {
    pub fn new(body_text: impl Into<String>) -> Self {
        Self { body_text: body_text.into() }
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringResult {
    Success { probability: f64 },
    Failure { reason: String },
}

impl ScoringResult {
    /// Success with the probability normalized into [0, 1]
    pub fn success(raw: f64) -> Self {
        ScoringResult::Success { probability: normalize_probability(raw) }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ScoringResult::Failure { reason: reason.into() }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            ScoringResult::Success { probability } => Some(*probability),
            ScoringResult::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScoringResult::Success { .. })
    }
}

/// Normalization rule for classifier output: non-finite becomes 0,
/// everything else is clamped into [0, 1].
///
/// A 0 produced here is indistinguishable from a confident "safe" verdict.
pub fn normalize_probability(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Color band of a displayed score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// > 0.85 high, > 0.5 medium, else low
    pub fn from_probability(probability: f64) -> Self {
        if probability > RISK_THRESHOLD_HIGH {
            RiskBand::High
        } else if probability > RISK_THRESHOLD_MEDIUM {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    /// CSS color used on the panel
    pub fn css_color(self) -> &'static str {
        match self {
            RiskBand::High => "#d93025",
            RiskBand::Medium => "#f29900",
            RiskBand::Low => "#188038",
        }
    }

    /// ANSI color code for terminal display
    pub fn color_code(self) -> &'static str {
        match self {
            RiskBand::High => "\x1b[31m",   // Red
            RiskBand::Medium => "\x1b[33m", // Orange/Yellow
            RiskBand::Low => "\x1b[32m",    // Green
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiskBand::Low => "LOW",
            RiskBand::Medium => "MEDIUM",
            RiskBand::High => "HIGH",
        };
        write!(f, "{}", name)
    }
}

/// Percentage label: probability × 100 with two decimals, e.g. "90.00%"
pub fn percent_label(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(RiskBand::from_probability(0.90), RiskBand::High);
        assert_eq!(RiskBand::from_probability(0.85), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.60), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.50), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.10), RiskBand::Low);
    }

    #[test]
    fn test_percent_label() {
        assert_eq!(percent_label(0.90), "90.00%");
        assert_eq!(percent_label(0.60), "60.00%");
        assert_eq!(percent_label(0.10), "10.00%");
        assert_eq!(percent_label(0.123456), "12.35%");
        assert_eq!(percent_label(0.0), "0.00%");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_probability(1.7), 1.0);
        assert_eq!(normalize_probability(-0.2), 0.0);
        assert_eq!(normalize_probability(f64::NAN), 0.0);
        assert_eq!(normalize_probability(0.42), 0.42);
    }

    #[test]
    fn test_result_accessors() {
        assert_eq!(ScoringResult::success(0.3).probability(), Some(0.3));
        let failed = ScoringResult::failure("denied");
        assert!(!failed.is_success());
        assert_eq!(failed.probability(), None);
    }
}
