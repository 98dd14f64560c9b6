use std::fmt;

use serde::Serialize;

use crate::model::{EnsembleMethod, FinalPrediction, Opinion, PredictionQuality, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Medium,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceLevel::VeryHigh
        } else if confidence >= 70.0 {
            ConfidenceLevel::High
        } else if confidence >= 60.0 {
            ConfidenceLevel::Medium
        } else if confidence >= 50.0 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High",
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::VeryLow => "Very Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub method: EnsembleMethod,
    pub confidence_level: ConfidenceLevel,
    pub sources_breakdown: Vec<Opinion>,
    pub quality_assessment: PredictionQuality,
    pub strengths: Vec<String>,
    pub risk_factors: Vec<String>,
}

pub fn explain(prediction: &FinalPrediction) -> Explanation {
    let mut strengths = Vec::new();
    if prediction.total_sources >= 3 {
        strengths.push("Multiple prediction sources analyzed".to_string());
    }
    if prediction.agreement_boost > 5.0 {
        strengths.push("High agreement between sources".to_string());
    }
    if prediction.has_source_kind(SourceKind::Ai) {
        strengths.push("AI-powered analysis included".to_string());
    }

    let mut risk_factors = Vec::new();
    if prediction.confidence < 60.0 {
        risk_factors.push("Low confidence prediction".to_string());
    }
    if prediction.total_sources < 2 {
        risk_factors.push("Limited prediction sources".to_string());
    }

    Explanation {
        method: prediction.method,
        confidence_level: ConfidenceLevel::from_confidence(prediction.confidence),
        sources_breakdown: prediction.sources.clone(),
        quality_assessment: prediction.quality,
        strengths,
        risk_factors,
    }
}
