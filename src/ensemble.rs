use serde::{Deserialize, Serialize};

use crate::model::{
    EnsembleMethod, FinalPrediction, MatchContext, Opinion, Outcome, PredictionQuality,
    Probabilities, SourceKind, clamp_confidence, clamp_reliability,
};

pub const CONFIDENCE_CAP: f64 = 95.0;
pub const FALLBACK_CONFIDENCE: f64 = 45.0;
pub const FALLBACK_REASONING: &str =
    "No reliable prediction sources available - using balanced default";

const AGREEMENT_THRESHOLD: f64 = 0.7;
const AGREEMENT_SCALE: f64 = 10.0;
const HIGH_QUALITY_MIN_SOURCES: usize = 3;
const HIGH_QUALITY_MIN_BOOST: f64 = 5.0;
const MAX_REASONINGS: usize = 3;

/// Base vote weight per source kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    #[serde(default = "default_statistical")]
    pub statistical: f64,
    #[serde(default = "default_expert")]
    pub expert: f64,
    #[serde(default = "default_ai")]
    pub ai: f64,
    #[serde(default = "default_web")]
    pub web: f64,
}

fn default_statistical() -> f64 {
    0.25
}

fn default_expert() -> f64 {
    0.10
}

fn default_ai() -> f64 {
    0.30
}

fn default_web() -> f64 {
    0.35
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            statistical: default_statistical(),
            expert: default_expert(),
            ai: default_ai(),
            web: default_web(),
        }
    }
}

impl EnsembleWeights {
    pub fn base_weight(&self, kind: SourceKind) -> f64 {
        let w = match kind {
            SourceKind::Statistical => self.statistical,
            SourceKind::Expert => self.expert,
            SourceKind::Ai => self.ai,
            SourceKind::Web => self.web,
        };
        if w.is_finite() { w.max(0.0) } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Votes {
    home: f64,
    draw: f64,
    away: f64,
}

impl Votes {
    fn add(&mut self, outcome: Outcome, weight: f64) {
        match outcome {
            Outcome::HomeWin => self.home += weight,
            Outcome::AwayWin => self.away += weight,
            Outcome::Draw => self.draw += weight,
        }
    }

    fn total(&self) -> f64 {
        self.home + self.draw + self.away
    }
}

/// Weighted-voting aggregator. Pure computation over already collected opinions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleCombiner {
    weights: EnsembleWeights,
}

impl EnsembleCombiner {
    pub fn new(weights: EnsembleWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> EnsembleWeights {
        self.weights
    }

    /// Vote weight of one opinion: base weight × confidence share × reliability.
    pub fn weight_of(&self, opinion: &Opinion) -> f64 {
        self.weights.base_weight(opinion.kind)
            * (clamp_confidence(opinion.confidence) / 100.0)
            * clamp_reliability(opinion.reliability)
    }

    pub fn combine(&self, ctx: &MatchContext, opinions: Vec<Opinion>) -> FinalPrediction {
        if opinions.is_empty() {
            return fallback_prediction();
        }

        let mut votes = Votes::default();
        for opinion in &opinions {
            votes.add(opinion.outcome, self.weight_of(opinion));
        }
        let total_weight = votes.total();
        if total_weight <= 0.0 || !total_weight.is_finite() {
            tracing::debug!(
                sources = opinions.len(),
                "all opinion weights are zero; using fallback"
            );
            return fallback_prediction();
        }

        let probabilities = Probabilities {
            home_win: votes.home / total_weight * 100.0,
            draw: votes.draw / total_weight * 100.0,
            away_win: votes.away / total_weight * 100.0,
        };
        let outcome = probabilities.leader();

        let scaled: Vec<f64> = opinions
            .iter()
            .map(|op| clamp_confidence(op.confidence) * clamp_reliability(op.reliability))
            .collect();
        let ensemble_confidence = if scaled.is_empty() {
            probabilities.of(outcome)
        } else {
            scaled.iter().sum::<f64>() / scaled.len() as f64
        };

        let agreement_boost = agreement_boost(&opinions, outcome);
        let confidence = (ensemble_confidence + agreement_boost).clamp(0.0, CONFIDENCE_CAP);

        let quality = if opinions.len() >= HIGH_QUALITY_MIN_SOURCES
            && agreement_boost > HIGH_QUALITY_MIN_BOOST
        {
            PredictionQuality::High
        } else {
            PredictionQuality::Medium
        };

        let reasoning = opinions
            .iter()
            .filter(|op| !op.reasoning.trim().is_empty())
            .take(MAX_REASONINGS)
            .map(|op| format!("{}: {}", op.source_name, op.reasoning))
            .collect::<Vec<_>>()
            .join("; ");

        FinalPrediction {
            outcome,
            predicted_team: ctx.team_for(outcome).to_string(),
            confidence,
            probabilities,
            reasoning,
            agreement_boost,
            quality,
            total_sources: opinions.len(),
            sources: opinions,
            method: EnsembleMethod::WeightedVoting,
        }
    }
}

/// Boost applied when more than one source exists and over 70% of them agree
/// with the winning outcome.
pub fn agreement_boost(opinions: &[Opinion], winner: Outcome) -> f64 {
    if opinions.len() <= 1 {
        return 0.0;
    }
    let agreeing = opinions.iter().filter(|op| op.outcome == winner).count();
    let ratio = agreeing as f64 / opinions.len() as f64;
    if ratio > AGREEMENT_THRESHOLD {
        AGREEMENT_SCALE * ratio
    } else {
        0.0
    }
}

pub fn fallback_prediction() -> FinalPrediction {
    FinalPrediction {
        outcome: Outcome::Draw,
        predicted_team: crate::model::DRAW_LABEL.to_string(),
        confidence: FALLBACK_CONFIDENCE,
        probabilities: Probabilities {
            home_win: 37.5,
            draw: 25.0,
            away_win: 37.5,
        },
        reasoning: FALLBACK_REASONING.to_string(),
        agreement_boost: 0.0,
        quality: PredictionQuality::Low,
        sources: Vec::new(),
        method: EnsembleMethod::Fallback,
        total_sources: 0,
    }
}
