use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

pub const DRAW_LABEL: &str = "Draw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::HomeWin => "HOME_WIN",
            Outcome::AwayWin => "AWAY_WIN",
            Outcome::Draw => "DRAW",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOME_WIN" => Some(Outcome::HomeWin),
            "AWAY_WIN" => Some(Outcome::AwayWin),
            "DRAW" => Some(Outcome::Draw),
            _ => None,
        }
    }

    /// Picks the leading outcome of a (home, draw, away) triple.
    ///
    /// Exact ties resolve HOME_WIN first, then AWAY_WIN, then DRAW. Historical
    /// accuracy figures were produced with this ordering, so keep it.
    pub fn pick(home: f64, draw: f64, away: f64) -> Self {
        if home >= away && home >= draw {
            Outcome::HomeWin
        } else if away >= home && away >= draw {
            Outcome::AwayWin
        } else {
            Outcome::Draw
        }
    }

    pub fn from_score(home_goals: i64, away_goals: i64) -> Self {
        if home_goals > away_goals {
            Outcome::HomeWin
        } else if home_goals < away_goals {
            Outcome::AwayWin
        } else {
            Outcome::Draw
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Statistical,
    Expert,
    Ai,
    Web,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Statistical => "statistical",
            SourceKind::Expert => "expert",
            SourceKind::Ai => "ai",
            SourceKind::Web => "web",
        }
    }
}

/// One source's guess for a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    #[serde(rename = "name")]
    pub source_name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(rename = "prediction")]
    pub outcome: Outcome,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub confidence: f64,
    pub reliability: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl Opinion {
    pub fn new(
        source_name: impl Into<String>,
        kind: SourceKind,
        outcome: Outcome,
        confidence: f64,
        reliability: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            kind,
            outcome,
            confidence: clamp_confidence(confidence),
            reliability: clamp_reliability(reliability),
            reasoning: reasoning.into(),
        }
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub fn clamp_reliability(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchContext {
    #[serde(default)]
    pub match_id: Option<u64>,
    pub home_team_name: String,
    pub away_team_name: String,
    #[serde(default)]
    pub competition_name: String,
    #[serde(default)]
    pub match_date: Option<String>,
}

impl MatchContext {
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            match_id: None,
            home_team_name: home.into(),
            away_team_name: away.into(),
            competition_name: String::new(),
            match_date: None,
        }
    }

    pub fn with_competition(mut self, competition: impl Into<String>) -> Self {
        self.competition_name = competition.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.match_date = Some(date.into());
        self
    }

    pub fn with_match_id(mut self, id: u64) -> Self {
        self.match_id = Some(id);
        self
    }

    pub fn team_for(&self, outcome: Outcome) -> &str {
        match outcome {
            Outcome::HomeWin => &self.home_team_name,
            Outcome::AwayWin => &self.away_team_name,
            Outcome::Draw => DRAW_LABEL,
        }
    }
}

/// Outcome probabilities in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    #[serde(serialize_with = "serialize_one_decimal")]
    pub home_win: f64,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub draw: f64,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub away_win: f64,
}

impl Probabilities {
    pub fn of(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::HomeWin => self.home_win,
            Outcome::AwayWin => self.away_win,
            Outcome::Draw => self.draw,
        }
    }

    pub fn leader(&self) -> Outcome {
        Outcome::pick(self.home_win, self.draw, self.away_win)
    }

    pub fn sum(&self) -> f64 {
        self.home_win + self.draw + self.away_win
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMethod {
    WeightedVoting,
    Fallback,
}

impl EnsembleMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            EnsembleMethod::WeightedVoting => "weighted_voting",
            EnsembleMethod::Fallback => "fallback",
        }
    }
}

/// Combined prediction for one match. Numbers stay at full precision and are
/// rounded to one decimal when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPrediction {
    #[serde(rename = "prediction")]
    pub outcome: Outcome,
    pub predicted_team: String,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub reasoning: String,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub agreement_boost: f64,
    #[serde(rename = "prediction_quality")]
    pub quality: PredictionQuality,
    #[serde(rename = "sources_used")]
    pub sources: Vec<Opinion>,
    #[serde(rename = "ensemble_method")]
    pub method: EnsembleMethod,
    pub total_sources: usize,
}

impl FinalPrediction {
    pub fn has_source_kind(&self, kind: SourceKind) -> bool {
        self.sources.iter().any(|s| s.kind == kind)
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn serialize_one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round1(*value))
}
