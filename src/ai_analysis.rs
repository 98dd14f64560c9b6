use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::http_client::client_with_timeout;
use crate::model::{MatchContext, Opinion, Outcome, SourceKind};
use crate::source::{OpinionSource, SourceError};

pub const SOURCE_NAME: &str = "AI Analysis";
pub const RELIABILITY: f64 = 0.85;
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f64 = 0.3;
const CONTEXT_REASONING_CHARS: usize = 100;

const SYSTEM_PROMPT: &str = "You are a world-class football analyst with deep knowledge of teams, \
tactics, and match prediction. Provide detailed, data-driven analysis.";

/// Parsed LLM verdict. Only `prediction`, `predicted_team` and `confidence`
/// are required; the rest is best effort.
#[derive(Debug, Clone, PartialEq)]
pub struct AiVerdict {
    pub outcome: Outcome,
    pub predicted_team: String,
    pub confidence: f64,
    pub reasoning: String,
    pub key_factors: Vec<String>,
    pub risk_assessment: Option<String>,
}

impl AiVerdict {
    pub fn into_opinion(self) -> Opinion {
        Opinion::new(
            SOURCE_NAME,
            SourceKind::Ai,
            self.outcome,
            self.confidence,
            RELIABILITY,
            self.reasoning,
        )
    }
}

/// Chat-completions backed analyst.
pub struct AiAnalysisProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl AiAnalysisProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client_with_timeout(timeout)?,
            endpoint: OPENAI_CHAT_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_reply(&self, prompt: &str) -> Result<String, SourceError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .map_err(|err| SourceError::from_request(err, self.timeout))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| SourceError::from_request(err, self.timeout))?;
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion_body(&body)
    }
}

impl OpinionSource for AiAnalysisProvider {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Ai
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch(
        &self,
        ctx: &MatchContext,
        existing: &[Opinion],
    ) -> Result<Option<Opinion>, SourceError> {
        if self.api_key.trim().is_empty() {
            return Err(SourceError::Unavailable("no api key configured".into()));
        }
        let prompt = build_prompt(ctx, existing);
        let reply = self.request_reply(&prompt)?;
        let verdict = parse_ai_reply(&reply)?;
        Ok(Some(verdict.into_opinion()))
    }
}

pub fn build_prompt(ctx: &MatchContext, existing: &[Opinion]) -> String {
    let sources_summary = if existing.is_empty() {
        "No previous sources available".to_string()
    } else {
        existing
            .iter()
            .map(|op| {
                let reasoning: String = op.reasoning.chars().take(CONTEXT_REASONING_CHARS).collect();
                format!(
                    "- {}: {} ({:.1}%) - {}",
                    op.source_name, op.outcome, op.confidence, reasoning
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"As an expert football analyst, analyze this match and provide a detailed prediction:

MATCH: {home} vs {away}
COMPETITION: {competition}
DATE: {date}

EXISTING PREDICTIONS:
{sources_summary}

Please analyze considering:
1. Recent team form and performance trends
2. Head-to-head history and playing styles
3. Home advantage and venue factors
4. Player injuries/suspensions (if relevant to team names)
5. Competition importance and context
6. Seasonal timing (start, mid, end of season)
7. Analysis of existing predictions for consistency

Provide your prediction in this JSON format:
{{
    "prediction": "HOME_WIN" | "AWAY_WIN" | "DRAW",
    "predicted_team": "team name or Draw",
    "confidence": numeric_value_0_to_100,
    "probabilities": {{"home_win": percentage, "draw": percentage, "away_win": percentage}},
    "reasoning": "detailed explanation of your analysis",
    "key_factors": ["factor1", "factor2", "factor3"],
    "risk_assessment": "low/medium/high risk prediction"
}}"#,
        home = ctx.home_team_name,
        away = ctx.away_team_name,
        competition = ctx.competition_name,
        date = ctx.match_date.as_deref().unwrap_or(""),
    )
}

/// Extracts `choices[0].message.content` from a chat-completions response.
pub fn parse_completion_body(body: &str) -> Result<String, SourceError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|err| SourceError::Malformed(format!("completion body: {err}")))?;
    root.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| SourceError::Malformed("completion without message content".into()))
}

/// Pulls the JSON object out of a free-text reply: everything from the first
/// `{` to the last `}`.
pub fn parse_ai_reply(content: &str) -> Result<AiVerdict, SourceError> {
    let start = content
        .find('{')
        .ok_or_else(|| SourceError::Malformed("reply has no json object".into()))?;
    let end = content
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| SourceError::Malformed("reply has no json object".into()))?;
    let root: Value = serde_json::from_str(&content[start..=end])
        .map_err(|err| SourceError::Malformed(format!("reply json: {err}")))?;

    let raw_prediction = root
        .get("prediction")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed("missing prediction".into()))?;
    let outcome = Outcome::parse(raw_prediction)
        .ok_or_else(|| SourceError::Malformed(format!("unknown prediction {raw_prediction:?}")))?;
    let predicted_team = root
        .get("predicted_team")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed("missing predicted_team".into()))?
        .to_string();
    let confidence = root
        .get("confidence")
        .and_then(number_like)
        .ok_or_else(|| SourceError::Malformed("missing confidence".into()))?;

    let reasoning = root
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let key_factors = root
        .get("key_factors")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();
    let risk_assessment = root
        .get("risk_assessment")
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    Ok(AiVerdict {
        outcome,
        predicted_team,
        confidence,
        reasoning,
        key_factors,
        risk_assessment,
    })
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}
