use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http_client::client_with_timeout;
use crate::model::{MatchContext, Opinion, Outcome, Probabilities, SourceKind};
use crate::seeded::seeded_rng;
use crate::source::{OpinionSource, SourceError};
use crate::ttl_cache::TtlCache;

pub const SOURCE_NAME: &str = "Web Aggregation";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CACHE_TTL: Duration = Duration::from_secs(3600);
const MAX_SEARCH_RESULTS: usize = 5;
const ANALYZED_SEARCH_RESULTS: usize = 3;
const DEFAULT_TIP_CONFIDENCE: f64 = 65.0;
const UNKNOWN_DOMAIN_RELIABILITY: f64 = 0.70;

const WIN_KEYWORDS: &[&str] = &["win", "victory", "beat", "defeat"];

const DOMAIN_RELIABILITY: &[(&str, f64)] = &[
    ("forebet", 0.85),
    ("predictz", 0.80),
    ("soccervista", 0.75),
    ("betexplorer", 0.82),
    ("footystats", 0.78),
    ("espn", 0.90),
    ("bbc", 0.95),
    ("skysports", 0.90),
    ("goal", 0.80),
];

#[derive(Debug, Clone, Copy)]
pub struct PredictionSite {
    pub name: &'static str,
    pub base_url: &'static str,
    pub reliability: f64,
}

pub const PREDICTION_SITES: &[PredictionSite] = &[
    PredictionSite { name: "Forebet", base_url: "https://www.forebet.com", reliability: 0.85 },
    PredictionSite { name: "PredictZ", base_url: "https://www.predictz.com", reliability: 0.80 },
    PredictionSite { name: "SoccerVista", base_url: "https://www.soccervista.com", reliability: 0.75 },
    PredictionSite { name: "BetExplorer", base_url: "https://www.betexplorer.com", reliability: 0.82 },
    PredictionSite { name: "FootyStats", base_url: "https://footystats.org", reliability: 0.78 },
];

/// One prediction found on the web.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebTip {
    pub source: String,
    pub url: String,
    pub outcome: Outcome,
    pub confidence: f64,
    pub reliability: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebAggregate {
    pub outcome: Outcome,
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub tips_analyzed: usize,
}

impl WebAggregate {
    pub fn into_opinion(self) -> Opinion {
        let reliability = if self.tips_analyzed > 2 { 0.8 } else { 0.6 };
        Opinion::new(
            SOURCE_NAME,
            SourceKind::Web,
            self.outcome,
            self.confidence,
            reliability,
            format!(
                "Aggregated from {} web sources with weighted analysis",
                self.tips_analyzed
            ),
        )
    }
}

/// Collects tips from a search endpoint and known prediction sites and folds
/// them into one opinion. Results are cached per matchup.
pub struct WebAggregationProvider {
    client: Client,
    search_url: Option<String>,
    site_estimates: bool,
    timeout: Duration,
    cache: TtlCache<String, Opinion>,
}

impl WebAggregationProvider {
    pub fn new(search_url: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client_with_timeout(timeout)?,
            search_url: search_url.filter(|url| !url.trim().is_empty()),
            site_estimates: true,
            timeout,
            cache: TtlCache::new(CACHE_TTL),
        })
    }

    pub fn with_site_estimates(mut self, enabled: bool) -> Self {
        self.site_estimates = enabled;
        self
    }

    pub fn collect_tips(&self, ctx: &MatchContext) -> Vec<WebTip> {
        let mut tips = Vec::new();
        if let Some(url) = self.search_url.as_deref() {
            match self.search(url, &search_query(ctx)) {
                Ok(hits) => tips.extend(
                    hits.iter()
                        .take(ANALYZED_SEARCH_RESULTS)
                        .filter_map(|hit| {
                            analyze_search_hit(hit, &ctx.home_team_name, &ctx.away_team_name)
                        }),
                ),
                Err(err) => tracing::warn!(error = %err, "web search failed; continuing without it"),
            }
        }
        if self.site_estimates {
            tips.extend(
                PREDICTION_SITES
                    .iter()
                    .map(|site| site_estimate(site, &ctx.home_team_name, &ctx.away_team_name)),
            );
        }
        tips
    }

    fn search(&self, url: &str, query: &str) -> Result<Vec<SearchHit>, SourceError> {
        let max_results = MAX_SEARCH_RESULTS.to_string();
        let resp = self
            .client
            .get(url)
            .query(&[("q", query), ("max_results", max_results.as_str())])
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
        parse_search_results(&body)
    }
}

impl OpinionSource for WebAggregationProvider {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch(
        &self,
        ctx: &MatchContext,
        _existing: &[Opinion],
    ) -> Result<Option<Opinion>, SourceError> {
        let key = format!(
            "{}_vs_{}_{}",
            ctx.home_team_name,
            ctx.away_team_name,
            ctx.match_date.as_deref().unwrap_or_default()
        );
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Some(hit));
        }

        let tips = self.collect_tips(ctx);
        let Some(aggregate) = aggregate_tips(&tips) else {
            return Ok(None);
        };
        let opinion = aggregate.into_opinion();
        self.cache.insert(key, opinion.clone());
        Ok(Some(opinion))
    }
}

pub fn search_query(ctx: &MatchContext) -> String {
    let mut query = format!(
        "{} vs {} prediction forecast betting tips",
        ctx.home_team_name, ctx.away_team_name
    );
    if let Some(date) = ctx.match_date.as_deref().and_then(date_part) {
        query.push(' ');
        query.push_str(date);
    }
    query
}

fn date_part(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let date = trimmed.get(..10)?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(date)
}

/// Accepts either a bare array of hits or an object with a `results` array.
pub fn parse_search_results(raw: &str) -> Result<Vec<SearchHit>, SourceError> {
    let root: Value = serde_json::from_str(raw.trim())
        .map_err(|err| SourceError::Malformed(format!("search json: {err}")))?;
    let items = match &root {
        Value::Array(_) => root.clone(),
        Value::Object(map) => map.get("results").cloned().unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        _ => return Err(SourceError::Malformed("unexpected search payload".into())),
    };
    serde_json::from_value(items).map_err(|err| SourceError::Malformed(format!("search hits: {err}")))
}

/// Keyword heuristics over a search result's title and snippet.
pub fn analyze_search_hit(hit: &SearchHit, home: &str, away: &str) -> Option<WebTip> {
    if hit.href.trim().is_empty() {
        return None;
    }
    let text = format!("{} {}", hit.title, hit.body).to_lowercase();
    let home_lower = home.to_lowercase();
    let away_lower = away.to_lowercase();
    let home_mentions = count_mentions(&text, &home_lower);
    let away_mentions = count_mentions(&text, &away_lower);
    if home_mentions == 0 && away_mentions == 0 {
        return None;
    }

    let mut confidence = first_percentage(&text).unwrap_or(DEFAULT_TIP_CONFIDENCE);
    let mut outcome = Outcome::Draw;
    if WIN_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        if home_mentions > away_mentions {
            outcome = Outcome::HomeWin;
            confidence = (confidence + 10.0).min(85.0);
        } else if away_mentions > home_mentions {
            outcome = Outcome::AwayWin;
            confidence = (confidence + 10.0).min(85.0);
        }
    }

    Some(WebTip {
        source: source_name_from_url(&hit.href),
        url: hit.href.clone(),
        outcome,
        confidence,
        reliability: reliability_for_url(&hit.href),
    })
}

/// Deterministic per-matchup estimate standing in for a scraped site.
pub fn site_estimate(site: &PredictionSite, home: &str, away: &str) -> WebTip {
    let mut rng = seeded_rng(&[home, away, site.name]);
    let confidence = rng.gen_range(60.0_f64..90.0) * site.reliability;
    let roll: f64 = rng.r#gen();
    let outcome = if roll < 0.45 {
        Outcome::HomeWin
    } else if roll < 0.70 {
        Outcome::AwayWin
    } else {
        Outcome::Draw
    };
    WebTip {
        source: site.name.to_string(),
        url: site.base_url.to_string(),
        outcome,
        confidence,
        reliability: site.reliability,
    }
}

/// Reliability-weighted vote over tips. Ties fall to a draw.
pub fn aggregate_tips(tips: &[WebTip]) -> Option<WebAggregate> {
    let mut home = 0.0;
    let mut draw = 0.0;
    let mut away = 0.0;
    let mut weighted_confidence = 0.0;
    for tip in tips {
        let w = tip.reliability.max(0.0);
        match tip.outcome {
            Outcome::HomeWin => home += w,
            Outcome::AwayWin => away += w,
            Outcome::Draw => draw += w,
        }
        weighted_confidence += tip.confidence * w;
    }
    let total = home + draw + away;
    if total <= 0.0 {
        return None;
    }

    let probabilities = Probabilities {
        home_win: home / total * 100.0,
        draw: draw / total * 100.0,
        away_win: away / total * 100.0,
    };
    let outcome = if home > away && home > draw {
        Outcome::HomeWin
    } else if away > home && away > draw {
        Outcome::AwayWin
    } else {
        Outcome::Draw
    };

    Some(WebAggregate {
        outcome,
        confidence: weighted_confidence / total,
        probabilities,
        tips_analyzed: tips.len(),
    })
}

pub fn reliability_for_url(url: &str) -> f64 {
    let lower = url.to_lowercase();
    DOMAIN_RELIABILITY
        .iter()
        .find(|(domain, _)| lower.contains(domain))
        .map(|(_, r)| *r)
        .unwrap_or(UNKNOWN_DOMAIN_RELIABILITY)
}

pub fn source_name_from_url(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = [".co.uk", ".com", ".org", ".net"]
        .iter()
        .find_map(|tld| host.strip_suffix(tld))
        .unwrap_or(host);
    if host.is_empty() {
        return "Web Source".to_string();
    }
    title_case(host)
}

fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

fn count_mentions(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle).count()
}

fn first_percentage(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    for (idx, b) in bytes.iter().enumerate() {
        if *b != b'%' {
            continue;
        }
        let start = bytes[..idx]
            .iter()
            .rposition(|c| !c.is_ascii_digit())
            .map(|p| p + 1)
            .unwrap_or(0);
        if start < idx {
            return text[start..idx].parse().ok();
        }
    }
    None
}
