use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovLimiter};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::http_client::http_client;
use crate::model::{MatchContext, Outcome};
use crate::ttl_cache::TtlCache;

const RESPONSE_TTL: Duration = Duration::from_secs(300);
const MAX_REQUESTS_PER_MINUTE: u32 = 10;
const MIN_BACKOFF: Duration = Duration::from_millis(10);
const AUTH_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: i64,
    pub away: i64,
}

impl Score {
    pub fn outcome(&self) -> Outcome {
        Outcome::from_score(self.home, self.away)
    }
}

/// A fixture as reported by football-data.org.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiMatch {
    pub id: u64,
    pub utc_date: String,
    pub status: String,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
    pub home_team_id: Option<u64>,
    pub away_team_id: Option<u64>,
    pub full_time: Option<Score>,
    pub half_time: Option<Score>,
}

impl ApiMatch {
    pub fn is_finished(&self) -> bool {
        self.status.eq_ignore_ascii_case("FINISHED")
    }

    pub fn to_context(&self) -> MatchContext {
        MatchContext::new(self.home_team.clone(), self.away_team.clone())
            .with_competition(self.competition.clone())
            .with_date(self.utc_date.clone())
            .with_match_id(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Competition {
    pub id: u64,
    pub code: Option<String>,
    pub name: String,
    pub area: Option<String>,
}

/// Per-minute request budget for the football-data.org free tier.
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
    clock: DefaultClock,
}

impl RateLimiter {
    /// Allows a burst of `max_requests`, refilled evenly over a minute.
    pub fn per_minute(max_requests: u32) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: GovLimiter::direct(Quota::per_minute(burst)),
            clock: DefaultClock::default(),
        }
    }

    /// Takes a slot if one is free. Otherwise returns how long to wait.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.inner
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    pub fn acquire(&self) {
        while let Err(wait) = self.try_acquire() {
            tracing::info!(wait_ms = wait.as_millis() as u64, "football api budget spent; waiting");
            thread::sleep(wait.max(MIN_BACKOFF));
        }
    }
}

pub struct FootballApi {
    client: &'static Client,
    base_url: String,
    api_key: String,
    cache: TtlCache<String, String>,
    limiter: RateLimiter,
}

impl FootballApi {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            cache: TtlCache::new(RESPONSE_TTL),
            limiter: RateLimiter::per_minute(MAX_REQUESTS_PER_MINUTE),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let key = settings
            .football_api_key
            .as_deref()
            .context("FOOTBALL_API_KEY is not set")?;
        Self::new(key, settings.football_api_url.clone())
    }

    pub fn competitions(&self) -> Result<Vec<Competition>> {
        let body = self.get("competitions", &[])?;
        parse_competitions_json(&body)
    }

    /// Matches from today through `days` days ahead.
    pub fn upcoming_matches(&self, days: i64) -> Result<Vec<ApiMatch>> {
        let today = Utc::now().date_naive();
        self.matches_between(today, today + ChronoDuration::days(days.max(0)))
    }

    pub fn matches_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ApiMatch>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let body = self.get("matches", &[("dateFrom", from.as_str()), ("dateTo", to.as_str())])?;
        parse_matches_json(&body)
    }

    pub fn competition_matches(&self, competition_id: u64, days: i64) -> Result<Vec<ApiMatch>> {
        let today = Utc::now().date_naive();
        let from = today.format("%Y-%m-%d").to_string();
        let to = (today + ChronoDuration::days(days.max(0)))
            .format("%Y-%m-%d")
            .to_string();
        let endpoint = format!("competitions/{competition_id}/matches");
        let body = self.get(&endpoint, &[("dateFrom", from.as_str()), ("dateTo", to.as_str())])?;
        parse_matches_json(&body)
    }

    pub fn live_matches(&self) -> Result<Vec<ApiMatch>> {
        let body = self.get("matches", &[("status", "IN_PLAY")])?;
        parse_matches_json(&body)
    }

    pub fn match_by_id(&self, match_id: u64) -> Result<ApiMatch> {
        let body = self.get(&format!("matches/{match_id}"), &[])?;
        parse_match_json(&body)
    }

    fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let key = cache_key(endpoint, params);
        if let Some(body) = self.cache.get(&key) {
            return Ok(body);
        }

        self.limiter.acquire();
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        tracing::debug!(%url, "football api request");
        let resp = self
            .client
            .get(&url)
            .header(AUTH_HEADER, &self.api_key)
            .query(params)
            .send()
            .with_context(|| format!("request {endpoint} failed"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(anyhow!("football api rate limit hit on {endpoint}"));
        }
        if !status.is_success() {
            return Err(anyhow!("http {}: {}", status, body));
        }
        self.cache.insert(key, body.clone());
        Ok(body)
    }
}

fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut key = endpoint.to_string();
    for (name, value) in params {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMatch {
    id: u64,
    #[serde(default)]
    utc_date: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    competition: Option<WireNamed>,
    home_team: WireNamed,
    away_team: WireNamed,
    #[serde(default)]
    score: Option<WireScore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNamed {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

impl WireNamed {
    fn display_name(&self) -> String {
        self.name
            .as_deref()
            .or(self.short_name.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireScore {
    #[serde(default)]
    full_time: Option<WireGoals>,
    #[serde(default)]
    half_time: Option<WireGoals>,
}

#[derive(Debug, Deserialize)]
struct WireGoals {
    home: Option<i64>,
    away: Option<i64>,
}

impl WireGoals {
    fn score(&self) -> Option<Score> {
        Some(Score {
            home: self.home?,
            away: self.away?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompetitionsResponse {
    #[serde(default)]
    competitions: Vec<WireCompetition>,
}

#[derive(Debug, Deserialize)]
struct WireCompetition {
    id: u64,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    area: Option<WireNamed>,
}

impl From<WireMatch> for ApiMatch {
    fn from(m: WireMatch) -> Self {
        let (full_time, half_time) = match &m.score {
            Some(score) => (
                score.full_time.as_ref().and_then(WireGoals::score),
                score.half_time.as_ref().and_then(WireGoals::score),
            ),
            None => (None, None),
        };
        ApiMatch {
            id: m.id,
            utc_date: m.utc_date,
            status: m.status,
            competition: m
                .competition
                .as_ref()
                .map(WireNamed::display_name)
                .unwrap_or_default(),
            home_team: m.home_team.display_name(),
            away_team: m.away_team.display_name(),
            home_team_id: m.home_team.id,
            away_team_id: m.away_team.id,
            full_time,
            half_time,
        }
    }
}

/// Parses a `/matches` listing. Entries without both team names are dropped.
pub fn parse_matches_json(raw: &str) -> Result<Vec<ApiMatch>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: MatchesResponse = serde_json::from_str(trimmed).context("invalid matches json")?;
    Ok(data
        .matches
        .into_iter()
        .map(ApiMatch::from)
        .filter(|m| !m.home_team.is_empty() && !m.away_team.is_empty())
        .collect())
}

pub fn parse_match_json(raw: &str) -> Result<ApiMatch> {
    let wire: WireMatch = serde_json::from_str(raw.trim()).context("invalid match json")?;
    Ok(ApiMatch::from(wire))
}

pub fn parse_competitions_json(raw: &str) -> Result<Vec<Competition>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: CompetitionsResponse =
        serde_json::from_str(trimmed).context("invalid competitions json")?;
    Ok(data
        .competitions
        .into_iter()
        .map(|c| Competition {
            id: c.id,
            code: c.code,
            name: c.name,
            area: c.area.map(|a| a.display_name()).filter(|a| !a.is_empty()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{RateLimiter, cache_key};

    #[test]
    fn eleventh_request_in_a_minute_is_refused() {
        let limiter = RateLimiter::per_minute(10);
        for _ in 0..10 {
            assert!(limiter.try_acquire().is_ok());
        }
        let wait = limiter.try_acquire().unwrap_err();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(7), "one slot refills every 6s");
    }

    #[test]
    fn zero_budget_still_allows_one_request() {
        let limiter = RateLimiter::per_minute(0);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
    }

    #[test]
    fn cache_key_includes_params() {
        assert_eq!(
            cache_key("matches", &[("dateFrom", "2024-01-01")]),
            "matches|dateFrom=2024-01-01"
        );
        assert_eq!(cache_key("competitions", &[]), "competitions");
    }
}
