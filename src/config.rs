use std::path::PathBuf;
use std::time::Duration;

use crate::ensemble::EnsembleWeights;

const APP_DIR: &str = "kickoff_oracle";
const DB_FILE: &str = "predictions.sqlite";

pub const DEFAULT_FOOTBALL_API_URL: &str = "https://api.football-data.org/v4";

/// Runtime settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub football_api_key: Option<String>,
    pub football_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub web_search_url: Option<String>,
    pub ai_timeout: Duration,
    pub web_timeout: Duration,
    pub prediction_cache_ttl: Duration,
    pub db_path: Option<PathBuf>,
    pub fast_mode: bool,
    pub weights: EnsembleWeights,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };
        let secs = |key: &str, default: u64, min: u64, max: u64| {
            let raw = lookup(key)
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(default)
                .clamp(min, max);
            Duration::from_secs(raw)
        };
        let weight = |key: &str, default: f64| {
            lookup(key)
                .and_then(|val| val.trim().parse::<f64>().ok())
                .filter(|val| val.is_finite())
                .unwrap_or(default)
                .clamp(0.0, 1.0)
        };
        let defaults = EnsembleWeights::default();

        Self {
            football_api_key: non_empty("FOOTBALL_API_KEY"),
            football_api_url: non_empty("FOOTBALL_API_URL")
                .unwrap_or_else(|| DEFAULT_FOOTBALL_API_URL.to_string()),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: non_empty("OPENAI_MODEL")
                .unwrap_or_else(|| crate::ai_analysis::DEFAULT_MODEL.to_string()),
            web_search_url: non_empty("WEB_SEARCH_URL"),
            ai_timeout: secs("AI_TIMEOUT_SECS", 20, 1, 120),
            web_timeout: secs("WEB_TIMEOUT_SECS", 30, 1, 120),
            prediction_cache_ttl: secs("PREDICTION_CACHE_SECS", 1800, 0, 86_400),
            db_path: non_empty("PREDICTIONS_DB").map(PathBuf::from),
            fast_mode: non_empty("FAST_MODE")
                .map(|val| parse_flag(&val))
                .unwrap_or(true),
            weights: EnsembleWeights {
                statistical: weight("ENSEMBLE_WEIGHT_STATISTICAL", defaults.statistical),
                expert: weight("ENSEMBLE_WEIGHT_EXPERT", defaults.expert),
                ai: weight("ENSEMBLE_WEIGHT_AI", defaults.ai),
                web: weight("ENSEMBLE_WEIGHT_WEB", defaults.web),
            },
        }
    }

    /// Explicit `PREDICTIONS_DB`, else the per-user data directory.
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(default_db_path)
    }
}

/// Loads `.env.local` first so it wins over `.env`.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DB_FILE))
}

pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
