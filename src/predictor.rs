use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rayon::prelude::*;

use crate::ai_analysis::AiAnalysisProvider;
use crate::config::Settings;
use crate::ensemble::EnsembleCombiner;
use crate::expert::ExpertRuleProvider;
use crate::model::{FinalPrediction, MatchContext, Opinion};
use crate::source::{OpinionSource, spawn_fetch};
use crate::statistical::StatisticalProvider;
use crate::ttl_cache::TtlCache;
use crate::web_aggregation::WebAggregationProvider;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Runs every provider for a match and blends their opinions.
///
/// Statistical analysis runs inline. The AI and web sources each get a worker
/// thread and a deadline measured from the same start instant; whatever has
/// not answered by then is left out. Expert rules run last over what came back.
pub struct MatchPredictor {
    statistical: StatisticalProvider,
    expert: ExpertRuleProvider,
    ai: Option<Arc<dyn OpinionSource>>,
    web: Option<Arc<dyn OpinionSource>>,
    combiner: EnsembleCombiner,
    cache: TtlCache<String, FinalPrediction>,
}

impl Default for MatchPredictor {
    fn default() -> Self {
        Self::new(EnsembleCombiner::default(), DEFAULT_CACHE_TTL)
    }
}

impl MatchPredictor {
    /// Local providers only. Attach external sources with the `with_*` builders.
    pub fn new(combiner: EnsembleCombiner, cache_ttl: Duration) -> Self {
        Self {
            statistical: StatisticalProvider::new(),
            expert: ExpertRuleProvider::new(),
            ai: None,
            web: None,
            combiner,
            cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn with_ai_source(mut self, source: Arc<dyn OpinionSource>) -> Self {
        self.ai = Some(source);
        self
    }

    pub fn with_web_source(mut self, source: Arc<dyn OpinionSource>) -> Self {
        self.web = Some(source);
        self
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut predictor = Self::new(
            EnsembleCombiner::new(settings.weights),
            settings.prediction_cache_ttl,
        );
        if let Some(key) = settings.openai_api_key.as_deref() {
            let ai = AiAnalysisProvider::new(key, settings.openai_model.clone(), settings.ai_timeout)?;
            predictor = predictor.with_ai_source(Arc::new(ai));
        } else {
            tracing::info!("OPENAI_API_KEY not set; AI analysis disabled");
        }
        let web = WebAggregationProvider::new(settings.web_search_url.clone(), settings.web_timeout)?;
        Ok(predictor.with_web_source(Arc::new(web)))
    }

    pub fn combiner(&self) -> &EnsembleCombiner {
        &self.combiner
    }

    /// Fast mode skips the web source. Results are cached per
    /// matchup, date and mode.
    pub fn predict(&self, ctx: &MatchContext, fast_mode: bool) -> FinalPrediction {
        let key = cache_key(ctx, fast_mode);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%key, "returning cached prediction");
            return cached;
        }

        let opinions = self.collect_opinions(ctx, fast_mode);
        let prediction = self.combiner.combine(ctx, opinions);
        tracing::info!(
            home = %ctx.home_team_name,
            away = %ctx.away_team_name,
            outcome = %prediction.outcome,
            confidence = prediction.confidence,
            sources = prediction.total_sources,
            "prediction ready"
        );
        self.cache.insert(key, prediction.clone());
        prediction
    }

    /// Opinions in invocation order: web, statistical, ai, expert.
    pub fn collect_opinions(&self, ctx: &MatchContext, fast_mode: bool) -> Vec<Opinion> {
        let statistical = self.statistical.compute(ctx);
        let started = Instant::now();

        let web = match (&self.web, fast_mode) {
            (Some(source), false) => Some(spawn_fetch(
                Arc::clone(source),
                ctx.clone(),
                Vec::new(),
                started,
            )),
            _ => None,
        };
        let ai = self.ai.as_ref().map(|source| {
            spawn_fetch(
                Arc::clone(source),
                ctx.clone(),
                vec![statistical.clone()],
                started,
            )
        });

        let mut opinions = Vec::with_capacity(4);
        if let Some(op) = web.and_then(|pending| pending.wait()) {
            opinions.push(op);
        }
        opinions.push(statistical);
        if let Some(op) = ai.and_then(|pending| pending.wait()) {
            opinions.push(op);
        }
        if let Some(op) = self.expert.apply(ctx, &opinions) {
            opinions.push(op);
        }
        opinions
    }

    /// Predicts many matches on the rayon pool. Output order follows input.
    pub fn predict_many(&self, matches: &[MatchContext], fast_mode: bool) -> Vec<FinalPrediction> {
        matches
            .par_iter()
            .map(|ctx| self.predict(ctx, fast_mode))
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

pub fn cache_key(ctx: &MatchContext, fast_mode: bool) -> String {
    format!(
        "{}_{}_{}_{}",
        ctx.home_team_name,
        ctx.away_team_name,
        ctx.match_date.as_deref().unwrap_or_default(),
        fast_mode
    )
}
