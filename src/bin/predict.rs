use std::fs;

use anyhow::{Context, Result, anyhow};
use serde_json::json;

use kickoff_oracle::cli::{arg_value, has_flag, parsed_arg};
use kickoff_oracle::config::{self, Settings};
use kickoff_oracle::ensemble::EnsembleCombiner;
use kickoff_oracle::explanation::explain;
use kickoff_oracle::football_api::FootballApi;
use kickoff_oracle::logging::init_logging;
use kickoff_oracle::model::MatchContext;
use kickoff_oracle::predictor::MatchPredictor;

fn main() -> Result<()> {
    config::load_dotenv();
    init_logging();

    let settings = Settings::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let ctx = if let Some(path) = arg_value(&args, "--json") {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
        serde_json::from_str::<MatchContext>(&raw)
            .with_context(|| format!("parse match context from {path}"))?
    } else if let Some(match_id) = parsed_arg::<u64>(&args, "--match-id") {
        FootballApi::from_settings(&settings)?
            .match_by_id(match_id)
            .with_context(|| format!("fetch match {match_id}"))?
            .to_context()
    } else {
        context_from_args(&args)?
    };
    let fast_mode = if has_flag(&args, "--full") {
        false
    } else {
        settings.fast_mode
    };

    let predictor = if has_flag(&args, "--local") {
        MatchPredictor::new(
            EnsembleCombiner::new(settings.weights),
            settings.prediction_cache_ttl,
        )
    } else {
        MatchPredictor::from_settings(&settings)?
    };

    let prediction = predictor.predict(&ctx, fast_mode);
    let explanation = explain(&prediction);
    let out = json!({
        "match": ctx,
        "prediction": prediction,
        "explanation": explanation,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize prediction")?
    );
    Ok(())
}

fn context_from_args(args: &[String]) -> Result<MatchContext> {
    let home = arg_value(args, "--home").ok_or_else(|| anyhow!("missing --home <team>"))?;
    let away = arg_value(args, "--away").ok_or_else(|| anyhow!("missing --away <team>"))?;
    let mut ctx = MatchContext::new(home, away);
    if let Some(competition) = arg_value(args, "--competition") {
        ctx = ctx.with_competition(competition);
    }
    if let Some(date) = arg_value(args, "--date") {
        ctx = ctx.with_date(date);
    }
    Ok(ctx)
}
