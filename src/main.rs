use std::path::PathBuf;

use anyhow::{Context, Result};

use kickoff_oracle::cli::{arg_value, has_flag, parsed_arg};
use kickoff_oracle::config::{self, Settings};
use kickoff_oracle::football_api::FootballApi;
use kickoff_oracle::logging::init_logging;
use kickoff_oracle::model::round1;
use kickoff_oracle::predictor::MatchPredictor;
use kickoff_oracle::statistical::StatisticalProvider;
use kickoff_oracle::store::{PredictionRecord, PredictionStore};

const DEFAULT_DAYS: i64 = 3;

fn main() -> Result<()> {
    config::load_dotenv();
    init_logging();

    let settings = Settings::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let days = parsed_arg::<i64>(&args, "--days")
        .unwrap_or(DEFAULT_DAYS)
        .clamp(0, 14);
    let fast_mode = if has_flag(&args, "--full") {
        false
    } else {
        settings.fast_mode
    };
    let batch_name = arg_value(&args, "--batch");

    let api = FootballApi::from_settings(&settings)?;
    let fetched = if has_flag(&args, "--live") {
        api.live_matches().context("fetch live matches")?
    } else if let Some(competition_id) = parsed_arg::<u64>(&args, "--competition") {
        api.competition_matches(competition_id, days)
            .with_context(|| format!("fetch matches for competition {competition_id}"))?
    } else {
        api.upcoming_matches(days).context("fetch upcoming matches")?
    };
    let matches = fetched
        .into_iter()
        .filter(|m| !m.is_finished())
        .collect::<Vec<_>>();
    if matches.is_empty() {
        println!("No upcoming matches in the next {days} days");
        return Ok(());
    }

    let predictor = MatchPredictor::from_settings(&settings)?;
    let contexts = matches.iter().map(|m| m.to_context()).collect::<Vec<_>>();
    let predictions = predictor.predict_many(&contexts, fast_mode);

    let statistical = StatisticalProvider::new();
    let records = contexts
        .iter()
        .zip(predictions)
        .map(|(ctx, prediction)| {
            PredictionRecord::new(ctx.clone(), prediction).with_statistics(&statistical.analyze(ctx))
        })
        .collect::<Vec<_>>();

    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| settings.resolved_db_path())
        .context("unable to resolve sqlite path")?;
    let mut store = PredictionStore::open(&db_path)?;
    match batch_name.as_deref() {
        Some(name) => {
            let batch_id = store.save_batch(name, &records)?;
            println!("Saved batch {batch_id} ({name})");
        }
        None => {
            for record in &records {
                store.save_prediction(record)?;
            }
        }
    }

    println!(
        "Predicted {} matches ({} mode)",
        records.len(),
        if fast_mode { "fast" } else { "full" }
    );
    println!("DB: {}", db_path.display());
    for record in &records {
        let p = &record.prediction;
        println!(
            "{} | {} vs {} -> {} ({:.1}%) H {:.1} D {:.1} A {:.1} [{} sources, {:?}]",
            record.ctx.match_date.as_deref().unwrap_or("n/a"),
            record.ctx.home_team_name,
            record.ctx.away_team_name,
            p.predicted_team,
            round1(p.confidence),
            p.probabilities.home_win,
            p.probabilities.draw,
            p.probabilities.away_win,
            p.total_sources,
            p.quality,
        );
    }

    Ok(())
}
