use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};

use kickoff_oracle::cli::{arg_value, has_flag, parsed_arg};
use kickoff_oracle::config::{self, Settings};
use kickoff_oracle::football_api::FootballApi;
use kickoff_oracle::logging::init_logging;
use kickoff_oracle::store::PredictionStore;

const DEFAULT_LOOKBACK_DAYS: i64 = 7;
const RECENT_COMPARISONS: usize = 10;

fn main() -> Result<()> {
    config::load_dotenv();
    init_logging();

    let settings = Settings::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| settings.resolved_db_path())
        .context("unable to resolve sqlite path")?;
    let mut store = PredictionStore::open(&db_path)?;

    if let Some(batch_id) = parsed_arg::<i64>(&args, "--delete-batch") {
        let removed = store.delete_batch(batch_id)?;
        println!(
            "batch {batch_id}: {}",
            if removed { "deleted" } else { "not found" }
        );
        return Ok(());
    }

    if has_flag(&args, "--list-batches") {
        for batch in store.batches()? {
            println!(
                "{:>4} | {} | {} | {} predictions",
                batch.id, batch.batch_date, batch.batch_name, batch.total_predictions
            );
        }
        return Ok(());
    }

    if !has_flag(&args, "--no-sync") {
        let days = parsed_arg::<i64>(&args, "--days")
            .unwrap_or(DEFAULT_LOOKBACK_DAYS)
            .clamp(1, 30);
        sync_results(&settings, &store, days)?;
    }
    let tracked = store.refresh_accuracy()?;

    if let Some(batch_id) = parsed_arg::<i64>(&args, "--batch") {
        let cmp = store.batch_comparison(batch_id)?;
        println!(
            "Batch {batch_id}: {}/{} finished correct ({:.1}%), {} predictions",
            cmp.correct_predictions,
            cmp.finished_matches,
            cmp.win_ratio,
            cmp.total_predictions
        );
        for c in &cmp.comparisons {
            let result = match (c.home_score, c.away_score) {
                (Some(h), Some(a)) => format!("{h}-{a}"),
                _ => "pending".to_string(),
            };
            println!(
                "  {} vs {}: {} ({:.1}%) -> {} {}",
                c.home_team,
                c.away_team,
                c.predicted_outcome,
                c.confidence,
                result,
                match c.was_correct {
                    Some(true) => "ok",
                    Some(false) => "miss",
                    None => "",
                }
            );
        }
        return Ok(());
    }

    let stats = store.statistics()?;
    println!("DB: {}", db_path.display());
    println!("Tracked comparisons: {tracked}");
    println!(
        "Overall: {}/{} correct ({:.1}%)",
        stats.overall.correct_predictions, stats.overall.total_predictions, stats.overall.accuracy
    );
    for bucket in &stats.by_confidence {
        println!(
            "  {:<6} {:>3}/{:<3} {:>5.1}%  avg conf {:.1}",
            bucket.confidence_bucket.as_str(),
            bucket.correct_predictions,
            bucket.total_predictions,
            bucket.accuracy,
            bucket.avg_confidence
        );
    }
    for outcome in &stats.by_outcome {
        println!(
            "  {:<8} {:>3}/{:<3} {:>5.1}%",
            outcome.predicted_outcome.as_str(),
            outcome.correct_predictions,
            outcome.total_predictions,
            outcome.accuracy
        );
    }
    for c in store.comparisons(RECENT_COMPARISONS)? {
        println!(
            "  {} | {} vs {}: {} -> {}",
            c.match_date,
            c.home_team,
            c.away_team,
            c.predicted_outcome,
            c.actual_outcome.map(|o| o.as_str()).unwrap_or("n/a")
        );
    }

    Ok(())
}

fn sync_results(settings: &Settings, store: &PredictionStore, days: i64) -> Result<()> {
    let api = FootballApi::from_settings(settings)?;
    let today = Utc::now().date_naive();
    let matches = api
        .matches_between(today - ChronoDuration::days(days), today)
        .context("fetch recent matches")?;
    let mut saved = 0usize;
    for m in &matches {
        if store.save_result(m)? {
            saved += 1;
        }
    }
    println!("Synced {saved} finished results from {} matches", matches.len());
    Ok(())
}
