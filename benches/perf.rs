use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use kickoff_oracle::ensemble::EnsembleCombiner;
use kickoff_oracle::model::{MatchContext, Opinion, Outcome, SourceKind};
use kickoff_oracle::predictor::MatchPredictor;
use kickoff_oracle::statistical::StatisticalProvider;
use kickoff_oracle::web_aggregation::{analyze_search_hit, parse_search_results};

const SEARCH_JSON: &str = r#"{"results": [
    {"title": "Liverpool vs Everton prediction", "body": "Liverpool to win, home win likely at 64%", "href": "https://www.forebet.com/en/liverpool-everton"},
    {"title": "Merseyside derby preview", "body": "Everton and Liverpool could share the points in a draw", "href": "https://www.bbc.co.uk/sport/football/preview"},
    {"title": "Everton tips", "body": "Everton away win backed by Everton fans", "href": "https://tips.example.com/everton"}
]}"#;

fn sample_opinions() -> Vec<Opinion> {
    vec![
        Opinion::new("Web Aggregation", SourceKind::Web, Outcome::HomeWin, 68.0, 0.8, "sites lean home"),
        Opinion::new("Statistical Analysis", SourceKind::Statistical, Outcome::HomeWin, 61.5, 0.7, "form gap"),
        Opinion::new("AI Analysis", SourceKind::Ai, Outcome::Draw, 55.0, 0.85, "derby nerves"),
        Opinion::new("Expert Rules", SourceKind::Expert, Outcome::HomeWin, 82.0, 0.75, "elite home side"),
    ]
}

fn sample_matches(n: usize) -> Vec<MatchContext> {
    let teams = [
        "Arsenal", "Chelsea", "Liverpool", "Everton", "Ajax", "PSV", "Bayern Munich", "Mainz",
    ];
    (0..n)
        .map(|i| {
            MatchContext::new(teams[i % teams.len()], teams[(i + 3) % teams.len()])
                .with_competition("Premier League")
                .with_date(format!("2024-04-{:02}T15:00:00Z", 1 + i % 28))
        })
        .collect()
}

fn bench_ensemble_combine(c: &mut Criterion) {
    let combiner = EnsembleCombiner::default();
    let ctx = MatchContext::new("Liverpool", "Everton");
    let opinions = sample_opinions();
    c.bench_function("ensemble_combine_4", |b| {
        b.iter(|| combiner.combine(black_box(&ctx), black_box(opinions.clone())))
    });
}

fn bench_statistical_analyze(c: &mut Criterion) {
    let provider = StatisticalProvider::new();
    let ctx = MatchContext::new("Manchester City", "Burnley").with_competition("Premier League");
    c.bench_function("statistical_analyze", |b| {
        b.iter(|| provider.analyze(black_box(&ctx)))
    });
}

fn bench_search_hits(c: &mut Criterion) {
    c.bench_function("parse_and_score_search_hits", |b| {
        b.iter(|| {
            let hits = parse_search_results(black_box(SEARCH_JSON)).expect("valid search json");
            hits.iter()
                .filter_map(|hit| analyze_search_hit(hit, "Liverpool", "Everton"))
                .count()
        })
    });
}

fn bench_predict_local(c: &mut Criterion) {
    let matches = sample_matches(64);
    c.bench_function("predict_many_local_64", |b| {
        b.iter(|| {
            // Fresh predictor each round so the cache never short-circuits.
            let predictor = MatchPredictor::default();
            predictor.predict_many(black_box(&matches), true)
        })
    });
}

criterion_group!(
    benches,
    bench_ensemble_combine,
    bench_statistical_analyze,
    bench_search_hits,
    bench_predict_local
);
criterion_main!(benches);
