use std::fs;
use std::path::PathBuf;

use kickoff_oracle::ai_analysis::parse_ai_reply;
use kickoff_oracle::football_api::{
    Score, parse_competitions_json, parse_match_json, parse_matches_json,
};
use kickoff_oracle::model::Outcome;
use kickoff_oracle::source::SourceError;
use kickoff_oracle::web_aggregation::{analyze_search_hit, parse_search_results};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_football_data_matches_fixture() {
    let raw = read_fixture("football_matches.json");
    let matches = parse_matches_json(&raw).expect("fixture should parse");
    assert_eq!(matches.len(), 2, "match without an away team is dropped");

    let city = &matches[0];
    assert_eq!(city.id, 436201);
    assert_eq!(city.home_team, "Manchester City FC");
    assert_eq!(city.away_team, "Arsenal FC");
    assert_eq!(city.competition, "Premier League");
    assert!(city.is_finished());
    assert_eq!(city.full_time, Some(Score { home: 1, away: 2 }));
    assert_eq!(city.half_time, Some(Score { home: 1, away: 0 }));
    assert_eq!(city.home_team_id, Some(65));

    let clasico = &matches[1];
    assert_eq!(clasico.home_team, "Real Madrid", "falls back to shortName");
    assert!(!clasico.is_finished());
    assert_eq!(clasico.full_time, None);
}

#[test]
fn api_match_converts_to_context() {
    let raw = read_fixture("football_match.json");
    let m = parse_match_json(&raw).expect("fixture should parse");
    let ctx = m.to_context();
    assert_eq!(ctx.match_id, Some(436201));
    assert_eq!(ctx.home_team_name, "Manchester City FC");
    assert_eq!(ctx.competition_name, "Premier League");
    assert_eq!(ctx.match_date.as_deref(), Some("2024-03-31T15:30:00Z"));
    assert_eq!(m.full_time.map(|s| s.outcome()), Some(Outcome::AwayWin));
}

#[test]
fn empty_payloads_parse_to_nothing() {
    assert!(parse_matches_json("").unwrap().is_empty());
    assert!(parse_matches_json("null").unwrap().is_empty());
    assert!(parse_matches_json(r#"{"matches": []}"#).unwrap().is_empty());
    assert!(parse_matches_json("{not json").is_err());
}

#[test]
fn parses_competitions_fixture() {
    let raw = read_fixture("competitions.json");
    let comps = parse_competitions_json(&raw).expect("fixture should parse");
    assert_eq!(comps.len(), 2);
    assert_eq!(comps[0].code.as_deref(), Some("PL"));
    assert_eq!(comps[1].name, "UEFA Champions League");
    assert_eq!(comps[1].area.as_deref(), Some("Europe"));
}

#[test]
fn extracts_json_from_chatty_ai_reply() {
    let raw = read_fixture("ai_reply.txt");
    let verdict = parse_ai_reply(&raw).expect("reply should parse");
    assert_eq!(verdict.outcome, Outcome::AwayWin);
    assert_eq!(verdict.predicted_team, "Arsenal FC");
    assert_eq!(verdict.confidence, 71.0);
    assert_eq!(verdict.key_factors.len(), 3);
    assert_eq!(verdict.risk_assessment.as_deref(), Some("medium"));

    let opinion = verdict.into_opinion();
    assert_eq!(opinion.source_name, "AI Analysis");
    assert_eq!(opinion.reliability, 0.85);
}

#[test]
fn ai_reply_missing_required_fields_is_malformed() {
    let no_team = r#"{"prediction": "HOME_WIN", "confidence": 70}"#;
    assert!(matches!(parse_ai_reply(no_team), Err(SourceError::Malformed(_))));

    let bad_outcome = r#"{"prediction": "HOME", "predicted_team": "X", "confidence": 70}"#;
    assert!(matches!(parse_ai_reply(bad_outcome), Err(SourceError::Malformed(_))));

    assert!(matches!(
        parse_ai_reply("I cannot predict this match."),
        Err(SourceError::Malformed(_))
    ));
    assert!(matches!(parse_ai_reply("} oops {"), Err(SourceError::Malformed(_))));
}

#[test]
fn search_hits_are_scored_by_keywords() {
    let raw = read_fixture("search_results.json");
    let hits = parse_search_results(&raw).expect("fixture should parse");
    assert_eq!(hits.len(), 4);

    let tip = analyze_search_hit(&hits[0], "Liverpool", "Everton").expect("mentions both teams");
    assert_eq!(tip.outcome, Outcome::HomeWin);
    assert_eq!(tip.confidence, 78.0);
    assert_eq!(tip.reliability, 0.85);
    assert_eq!(tip.source, "Forebet");

    let preview = analyze_search_hit(&hits[1], "Liverpool", "Everton").expect("mentions both teams");
    assert_eq!(preview.outcome, Outcome::Draw);
    assert_eq!(preview.confidence, 65.0);
    assert_eq!(preview.reliability, 0.95);

    assert!(analyze_search_hit(&hits[2], "Liverpool", "Everton").is_none());

    let even = analyze_search_hit(&hits[3], "Liverpool", "Everton").expect("mentions both teams");
    assert_eq!(even.outcome, Outcome::Draw, "equal mentions stay a draw");
    assert_eq!(even.reliability, 0.70);
}

#[test]
fn search_results_accept_bare_arrays() {
    let hits = parse_search_results(r#"[{"title": "a", "body": "b", "href": "https://x.org"}]"#)
        .expect("array should parse");
    assert_eq!(hits.len(), 1);
    assert!(parse_search_results("42").is_err());
}
