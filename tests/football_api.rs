mod common;

use kickoff_oracle::football_api::{FootballApi, Score};

use common::{read_fixture, serve_once};

fn api(base_url: &str) -> FootballApi {
    FootballApi::new("test-token", format!("{base_url}/v4/")).unwrap()
}

#[test]
fn match_by_id_hits_single_match_endpoint() {
    let (url, request) = serve_once("200 OK", read_fixture("football_match.json"));
    let m = api(&url).match_by_id(436201).expect("match should load");
    assert_eq!(m.id, 436201);
    assert_eq!(m.half_time, Some(Score { home: 1, away: 0 }));
    assert!(request.recv().unwrap().starts_with("GET /v4/matches/436201 "));
}

#[test]
fn live_matches_filter_on_in_play_status() {
    let (url, request) = serve_once("200 OK", read_fixture("football_matches.json"));
    let matches = api(&url).live_matches().expect("listing should load");
    assert_eq!(matches.len(), 2);
    assert!(request.recv().unwrap().starts_with("GET /v4/matches?status=IN_PLAY "));
}

#[test]
fn competition_matches_use_a_date_window() {
    let (url, request) = serve_once("200 OK", read_fixture("football_matches.json"));
    let matches = api(&url).competition_matches(2021, 7).expect("listing should load");
    assert_eq!(matches[0].competition, "Premier League");
    let line = request.recv().unwrap();
    assert!(line.starts_with("GET /v4/competitions/2021/matches?dateFrom="), "{line}");
    assert!(line.contains("&dateTo="));
}

#[test]
fn competitions_listing_parses() {
    let (url, request) = serve_once("200 OK", read_fixture("competitions.json"));
    let comps = api(&url).competitions().expect("listing should load");
    assert_eq!(comps.len(), 2);
    assert!(request.recv().unwrap().starts_with("GET /v4/competitions "));
}

#[test]
fn error_status_is_reported() {
    let (url, _request) = serve_once("403 Forbidden", r#"{"message": "restricted"}"#.to_string());
    let err = api(&url).match_by_id(1).unwrap_err();
    assert!(err.to_string().contains("403"), "{err}");

    let (url, _request) = serve_once("429 Too Many Requests", "{}".to_string());
    let err = api(&url).live_matches().unwrap_err();
    assert!(err.to_string().contains("rate limit"), "{err}");
}

#[test]
fn responses_are_cached_per_endpoint() {
    let (url, request) = serve_once("200 OK", read_fixture("football_match.json"));
    let api = api(&url);
    let first = api.match_by_id(436201).unwrap();
    request.recv().unwrap();
    // The one-shot server is gone, so a second request would fail.
    assert_eq!(api.match_by_id(436201).unwrap(), first);
}
