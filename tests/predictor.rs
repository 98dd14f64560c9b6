use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use kickoff_oracle::ensemble::EnsembleCombiner;
use kickoff_oracle::model::{MatchContext, Opinion, Outcome, SourceKind};
use kickoff_oracle::predictor::{MatchPredictor, cache_key};
use kickoff_oracle::source::{OpinionSource, SourceError};

struct FakeSource {
    kind: SourceKind,
    outcome: Outcome,
    delay: Duration,
    timeout: Duration,
    fail: bool,
    calls: AtomicUsize,
    finished: AtomicUsize,
    seen_existing: Mutex<Vec<usize>>,
}

impl FakeSource {
    fn new(kind: SourceKind, outcome: Outcome) -> Self {
        Self {
            kind,
            outcome,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(2),
            fail: false,
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            seen_existing: Mutex::new(Vec::new()),
        }
    }

    fn slow(mut self, delay: Duration, timeout: Duration) -> Self {
        self.delay = delay;
        self.timeout = timeout;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OpinionSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch(
        &self,
        _ctx: &MatchContext,
        existing: &[Opinion],
    ) -> Result<Option<Opinion>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_existing.lock().unwrap().push(existing.len());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Unavailable("fake outage".into()));
        }
        Ok(Some(Opinion::new(
            format!("fake {}", self.kind.as_str()),
            self.kind,
            self.outcome,
            72.0,
            0.8,
            "fake reasoning",
        )))
    }
}

fn predictor() -> MatchPredictor {
    MatchPredictor::new(EnsembleCombiner::default(), Duration::from_secs(60))
}

fn ctx() -> MatchContext {
    MatchContext::new("Ajax", "Feyenoord")
        .with_competition("Eredivisie")
        .with_date("2024-04-07T12:30:00Z")
}

#[test]
fn local_only_prediction_uses_statistics() {
    let p = predictor().predict(&ctx(), true);
    assert_eq!(p.total_sources, 1);
    assert_eq!(p.sources[0].kind, SourceKind::Statistical);
}

#[test]
fn sources_keep_invocation_order() {
    let web = Arc::new(FakeSource::new(SourceKind::Web, Outcome::HomeWin));
    let ai = Arc::new(FakeSource::new(SourceKind::Ai, Outcome::HomeWin));
    let predictor = predictor()
        .with_web_source(web.clone())
        .with_ai_source(ai.clone());

    let ctx = MatchContext::new("Real Madrid", "Getafe").with_competition("La Liga");
    let p = predictor.predict(&ctx, false);
    let kinds: Vec<SourceKind> = p.sources.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SourceKind::Web,
            SourceKind::Statistical,
            SourceKind::Ai,
            SourceKind::Expert
        ]
    );
    assert_eq!(web.calls(), 1);
    assert_eq!(*web.seen_existing.lock().unwrap(), vec![0]);
    assert_eq!(*ai.seen_existing.lock().unwrap(), vec![1], "ai sees the statistical opinion");
}

#[test]
fn fast_mode_skips_web_source() {
    let web = Arc::new(FakeSource::new(SourceKind::Web, Outcome::AwayWin));
    let ai = Arc::new(FakeSource::new(SourceKind::Ai, Outcome::AwayWin));
    let predictor = predictor()
        .with_web_source(web.clone())
        .with_ai_source(ai.clone());

    let p = predictor.predict(&ctx(), true);
    assert_eq!(web.calls(), 0);
    assert_eq!(ai.calls(), 1);
    assert!(!p.has_source_kind(SourceKind::Web));
    assert!(p.has_source_kind(SourceKind::Ai));
}

#[test]
fn slow_source_is_dropped_at_its_deadline() {
    let ai = Arc::new(
        FakeSource::new(SourceKind::Ai, Outcome::AwayWin)
            .slow(Duration::from_secs(3), Duration::from_millis(200)),
    );
    let predictor = predictor().with_ai_source(ai.clone());

    let started = Instant::now();
    let p = predictor.predict(&ctx(), true);
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
    assert!(!p.has_source_kind(SourceKind::Ai));
    assert_eq!(p.total_sources, 1);
}

#[test]
fn late_worker_runs_out_detached_after_deadline() {
    let ai = Arc::new(
        FakeSource::new(SourceKind::Ai, Outcome::AwayWin)
            .slow(Duration::from_millis(400), Duration::from_millis(100)),
    );
    let predictor = MatchPredictor::new(EnsembleCombiner::default(), Duration::ZERO)
        .with_ai_source(ai.clone());

    let p = predictor.predict(&ctx(), true);
    assert!(!p.has_source_kind(SourceKind::Ai));
    assert_eq!(ai.finished.load(Ordering::SeqCst), 0, "worker still running");

    thread::sleep(Duration::from_millis(600));
    assert_eq!(ai.finished.load(Ordering::SeqCst), 1, "worker ran to completion");
}

#[test]
fn concurrent_sources_share_one_clock() {
    let web = Arc::new(
        FakeSource::new(SourceKind::Web, Outcome::HomeWin)
            .slow(Duration::from_millis(300), Duration::from_secs(2)),
    );
    let ai = Arc::new(
        FakeSource::new(SourceKind::Ai, Outcome::HomeWin)
            .slow(Duration::from_millis(300), Duration::from_secs(2)),
    );
    let predictor = predictor().with_web_source(web).with_ai_source(ai);

    let started = Instant::now();
    let p = predictor.predict(&ctx(), false);
    assert!(started.elapsed() < Duration::from_millis(550));
    assert!(p.has_source_kind(SourceKind::Web));
    assert!(p.has_source_kind(SourceKind::Ai));
}

#[test]
fn failing_source_is_skipped() {
    let ai = Arc::new(FakeSource::new(SourceKind::Ai, Outcome::HomeWin).failing());
    let p = predictor().with_ai_source(ai.clone()).predict(&ctx(), true);
    assert_eq!(ai.calls(), 1);
    assert!(!p.has_source_kind(SourceKind::Ai));
    assert_eq!(p.total_sources, 1);
}

#[test]
fn repeated_prediction_hits_the_cache() {
    let ai = Arc::new(FakeSource::new(SourceKind::Ai, Outcome::Draw));
    let predictor = predictor().with_ai_source(ai.clone());

    let first = predictor.predict(&ctx(), true);
    let second = predictor.predict(&ctx(), true);
    assert_eq!(first, second);
    assert_eq!(ai.calls(), 1);

    predictor.predict(&ctx(), false);
    assert_eq!(ai.calls(), 2, "fast mode is part of the key");

    predictor.clear_cache();
    predictor.predict(&ctx(), true);
    assert_eq!(ai.calls(), 3);
}

#[test]
fn zero_ttl_disables_caching() {
    let ai = Arc::new(FakeSource::new(SourceKind::Ai, Outcome::Draw));
    let predictor = MatchPredictor::new(EnsembleCombiner::default(), Duration::ZERO)
        .with_ai_source(ai.clone());
    predictor.predict(&ctx(), true);
    predictor.predict(&ctx(), true);
    assert_eq!(ai.calls(), 2);
}

#[test]
fn batch_prediction_preserves_order() {
    let matches = vec![
        MatchContext::new("Liverpool", "Burnley"),
        MatchContext::new("Burnley", "Liverpool"),
        MatchContext::new("Ajax", "PSV"),
    ];
    let predictor = predictor();
    let batch = predictor.predict_many(&matches, true);
    assert_eq!(batch.len(), 3);
    for (ctx, p) in matches.iter().zip(&batch) {
        assert_eq!(p, &predictor.predict(ctx, true));
    }
    assert_eq!(batch[0].outcome, Outcome::HomeWin);
    assert_eq!(batch[0].predicted_team, "Liverpool");
}

#[test]
fn cache_key_includes_date_and_mode() {
    assert_eq!(
        cache_key(&ctx(), true),
        "Ajax_Feyenoord_2024-04-07T12:30:00Z_true"
    );
    assert_eq!(
        cache_key(&MatchContext::new("A", "B"), false),
        "A_B__false"
    );
}
