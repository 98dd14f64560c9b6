use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde_json::{Value, json};

use crate::football_api::{ApiMatch, Score};
use crate::model::{FinalPrediction, MatchContext, Outcome, Probabilities, round1};
use crate::statistical::{HalfTimeTurnaround, StatisticalReport};

impl ToSql for Outcome {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Outcome {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Outcome::parse(raw).ok_or_else(|| FromSqlError::Other(format!("unknown outcome {raw:?}").into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    Elite,
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceBucket::Elite
        } else if confidence >= 70.0 {
            ConfidenceBucket::High
        } else if confidence >= 50.0 {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceBucket::Elite => "ELITE",
            ConfidenceBucket::High => "HIGH",
            ConfidenceBucket::Medium => "MEDIUM",
            ConfidenceBucket::Low => "LOW",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ELITE" => Some(ConfidenceBucket::Elite),
            "HIGH" => Some(ConfidenceBucket::High),
            "MEDIUM" => Some(ConfidenceBucket::Medium),
            "LOW" => Some(ConfidenceBucket::Low),
            _ => None,
        }
    }
}

/// Whoever led at half-time and went on to lose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HalfTimeSwing {
    #[serde(rename = "HT_HOME_WIN_FT_LOSE")]
    HomeLeadLost,
    #[serde(rename = "HT_AWAY_WIN_FT_LOSE")]
    AwayLeadLost,
    #[serde(rename = "NONE")]
    None,
}

impl HalfTimeSwing {
    pub fn from_scores(half_time: Option<Score>, full_time: Outcome) -> Self {
        match half_time.map(|s| s.outcome()) {
            Some(Outcome::HomeWin) if full_time == Outcome::AwayWin => HalfTimeSwing::HomeLeadLost,
            Some(Outcome::AwayWin) if full_time == Outcome::HomeWin => HalfTimeSwing::AwayLeadLost,
            _ => HalfTimeSwing::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HalfTimeSwing::HomeLeadLost => "HT_HOME_WIN_FT_LOSE",
            HalfTimeSwing::AwayLeadLost => "HT_AWAY_WIN_FT_LOSE",
            HalfTimeSwing::None => "NONE",
        }
    }
}

/// Everything persisted for one predicted match.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub ctx: MatchContext,
    pub prediction: FinalPrediction,
    pub half_time: Option<HalfTimeTurnaround>,
    pub team_stats: Option<Value>,
}

impl PredictionRecord {
    pub fn new(ctx: MatchContext, prediction: FinalPrediction) -> Self {
        Self {
            ctx,
            prediction,
            half_time: None,
            team_stats: None,
        }
    }

    pub fn with_statistics(mut self, report: &StatisticalReport) -> Self {
        self.half_time = Some(report.half_time);
        self.team_stats = Some(json!({
            "home": report.home,
            "away": report.away,
            "home_advantage": round1(report.home_advantage),
            "strength_diff": round1(report.strength_diff),
        }));
        self
    }

    fn match_id(&self) -> Result<i64> {
        self.ctx
            .match_id
            .map(|id| id as i64)
            .ok_or_else(|| {
                anyhow!(
                    "prediction for {} vs {} has no match id",
                    self.ctx.home_team_name,
                    self.ctx.away_team_name
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub match_id: u64,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub match_date: String,
    pub predicted_outcome: Outcome,
    pub predicted_team: String,
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub reasoning: String,
    pub team_stats: Value,
    pub half_time: Option<HalfTimeTurnaround>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub actual_outcome: Option<Outcome>,
    pub was_correct: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketAccuracy {
    pub confidence_bucket: ConfidenceBucket,
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub accuracy: f64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeAccuracy {
    pub predicted_outcome: Outcome,
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracyStats {
    pub overall: AccuracySummary,
    pub by_confidence: Vec<BucketAccuracy>,
    pub by_outcome: Vec<OutcomeAccuracy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionBatch {
    pub id: i64,
    pub batch_name: String,
    pub batch_date: String,
    pub description: Option<String>,
    pub total_predictions: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchComparison {
    pub comparisons: Vec<Comparison>,
    pub total_predictions: u64,
    pub finished_matches: u64,
    pub correct_predictions: u64,
    pub win_ratio: f64,
}

/// SQLite-backed prediction history and accuracy tracking.
pub struct PredictionStore {
    conn: Connection,
}

impl PredictionStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn save_prediction(&self, record: &PredictionRecord) -> Result<()> {
        upsert_prediction(&self.conn, record, None)
    }

    /// Stores a finished match. Returns `false` (and writes nothing) for
    /// matches that are not finished or have no full-time score.
    pub fn save_result(&self, m: &ApiMatch) -> Result<bool> {
        let Some(full_time) = m.full_time.filter(|_| m.is_finished()) else {
            return Ok(false);
        };
        let actual = full_time.outcome();
        let ht_outcome = m.half_time.map(|s| s.outcome());
        let swing = HalfTimeSwing::from_scores(m.half_time, actual);

        self.conn
            .execute(
                r#"
                INSERT INTO match_results (
                    match_id, home_team_id, away_team_id, home_team_name, away_team_name,
                    competition_name, match_date, home_score, away_score,
                    ht_home_score, ht_away_score, actual_outcome, ht_outcome,
                    ht_win_ft_lose_outcome, match_status, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT(match_id) DO UPDATE SET
                    home_score = excluded.home_score,
                    away_score = excluded.away_score,
                    ht_home_score = excluded.ht_home_score,
                    ht_away_score = excluded.ht_away_score,
                    actual_outcome = excluded.actual_outcome,
                    ht_outcome = excluded.ht_outcome,
                    ht_win_ft_lose_outcome = excluded.ht_win_ft_lose_outcome,
                    match_status = excluded.match_status,
                    updated_at = excluded.updated_at
                "#,
                params![
                    m.id as i64,
                    m.home_team_id.map(|id| id as i64),
                    m.away_team_id.map(|id| id as i64),
                    m.home_team,
                    m.away_team,
                    m.competition,
                    m.utc_date,
                    full_time.home,
                    full_time.away,
                    m.half_time.map(|s| s.home),
                    m.half_time.map(|s| s.away),
                    actual,
                    ht_outcome,
                    swing.as_str(),
                    m.status,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert match result")?;
        Ok(true)
    }

    /// Predictions that have a recorded result, newest match first.
    pub fn comparisons(&self, limit: usize) -> Result<Vec<Comparison>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{COMPARISON_SELECT}
                 WHERE r.actual_outcome IS NOT NULL
                 ORDER BY p.match_date DESC
                 LIMIT ?1"
            ))
            .context("prepare comparisons query")?;
        let rows = stmt
            .query_map(params![limit as i64], comparison_from_row)
            .context("query comparisons")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read comparison rows")
    }

    pub fn statistics(&self) -> Result<AccuracyStats> {
        let (total, correct): (i64, i64) = self
            .conn
            .query_row(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(CASE WHEN p.predicted_outcome = r.actual_outcome THEN 1 ELSE 0 END), 0)
                FROM predictions p
                JOIN match_results r ON p.match_id = r.match_id
                WHERE r.actual_outcome IS NOT NULL
                "#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("query overall accuracy")?;

        let mut stmt = self
            .conn
            .prepare(&format!(
                r#"
                SELECT {BUCKET_CASE} AS bucket,
                       COUNT(*),
                       SUM(CASE WHEN p.predicted_outcome = r.actual_outcome THEN 1 ELSE 0 END),
                       AVG(p.confidence) AS avg_confidence
                FROM predictions p
                JOIN match_results r ON p.match_id = r.match_id
                WHERE r.actual_outcome IS NOT NULL
                GROUP BY bucket
                ORDER BY avg_confidence DESC
                "#
            ))
            .context("prepare bucket accuracy query")?;
        let by_confidence = stmt
            .query_map([], |row| {
                let bucket: String = row.get(0)?;
                let total: i64 = row.get(1)?;
                let correct: i64 = row.get(2)?;
                let avg: f64 = row.get(3)?;
                Ok((bucket, total, correct, avg))
            })
            .context("query bucket accuracy")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read bucket accuracy rows")?
            .into_iter()
            .filter_map(|(bucket, total, correct, avg)| {
                Some(BucketAccuracy {
                    confidence_bucket: ConfidenceBucket::parse(&bucket)?,
                    total_predictions: total as u64,
                    correct_predictions: correct as u64,
                    accuracy: percent(correct, total),
                    avg_confidence: round1(avg),
                })
            })
            .collect();

        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT p.predicted_outcome,
                       COUNT(*),
                       SUM(CASE WHEN p.predicted_outcome = r.actual_outcome THEN 1 ELSE 0 END)
                FROM predictions p
                JOIN match_results r ON p.match_id = r.match_id
                WHERE r.actual_outcome IS NOT NULL
                GROUP BY p.predicted_outcome
                ORDER BY p.predicted_outcome
                "#,
            )
            .context("prepare outcome accuracy query")?;
        let by_outcome = stmt
            .query_map([], |row| {
                let total: i64 = row.get(1)?;
                let correct: i64 = row.get(2)?;
                Ok(OutcomeAccuracy {
                    predicted_outcome: row.get(0)?,
                    total_predictions: total as u64,
                    correct_predictions: correct as u64,
                    accuracy: percent(correct, total),
                })
            })
            .context("query outcome accuracy")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read outcome accuracy rows")?;

        Ok(AccuracyStats {
            overall: AccuracySummary {
                total_predictions: total as u64,
                correct_predictions: correct as u64,
                accuracy: percent(correct, total),
            },
            by_confidence,
            by_outcome,
        })
    }

    /// Rebuilds `prediction_accuracy` from the current predictions and
    /// results. Returns the number of tracked rows.
    pub fn refresh_accuracy(&mut self) -> Result<usize> {
        let tx = self.conn.transaction().context("begin accuracy transaction")?;
        tx.execute("DELETE FROM prediction_accuracy", [])
            .context("clear accuracy table")?;
        let inserted = tx
            .execute(
                &format!(
                    r#"
                    INSERT INTO prediction_accuracy (
                        prediction_id, match_id, was_correct, confidence_bucket,
                        prediction_method, created_at
                    )
                    SELECT p.id, p.match_id,
                           (p.predicted_outcome = r.actual_outcome),
                           {BUCKET_CASE},
                           p.prediction_method,
                           ?1
                    FROM predictions p
                    JOIN match_results r ON p.match_id = r.match_id
                    WHERE r.actual_outcome IS NOT NULL
                    "#
                ),
                params![Utc::now().to_rfc3339()],
            )
            .context("fill accuracy table")?;
        tx.commit().context("commit accuracy transaction")?;
        Ok(inserted)
    }

    /// Saves the batch header and all its predictions in one transaction.
    pub fn save_batch(&mut self, name: &str, records: &[PredictionRecord]) -> Result<i64> {
        let tx = self.conn.transaction().context("begin batch transaction")?;
        let now = Utc::now();
        tx.execute(
            r#"
            INSERT INTO prediction_batches (batch_name, batch_date, description, total_predictions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                name,
                now.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("Manual prediction batch: {name}"),
                records.len() as i64,
                now.to_rfc3339(),
            ],
        )
        .context("insert batch")?;
        let batch_id = tx.last_insert_rowid();
        for record in records {
            upsert_prediction(&tx, record, Some(batch_id))?;
        }
        tx.commit().context("commit batch transaction")?;
        tracing::info!(batch_id, name, predictions = records.len(), "saved prediction batch");
        Ok(batch_id)
    }

    pub fn batches(&self) -> Result<Vec<PredictionBatch>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, batch_name, batch_date, description, total_predictions, created_at
                FROM prediction_batches
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .context("prepare batches query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PredictionBatch {
                    id: row.get(0)?,
                    batch_name: row.get(1)?,
                    batch_date: row.get(2)?,
                    description: row.get(3)?,
                    total_predictions: row.get::<_, i64>(4)? as u64,
                    created_at: row.get(5)?,
                })
            })
            .context("query batches")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read batch rows")
    }

    pub fn batch_comparison(&self, batch_id: i64) -> Result<BatchComparison> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{COMPARISON_SELECT}
                 WHERE p.batch_id = ?1
                 ORDER BY p.match_date ASC"
            ))
            .context("prepare batch comparison query")?;
        let comparisons = stmt
            .query_map(params![batch_id], comparison_from_row)
            .context("query batch comparison")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read batch comparison rows")?;

        let finished = comparisons
            .iter()
            .filter(|c| c.actual_outcome.is_some())
            .count() as i64;
        let correct = comparisons
            .iter()
            .filter(|c| c.was_correct == Some(true))
            .count() as i64;
        Ok(BatchComparison {
            total_predictions: comparisons.len() as u64,
            finished_matches: finished as u64,
            correct_predictions: correct as u64,
            win_ratio: percent(correct, finished),
            comparisons,
        })
    }

    /// Removes the batch, its predictions and any orphaned accuracy rows.
    /// Returns whether a batch with that id existed.
    pub fn delete_batch(&mut self, batch_id: i64) -> Result<bool> {
        let tx = self.conn.transaction().context("begin delete transaction")?;
        tx.execute("DELETE FROM predictions WHERE batch_id = ?1", params![batch_id])
            .context("delete batch predictions")?;
        let removed = tx
            .execute("DELETE FROM prediction_batches WHERE id = ?1", params![batch_id])
            .context("delete batch")?;
        tx.execute(
            "DELETE FROM prediction_accuracy WHERE prediction_id NOT IN (SELECT id FROM predictions)",
            [],
        )
        .context("delete orphaned accuracy rows")?;
        tx.commit().context("commit delete transaction")?;
        Ok(removed > 0)
    }

    pub fn prediction_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))
            .context("count predictions")?;
        Ok(count as u64)
    }

    pub fn stored_outcome(&self, match_id: u64) -> Result<Option<Outcome>> {
        self.conn
            .query_row(
                "SELECT predicted_outcome FROM predictions WHERE match_id = ?1",
                params![match_id as i64],
                |row| row.get(0),
            )
            .optional()
            .context("query stored prediction")
    }
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER UNIQUE NOT NULL,
            home_team_name TEXT NOT NULL,
            away_team_name TEXT NOT NULL,
            competition_name TEXT,
            match_date TEXT NOT NULL,
            predicted_outcome TEXT NOT NULL,
            predicted_team TEXT NOT NULL,
            confidence REAL NOT NULL,
            home_win_prob REAL,
            draw_prob REAL,
            away_win_prob REAL,
            ht_home_win_ft_lose_prob REAL,
            ht_away_win_ft_lose_prob REAL,
            reasoning TEXT,
            prediction_method TEXT NOT NULL DEFAULT 'weighted_voting',
            team_stats TEXT,
            batch_id INTEGER NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_batch ON predictions(batch_id);
        CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(match_date);
        CREATE TABLE IF NOT EXISTS match_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER UNIQUE NOT NULL,
            home_team_id INTEGER NULL,
            away_team_id INTEGER NULL,
            home_team_name TEXT NOT NULL,
            away_team_name TEXT NOT NULL,
            competition_name TEXT,
            match_date TEXT NOT NULL,
            home_score INTEGER,
            away_score INTEGER,
            ht_home_score INTEGER,
            ht_away_score INTEGER,
            actual_outcome TEXT,
            ht_outcome TEXT,
            ht_win_ft_lose_outcome TEXT NOT NULL DEFAULT 'NONE',
            match_status TEXT NOT NULL DEFAULT 'FINISHED',
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS prediction_accuracy (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prediction_id INTEGER,
            match_id INTEGER,
            was_correct INTEGER NOT NULL,
            confidence_bucket TEXT,
            prediction_method TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS prediction_batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_name TEXT NOT NULL,
            batch_date TEXT NOT NULL,
            description TEXT,
            total_predictions INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .context("init sqlite schema")?;
    Ok(())
}

const BUCKET_CASE: &str = "CASE
    WHEN p.confidence >= 80 THEN 'ELITE'
    WHEN p.confidence >= 70 THEN 'HIGH'
    WHEN p.confidence >= 50 THEN 'MEDIUM'
    ELSE 'LOW'
END";

const COMPARISON_SELECT: &str = r#"
    SELECT p.match_id, p.home_team_name, p.away_team_name, p.competition_name,
           p.match_date, p.predicted_outcome, p.predicted_team, p.confidence,
           p.home_win_prob, p.draw_prob, p.away_win_prob, p.reasoning, p.team_stats,
           r.home_score, r.away_score, r.actual_outcome,
           p.ht_home_win_ft_lose_prob, p.ht_away_win_ft_lose_prob
    FROM predictions p
    LEFT JOIN match_results r ON p.match_id = r.match_id"#;

fn comparison_from_row(row: &Row<'_>) -> rusqlite::Result<Comparison> {
    let predicted_outcome: Outcome = row.get(5)?;
    let actual_outcome: Option<Outcome> = row.get(15)?;
    let team_stats = row
        .get::<_, Option<String>>(12)?
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or(Value::Null);
    Ok(Comparison {
        match_id: row.get::<_, i64>(0)? as u64,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        competition: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        match_date: row.get(4)?,
        predicted_outcome,
        predicted_team: row.get(6)?,
        confidence: row.get(7)?,
        probabilities: Probabilities {
            home_win: row.get::<_, Option<f64>>(8)?.unwrap_or_default(),
            draw: row.get::<_, Option<f64>>(9)?.unwrap_or_default(),
            away_win: row.get::<_, Option<f64>>(10)?.unwrap_or_default(),
        },
        reasoning: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        team_stats,
        half_time: match (row.get::<_, Option<f64>>(16)?, row.get::<_, Option<f64>>(17)?) {
            (Some(home_lead_lost), Some(away_lead_lost)) => Some(HalfTimeTurnaround {
                home_lead_lost,
                away_lead_lost,
            }),
            _ => None,
        },
        home_score: row.get(13)?,
        away_score: row.get(14)?,
        was_correct: actual_outcome.map(|actual| actual == predicted_outcome),
        actual_outcome,
    })
}

fn upsert_prediction(conn: &Connection, record: &PredictionRecord, batch_id: Option<i64>) -> Result<()> {
    let match_id = record.match_id()?;
    let p = &record.prediction;
    let team_stats = record
        .team_stats
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("serialize team stats")?;
    conn.execute(
        r#"
        INSERT INTO predictions (
            match_id, home_team_name, away_team_name, competition_name, match_date,
            predicted_outcome, predicted_team, confidence, home_win_prob, draw_prob,
            away_win_prob, ht_home_win_ft_lose_prob, ht_away_win_ft_lose_prob,
            reasoning, prediction_method, team_stats, batch_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        ON CONFLICT(match_id) DO UPDATE SET
            home_team_name = excluded.home_team_name,
            away_team_name = excluded.away_team_name,
            competition_name = excluded.competition_name,
            match_date = excluded.match_date,
            predicted_outcome = excluded.predicted_outcome,
            predicted_team = excluded.predicted_team,
            confidence = excluded.confidence,
            home_win_prob = excluded.home_win_prob,
            draw_prob = excluded.draw_prob,
            away_win_prob = excluded.away_win_prob,
            ht_home_win_ft_lose_prob = excluded.ht_home_win_ft_lose_prob,
            ht_away_win_ft_lose_prob = excluded.ht_away_win_ft_lose_prob,
            reasoning = excluded.reasoning,
            prediction_method = excluded.prediction_method,
            team_stats = excluded.team_stats,
            batch_id = excluded.batch_id,
            created_at = excluded.created_at
        "#,
        params![
            match_id,
            record.ctx.home_team_name,
            record.ctx.away_team_name,
            record.ctx.competition_name,
            record.ctx.match_date.as_deref().unwrap_or_default(),
            p.outcome,
            p.predicted_team,
            round1(p.confidence),
            round1(p.probabilities.home_win),
            round1(p.probabilities.draw),
            round1(p.probabilities.away_win),
            record.half_time.map(|h| round1(h.home_lead_lost)),
            record.half_time.map(|h| round1(h.away_lead_lost)),
            p.reasoning,
            p.method.as_str(),
            team_stats,
            batch_id,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert prediction for match {match_id}"))?;
    Ok(())
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        round1(part as f64 / whole as f64 * 100.0)
    } else {
        0.0
    }
}
