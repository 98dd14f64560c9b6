use rand::Rng;
use serde::Serialize;

use crate::model::{MatchContext, Opinion, Probabilities, SourceKind};
use crate::seeded::seeded_rng;

pub const SOURCE_NAME: &str = "Statistical Analysis";
pub const RELIABILITY: f64 = 0.7;

const BASE_STRENGTH: f64 = 50.0;
const STRENGTH_JITTER: f64 = 8.0;
const HOME_ADVANTAGE: f64 = 3.5;
const STRONG_HOME_BONUS: f64 = 1.5;
const WEAK_HOME_PENALTY: f64 = 0.5;
const SIMULATED_MATCHES: u32 = 5;
const SCORING_GAP: f64 = 0.5;

// Club keys are matched as lower-case substrings of the team name.
const HISTORICAL_BONUS: &[(&str, f64)] = &[
    ("manchester city", 18.0),
    ("liverpool", 17.0),
    ("real madrid", 20.0),
    ("barcelona", 18.0),
    ("bayern munich", 19.0),
    ("paris saint-germain", 16.0),
    ("chelsea", 14.0),
    ("arsenal", 14.0),
    ("manchester united", 13.0),
    ("atletico madrid", 14.0),
    ("borussia dortmund", 13.0),
    ("juventus", 14.0),
    ("ac milan", 13.0),
    ("inter", 13.0),
    ("napoli", 13.0),
    ("tottenham", 10.0),
    ("newcastle", 8.0),
    ("sevilla", 10.0),
    ("real sociedad", 8.0),
    ("villarreal", 8.0),
    ("rb leipzig", 10.0),
    ("bayer leverkusen", 10.0),
    ("eintracht frankfurt", 8.0),
    ("atalanta", 9.0),
    ("roma", 9.0),
    ("lazio", 8.0),
    ("marseille", 9.0),
    ("lyon", 9.0),
    ("monaco", 9.0),
    ("ajax", 10.0),
    ("psv", 8.0),
    ("benfica", 10.0),
    ("porto", 10.0),
    ("sporting", 8.0),
    ("brighton", 6.0),
    ("west ham", 7.0),
    ("leicester", 7.0),
    ("everton", 6.0),
    ("wolves", 6.0),
    ("crystal palace", 5.0),
    ("bournemouth", 4.0),
    ("coventry", -5.0),
    ("stoke", -3.0),
    ("birmingham", -4.0),
    ("swansea", -3.0),
    ("wrexham", -8.0),
    ("norwich", -2.0),
    ("hull", -3.0),
];

#[derive(Debug, Clone, Copy)]
struct Band {
    above: f64,
    home: f64,
    draw: f64,
    away: f64,
}

// Checked top to bottom; the first band whose lower bound the diff exceeds wins.
const STRENGTH_BANDS: &[Band] = &[
    Band { above: 20.0, home: 0.85, draw: 0.07, away: 0.08 },
    Band { above: 15.0, home: 0.82, draw: 0.08, away: 0.10 },
    Band { above: 10.0, home: 0.75, draw: 0.10, away: 0.15 },
    Band { above: 5.0, home: 0.65, draw: 0.15, away: 0.20 },
    Band { above: -5.0, home: 0.45, draw: 0.20, away: 0.35 },
    Band { above: -10.0, home: 0.20, draw: 0.15, away: 0.65 },
    Band { above: -15.0, home: 0.10, draw: 0.08, away: 0.82 },
    Band { above: f64::NEG_INFINITY, home: 0.08, draw: 0.07, away: 0.85 },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStats {
    pub strength: f64,
    pub form: String,
    pub points_per_game: f64,
    pub goals_scored: u32,
    pub goals_per_game: f64,
    pub matches_played: u32,
}

/// Chance (percent) that a side leads at half-time and still loses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HalfTimeTurnaround {
    pub home_lead_lost: f64,
    pub away_lead_lost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticalReport {
    pub opinion: Opinion,
    pub probabilities: Probabilities,
    pub strength_diff: f64,
    pub home_advantage: f64,
    pub home: TeamStats,
    pub away: TeamStats,
    pub half_time: HalfTimeTurnaround,
}

/// Reputation-driven strength model. Same match context in, same report out.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalProvider;

impl StatisticalProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, ctx: &MatchContext) -> Opinion {
        self.analyze(ctx).opinion
    }

    pub fn analyze(&self, ctx: &MatchContext) -> StatisticalReport {
        let home_name = ctx.home_team_name.as_str();
        let away_name = ctx.away_team_name.as_str();
        let mut rng = seeded_rng(&[home_name, away_name, ctx.competition_name.as_str()]);

        let home_strength = BASE_STRENGTH
            + historical_bonus(home_name)
            + rng.gen_range(-STRENGTH_JITTER..=STRENGTH_JITTER);
        let away_strength = BASE_STRENGTH
            + historical_bonus(away_name)
            + rng.gen_range(-STRENGTH_JITTER..=STRENGTH_JITTER);

        let home = simulated_form(&mut rng, home_strength);
        let away = simulated_form(&mut rng, away_strength);

        let home_advantage = home_advantage(home_strength);
        let strength_diff = home_strength + home_advantage - away_strength;

        let band = band_for(strength_diff);
        let (mut p_home, mut p_draw, mut p_away) = (band.home, band.draw, band.away);

        if home.goals_per_game > away.goals_per_game + SCORING_GAP {
            p_home += 0.05;
            p_away -= 0.03;
            p_draw -= 0.02;
        } else if away.goals_per_game > home.goals_per_game + SCORING_GAP {
            p_away += 0.05;
            p_home -= 0.03;
            p_draw -= 0.02;
        }

        let total = p_home + p_draw + p_away;
        let probabilities = Probabilities {
            home_win: p_home / total * 100.0,
            draw: p_draw / total * 100.0,
            away_win: p_away / total * 100.0,
        };
        let outcome = probabilities.leader();
        let confidence = probabilities.of(outcome);

        let reasoning = build_reasoning(ctx, strength_diff, home_advantage, &home, &away);
        let opinion = Opinion::new(
            SOURCE_NAME,
            SourceKind::Statistical,
            outcome,
            confidence,
            RELIABILITY,
            reasoning,
        );

        let half_time = HalfTimeTurnaround {
            home_lead_lost: half_time_lead_lost(home_strength, away_strength, Side::Home),
            away_lead_lost: half_time_lead_lost(away_strength, home_strength, Side::Away),
        };

        StatisticalReport {
            opinion,
            probabilities,
            strength_diff,
            home_advantage,
            home,
            away,
            half_time,
        }
    }
}

/// Sum of every table bonus whose key appears in the lower-cased name.
pub fn historical_bonus(team_name: &str) -> f64 {
    let lower = team_name.to_lowercase();
    HISTORICAL_BONUS
        .iter()
        .filter(|(key, _)| lower.contains(key))
        .map(|(_, bonus)| bonus)
        .sum()
}

fn simulated_form<R: Rng>(rng: &mut R, strength: f64) -> TeamStats {
    let points_per_game: f64 = rng.gen_range(0.5..=2.5);
    let goals_scored: u32 = rng.gen_range(3..=12);
    TeamStats {
        strength,
        form: "N/A".to_string(),
        points_per_game,
        goals_scored,
        goals_per_game: goals_scored as f64 / SIMULATED_MATCHES.max(1) as f64,
        matches_played: SIMULATED_MATCHES,
    }
}

fn home_advantage(home_strength: f64) -> f64 {
    if home_strength > 60.0 {
        HOME_ADVANTAGE + STRONG_HOME_BONUS
    } else if home_strength < 40.0 {
        HOME_ADVANTAGE - WEAK_HOME_PENALTY
    } else {
        HOME_ADVANTAGE
    }
}

fn band_for(strength_diff: f64) -> Band {
    STRENGTH_BANDS
        .iter()
        .copied()
        .find(|band| strength_diff > band.above)
        .unwrap_or(STRENGTH_BANDS[STRENGTH_BANDS.len() - 1])
}

fn build_reasoning(
    ctx: &MatchContext,
    strength_diff: f64,
    home_advantage: f64,
    home: &TeamStats,
    away: &TeamStats,
) -> String {
    let mut parts = Vec::new();
    let stronger = if strength_diff > 0.0 {
        &ctx.home_team_name
    } else {
        &ctx.away_team_name
    };
    if strength_diff.abs() > 15.0 {
        parts.push(format!("{stronger} has significantly better form"));
    } else if strength_diff.abs() > 8.0 {
        parts.push(format!("{stronger} has better recent form"));
    } else {
        parts.push("Both teams in similar form".to_string());
    }

    if home_advantage > 4.0 {
        parts.push("Strong home advantage".to_string());
    } else if home_advantage > 2.0 {
        parts.push("Home advantage".to_string());
    }

    if home.goals_per_game > away.goals_per_game + SCORING_GAP {
        parts.push(format!("{} scoring more goals", ctx.home_team_name));
    } else if away.goals_per_game > home.goals_per_game + SCORING_GAP {
        parts.push(format!("{} scoring more goals", ctx.away_team_name));
    }

    parts.join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

fn half_time_lead_lost(team_strength: f64, opponent_strength: f64, side: Side) -> f64 {
    let mut prob: f64 = 4.0;
    let diff = (team_strength - opponent_strength).abs();
    if (5.0..=15.0).contains(&diff) {
        prob += 2.0;
    } else if diff > 20.0 {
        prob -= 1.0;
    }
    if side == Side::Away {
        prob += 0.8;
    }

    let tag = match side {
        Side::Home => "home",
        Side::Away => "away",
    };
    let key = format!("{team_strength}_{opponent_strength}_{tag}");
    let mut rng = seeded_rng(&[key.as_str()]);
    prob += rng.gen_range(-1.5..=1.5);
    prob.clamp(1.5, 8.5)
}

#[cfg(test)]
mod tests {
    use super::{band_for, half_time_lead_lost, historical_bonus, home_advantage, Side};

    #[test]
    fn bonus_sums_every_matching_key() {
        assert_eq!(historical_bonus("Manchester City FC"), 18.0);
        assert_eq!(historical_bonus("Burnley"), 0.0);
        assert_eq!(historical_bonus(""), 0.0);
        // "inter" and "roma" both appear in this (made-up) name.
        assert_eq!(historical_bonus("Internazionale Roma"), 22.0);
    }

    #[test]
    fn bands_are_exclusive_on_the_lower_bound() {
        assert_eq!(band_for(20.0).home, 0.82);
        assert_eq!(band_for(20.01).home, 0.85);
        assert_eq!(band_for(0.0).home, 0.45);
        assert_eq!(band_for(-5.0).away, 0.65);
        assert_eq!(band_for(-100.0).away, 0.85);
    }

    #[test]
    fn home_advantage_tracks_home_strength() {
        assert_eq!(home_advantage(61.0), 5.0);
        assert_eq!(home_advantage(50.0), 3.5);
        assert_eq!(home_advantage(39.0), 3.0);
    }

    #[test]
    fn turnaround_probability_is_bounded() {
        for (a, b) in [(50.0, 50.0), (70.0, 40.0), (20.0, 80.0), (55.0, 45.0)] {
            let p = half_time_lead_lost(a, b, Side::Away);
            assert!((1.5..=8.5).contains(&p));
        }
    }
}
