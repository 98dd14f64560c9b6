use crate::model::{MatchContext, Opinion, Outcome, SourceKind};

pub const SOURCE_NAME: &str = "Expert Rules";

const ELITE_TEAMS: &[&str] = &[
    "manchester city",
    "liverpool",
    "real madrid",
    "barcelona",
    "bayern munich",
    "paris saint-germain",
    "arsenal",
    "chelsea",
];

const HIGH_IMPORTANCE_COMPETITIONS: &[&str] = &[
    "champions league",
    "europa league",
    "premier league",
    "la liga",
    "serie a",
];

/// Everything a rule may look at.
pub struct RuleInput<'a> {
    pub ctx: &'a MatchContext,
    pub existing: &'a [Opinion],
    pub home_elite: bool,
    pub away_elite: bool,
    pub high_importance: bool,
}

pub struct ExpertRule {
    pub name: &'static str,
    pub applies: fn(&RuleInput<'_>) -> bool,
    pub outcome: Outcome,
    pub confidence: f64,
    pub reliability: f64,
    pub reasoning: fn(&MatchContext) -> String,
}

// Order matters: the first rule whose predicate holds decides.
const RULES: &[ExpertRule] = &[
    ExpertRule {
        name: "elite_home",
        applies: elite_home,
        outcome: Outcome::HomeWin,
        confidence: 82.0,
        reliability: 0.75,
        reasoning: elite_home_reasoning,
    },
    ExpertRule {
        name: "elite_away",
        applies: elite_away,
        outcome: Outcome::AwayWin,
        confidence: 75.0,
        reliability: 0.75,
        reasoning: elite_away_reasoning,
    },
    ExpertRule {
        name: "home_consensus",
        applies: home_consensus,
        outcome: Outcome::HomeWin,
        confidence: 70.0,
        reliability: 0.65,
        reasoning: home_consensus_reasoning,
    },
];

fn elite_home(input: &RuleInput<'_>) -> bool {
    input.home_elite && !input.away_elite
}

fn elite_away(input: &RuleInput<'_>) -> bool {
    input.away_elite && !input.home_elite
}

fn home_consensus(input: &RuleInput<'_>) -> bool {
    input.high_importance && input.existing.len() > 2 && home_majority(input.existing)
}

fn elite_home_reasoning(ctx: &MatchContext) -> String {
    format!(
        "{} is an elite team with significant advantage at home",
        ctx.home_team_name
    )
}

fn elite_away_reasoning(ctx: &MatchContext) -> String {
    format!(
        "{} is an elite team, but away form can be challenging",
        ctx.away_team_name
    )
}

fn home_consensus_reasoning(_: &MatchContext) -> String {
    "High-importance match with home consensus".to_string()
}

/// Small ordered decision table over the match and the opinions gathered so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpertRuleProvider;

impl ExpertRuleProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn rules(&self) -> &'static [ExpertRule] {
        RULES
    }

    pub fn apply(&self, ctx: &MatchContext, existing: &[Opinion]) -> Option<Opinion> {
        let input = RuleInput {
            ctx,
            existing,
            home_elite: is_elite(&ctx.home_team_name),
            away_elite: is_elite(&ctx.away_team_name),
            high_importance: is_high_importance(&ctx.competition_name),
        };

        let rule = RULES.iter().find(|rule| (rule.applies)(&input))?;
        tracing::debug!(rule = rule.name, "expert rule fired");
        Some(Opinion::new(
            SOURCE_NAME,
            SourceKind::Expert,
            rule.outcome,
            rule.confidence,
            rule.reliability,
            (rule.reasoning)(ctx),
        ))
    }
}

pub fn is_elite(team_name: &str) -> bool {
    contains_any(team_name, ELITE_TEAMS)
}

pub fn is_high_importance(competition_name: &str) -> bool {
    contains_any(competition_name, HIGH_IMPORTANCE_COMPETITIONS)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|needle| lower.contains(needle))
}

fn home_majority(opinions: &[Opinion]) -> bool {
    let home = opinions
        .iter()
        .filter(|op| op.outcome == Outcome::HomeWin)
        .count();
    home * 2 > opinions.len()
}
