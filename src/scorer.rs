use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::handicap::parse_handicap;
use crate::league_stats::{LeagueStatistic, LeagueTable};
use crate::model::{
    GoalsBucket, HandicapPick, MarketPrediction, MatchPick, MatchRecord, PredictionRecord,
    PredictionSource, Verdict,
};
use crate::movement::MovementLabel;
use crate::priors::{LeaguePriors, LeagueTag};
use crate::settlement::{Side, record_line, upper_side};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConstants {
    /// Points per unit of gap between the winner and the runner-up.
    pub k1: i32,
    /// Points per unit of the winning score.
    pub k2: i32,
    pub cap: u8,
    /// Confidence reported with an undetermined verdict.
    pub undetermined: u8,
    /// Undetermined confidence always stays below this.
    pub low_confidence: u8,
    /// Three-way price gap (second lowest minus lowest) that marks a clear favourite.
    pub clear_favourite_gap: f64,
    pub clear_favourite_bonus: i32,
}

impl Default for ScoringConstants {
    fn default() -> Self {
        Self {
            k1: 8,
            k2: 3,
            cap: 90,
            undetermined: 40,
            low_confidence: 50,
            clear_favourite_gap: 0.5,
            clear_favourite_bonus: 10,
        }
    }
}

/// Numeric inputs a rule can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    EuroHome,
    EuroDraw,
    EuroAway,
    /// Opening minus current home price; positive when the price fell.
    EuroHomeDrop,
    EuroAwayDrop,
    /// Current minus opening Asian home price.
    AsianHomeChange,
    AsianHomePrice,
    AsianLineAbs,
    IndexLineAbs,
    UpperPrice,
    PushPrice,
    LowerPrice,
    UpperDrop,
    PushDrop,
    LowerDrop,
    TotalLine,
    OverPrice,
    UnderPrice,
    LeagueAvgGoals,
    /// League lower-side rate in percent at the current three-way line.
    LeagueLowerRate,
    /// League over rate in percent at the current total line.
    LeagueOverRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Below(Field, f64),
    Above(Field, f64),
    AtMost(Field, f64),
    AtLeast(Field, f64),
    /// `lo <= value < hi`
    Band(Field, f64, f64),
    Missing(Field),
    League(LeagueTag),
    Label(MovementLabel),
    /// The three-way price of this slot is the lowest (ties included).
    LowestPrice(HandicapPick),
    All(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// A rule whose field is missing never fires.
    pub fn holds(&self, input: &ScoringInput<'_>) -> bool {
        let cmp = |field: Field, f: &dyn Fn(f64) -> bool| input.value(field).is_some_and(f);
        match self {
            Condition::Below(field, x) => cmp(*field, &|v| v < *x),
            Condition::Above(field, x) => cmp(*field, &|v| v > *x),
            Condition::AtMost(field, x) => cmp(*field, &|v| v <= *x),
            Condition::AtLeast(field, x) => cmp(*field, &|v| v >= *x),
            Condition::Band(field, lo, hi) => cmp(*field, &|v| v >= *lo && v < *hi),
            Condition::Missing(field) => input.value(*field).is_none(),
            Condition::League(tag) => input.priors.has(input.league, *tag),
            Condition::Label(label) => input.label == Some(*label),
            Condition::LowestPrice(slot) => input.is_lowest(*slot),
            Condition::All(parts) => !parts.is_empty() && parts.iter().all(|c| c.holds(input)),
            Condition::Not(inner) => !inner.holds(input),
        }
    }

    /// First numeric field the condition looks at, used to render `{value}`.
    fn subject(&self) -> Option<Field> {
        match self {
            Condition::Below(f, _)
            | Condition::Above(f, _)
            | Condition::AtMost(f, _)
            | Condition::AtLeast(f, _)
            | Condition::Band(f, _, _) => Some(*f),
            Condition::All(parts) => parts.iter().find_map(Condition::subject),
            Condition::Not(inner) => inner.subject(),
            Condition::Missing(_)
            | Condition::League(_)
            | Condition::Label(_)
            | Condition::LowestPrice(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition<T> {
    pub condition: Condition,
    pub target: T,
    pub points: i32,
    /// `{value}`, `{league}` and `{label}` are substituted when the rule fires.
    pub reason_template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRule {
    pub condition: Condition,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub outcome: Vec<RuleDefinition<MatchPick>>,
    pub handicap: Vec<RuleDefinition<HandicapPick>>,
    pub goals: Vec<RuleDefinition<GoalsBucket>>,
    pub warnings: Vec<WarningRule>,
}

static BUILTIN_RULES: Lazy<RuleSet> = Lazy::new(RuleSet::builtin);

fn rule<T>(condition: Condition, target: T, points: i32, reason: &str) -> RuleDefinition<T> {
    RuleDefinition {
        condition,
        target,
        points,
        reason_template: reason.to_string(),
    }
}

/// `lo < value <= hi`
fn line_band(field: Field, lo: f64, hi: f64) -> Condition {
    Condition::All(vec![Condition::Above(field, lo), Condition::AtMost(field, hi)])
}

fn level_asian_line() -> Condition {
    Condition::AtMost(Field::AsianLineAbs, 0.25)
}

impl RuleSet {
    pub fn builtin() -> Self {
        use Condition::*;
        use Field::*;

        let outcome = vec![
            rule(Below(EuroHome, 1.50), MatchPick::Home, 4, "home price very low {value}"),
            rule(Band(EuroHome, 1.50, 1.70), MatchPick::Home, 3, "home price low {value}"),
            rule(Band(EuroHome, 1.70, 2.00), MatchPick::Home, 2, "home price under 2.00 ({value})"),
            rule(Above(EuroHome, 2.60), MatchPick::Away, 2, "home price high {value}"),
            rule(Below(EuroAway, 1.70), MatchPick::Away, 4, "away price very low {value}"),
            rule(Band(EuroAway, 1.70, 2.00), MatchPick::Away, 3, "away price low {value}"),
            rule(Band(EuroAway, 2.00, 2.30), MatchPick::Away, 2, "away price under 2.30 ({value})"),
            rule(Below(EuroDraw, 3.10), MatchPick::Draw, 2, "draw price low {value}"),
            rule(Above(EuroDraw, 3.60), MatchPick::Draw, -1, "draw price high {value}"),
            rule(
                All(vec![
                    Above(EuroHomeDrop, 0.15),
                    Not(Box::new(League(LeagueTag::Trap))),
                ]),
                MatchPick::Home,
                2,
                "home price dropped {value}",
            ),
            rule(
                All(vec![Above(EuroHomeDrop, 0.15), League(LeagueTag::Trap)]),
                MatchPick::Away,
                2,
                "home price dropped {value} in {league}, read as a trap",
            ),
            rule(Below(EuroHomeDrop, -0.12), MatchPick::Home, -1, "home price drifted {value}"),
            rule(Above(EuroAwayDrop, 0.15), MatchPick::Away, 2, "away price dropped {value}"),
            rule(League(LeagueTag::HighDraw), MatchPick::Draw, 2, "{league} is a high-draw league"),
            rule(
                All(vec![
                    Below(AsianHomeChange, -0.05),
                    League(LeagueTag::PriceDropSignal),
                ]),
                MatchPick::Home,
                2,
                "Asian home price fell {value}, a strong signal in {league}",
            ),
            rule(
                All(vec![
                    Below(AsianHomeChange, -0.05),
                    Not(Box::new(League(LeagueTag::PriceDropSignal))),
                ]),
                MatchPick::Home,
                1,
                "Asian home price fell {value}",
            ),
            rule(Above(AsianHomeChange, 0.05), MatchPick::Away, 1, "Asian home price rose {value}"),
            rule(
                Label(MovementLabel::LineUpPriceDown),
                MatchPick::Home,
                2,
                "{label}: market backs the home side",
            ),
            rule(
                Label(MovementLabel::LineDownPriceDown),
                MatchPick::Away,
                2,
                "{label}: market backs the away side",
            ),
            rule(
                All(vec![
                    level_asian_line(),
                    AtLeast(AsianHomePrice, 1.01),
                    AtMost(AsianHomePrice, 1.10),
                ]),
                MatchPick::Draw,
                2,
                "level line with a high home price",
            ),
            rule(
                All(vec![level_asian_line(), League(LeagueTag::LevelDraw)]),
                MatchPick::Draw,
                2,
                "level lines often draw in {league}",
            ),
            rule(
                All(vec![level_asian_line(), League(LeagueTag::LevelAway)]),
                MatchPick::Away,
                2,
                "level lines often go away in {league}",
            ),
        ];

        let handicap = vec![
            rule(LowestPrice(HandicapPick::Upper), HandicapPick::Upper, 3, "upper side has the lowest price"),
            rule(LowestPrice(HandicapPick::Push), HandicapPick::Push, 3, "push has the lowest price"),
            rule(LowestPrice(HandicapPick::Lower), HandicapPick::Lower, 3, "lower side has the lowest price"),
            rule(Below(UpperPrice, 1.80), HandicapPick::Upper, 3, "upper price low {value}"),
            rule(Band(UpperPrice, 1.80, 2.10), HandicapPick::Upper, 2, "upper price under 2.10 ({value})"),
            rule(Below(PushPrice, 3.00), HandicapPick::Push, 2, "push price low {value}"),
            rule(Band(PushPrice, 3.00, 3.50), HandicapPick::Push, 1, "push price under 3.50 ({value})"),
            rule(Below(LowerPrice, 1.80), HandicapPick::Lower, 3, "lower price low {value}"),
            rule(Band(LowerPrice, 1.80, 2.20), HandicapPick::Lower, 2, "lower price fairly low {value}"),
            rule(Above(UpperDrop, 0.15), HandicapPick::Upper, 2, "upper price dropped {value}"),
            rule(Above(PushDrop, 0.15), HandicapPick::Push, 2, "push price dropped {value}"),
            rule(Above(LowerDrop, 0.15), HandicapPick::Lower, 2, "lower price dropped {value}"),
            rule(AtLeast(IndexLineAbs, 2.0), HandicapPick::Lower, 1, "deep line {value}"),
            rule(AtMost(IndexLineAbs, 0.0), HandicapPick::Push, 1, "level line"),
            rule(
                All(vec![AtLeast(IndexLineAbs, 1.5), League(LeagueTag::DeepHandicap)]),
                HandicapPick::Lower,
                1,
                "deep line {value} favours the receiving side in {league}",
            ),
            rule(
                AtLeast(LeagueLowerRate, 65.0),
                HandicapPick::Lower,
                4,
                "lower side covered {value}% at this line in {league}",
            ),
            rule(
                AtMost(LeagueLowerRate, 35.0),
                HandicapPick::Upper,
                4,
                "upper side covered at this line in {league}, lower only {value}%",
            ),
        ];

        let goals = vec![
            rule(AtMost(TotalLine, 2.0), GoalsBucket::ZeroToOne, 4, "very low total line {value}"),
            rule(line_band(TotalLine, 2.0, 2.25), GoalsBucket::OneToTwo, 4, "low total line {value}"),
            rule(
                All(vec![line_band(TotalLine, 2.25, 2.5), Below(LeagueAvgGoals, 2.5)]),
                GoalsBucket::OneToTwo,
                3,
                "total line {value} in a low-scoring league",
            ),
            rule(
                All(vec![
                    line_band(TotalLine, 2.25, 2.5),
                    Not(Box::new(Below(LeagueAvgGoals, 2.5))),
                ]),
                GoalsBucket::TwoToThree,
                3,
                "total line {value}",
            ),
            rule(line_band(TotalLine, 2.5, 2.75), GoalsBucket::TwoToThree, 4, "total line {value}"),
            rule(
                All(vec![line_band(TotalLine, 2.75, 3.0), AtLeast(LeagueAvgGoals, 3.0)]),
                GoalsBucket::ThreeToFour,
                3,
                "total line {value} in a high-scoring league",
            ),
            rule(
                All(vec![
                    line_band(TotalLine, 2.75, 3.0),
                    Not(Box::new(AtLeast(LeagueAvgGoals, 3.0))),
                ]),
                GoalsBucket::TwoToThree,
                3,
                "total line {value}",
            ),
            rule(line_band(TotalLine, 3.0, 3.5), GoalsBucket::ThreeToFour, 3, "high total line {value}"),
            rule(Above(TotalLine, 3.5), GoalsBucket::FourToSix, 3, "very high total line {value}"),
            rule(Below(OverPrice, 0.82), GoalsBucket::ThreeToFour, 2, "over priced low {value}"),
            rule(Below(UnderPrice, 0.82), GoalsBucket::OneToTwo, 2, "under priced low {value}"),
            rule(
                All(vec![Missing(TotalLine), AtLeast(LeagueAvgGoals, 3.2)]),
                GoalsBucket::ThreeToFour,
                2,
                "no total line, league averages {value}",
            ),
            rule(
                All(vec![Missing(TotalLine), AtMost(LeagueAvgGoals, 2.4)]),
                GoalsBucket::OneToTwo,
                2,
                "no total line, league averages {value}",
            ),
            rule(
                All(vec![
                    Missing(TotalLine),
                    Above(LeagueAvgGoals, 2.4),
                    Below(LeagueAvgGoals, 3.2),
                ]),
                GoalsBucket::TwoToThree,
                1,
                "no total line, league averages {value}",
            ),
            rule(
                AtLeast(LeagueOverRate, 65.0),
                GoalsBucket::ThreeToFour,
                4,
                "over landed {value}% at this total in {league}",
            ),
            rule(
                AtMost(LeagueOverRate, 35.0),
                GoalsBucket::OneToTwo,
                4,
                "over landed only {value}% at this total in {league}",
            ),
            rule(League(LeagueTag::HighScoring), GoalsBucket::ThreeToFour, 1, "{league} is high scoring"),
            rule(League(LeagueTag::LowScoring), GoalsBucket::OneToTwo, 1, "{league} is low scoring"),
            rule(level_asian_line(), GoalsBucket::OneToTwo, 1, "level line, expect a tight game"),
        ];

        let warnings = vec![
            WarningRule {
                condition: All(vec![Above(EuroHomeDrop, 0.15), League(LeagueTag::Trap)]),
                message: "trap league: home price drop may be bait".to_string(),
            },
            WarningRule {
                condition: Label(MovementLabel::LineUpPriceUp),
                message: "line up with price up: possible trap".to_string(),
            },
            WarningRule {
                condition: Label(MovementLabel::LineDownPriceUp),
                message: "line down with price up: possible trap".to_string(),
            },
        ];

        Self {
            outcome,
            handicap,
            goals,
            warnings,
        }
    }
}

/// Normalized view of one match for rule evaluation.
#[derive(Debug, Clone)]
pub struct ScoringInput<'a> {
    pub league: &'a str,
    pub priors: &'a LeaguePriors,
    pub label: Option<MovementLabel>,
    euro_home: Option<f64>,
    euro_draw: Option<f64>,
    euro_away: Option<f64>,
    euro_home_drop: Option<f64>,
    euro_away_drop: Option<f64>,
    asian_home: Option<f64>,
    asian_home_change: Option<f64>,
    asian_line: Option<f64>,
    index_line: Option<f64>,
    upper: Option<f64>,
    push: Option<f64>,
    lower: Option<f64>,
    upper_drop: Option<f64>,
    push_drop: Option<f64>,
    lower_drop: Option<f64>,
    total_line: Option<f64>,
    over: Option<f64>,
    under: Option<f64>,
    league_avg: Option<f64>,
    league_lower_rate: Option<f64>,
    league_over_rate: Option<f64>,
}

/// Opening minus current; positive when the price fell.
fn price_drop(initial: Option<f64>, current: Option<f64>) -> Option<f64> {
    Some(initial? - current?)
}

fn price_change(initial: Option<f64>, current: Option<f64>) -> Option<f64> {
    Some(current? - initial?)
}

impl<'a> ScoringInput<'a> {
    /// `league` is the match league's history, if any; every league-derived
    /// field stays missing without enough samples.
    pub fn new(
        record: &'a MatchRecord,
        priors: &'a LeaguePriors,
        league: Option<&LeagueStatistic>,
    ) -> Self {
        let euro = &record.euro;
        let asian = &record.asian;
        let index = &record.index;
        // The handicap market only reads a line that comes with all three index prices.
        let priced = index.latest(|s| s.home).is_some()
            && index.latest(|s| s.draw).is_some()
            && index.latest(|s| s.away).is_some();
        let line = record.index_line.filter(|_| priced);
        let total_line = record.total_line();

        // Three-way prices are home/draw/away; map them onto upper/push/lower.
        let (upper, lower, upper_drop, lower_drop) = match line.map(upper_side) {
            Some(Side::Home) => (
                index.latest(|s| s.home),
                index.latest(|s| s.away),
                price_drop(index.initial.home, index.current.home),
                price_drop(index.initial.away, index.current.away),
            ),
            Some(Side::Away) => (
                index.latest(|s| s.away),
                index.latest(|s| s.home),
                price_drop(index.initial.away, index.current.away),
                price_drop(index.initial.home, index.current.home),
            ),
            None => (None, None, None, None),
        };
        let (push, push_drop) = match line {
            Some(_) => (
                index.latest(|s| s.draw),
                price_drop(index.initial.draw, index.current.draw),
            ),
            None => (None, None),
        };

        Self {
            league: record.league.as_str(),
            priors,
            label: record.movement_label,
            euro_home: euro.latest(|s| s.home),
            euro_draw: euro.latest(|s| s.draw),
            euro_away: euro.latest(|s| s.away),
            euro_home_drop: price_drop(euro.initial.home, euro.current.home),
            euro_away_drop: price_drop(euro.initial.away, euro.current.away),
            asian_home: asian.latest(|s| s.home),
            asian_home_change: price_change(asian.initial.home, asian.current.home),
            asian_line: asian.latest(|s| s.handicap.as_deref().and_then(parse_handicap)),
            index_line: line,
            upper,
            push,
            lower,
            upper_drop,
            push_drop,
            lower_drop,
            total_line,
            over: record.totals.latest(|s| s.over),
            under: record.totals.latest(|s| s.under),
            league_avg: league.and_then(LeagueStatistic::settled_avg_goals),
            league_lower_rate: league.zip(line).and_then(|(l, line)| l.lower_rate_at(line)),
            league_over_rate: league.zip(total_line).and_then(|(l, line)| l.over_rate_at(line)),
        }
    }

    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::EuroHome => self.euro_home,
            Field::EuroDraw => self.euro_draw,
            Field::EuroAway => self.euro_away,
            Field::EuroHomeDrop => self.euro_home_drop,
            Field::EuroAwayDrop => self.euro_away_drop,
            Field::AsianHomeChange => self.asian_home_change,
            Field::AsianHomePrice => self.asian_home,
            Field::AsianLineAbs => self.asian_line.map(f64::abs),
            Field::IndexLineAbs => self.index_line.map(f64::abs),
            Field::UpperPrice => self.upper,
            Field::PushPrice => self.push,
            Field::LowerPrice => self.lower,
            Field::UpperDrop => self.upper_drop,
            Field::PushDrop => self.push_drop,
            Field::LowerDrop => self.lower_drop,
            Field::TotalLine => self.total_line,
            Field::OverPrice => self.over,
            Field::UnderPrice => self.under,
            Field::LeagueAvgGoals => self.league_avg,
            Field::LeagueLowerRate => self.league_lower_rate,
            Field::LeagueOverRate => self.league_over_rate,
        }
    }

    fn three_way(&self) -> Option<[f64; 3]> {
        Some([self.upper?, self.push?, self.lower?])
    }

    fn is_lowest(&self, slot: HandicapPick) -> bool {
        let Some(prices) = self.three_way() else { return false };
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let own = match slot {
            HandicapPick::Upper => prices[0],
            HandicapPick::Push => prices[1],
            HandicapPick::Lower => prices[2],
        };
        own == min
    }

    /// Second lowest minus lowest three-way price.
    fn favourite_gap(&self) -> Option<f64> {
        let mut prices = self.three_way()?;
        prices.sort_by(f64::total_cmp);
        Some(prices[1] - prices[0])
    }

    fn render(&self, template: &str, subject: Option<Field>) -> String {
        let mut out = template.replace("{league}", self.league);
        if out.contains("{label}") {
            let label = self.label.map(|l| l.as_str()).unwrap_or("-");
            out = out.replace("{label}", label);
        }
        if out.contains("{value}") {
            let value = subject
                .and_then(|f| self.value(f))
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string());
            out = out.replace("{value}", &value);
        }
        out
    }
}

/// Everything scoring needs besides the match itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub priors: &'a LeaguePriors,
    pub leagues: Option<&'a LeagueTable>,
    pub rules: &'a RuleSet,
    pub constants: ScoringConstants,
}

impl<'a> ScoringContext<'a> {
    pub fn new(priors: &'a LeaguePriors) -> Self {
        Self {
            priors,
            leagues: None,
            rules: &BUILTIN_RULES,
            constants: ScoringConstants::default(),
        }
    }

    pub fn with_leagues(mut self, leagues: &'a LeagueTable) -> Self {
        self.leagues = Some(leagues);
        self
    }

    pub fn with_rules(mut self, rules: &'a RuleSet) -> Self {
        self.rules = rules;
        self
    }

    fn league(&self, league: &str) -> Option<&'a LeagueStatistic> {
        self.leagues.and_then(|t| t.get(league))
    }
}

pub fn confidence(top: i32, runner_up: i32, constants: &ScoringConstants) -> u8 {
    let gap = (top - runner_up).max(0) as i64;
    let raw = 50 + gap * constants.k1 as i64 + top as i64 * constants.k2 as i64;
    raw.clamp(0, constants.cap as i64) as u8
}

/// Run one market's rule table. Candidates are listed in tie-break order.
pub fn evaluate_market<T: Copy + PartialEq>(
    candidates: &[T],
    rules: &[RuleDefinition<T>],
    input: &ScoringInput<'_>,
    constants: &ScoringConstants,
) -> MarketPrediction<T> {
    let mut scores = vec![0i32; candidates.len()];
    let mut reasons = Vec::new();
    let mut positive_fired = false;

    for rule in rules {
        let Some(slot) = candidates.iter().position(|c| *c == rule.target) else { continue };
        if !rule.condition.holds(input) {
            continue;
        }
        scores[slot] += rule.points;
        positive_fired |= rule.points > 0;
        reasons.push(input.render(&rule.reason_template, rule.condition.subject()));
    }

    let undetermined = constants.undetermined.min(constants.low_confidence.saturating_sub(1));
    let Some((best, top)) = scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |acc: Option<(usize, i32)>, (i, s)| match acc {
            Some((_, best)) if best >= s => acc,
            _ => Some((i, s)),
        })
    else {
        return MarketPrediction::undetermined(undetermined, reasons);
    };
    if !positive_fired || top <= 0 {
        return MarketPrediction::undetermined(undetermined, reasons);
    }
    let runner_up = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best)
        .map(|(_, s)| *s)
        .max()
        .unwrap_or(0);

    MarketPrediction {
        verdict: Verdict::Pick(candidates[best]),
        confidence: confidence(top, runner_up, constants),
        reasons,
    }
}

pub const OUTCOME_CANDIDATES: [MatchPick; 3] = [MatchPick::Home, MatchPick::Draw, MatchPick::Away];
pub const HANDICAP_CANDIDATES: [HandicapPick; 3] =
    [HandicapPick::Upper, HandicapPick::Push, HandicapPick::Lower];
pub const GOALS_CANDIDATES: [GoalsBucket; 5] = [
    GoalsBucket::ZeroToOne,
    GoalsBucket::OneToTwo,
    GoalsBucket::TwoToThree,
    GoalsBucket::ThreeToFour,
    GoalsBucket::FourToSix,
];

/// Score one match across all three markets.
pub fn score(record: &MatchRecord, ctx: &ScoringContext<'_>) -> PredictionRecord {
    let input = ScoringInput::new(record, ctx.priors, ctx.league(&record.league));
    let constants = &ctx.constants;

    let outcome = evaluate_market(&OUTCOME_CANDIDATES, &ctx.rules.outcome, &input, constants);
    let mut handicap =
        evaluate_market(&HANDICAP_CANDIDATES, &ctx.rules.handicap, &input, constants);
    if handicap.pick().is_some()
        && let Some(gap) = input.favourite_gap()
        && gap > constants.clear_favourite_gap
    {
        let bumped = handicap.confidence as i32 + constants.clear_favourite_bonus;
        handicap.confidence = bumped.clamp(0, constants.cap as i32) as u8;
        handicap.reasons.push(format!("clear favourite, price gap {gap:.2}"));
    }
    let goals = evaluate_market(&GOALS_CANDIDATES, &ctx.rules.goals, &input, constants);

    let warnings = ctx
        .rules
        .warnings
        .iter()
        .filter(|w| w.condition.holds(&input))
        .map(|w| input.render(&w.message, w.condition.subject()))
        .collect();

    PredictionRecord {
        match_id: record.match_id.clone(),
        source: PredictionSource::Automatic,
        league: record.league.clone(),
        match_time: record.match_time.clone(),
        home_team: record.home_team.clone(),
        away_team: record.away_team.clone(),
        outcome: Some(outcome),
        handicap: Some(handicap),
        handicap_line: record_line(record),
        goals: Some(goals),
        total_line: input.total_line,
        warnings,
        predicted_at: chrono::Local::now().to_rfc3339(),
        review: None,
    }
}

/// Best determined picks of a day, per market.
#[derive(Debug, Clone, Default)]
pub struct TopPicks<'a> {
    pub outcome: Vec<&'a PredictionRecord>,
    pub handicap: Vec<&'a PredictionRecord>,
    pub goals: Vec<&'a PredictionRecord>,
}

fn top_by<'a>(
    predictions: &'a [PredictionRecord],
    k: usize,
    conf: impl Fn(&PredictionRecord) -> Option<u8>,
) -> Vec<&'a PredictionRecord> {
    let mut picked: Vec<(&PredictionRecord, u8)> = predictions
        .iter()
        .filter_map(|p| Some((p, conf(p)?)))
        .collect();
    picked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.match_time.cmp(&b.0.match_time)));
    picked.into_iter().take(k).map(|(p, _)| p).collect()
}

pub fn top_picks(predictions: &[PredictionRecord], k: usize) -> TopPicks<'_> {
    TopPicks {
        outcome: top_by(predictions, k, |p| {
            p.outcome.as_ref().filter(|m| m.pick().is_some()).map(|m| m.confidence)
        }),
        handicap: top_by(predictions, k, |p| {
            p.handicap.as_ref().filter(|m| m.pick().is_some()).map(|m| m.confidence)
        }),
        goals: top_by(predictions, k, |p| {
            p.goals.as_ref().filter(|m| m.pick().is_some()).map(|m| m.confidence)
        }),
    }
}
