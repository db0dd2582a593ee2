use std::fmt;

use serde::{Deserialize, Serialize};

use crate::movement::MovementLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    NotStarted,
    Live,
    Finished,
    Postponed,
}

impl MatchStatus {
    /// Status codes used by the scraped source.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NotStarted),
            1 => Some(Self::Live),
            2 => Some(Self::Finished),
            6 => Some(Self::Postponed),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::NotStarted => 0,
            Self::Live => 1,
            Self::Finished => 2,
            Self::Postponed => 6,
        }
    }

    pub fn has_score(self) -> bool {
        matches!(self, Self::Live | Self::Finished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn total(&self) -> u32 {
        self.home + self.away
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// 1X2 decimal prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EuroSnapshot {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

/// Two-way Asian handicap. The handicap stays textual; it is parsed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsianSnapshot {
    pub home: Option<f64>,
    pub handicap: Option<String>,
    pub away: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsSnapshot {
    pub over: Option<f64>,
    pub line: Option<f64>,
    pub under: Option<f64>,
}

/// Three-way prices of the handicap-index market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

/// Opening and latest snapshot of one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market<T> {
    pub initial: T,
    pub current: T,
}

impl<T> Market<T> {
    /// Latest known value of a field: current snapshot first, then the opening one.
    pub fn latest<U>(&self, field: impl Fn(&T) -> Option<U>) -> Option<U> {
        field(&self.current).or_else(|| field(&self.initial))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub match_time: String,
    pub owner_date: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub euro: Market<EuroSnapshot>,
    #[serde(default)]
    pub asian: Market<AsianSnapshot>,
    #[serde(default)]
    pub totals: Market<TotalsSnapshot>,
    /// Handicap-index line, home-relative (negative when home gives goals).
    #[serde(default)]
    pub index_line: Option<f64>,
    #[serde(default)]
    pub index: Market<IndexSnapshot>,
    #[serde(default)]
    pub movement_label: Option<MovementLabel>,
}

impl MatchRecord {
    pub fn new(match_id: impl Into<String>, status: MatchStatus) -> Self {
        Self {
            match_id: match_id.into(),
            league: String::new(),
            home_team: String::new(),
            away_team: String::new(),
            match_time: String::new(),
            owner_date: String::new(),
            status,
            home_score: None,
            away_score: None,
            euro: Market::default(),
            asian: Market::default(),
            totals: Market::default(),
            index_line: None,
            index: Market::default(),
            movement_label: None,
        }
    }

    /// Final (or running) score. `None` unless both sides are known and the
    /// match has actually kicked off.
    pub fn score(&self) -> Option<Score> {
        if !self.status.has_score() {
            return None;
        }
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(Score { home, away }),
            _ => None,
        }
    }

    pub fn final_score(&self) -> Option<Score> {
        if self.status != MatchStatus::Finished {
            return None;
        }
        self.score()
    }

    /// Latest total-goals line, falling back to the opening one.
    pub fn total_line(&self) -> Option<f64> {
        self.totals.latest(|s| s.line)
    }

    pub fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    #[default]
    Automatic,
    Manual,
}

impl PredictionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPick {
    Home,
    Draw,
    Away,
}

impl MatchPick {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Draw => "draw",
            Self::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandicapPick {
    Upper,
    Push,
    Lower,
}

impl HandicapPick {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Push => "push",
            Self::Lower => "lower",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalsBucket {
    ZeroToOne,
    OneToTwo,
    TwoToThree,
    ThreeToFour,
    FourToSix,
}

impl GoalsBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZeroToOne => "0-1",
            Self::OneToTwo => "1-2",
            Self::TwoToThree => "2-3",
            Self::ThreeToFour => "3-4",
            Self::FourToSix => "4-6",
        }
    }

    /// Inclusive goal range covered by the bucket.
    pub fn range(self) -> (u32, u32) {
        match self {
            Self::ZeroToOne => (0, 1),
            Self::OneToTwo => (1, 2),
            Self::TwoToThree => (2, 3),
            Self::ThreeToFour => (3, 4),
            Self::FourToSix => (4, 6),
        }
    }

    pub fn contains(self, total_goals: u32) -> bool {
        let (lo, hi) = self.range();
        (lo..=hi).contains(&total_goals)
    }
}

/// A computed pick, or an explicit "no signal" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pick", rename_all = "snake_case")]
pub enum Verdict<T> {
    Pick(T),
    Undetermined,
}

impl<T: Copy> Verdict<T> {
    pub fn pick(&self) -> Option<T> {
        match self {
            Verdict::Pick(p) => Some(*p),
            Verdict::Undetermined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrediction<T> {
    pub verdict: Verdict<T>,
    /// 0..=100, additive heuristic points, not a probability.
    pub confidence: u8,
    pub reasons: Vec<String>,
}

impl<T: Copy> MarketPrediction<T> {
    pub fn undetermined(confidence: u8, reasons: Vec<String>) -> Self {
        Self {
            verdict: Verdict::Undetermined,
            confidence,
            reasons,
        }
    }

    pub fn pick(&self) -> Option<T> {
        self.verdict.pick()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Correct,
    Incorrect,
    Push,
    Ungraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewed_at: String,
    pub home_score: u32,
    pub away_score: u32,
    pub outcome: Grade,
    pub handicap: Grade,
    pub goals: Grade,
    pub correct: u32,
    pub graded: u32,
    /// Share of graded markets that were correct, in percent.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub match_id: String,
    #[serde(default)]
    pub source: PredictionSource,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub match_time: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub outcome: Option<MarketPrediction<MatchPick>>,
    #[serde(default)]
    pub handicap: Option<MarketPrediction<HandicapPick>>,
    /// Home-relative line the handicap pick refers to.
    #[serde(default)]
    pub handicap_line: Option<f64>,
    #[serde(default)]
    pub goals: Option<MarketPrediction<GoalsBucket>>,
    #[serde(default)]
    pub total_line: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub predicted_at: String,
    #[serde(default)]
    pub review: Option<Review>,
}

impl PredictionRecord {
    pub fn is_reviewed(&self) -> bool {
        self.review.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_requires_both_sides_and_kickoff() {
        let mut m = MatchRecord::new("1", MatchStatus::NotStarted);
        m.home_score = Some(1);
        m.away_score = Some(0);
        assert!(m.score().is_none());

        m.status = MatchStatus::Finished;
        assert_eq!(m.score(), Some(Score { home: 1, away: 0 }));

        m.away_score = None;
        assert!(m.score().is_none());
    }

    #[test]
    fn latest_prefers_current_snapshot() {
        let mut m = MatchRecord::new("1", MatchStatus::NotStarted);
        m.totals.initial.line = Some(2.5);
        assert_eq!(m.total_line(), Some(2.5));
        m.totals.current.line = Some(2.75);
        assert_eq!(m.total_line(), Some(2.75));
    }

    #[test]
    fn goals_bucket_ranges_overlap_at_edges() {
        assert!(GoalsBucket::TwoToThree.contains(2));
        assert!(GoalsBucket::TwoToThree.contains(3));
        assert!(!GoalsBucket::TwoToThree.contains(4));
        assert!(GoalsBucket::FourToSix.contains(6));
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            MatchStatus::NotStarted,
            MatchStatus::Live,
            MatchStatus::Finished,
            MatchStatus::Postponed,
        ] {
            assert_eq!(MatchStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(MatchStatus::from_code(3), None);
    }
}
