use serde::{Deserialize, Serialize};

use crate::handicap::{home_relative_line, is_quarter_ball};
use crate::model::{MatchPick, MatchRecord, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOutcome {
    UpperWins,
    LowerWins,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsOutcome {
    Over,
    Under,
    Push,
}

/// Three-way handicap result seen from the home side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    HomeCovers,
    Level,
    AwayCovers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandicapSettlement {
    pub outcome: LineOutcome,
    /// Side giving the handicap. On a level line the home side is the nominal upper side.
    pub upper: Side,
}

impl HandicapSettlement {
    pub fn lower(&self) -> Side {
        self.upper.other()
    }

    /// Side that won the line, `None` on a push.
    pub fn winner(&self) -> Option<Side> {
        match self.outcome {
            LineOutcome::UpperWins => Some(self.upper),
            LineOutcome::LowerWins => Some(self.lower()),
            LineOutcome::Push => None,
        }
    }
}

/// Which side gives the goals for a home-relative line.
pub fn upper_side(line: f64) -> Side {
    if line > 0.0 { Side::Away } else { Side::Home }
}

/// Settle a home-relative handicap (negative = home gives goals).
///
/// The home margin after adjustment is `home + line - away`; the upper side
/// wins when its own adjusted margin is positive. Lines that are not finite or
/// not on quarter-ball granularity settle to `None`.
pub fn settle_handicap(score: Score, line: f64) -> Option<HandicapSettlement> {
    if !is_quarter_ball(line) {
        return None;
    }
    let upper = upper_side(line);
    let outcome = match (settle_index(score, line)?, upper) {
        (IndexOutcome::Level, _) => LineOutcome::Push,
        (IndexOutcome::HomeCovers, Side::Home) | (IndexOutcome::AwayCovers, Side::Away) => {
            LineOutcome::UpperWins
        }
        _ => LineOutcome::LowerWins,
    };
    Some(HandicapSettlement { outcome, upper })
}

/// Total goals against a published line, by strict inequality.
pub fn settle_totals(score: Score, line: f64) -> Option<TotalsOutcome> {
    if !line.is_finite() || line < 0.0 {
        return None;
    }
    let total = score.total() as f64;
    Some(if total > line {
        TotalsOutcome::Over
    } else if total < line {
        TotalsOutcome::Under
    } else {
        TotalsOutcome::Push
    })
}

pub fn settle_index(score: Score, line: f64) -> Option<IndexOutcome> {
    if !line.is_finite() {
        return None;
    }
    let diff = score.home as f64 + line - score.away as f64;
    Some(if diff > 0.0 {
        IndexOutcome::HomeCovers
    } else if diff < 0.0 {
        IndexOutcome::AwayCovers
    } else {
        IndexOutcome::Level
    })
}

pub fn match_outcome(score: Score) -> MatchPick {
    if score.home > score.away {
        MatchPick::Home
    } else if score.home < score.away {
        MatchPick::Away
    } else {
        MatchPick::Draw
    }
}

/// Home-relative line of a stored match: the handicap-index line when known,
/// otherwise the latest Asian token.
pub fn record_line(record: &MatchRecord) -> Option<f64> {
    record.index_line.or_else(|| {
        record
            .asian
            .latest(|s| s.handicap.as_deref().and_then(home_relative_line))
    })
}

/// Handicap settlement of a finished match; `None` when score or line is missing.
pub fn settle_record_handicap(record: &MatchRecord) -> Option<HandicapSettlement> {
    settle_handicap(record.final_score()?, record_line(record)?)
}

pub fn settle_record_totals(record: &MatchRecord) -> Option<TotalsOutcome> {
    settle_totals(record.final_score()?, record.total_line()?)
}
