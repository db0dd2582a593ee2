use std::collections::BTreeMap;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use crate::model::{
    Grade, HandicapPick, MarketPrediction, MatchRecord, PredictionRecord, PredictionSource, Review,
    Score,
};
use crate::settlement::{LineOutcome, match_outcome, settle_handicap};

/// Combine the rows stored for one match. A determined manual pick replaces the
/// automatic one for its own market only.
pub fn effective_prediction(rows: &[PredictionRecord]) -> Option<PredictionRecord> {
    let automatic = rows.iter().find(|p| p.source == PredictionSource::Automatic);
    let manual = rows.iter().find(|p| p.source == PredictionSource::Manual);

    let (mut merged, manual) = match (automatic, manual) {
        (Some(auto), manual) => (auto.clone(), manual),
        (None, Some(manual)) => return Some(manual.clone()),
        (None, None) => return None,
    };
    let Some(manual) = manual else { return Some(merged) };

    if let Some(outcome) = determined(&manual.outcome) {
        merged.outcome = Some(outcome);
    }
    if let Some(handicap) = determined(&manual.handicap)
        && manual.handicap_line.is_some()
    {
        merged.handicap = Some(handicap);
        merged.handicap_line = manual.handicap_line;
    }
    if let Some(goals) = determined(&manual.goals) {
        merged.goals = Some(goals);
    }
    merged.warnings.extend(manual.warnings.iter().cloned());
    Some(merged)
}

/// `effective_prediction` for every match in `rows`, in first-seen order.
pub fn effective_predictions(rows: &[PredictionRecord]) -> Vec<PredictionRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<PredictionRecord>> = HashMap::new();
    for row in rows {
        let group = grouped.entry(row.match_id.as_str()).or_insert_with(|| {
            order.push(row.match_id.as_str());
            Vec::new()
        });
        group.push(row.clone());
    }
    order
        .into_iter()
        .filter_map(|id| effective_prediction(grouped.get(id)?))
        .collect()
}

fn determined<T: Copy>(market: &Option<MarketPrediction<T>>) -> Option<MarketPrediction<T>> {
    market.as_ref().filter(|m| m.pick().is_some()).cloned()
}

fn grade_handicap(score: Score, line: Option<f64>, pick: Option<HandicapPick>) -> Grade {
    let (Some(line), Some(pick)) = (line, pick) else {
        return Grade::Ungraded;
    };
    let Some(settlement) = settle_handicap(score, line) else {
        return Grade::Ungraded;
    };
    match (pick, settlement.outcome) {
        (HandicapPick::Push, LineOutcome::Push) => Grade::Correct,
        (HandicapPick::Push, _) => Grade::Incorrect,
        (_, LineOutcome::Push) => Grade::Push,
        (HandicapPick::Upper, LineOutcome::UpperWins)
        | (HandicapPick::Lower, LineOutcome::LowerWins) => Grade::Correct,
        _ => Grade::Incorrect,
    }
}

fn grade_pick<T: Copy>(market: &Option<MarketPrediction<T>>, hit: impl Fn(T) -> bool) -> Grade {
    match market.as_ref().and_then(MarketPrediction::pick) {
        Some(pick) if hit(pick) => Grade::Correct,
        Some(_) => Grade::Incorrect,
        None => Grade::Ungraded,
    }
}

/// Grade a prediction against its finished match. `None` unless the match is
/// finished with a full score.
pub fn grade(prediction: &PredictionRecord, record: &MatchRecord, reviewed_at: &str) -> Option<Review> {
    let score = record.final_score()?;
    let actual = match_outcome(score);

    let outcome = grade_pick(&prediction.outcome, |p| p == actual);
    let handicap = grade_handicap(
        score,
        prediction.handicap_line,
        prediction.handicap.as_ref().and_then(MarketPrediction::pick),
    );
    let goals = grade_pick(&prediction.goals, |bucket| bucket.contains(score.total()));

    let grades = [outcome, handicap, goals];
    let correct = grades.iter().filter(|g| **g == Grade::Correct).count() as u32;
    let graded = grades
        .iter()
        .filter(|g| matches!(g, Grade::Correct | Grade::Incorrect))
        .count() as u32;
    let accuracy = if graded == 0 {
        0.0
    } else {
        correct as f64 / graded as f64 * 100.0
    };

    Some(Review {
        reviewed_at: reviewed_at.to_string(),
        home_score: score.home,
        away_score: score.away,
        outcome,
        handicap,
        goals,
        correct,
        graded,
        accuracy,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTally {
    pub correct: u32,
    pub incorrect: u32,
    pub push: u32,
    pub ungraded: u32,
}

impl MarketTally {
    fn add(&mut self, grade: Grade) {
        match grade {
            Grade::Correct => self.correct += 1,
            Grade::Incorrect => self.incorrect += 1,
            Grade::Push => self.push += 1,
            Grade::Ungraded => self.ungraded += 1,
        }
    }

    pub fn graded(&self) -> u32 {
        self.correct + self.incorrect
    }

    pub fn accuracy(&self) -> Option<f64> {
        let graded = self.graded();
        if graded == 0 {
            return None;
        }
        Some(self.correct as f64 / graded as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueTally {
    pub reviewed: u32,
    pub outcome: MarketTally,
    pub handicap: MarketTally,
    pub goals: MarketTally,
}

impl LeagueTally {
    fn add(&mut self, review: &Review) {
        self.reviewed += 1;
        self.outcome.add(review.outcome);
        self.handicap.add(review.handicap);
        self.goals.add(review.goals);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub days: i64,
    pub overall: LeagueTally,
    /// Mean per-match accuracy over matches with at least one graded market.
    pub avg_accuracy: Option<f64>,
    pub leagues: BTreeMap<String, LeagueTally>,
}

/// Summarize reviews written within `days` of `now`. Each match counts once.
pub fn summarize(predictions: &[PredictionRecord], days: i64, now: DateTime<Local>) -> ReviewSummary {
    let cutoff = now - Duration::days(days.clamp(0, 36_500));
    let mut seen: HashSet<&str> = HashSet::new();
    let mut summary = ReviewSummary {
        days,
        ..ReviewSummary::default()
    };
    let mut accuracy_sum = 0.0;
    let mut accuracy_n = 0u32;

    for prediction in predictions {
        let Some(review) = &prediction.review else { continue };
        let Ok(at) = DateTime::parse_from_rfc3339(&review.reviewed_at) else { continue };
        if at < cutoff || !seen.insert(prediction.match_id.as_str()) {
            continue;
        }
        summary.overall.add(review);
        summary
            .leagues
            .entry(prediction.league.clone())
            .or_default()
            .add(review);
        if review.graded > 0 {
            accuracy_sum += review.accuracy;
            accuracy_n += 1;
        }
    }

    if accuracy_n > 0 {
        summary.avg_accuracy = Some(accuracy_sum / accuracy_n as f64);
    }
    summary
}
