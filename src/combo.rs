use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::league_stats::TeamForm;
use crate::model::{HandicapPick, MatchPick, MatchRecord, PredictionRecord};
use crate::odds::hk_to_decimal;
use crate::settlement::{Side, upper_side};

pub const MIN_LEGS: usize = 2;
pub const MAX_LEGS: usize = 5;
pub const MIN_TARGET: f64 = 2.0;
pub const MAX_TARGET: f64 = 10.0;

const WIN_PRICE_MIN: f64 = 1.50;
const WIN_PRICE_MAX: f64 = 2.00;
const FORM_RATE_MIN: f64 = 40.0;
const OVER_PRICE_MIN: f64 = 1.70;
const OVER_PRICE_MAX: f64 = 2.00;
const OVER_LINE_MIN: f64 = 2.5;
const OVER_LINE_SURE: f64 = 3.0;
const BIG_GAME_RATE_MIN: f64 = 50.0;

/// One single-market leg offered to the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub match_id: String,
    pub league: String,
    pub fixture: String,
    pub match_time: String,
    pub label: String,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    pub legs: Vec<Candidate>,
    pub price: f64,
    pub distance: f64,
}

/// Accepted combined prices as multiples of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceBand {
    pub low: f64,
    pub high: f64,
}

impl Default for AcceptanceBand {
    fn default() -> Self {
        Self {
            low: 0.93,
            high: 1.17,
        }
    }
}

impl AcceptanceBand {
    pub fn bounds(&self, target: f64) -> (f64, f64) {
        (target * self.low, target * self.high)
    }

    pub fn contains(&self, target: f64, price: f64) -> bool {
        let (lo, hi) = self.bounds(target);
        price >= lo && price <= hi
    }
}

/// Clamp a user request to the supported leg count and target range.
pub fn clamp_request(n: usize, target: f64) -> (usize, f64) {
    let target = if target.is_finite() { target } else { MIN_TARGET };
    (
        n.clamp(MIN_LEGS, MAX_LEGS),
        target.clamp(MIN_TARGET, MAX_TARGET),
    )
}

struct Search<'a> {
    pool: Vec<&'a Candidate>,
    /// Distinct-match index of every pool entry.
    slots: Vec<usize>,
    n: usize,
    target: f64,
    band: AcceptanceBand,
    best: Option<(Vec<usize>, f64, f64)>,
}

impl Search<'_> {
    fn walk(&mut self, start: usize, picked: &mut Vec<usize>, used: &mut [bool], price: f64) {
        if picked.len() == self.n {
            if !self.band.contains(self.target, price) {
                return;
            }
            let distance = (price - self.target).abs();
            // Strict comparison keeps the first combination found on ties.
            if self.best.as_ref().is_none_or(|(_, _, d)| distance < *d) {
                self.best = Some((picked.clone(), price, distance));
            }
            return;
        }
        let needed = self.n - picked.len();
        for i in start..self.pool.len() {
            if self.pool.len() - i < needed {
                break;
            }
            let slot = self.slots[i];
            if used[slot] {
                continue;
            }
            used[slot] = true;
            picked.push(i);
            self.walk(i + 1, picked, used, price * self.pool[i].price);
            picked.pop();
            used[slot] = false;
        }
    }
}

/// Exhaustive search for the `n`-leg combination of distinct matches whose
/// combined price is closest to `target`. Only combinations inside the
/// acceptance band qualify; `None` when there is no such combination.
pub fn select(
    candidates: &[Candidate],
    n: usize,
    target: f64,
    band: AcceptanceBand,
) -> Option<Combination> {
    if n == 0 || !target.is_finite() || target <= 0.0 {
        return None;
    }
    let pool: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.price.is_finite() && c.price > 0.0)
        .collect();
    let mut distinct: HashMap<&str, usize> = HashMap::new();
    let slots: Vec<usize> = pool
        .iter()
        .map(|c| {
            let next = distinct.len();
            *distinct.entry(c.match_id.as_str()).or_insert(next)
        })
        .collect();
    if distinct.len() < n {
        return None;
    }

    let mut used = vec![false; distinct.len()];
    let mut search = Search {
        pool,
        slots,
        n,
        target,
        band,
        best: None,
    };
    search.walk(0, &mut Vec::with_capacity(n), &mut used, 1.0);

    let (indices, price, distance) = search.best?;
    Some(Combination {
        legs: indices.into_iter().map(|i| search.pool[i].clone()).collect(),
        price,
        distance,
    })
}

fn candidate(record: &MatchRecord, label: &str, price: f64, reason: String) -> Candidate {
    Candidate {
        match_id: record.match_id.clone(),
        league: record.league.clone(),
        fixture: record.fixture_label(),
        match_time: record.match_time.clone(),
        label: label.to_string(),
        price,
        reason,
    }
}

/// Win and over legs for upcoming matches, backed by team form.
pub fn candidates_from_form(
    upcoming: &[MatchRecord],
    forms: &HashMap<String, TeamForm>,
) -> Vec<Candidate> {
    let empty = TeamForm::default();
    let mut out = Vec::new();
    for record in upcoming {
        let home = forms.get(&record.home_team).unwrap_or(&empty);
        let away = forms.get(&record.away_team).unwrap_or(&empty);

        if let Some(price) = record.euro.latest(|s| s.home)
            && (WIN_PRICE_MIN..=WIN_PRICE_MAX).contains(&price)
            && (home.win_rate() >= FORM_RATE_MIN || away.loss_rate() >= FORM_RATE_MIN)
        {
            let reason = format!(
                "{} win rate {:.0}%, {} loss rate {:.0}%",
                record.home_team,
                home.win_rate(),
                record.away_team,
                away.loss_rate()
            );
            out.push(candidate(record, "home win", price, reason));
        }

        if let Some(price) = record.euro.latest(|s| s.away)
            && (WIN_PRICE_MIN..=WIN_PRICE_MAX).contains(&price)
            && (away.win_rate() >= FORM_RATE_MIN || home.loss_rate() >= FORM_RATE_MIN)
        {
            let reason = format!(
                "{} win rate {:.0}%, {} loss rate {:.0}%",
                record.away_team,
                away.win_rate(),
                record.home_team,
                home.loss_rate()
            );
            out.push(candidate(record, "away win", price, reason));
        }

        let over = record.totals.latest(|s| s.over).map(hk_to_decimal);
        if let (Some(price), Some(line)) = (over, record.total_line())
            && (OVER_PRICE_MIN..=OVER_PRICE_MAX).contains(&price)
            && line >= OVER_LINE_MIN
        {
            let big_rate = (home.big_game_rate() + away.big_game_rate()) / 2.0;
            if big_rate >= BIG_GAME_RATE_MIN || line >= OVER_LINE_SURE {
                let reason = format!(
                    "{} big-game rate {:.0}%, {} big-game rate {:.0}%",
                    record.home_team,
                    home.big_game_rate(),
                    record.away_team,
                    away.big_game_rate()
                );
                out.push(candidate(record, &format!("over {line}"), price, reason));
            }
        }
    }
    out
}

fn handicap_price(record: &MatchRecord, line: f64, pick: HandicapPick) -> Option<f64> {
    let index = &record.index;
    match (pick, upper_side(line)) {
        (HandicapPick::Push, _) => index.latest(|s| s.draw),
        (HandicapPick::Upper, Side::Home) | (HandicapPick::Lower, Side::Away) => {
            index.latest(|s| s.home)
        }
        (HandicapPick::Upper, Side::Away) | (HandicapPick::Lower, Side::Home) => {
            index.latest(|s| s.away)
        }
    }
}

/// Legs from scored predictions: determined picks at or above `min_confidence`
/// that have a price on the matching record.
pub fn candidates_from_predictions(
    predictions: &[PredictionRecord],
    matches: &HashMap<String, MatchRecord>,
    min_confidence: u8,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for prediction in predictions {
        let Some(record) = matches.get(&prediction.match_id) else { continue };

        if let Some(market) = &prediction.outcome
            && market.confidence >= min_confidence
            && let Some(pick) = market.pick()
        {
            let price = match pick {
                MatchPick::Home => record.euro.latest(|s| s.home),
                MatchPick::Draw => record.euro.latest(|s| s.draw),
                MatchPick::Away => record.euro.latest(|s| s.away),
            };
            if let Some(price) = price {
                let reason = market.reasons.join("; ");
                out.push(candidate(record, pick.as_str(), price, reason));
            }
        }

        if let Some(market) = &prediction.handicap
            && market.confidence >= min_confidence
            && let Some(pick) = market.pick()
            && let Some(line) = prediction.handicap_line
            && let Some(price) = handicap_price(record, line, pick)
        {
            let label = format!("handicap {} ({line:+})", pick.as_str());
            out.push(candidate(record, &label, price, market.reasons.join("; ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(match_id: &str, price: f64) -> Candidate {
        Candidate {
            match_id: match_id.to_string(),
            league: "L".to_string(),
            fixture: format!("{match_id}H vs {match_id}A"),
            match_time: String::new(),
            label: "home win".to_string(),
            price,
            reason: String::new(),
        }
    }

    #[test]
    fn two_legs_inside_band_are_accepted() {
        let pool = vec![leg("1", 1.80), leg("2", 1.75)];
        let combo = select(&pool, 2, 3.0, AcceptanceBand::default()).unwrap();
        assert!((combo.price - 3.15).abs() < 1e-9);
        assert_eq!(combo.legs.len(), 2);
    }

    #[test]
    fn too_few_distinct_matches() {
        let pool = vec![leg("1", 1.80), leg("1", 1.75)];
        assert!(select(&pool, 2, 3.0, AcceptanceBand::default()).is_none());
        assert!(select(&pool[..1], 2, 3.0, AcceptanceBand::default()).is_none());
    }

    #[test]
    fn closest_outside_band_is_rejected() {
        let pool = vec![leg("1", 1.20), leg("2", 1.20)];
        assert!(select(&pool, 2, 3.0, AcceptanceBand::default()).is_none());
    }

    #[test]
    fn picks_closest_and_keeps_first_on_tie() {
        let pool = vec![leg("1", 1.50), leg("2", 2.00), leg("3", 2.00), leg("4", 1.60)];
        let combo = select(&pool, 2, 3.0, AcceptanceBand::default()).unwrap();
        let ids: Vec<&str> = combo.legs.iter().map(|c| c.match_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(combo.distance < 1e-9);
    }

    #[test]
    fn same_match_never_appears_twice() {
        let pool = vec![leg("1", 1.73), leg("1", 1.73), leg("2", 1.90)];
        let combo = select(&pool, 2, 3.0, AcceptanceBand::default()).unwrap();
        assert_ne!(combo.legs[0].match_id, combo.legs[1].match_id);
    }

    #[test]
    fn repeated_matches_share_one_slot() {
        let pool = vec![
            leg("1", 1.50),
            leg("2", 1.60),
            leg("1", 1.70),
            leg("3", 1.40),
            leg("2", 1.80),
        ];
        // 1.60 * 1.70 * 1.40 is the closest triple of distinct matches.
        let combo = select(&pool, 3, 4.0, AcceptanceBand::default()).unwrap();
        let ids: Vec<&str> = combo.legs.iter().map(|c| c.match_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert!((combo.price - 3.808).abs() < 1e-9);
        assert!(select(&pool, 4, 4.0, AcceptanceBand::default()).is_none());
    }

    #[test]
    fn request_is_clamped() {
        assert_eq!(clamp_request(1, 1.0), (2, 2.0));
        assert_eq!(clamp_request(9, 50.0), (5, 10.0));
        assert_eq!(clamp_request(3, 4.5), (3, 4.5));
    }
}
