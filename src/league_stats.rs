use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::handicap::quarter_units;
use crate::model::{MatchPick, MatchRecord, MatchStatus};
use crate::settlement::{
    LineOutcome, TotalsOutcome, match_outcome, record_line, settle_record_handicap,
    settle_record_totals,
};

pub const MIN_MATCHES_FOR_AVG: u32 = 10;
pub const MIN_LOWER_RATE_MATCHES: u32 = 5;
pub const MIN_TOTALS_SAMPLES: u32 = 5;
pub const MIN_TOTALS_RATE: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBucket {
    pub upper: u32,
    pub lower: u32,
    pub push: u32,
}

impl LineBucket {
    pub fn total(&self) -> u32 {
        self.upper + self.lower + self.push
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsBucket {
    pub over: u32,
    pub under: u32,
    pub push: u32,
}

impl TotalsBucket {
    pub fn total(&self) -> u32 {
        self.over + self.under + self.push
    }
}

/// Per-league aggregate over finished matches. Buckets are keyed by the line
/// in quarter-ball units (e.g. -2 for a home-relative -0.5 line).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueStatistic {
    pub league: String,
    pub matches: u32,
    pub total_goals: u32,
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
    pub handicap: BTreeMap<i32, LineBucket>,
    pub totals: BTreeMap<i32, TotalsBucket>,
}

impl LeagueStatistic {
    fn new(league: &str) -> Self {
        Self {
            league: league.to_string(),
            ..Self::default()
        }
    }

    pub fn avg_goals(&self) -> Option<f64> {
        if self.matches == 0 {
            return None;
        }
        Some(self.total_goals as f64 / self.matches as f64)
    }

    /// Matches with a settled (non-push) handicap result.
    pub fn graded_lines(&self) -> u32 {
        self.handicap.values().map(|b| b.upper + b.lower).sum()
    }

    /// Percentage of non-push handicap results won by the receiving side.
    pub fn lower_rate(&self) -> Option<f64> {
        let graded = self.graded_lines();
        if graded == 0 {
            return None;
        }
        let lower: u32 = self.handicap.values().map(|b| b.lower).sum();
        Some(lower as f64 / graded as f64 * 100.0)
    }

    pub fn totals_at(&self, line: f64) -> Option<&TotalsBucket> {
        self.totals.get(&quarter_units(line)?)
    }

    /// Goal average, only once the league has enough matches to trust it.
    pub fn settled_avg_goals(&self) -> Option<f64> {
        if self.matches < MIN_MATCHES_FOR_AVG {
            return None;
        }
        self.avg_goals()
    }

    /// Lower-side rate at one home-relative line; `None` below
    /// `MIN_LOWER_RATE_MATCHES` graded results at that line.
    pub fn lower_rate_at(&self, line: f64) -> Option<f64> {
        let bucket = self.handicap.get(&quarter_units(line)?)?;
        let graded = bucket.upper + bucket.lower;
        if graded < MIN_LOWER_RATE_MATCHES {
            return None;
        }
        Some(bucket.lower as f64 / graded as f64 * 100.0)
    }

    /// Over rate at one total line; `None` below `MIN_TOTALS_SAMPLES`.
    pub fn over_rate_at(&self, line: f64) -> Option<f64> {
        let bucket = self.totals_at(line)?;
        let samples = bucket.total();
        if samples < MIN_TOTALS_SAMPLES {
            return None;
        }
        Some(bucket.over as f64 / samples as f64 * 100.0)
    }

    fn add(&mut self, record: &MatchRecord) {
        let Some(score) = record.final_score() else { return };
        self.matches += 1;
        self.total_goals += score.total();
        match match_outcome(score) {
            MatchPick::Home => self.home_wins += 1,
            MatchPick::Draw => self.draws += 1,
            MatchPick::Away => self.away_wins += 1,
        }

        if let Some(settlement) = settle_record_handicap(record) {
            let line = record_line(record).and_then(quarter_units);
            if let Some(key) = line {
                let bucket = self.handicap.entry(key).or_default();
                match settlement.outcome {
                    LineOutcome::UpperWins => bucket.upper += 1,
                    LineOutcome::LowerWins => bucket.lower += 1,
                    LineOutcome::Push => bucket.push += 1,
                }
            }
        }

        if let Some(outcome) = settle_record_totals(record)
            && let Some(key) = record.total_line().and_then(quarter_units)
        {
            let bucket = self.totals.entry(key).or_default();
            match outcome {
                TotalsOutcome::Over => bucket.over += 1,
                TotalsOutcome::Under => bucket.under += 1,
                TotalsOutcome::Push => bucket.push += 1,
            }
        }
    }
}

/// Statistics for every league seen in a set of matches. Recomputed on demand,
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct LeagueTable {
    leagues: BTreeMap<String, LeagueStatistic>,
}

impl LeagueTable {
    pub fn build<'a>(matches: impl IntoIterator<Item = &'a MatchRecord>) -> Self {
        let mut leagues: BTreeMap<String, LeagueStatistic> = BTreeMap::new();
        for record in matches {
            if record.status != MatchStatus::Finished || record.final_score().is_none() {
                continue;
            }
            leagues
                .entry(record.league.clone())
                .or_insert_with(|| LeagueStatistic::new(&record.league))
                .add(record);
        }
        Self { leagues }
    }

    pub fn get(&self, league: &str) -> Option<&LeagueStatistic> {
        self.leagues.get(league)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeagueStatistic> {
        self.leagues.values()
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }

    /// Leagues with at least `min_graded` settled lines, highest lower-side rate first.
    pub fn lower_plate_leagues(&self, min_graded: u32) -> Vec<(&str, f64, u32)> {
        let mut out: Vec<(&str, f64, u32)> = self
            .leagues
            .values()
            .filter(|s| s.graded_lines() >= min_graded)
            .filter_map(|s| Some((s.league.as_str(), s.lower_rate()?, s.graded_lines())))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsSide {
    Over,
    Under,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsRecommendation {
    pub match_id: String,
    pub side: TotalsSide,
    pub line: f64,
    /// Historical hit rate in percent; doubles as confidence.
    pub rate: f64,
    pub samples: u32,
}

/// Recommend over or under for an upcoming match from the league's history at
/// the same total line.
pub fn recommend_totals(
    table: &LeagueTable,
    record: &MatchRecord,
    min_samples: u32,
    min_rate: f64,
) -> Option<TotalsRecommendation> {
    let line = record.total_line()?;
    let bucket = table.get(&record.league)?.totals_at(line)?;
    let samples = bucket.total();
    if samples < min_samples {
        return None;
    }
    let over_rate = bucket.over as f64 / samples as f64 * 100.0;
    let under_rate = bucket.under as f64 / samples as f64 * 100.0;
    let (side, rate) = if over_rate >= under_rate {
        (TotalsSide::Over, over_rate)
    } else {
        (TotalsSide::Under, under_rate)
    };
    if rate < min_rate {
        return None;
    }
    Some(TotalsRecommendation {
        match_id: record.match_id.clone(),
        side,
        line,
        rate,
        samples,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamForm {
    pub team: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    /// Matches with three or more total goals.
    pub big_games: u32,
}

impl TeamForm {
    fn rate(&self, count: u32) -> f64 {
        if self.played == 0 {
            return 0.0;
        }
        count as f64 / self.played as f64 * 100.0
    }

    pub fn win_rate(&self) -> f64 {
        self.rate(self.wins)
    }

    pub fn loss_rate(&self) -> f64 {
        self.rate(self.losses)
    }

    pub fn big_game_rate(&self) -> f64 {
        self.rate(self.big_games)
    }
}

/// Form for every team over its last `last_n` finished matches (all of them
/// when `None`), most recent by `match_time`.
pub fn team_forms(matches: &[MatchRecord], last_n: Option<usize>) -> HashMap<String, TeamForm> {
    let mut finished: Vec<&MatchRecord> = matches
        .iter()
        .filter(|m| m.final_score().is_some())
        .collect();
    finished.sort_by(|a, b| b.match_time.cmp(&a.match_time));

    let mut forms: HashMap<String, TeamForm> = HashMap::new();
    for record in finished {
        let Some(score) = record.final_score() else { continue };
        let sides = [
            (&record.home_team, score.home, score.away),
            (&record.away_team, score.away, score.home),
        ];
        for (team, scored, conceded) in sides {
            let form = forms.entry(team.clone()).or_insert_with(|| TeamForm {
                team: team.clone(),
                ..TeamForm::default()
            });
            if last_n.is_some_and(|n| form.played as usize >= n) {
                continue;
            }
            form.played += 1;
            form.goals_for += scored;
            form.goals_against += conceded;
            match scored.cmp(&conceded) {
                std::cmp::Ordering::Greater => form.wins += 1,
                std::cmp::Ordering::Equal => form.draws += 1,
                std::cmp::Ordering::Less => form.losses += 1,
            }
            if score.total() >= 3 {
                form.big_games += 1;
            }
        }
    }
    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(id: &str, league: &str, home: u32, away: u32, line: f64, total: f64) -> MatchRecord {
        let mut m = MatchRecord::new(id, MatchStatus::Finished);
        m.league = league.to_string();
        m.home_team = format!("H{id}");
        m.away_team = format!("A{id}");
        m.match_time = format!("2024-05-{id:0>2} 20:00");
        m.home_score = Some(home);
        m.away_score = Some(away);
        m.index_line = Some(line);
        m.totals.current.line = Some(total);
        m
    }

    #[test]
    fn buckets_and_counts() {
        let matches = vec![
            finished("1", "L", 2, 0, -1.0, 2.5),
            finished("2", "L", 1, 0, -1.0, 2.5),
            finished("3", "L", 0, 0, -1.0, 2.5),
            finished("4", "L", 1, 3, 0.5, 3.0),
        ];
        let table = LeagueTable::build(&matches);
        let stat = table.get("L").unwrap();
        assert_eq!(stat.matches, 4);
        assert_eq!(stat.total_goals, 7);
        assert_eq!((stat.home_wins, stat.draws, stat.away_wins), (2, 1, 1));

        let minus_one = stat.handicap.get(&-4).unwrap();
        assert_eq!(*minus_one, LineBucket { upper: 1, lower: 1, push: 1 });
        // 1-3 on +0.5: away gives half a ball and covers.
        assert_eq!(stat.handicap.get(&2).unwrap().upper, 1);

        assert_eq!(*stat.totals_at(2.5).unwrap(), TotalsBucket { over: 0, under: 3, push: 0 });
        assert_eq!(stat.totals_at(3.0).unwrap().over, 1);
    }

    #[test]
    fn average_needs_ten_matches() {
        let matches: Vec<MatchRecord> = (1..=9)
            .map(|i| finished(&i.to_string(), "L", 3, 1, -0.5, 2.5))
            .collect();
        let table = LeagueTable::build(&matches);
        assert_eq!(table.get("L").unwrap().settled_avg_goals(), None);

        let mut more = matches.clone();
        more.push(finished("10", "L", 3, 1, -0.5, 2.5));
        let table = LeagueTable::build(&more);
        let avg = table.get("L").and_then(LeagueStatistic::settled_avg_goals);
        assert!((avg.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn per_line_rates_need_samples_at_that_line() {
        // 2-2 on -0.5: home fails to cover and the 2.5 total goes over.
        let mut matches: Vec<MatchRecord> = (1..=4)
            .map(|i| finished(&i.to_string(), "L", 2, 2, -0.5, 2.5))
            .collect();
        matches.push(finished("5", "L", 2, 0, -1.0, 3.0));
        let stat = LeagueTable::build(&matches).get("L").cloned().unwrap();
        assert_eq!(stat.lower_rate_at(-0.5), None);
        assert_eq!(stat.over_rate_at(2.5), None);

        matches.push(finished("6", "L", 2, 2, -0.5, 2.5));
        let stat = LeagueTable::build(&matches).get("L").cloned().unwrap();
        assert_eq!(stat.lower_rate_at(-0.5), Some(100.0));
        assert_eq!(stat.over_rate_at(2.5), Some(100.0));
        assert_eq!(stat.lower_rate_at(-1.0), None);
        assert_eq!(stat.lower_rate_at(0.1), None);
    }

    #[test]
    fn totals_recommendation_thresholds() {
        let mut matches: Vec<MatchRecord> = (1..=4)
            .map(|i| finished(&i.to_string(), "L", 2, 2, 0.0, 2.5))
            .collect();
        let mut upcoming = MatchRecord::new("99", MatchStatus::NotStarted);
        upcoming.league = "L".to_string();
        upcoming.totals.initial.line = Some(2.5);

        let table = LeagueTable::build(&matches);
        assert!(recommend_totals(&table, &upcoming, MIN_TOTALS_SAMPLES, MIN_TOTALS_RATE).is_none());

        matches.push(finished("5", "L", 0, 1, 0.0, 2.5));
        let table = LeagueTable::build(&matches);
        let rec = recommend_totals(&table, &upcoming, MIN_TOTALS_SAMPLES, MIN_TOTALS_RATE).unwrap();
        assert_eq!(rec.side, TotalsSide::Over);
        assert_eq!(rec.samples, 5);
        assert!((rec.rate - 80.0).abs() < 1e-9);
    }

    #[test]
    fn form_limited_to_recent_matches() {
        let mut a = finished("1", "L", 0, 1, 0.0, 2.5);
        let mut b = finished("2", "L", 3, 0, 0.0, 2.5);
        let mut c = finished("3", "L", 2, 2, 0.0, 2.5);
        for m in [&mut a, &mut b, &mut c] {
            m.home_team = "Reds".to_string();
        }
        let forms = team_forms(&[a, b, c], Some(2));
        let reds = forms.get("Reds").unwrap();
        assert_eq!(reds.played, 2);
        assert_eq!((reds.wins, reds.draws, reds.losses), (1, 1, 0));
        assert_eq!(reds.big_games, 2);
        assert_eq!(reds.goals_for, 5);
    }

    #[test]
    fn lower_plate_requires_minimum_sample() {
        let matches: Vec<MatchRecord> = (1..=4)
            .map(|i| finished(&i.to_string(), "L", 0, 0, -0.5, 2.5))
            .collect();
        let table = LeagueTable::build(&matches);
        assert!(table.lower_plate_leagues(MIN_LOWER_RATE_MATCHES).is_empty());
        assert_eq!(table.get("L").unwrap().lower_rate(), Some(100.0));
    }
}
