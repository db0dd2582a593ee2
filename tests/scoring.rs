use std::fs;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use odds_signals::handicap::{RECEIVING_MARKER, vocabulary};
use odds_signals::league_stats::LeagueTable;
use odds_signals::model::{MatchPick, MatchRecord, MatchStatus, PredictionRecord};
use odds_signals::movement::{MovementThresholds, refresh_label};
use odds_signals::priors::{LeaguePriors, LeagueTag};
use odds_signals::scorer::{ScoringConstants, ScoringContext, score, top_picks};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn maybe_price(rng: &mut StdRng, lo: f64, hi: f64) -> Option<f64> {
    rng.gen_bool(0.8).then(|| rng.gen_range(lo..hi))
}

fn maybe_token(rng: &mut StdRng) -> Option<String> {
    if !rng.gen_bool(0.8) {
        return None;
    }
    let vocab = vocabulary();
    let (phrase, _) = vocab[rng.gen_range(0..vocab.len())];
    Some(if rng.gen_bool(0.3) {
        format!("{RECEIVING_MARKER}{phrase}")
    } else {
        phrase.to_string()
    })
}

fn random_record(rng: &mut StdRng, idx: usize, leagues: &[&str]) -> MatchRecord {
    let mut m = MatchRecord::new(idx.to_string(), MatchStatus::NotStarted);
    m.league = leagues[rng.gen_range(0..leagues.len())].to_string();
    m.home_team = format!("H{idx}");
    m.away_team = format!("A{idx}");
    for snap in [&mut m.euro.initial, &mut m.euro.current] {
        snap.home = maybe_price(rng, 1.05, 9.0);
        snap.draw = maybe_price(rng, 2.5, 6.0);
        snap.away = maybe_price(rng, 1.05, 12.0);
    }
    for snap in [&mut m.asian.initial, &mut m.asian.current] {
        snap.home = maybe_price(rng, 0.6, 1.2);
        snap.handicap = maybe_token(rng);
        snap.away = maybe_price(rng, 0.6, 1.2);
    }
    for snap in [&mut m.totals.initial, &mut m.totals.current] {
        snap.over = maybe_price(rng, 0.6, 1.2);
        snap.line = rng.gen_bool(0.8).then(|| rng.gen_range(6..=18) as f64 * 0.25);
        snap.under = maybe_price(rng, 0.6, 1.2);
    }
    m.index_line = rng.gen_bool(0.7).then(|| rng.gen_range(-12..=12) as f64 * 0.25);
    for snap in [&mut m.index.initial, &mut m.index.current] {
        snap.home = maybe_price(rng, 1.2, 8.0);
        snap.draw = maybe_price(rng, 2.5, 6.0);
        snap.away = maybe_price(rng, 1.2, 8.0);
    }
    refresh_label(&mut m, MovementThresholds::default());
    m
}

fn confidences(p: &PredictionRecord) -> Vec<(bool, u8, usize)> {
    let mut out = Vec::new();
    if let Some(m) = &p.outcome {
        out.push((m.pick().is_some(), m.confidence, m.reasons.len()));
    }
    if let Some(m) = &p.handicap {
        out.push((m.pick().is_some(), m.confidence, m.reasons.len()));
    }
    if let Some(m) = &p.goals {
        out.push((m.pick().is_some(), m.confidence, m.reasons.len()));
    }
    out
}

#[test]
fn confidence_stays_in_bounds_for_random_matches() {
    let mut rng = StdRng::seed_from_u64(0x0dd5);
    let priors = LeaguePriors::builtin();
    let leagues = ["英超", "意甲", "德甲", "日职乙", "葡超", "Unknown League"];
    let constants = ScoringConstants::default();
    let ctx = ScoringContext::new(&priors);

    for idx in 0..2_000 {
        let record = random_record(&mut rng, idx, &leagues);
        let prediction = score(&record, &ctx);
        for (determined, confidence, reasons) in confidences(&prediction) {
            assert!(confidence <= constants.cap, "match {idx}: {confidence}");
            if determined {
                assert!(reasons > 0, "match {idx}: pick without a reason");
            } else {
                assert!(confidence < constants.low_confidence, "match {idx}: {confidence}");
            }
        }
    }
}

#[test]
fn scoring_is_reproducible() {
    let mut rng = StdRng::seed_from_u64(7);
    let priors = LeaguePriors::builtin();
    let ctx = ScoringContext::new(&priors);
    for idx in 0..200 {
        let record = random_record(&mut rng, idx, &["英超", "意甲"]);
        let mut a = score(&record, &ctx);
        let mut b = score(&record, &ctx);
        a.predicted_at.clear();
        b.predicted_at.clear();
        assert_eq!(a, b);
    }
}

#[test]
fn priors_file_drives_league_rules() {
    let priors = LeaguePriors::load(&fixture_path("priors.json")).expect("priors fixture");
    assert!(priors.has("Test League", LeagueTag::HighDraw));
    assert!(!priors.has("Test League", LeagueTag::Trap));

    let mut m = MatchRecord::new("1", MatchStatus::NotStarted);
    m.league = "Test League".to_string();
    m.asian.current.handicap = Some("平手".to_string());

    let outcome = score(&m, &ScoringContext::new(&priors)).outcome.unwrap();
    assert_eq!(outcome.pick(), Some(MatchPick::Draw));
    assert_eq!(outcome.reasons.len(), 2);
    assert_eq!(outcome.confidence, 90);

    // Same match without the priors has no signal at all.
    let empty = LeaguePriors::default();
    let outcome = score(&m, &ScoringContext::new(&empty)).outcome.unwrap();
    assert_eq!(outcome.pick(), None);
}

#[test]
fn league_history_feeds_the_goal_average() {
    let mut history = Vec::new();
    for idx in 0..12 {
        let mut m = MatchRecord::new(format!("h{idx}"), MatchStatus::Finished);
        m.league = "Goal League".to_string();
        m.home_score = Some(3);
        m.away_score = Some(2);
        history.push(m);
    }
    let table = LeagueTable::build(&history);
    let avg = table.get("Goal League").and_then(|s| s.settled_avg_goals());
    assert_eq!(avg, Some(5.0));

    let priors = LeaguePriors::default();
    let mut upcoming = MatchRecord::new("u", MatchStatus::NotStarted);
    upcoming.league = "Goal League".to_string();

    let with_history = score(&upcoming, &ScoringContext::new(&priors).with_leagues(&table));
    let goals = with_history.goals.unwrap();
    assert_eq!(goals.pick().map(|b| b.as_str()), Some("3-4"));
    assert!(goals.reasons[0].contains("5.00"));

    let without = score(&upcoming, &ScoringContext::new(&priors)).goals.unwrap();
    assert_eq!(without.pick(), None);
    assert_eq!(without.confidence, 40);
}

#[test]
fn settled_lines_in_the_league_move_both_markets() {
    // Ten 2-2 draws on -0.5 with a 2.5 total: the receiving side covered
    // every time and every total went over.
    let mut history = Vec::new();
    for idx in 0..10 {
        let mut m = MatchRecord::new(format!("h{idx}"), MatchStatus::Finished);
        m.league = "History League".to_string();
        m.home_score = Some(2);
        m.away_score = Some(2);
        m.index_line = Some(-0.5);
        m.totals.current.line = Some(2.5);
        history.push(m);
    }
    let table = LeagueTable::build(&history);
    let stat = table.get("History League").unwrap();
    assert_eq!(stat.lower_rate_at(-0.5), Some(100.0));
    assert_eq!(stat.over_rate_at(2.5), Some(100.0));

    let mut upcoming = MatchRecord::new("u", MatchStatus::NotStarted);
    upcoming.league = "History League".to_string();
    upcoming.index_line = Some(-0.5);
    upcoming.index.current.home = Some(2.60);
    upcoming.index.current.draw = Some(3.10);
    upcoming.index.current.away = Some(2.70);
    upcoming.totals.current.line = Some(2.5);

    let priors = LeaguePriors::default();
    let plain = score(&upcoming, &ScoringContext::new(&priors));
    let informed = score(&upcoming, &ScoringContext::new(&priors).with_leagues(&table));

    // Prices alone: upper has the lowest price (3) against push under 3.50 (1).
    let handicap = plain.handicap.unwrap();
    assert_eq!(handicap.pick().map(|p| p.as_str()), Some("upper"));
    assert_eq!(handicap.confidence, 75);
    let handicap = informed.handicap.unwrap();
    assert_eq!(handicap.pick().map(|p| p.as_str()), Some("lower"));
    assert_eq!(handicap.confidence, 70);
    assert!(handicap.reasons.iter().any(|r| r.contains("100.00% at this line")));

    let goals = plain.goals.unwrap();
    assert_eq!(goals.pick().map(|b| b.as_str()), Some("2-3"));
    assert_eq!(goals.confidence, 83);
    let goals = informed.goals.unwrap();
    assert_eq!(goals.pick().map(|b| b.as_str()), Some("3-4"));
    assert_eq!(goals.confidence, 70);
}

#[test]
fn top_picks_rank_by_confidence() {
    let mut rng = StdRng::seed_from_u64(42);
    let priors = LeaguePriors::builtin();
    let ctx = ScoringContext::new(&priors);
    let predictions: Vec<PredictionRecord> = (0..50)
        .map(|idx| score(&random_record(&mut rng, idx, &["英超", "意甲"]), &ctx))
        .collect();

    let top = top_picks(&predictions, 3);
    assert!(top.outcome.len() <= 3);
    let confs: Vec<u8> = top
        .outcome
        .iter()
        .map(|p| p.outcome.as_ref().unwrap().confidence)
        .collect();
    assert!(confs.windows(2).all(|w| w[0] >= w[1]));
    assert!(top.outcome.iter().all(|p| p.outcome.as_ref().unwrap().pick().is_some()));
}
