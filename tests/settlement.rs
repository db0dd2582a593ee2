use odds_signals::model::Score;
use odds_signals::settlement::{LineOutcome, Side, TotalsOutcome, settle_handicap, settle_totals};

#[test]
fn home_favoured_by_half_ball_covers_with_one_goal_win() {
    let s = settle_handicap(Score { home: 2, away: 1 }, -0.5).unwrap();
    assert_eq!(s.outcome, LineOutcome::UpperWins);
    assert_eq!(s.upper, Side::Home);
}

#[test]
fn totals_over_and_push() {
    assert_eq!(
        settle_totals(Score { home: 2, away: 1 }, 2.5),
        Some(TotalsOutcome::Over)
    );
    assert_eq!(
        settle_totals(Score { home: 1, away: 2 }, 3.0),
        Some(TotalsOutcome::Push)
    );
}

#[test]
fn every_score_and_quarter_line_settles_once() {
    for home in 0..=6u32 {
        for away in 0..=6u32 {
            for units in -14..=14i32 {
                let h = units as f64 * 0.25;
                let settlement = settle_handicap(Score { home, away }, h)
                    .unwrap_or_else(|| panic!("{home}-{away} at {h} should settle"));
                let level = home as f64 + h == away as f64;
                assert_eq!(
                    settlement.outcome == LineOutcome::Push,
                    level,
                    "{home}-{away} at {h}"
                );

                // The upper side wins exactly when its adjusted margin is positive.
                let home_margin = home as f64 + h - away as f64;
                if !level {
                    let home_won = home_margin > 0.0;
                    assert_eq!(
                        settlement.winner(),
                        Some(if home_won { Side::Home } else { Side::Away }),
                        "{home}-{away} at {h}"
                    );
                }
            }
        }
    }
}

#[test]
fn missing_or_invalid_line_is_undetermined() {
    let score = Score { home: 1, away: 0 };
    assert!(settle_handicap(score, f64::NAN).is_none());
    assert!(settle_handicap(score, 0.1).is_none());
    assert!(settle_totals(score, -1.0).is_none());
}
