use std::sync::atomic::AtomicBool;

use anyhow::Result;
use chrono::Local;

use odds_signals::league_stats::{LeagueTable, MIN_LOWER_RATE_MATCHES};
use odds_signals::model::MatchStatus;
use odds_signals::review::{MarketTally, summarize};
use odds_signals::{cli, pipeline, store};

fn main() -> Result<()> {
    cli::load_env();
    cli::init_tracing();

    let args = cli::args();
    let (config, mut conn) = cli::open_store(&args)?;
    let cancel = AtomicBool::new(false);

    let run = pipeline::review_finished(&mut conn, &cancel)?;
    println!("Review complete");
    println!("DB: {}", config.db_path.display());
    println!(
        "Matches reviewed: {} (rows {}), pending: {}",
        run.reviewed, run.rows_written, run.pending
    );

    if let Some(days) = cli::parse_arg::<i64>(&args, "--summary-days")? {
        let reviewed = store::load_reviewed_predictions(&conn)?;
        let summary = summarize(&reviewed, days, Local::now());
        println!();
        println!("Last {} days: {} matches", summary.days, summary.overall.reviewed);
        println!(
            "  average accuracy: {}",
            summary
                .avg_accuracy
                .map(|a| format!("{a:.1}%"))
                .unwrap_or_else(|| "n/a".to_string())
        );
        print_tally("result", &summary.overall.outcome);
        print_tally("handicap", &summary.overall.handicap);
        print_tally("goals", &summary.overall.goals);

        println!();
        println!(
            "{:<16} {:>5} {:>10} {:>10} {:>10}",
            "league", "n", "result", "handicap", "goals"
        );
        for (league, tally) in &summary.leagues {
            println!(
                "{:<16} {:>5} {:>10} {:>10} {:>10}",
                league,
                tally.reviewed,
                pct(&tally.outcome),
                pct(&tally.handicap),
                pct(&tally.goals)
            );
        }
    }

    if cli::has_flag(&args, "--leagues") {
        let finished = store::load_matches_by_status(&conn, MatchStatus::Finished)?;
        let table = LeagueTable::build(&finished);
        println!();
        println!("Lower-side win rate by league:");
        for (league, rate, graded) in table.lower_plate_leagues(MIN_LOWER_RATE_MATCHES) {
            println!("  {league:<16} {rate:>6.1}% ({graded} lines)");
        }
    }
    Ok(())
}

fn pct(tally: &MarketTally) -> String {
    tally
        .accuracy()
        .map(|a| format!("{a:.1}%"))
        .unwrap_or_else(|| "-".to_string())
}

fn print_tally(name: &str, tally: &MarketTally) {
    println!(
        "  {name:<9} {} correct / {} graded, {} push, {} ungraded ({})",
        tally.correct,
        tally.graded(),
        tally.push,
        tally.ungraded,
        pct(tally)
    );
}
