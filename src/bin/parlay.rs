use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Result, bail};

use odds_signals::combo::{
    AcceptanceBand, candidates_from_form, candidates_from_predictions, clamp_request, select,
};
use odds_signals::export::export_workbook;
use odds_signals::league_stats::{LeagueTable, team_forms};
use odds_signals::model::MatchStatus;
use odds_signals::review::effective_predictions;
use odds_signals::{cli, store};

const DEFAULT_LEGS: usize = 2;
const DEFAULT_TARGET: f64 = 3.0;
const DEFAULT_MIN_CONFIDENCE: u8 = 60;

fn main() -> Result<()> {
    cli::load_env();
    cli::init_tracing();

    let args = cli::args();
    let (_config, conn) = cli::open_store(&args)?;
    let date = cli::arg_value(&args, "--date").unwrap_or_else(cli::today);
    let requested_n = cli::parse_arg::<usize>(&args, "--n")?.unwrap_or(DEFAULT_LEGS);
    let requested_target = cli::parse_arg::<f64>(&args, "--target")?.unwrap_or(DEFAULT_TARGET);
    let (n, target) = clamp_request(requested_n, requested_target);
    if (n, target) != (requested_n, requested_target) {
        println!("Request clamped to {n} legs, target {target:.2}");
    }

    let upcoming = store::load_matches_for_date(&conn, &date, MatchStatus::NotStarted)?;
    let source = cli::arg_value(&args, "--source").unwrap_or_else(|| "form".to_string());
    let candidates = match source.as_str() {
        "form" => {
            let finished = store::load_matches_by_status(&conn, MatchStatus::Finished)?;
            let last = cli::parse_arg::<usize>(&args, "--last")?;
            candidates_from_form(&upcoming, &team_forms(&finished, last))
        }
        "predictions" => {
            let min_conf = cli::parse_arg::<u8>(&args, "--min-confidence")?
                .unwrap_or(DEFAULT_MIN_CONFIDENCE);
            // Manual rows override the automatic picks market by market.
            let stored = store::load_predictions_for_date(&conn, &date)?;
            let predictions = effective_predictions(&stored);
            let by_id = upcoming
                .iter()
                .map(|m| (m.match_id.clone(), m.clone()))
                .collect::<HashMap<_, _>>();
            candidates_from_predictions(&predictions, &by_id, min_conf)
        }
        other => bail!("unknown --source {other:?}; expected form or predictions"),
    };

    let band = AcceptanceBand::default();
    let (lo, hi) = band.bounds(target);
    println!(
        "{date}: {} upcoming, {} candidates, {n} legs, target {target:.2} [{lo:.2}, {hi:.2}]",
        upcoming.len(),
        candidates.len()
    );

    let Some(combination) = select(&candidates, n, target, band) else {
        println!("No combination inside the acceptance band");
        return Ok(());
    };
    for (idx, leg) in combination.legs.iter().enumerate() {
        println!(
            "  {}. {} {} [{}] {} @ {:.2}",
            idx + 1,
            leg.match_time,
            leg.fixture,
            leg.league,
            leg.label,
            leg.price
        );
        if !leg.reason.is_empty() {
            println!("     {}", leg.reason);
        }
    }
    println!(
        "Combined price {:.2} (distance {:.2})",
        combination.price, combination.distance
    );

    if let Some(path) = cli::arg_value(&args, "--xlsx") {
        let path = PathBuf::from(path);
        let finished = store::load_matches_by_status(&conn, MatchStatus::Finished)?;
        let predictions = store::load_predictions_for_date(&conn, &date)?;
        let report = export_workbook(
            &path,
            &predictions,
            &LeagueTable::build(&finished),
            Some(&combination),
        )?;
        println!(
            "Workbook: {} ({} legs)",
            path.display(),
            report.combination_legs
        );
    }
    Ok(())
}
