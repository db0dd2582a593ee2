use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use odds_signals::export::export_workbook;
use odds_signals::league_stats::{
    LeagueTable, MIN_TOTALS_RATE, MIN_TOTALS_SAMPLES, TotalsSide, recommend_totals,
};
use odds_signals::model::{MarketPrediction, MatchStatus, PredictionRecord};
use odds_signals::movement::{EuroTendency, euro_movement};
use odds_signals::scorer::{ScoringContext, top_picks};
use odds_signals::{cli, pipeline, store};

const TOP_K: usize = 3;

fn main() -> Result<()> {
    cli::load_env();
    cli::init_tracing();

    let args = cli::args();
    let date = cli::arg_value(&args, "--date").unwrap_or_else(cli::today);
    let (config, conn) = cli::open_store(&args)?;
    let priors = config.load_priors()?;
    let cancel = AtomicBool::new(false);

    let run = pipeline::predict_day(
        &conn,
        ScoringContext::new(&priors),
        &date,
        config.workers,
        &cancel,
    )?;

    println!("Predictions for {date}");
    println!(
        "scored={} written={} kept_reviewed={}{}",
        run.predictions.len(),
        run.written,
        run.kept_reviewed,
        if run.cancelled { " (cancelled)" } else { "" }
    );
    if run.predictions.is_empty() {
        return Ok(());
    }

    println!(
        "{:<17} {:<12} {:<30} {:<18} {:<24} {:<18}",
        "time", "league", "fixture", "result", "handicap", "goals"
    );
    for p in &run.predictions {
        let line = p
            .handicap_line
            .map(|l| format!("{l:+}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<17} {:<12} {:<30} {:<18} {:<24} {:<18}",
            p.match_time,
            p.league,
            format!("{} vs {}", p.home_team, p.away_team),
            cell(p.outcome.as_ref(), |x| x.as_str()),
            format!("{line} {}", cell(p.handicap.as_ref(), |x| x.as_str())),
            cell(p.goals.as_ref(), |x| x.as_str()),
        );
        for warning in &p.warnings {
            println!("    ! {warning}");
        }
    }

    let top = top_picks(&run.predictions, TOP_K);
    print_top("Top result picks", &top.outcome, |p| {
        cell(p.outcome.as_ref(), |x| x.as_str())
    });
    print_top("Top handicap picks", &top.handicap, |p| {
        cell(p.handicap.as_ref(), |x| x.as_str())
    });
    print_top("Top goals picks", &top.goals, |p| {
        cell(p.goals.as_ref(), |x| x.as_str())
    });

    let finished = store::load_matches_by_status(&conn, MatchStatus::Finished)?;
    let leagues = LeagueTable::build(&finished);
    let upcoming = store::load_matches_for_date(&conn, &date, MatchStatus::NotStarted)?;
    println!("Market movement:");
    for m in &upcoming {
        let label = m
            .movement_label
            .map(|l| match l.tendency() {
                Some(reading) => format!("{l} ({reading})"),
                None => l.to_string(),
            })
            .unwrap_or_else(|| "no data".to_string());
        let euro = match euro_movement(&m.euro).and_then(|mv| mv.tendency) {
            Some(EuroTendency::Home) => "1X2 money on home",
            Some(EuroTendency::Away) => "1X2 money on away",
            Some(EuroTendency::Draw) => "1X2 money on draw",
            None => "1X2 steady",
        };
        println!("  {} {}: {label}; {euro}", m.match_time, m.fixture_label());
    }

    let totals = upcoming
        .iter()
        .filter_map(|m| Some((m, recommend_totals(&leagues, m, MIN_TOTALS_SAMPLES, MIN_TOTALS_RATE)?)))
        .collect::<Vec<_>>();
    if !totals.is_empty() {
        println!("Totals from league history:");
        for (m, rec) in totals {
            let side = match rec.side {
                TotalsSide::Over => "over",
                TotalsSide::Under => "under",
            };
            println!(
                "  {} {} {side} {} ({:.0}% of {} games)",
                m.match_time,
                m.fixture_label(),
                rec.line,
                rec.rate,
                rec.samples
            );
        }
    }

    if let Some(path) = cli::arg_value(&args, "--xlsx") {
        let path = PathBuf::from(path);
        let report = export_workbook(&path, &run.predictions, &leagues, None)?;
        println!(
            "Workbook: {} ({} predictions, {} league rows)",
            path.display(),
            report.predictions,
            report.league_rows
        );
    }
    Ok(())
}

fn cell<T: Copy>(market: Option<&MarketPrediction<T>>, label: impl Fn(T) -> &'static str) -> String {
    match market {
        Some(m) => match m.pick() {
            Some(pick) => format!("{} ({})", label(pick), m.confidence),
            None => format!("undetermined ({})", m.confidence),
        },
        None => "-".to_string(),
    }
}

fn print_top(title: &str, picks: &[&PredictionRecord], show: impl Fn(&PredictionRecord) -> String) {
    if picks.is_empty() {
        return;
    }
    println!("{title}:");
    for (rank, p) in picks.iter().enumerate() {
        println!(
            "  {}. {} {} vs {} -> {}",
            rank + 1,
            p.match_time,
            p.home_team,
            p.away_team,
            show(p)
        );
    }
}
