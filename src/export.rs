use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::combo::Combination;
use crate::handicap::from_quarter_units;
use crate::league_stats::LeagueTable;
use crate::model::{MarketPrediction, PredictionRecord};

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub predictions: usize,
    pub league_rows: usize,
    pub combination_legs: usize,
}

pub fn export_workbook(
    path: &Path,
    predictions: &[PredictionRecord],
    leagues: &LeagueTable,
    combination: Option<&Combination>,
) -> Result<ExportReport> {
    let prediction_rows = prediction_rows(predictions);
    let league_rows = league_rows(leagues);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Predictions")?;
        write_rows(sheet, &prediction_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Leagues")?;
        write_rows(sheet, &league_rows)?;
    }
    let combination_rows = combination.map(combination_rows);
    if let Some(rows) = &combination_rows {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Combination")?;
        write_rows(sheet, rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        predictions: prediction_rows.len().saturating_sub(1),
        league_rows: league_rows.len().saturating_sub(1),
        combination_legs: combination.map(|c| c.legs.len()).unwrap_or(0),
    })
}

fn market_cells<T: Copy>(
    market: Option<&MarketPrediction<T>>,
    label: impl Fn(T) -> &'static str,
) -> [String; 3] {
    let Some(market) = market else {
        return [String::new(), String::new(), String::new()];
    };
    let pick = market.pick().map(label).unwrap_or("undetermined");
    [
        pick.to_string(),
        market.confidence.to_string(),
        market.reasons.join("; "),
    ]
}

pub fn prediction_rows(predictions: &[PredictionRecord]) -> Vec<Vec<String>> {
    let mut rows = vec![
        [
            "match_id", "time", "league", "home", "away", "source", "result", "result_conf",
            "result_reasons", "handicap_line", "handicap", "handicap_conf", "handicap_reasons",
            "total_line", "goals", "goals_conf", "goals_reasons", "warnings",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>(),
    ];
    for p in predictions {
        let mut row = vec![
            p.match_id.clone(),
            p.match_time.clone(),
            p.league.clone(),
            p.home_team.clone(),
            p.away_team.clone(),
            p.source.as_str().to_string(),
        ];
        row.extend(market_cells(p.outcome.as_ref(), |x| x.as_str()));
        row.push(opt_to_string(p.handicap_line));
        row.extend(market_cells(p.handicap.as_ref(), |x| x.as_str()));
        row.push(opt_to_string(p.total_line));
        row.extend(market_cells(p.goals.as_ref(), |x| x.as_str()));
        row.push(p.warnings.join("; "));
        rows.push(row);
    }
    rows
}

/// One row per league and handicap bucket, plus a summary row per league.
pub fn league_rows(leagues: &LeagueTable) -> Vec<Vec<String>> {
    let mut rows = vec![
        [
            "league", "bucket", "matches", "avg_goals", "home", "draw", "away", "upper", "lower",
            "push", "lower_rate", "over", "under", "over_rate",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>(),
    ];
    let blank = || String::new();
    for stat in leagues.iter() {
        let (over, under) = stat
            .totals
            .values()
            .fold((0, 0), |(o, u), b| (o + b.over, u + b.under));
        rows.push(vec![
            stat.league.clone(),
            "all".to_string(),
            stat.matches.to_string(),
            opt_fixed(stat.avg_goals()),
            stat.home_wins.to_string(),
            stat.draws.to_string(),
            stat.away_wins.to_string(),
            blank(),
            blank(),
            blank(),
            opt_fixed(stat.lower_rate()),
            over.to_string(),
            under.to_string(),
            blank(),
        ]);
        for (units, bucket) in &stat.handicap {
            rows.push(vec![
                stat.league.clone(),
                format!("line {:+}", from_quarter_units(*units)),
                bucket.total().to_string(),
                blank(),
                blank(),
                blank(),
                blank(),
                bucket.upper.to_string(),
                bucket.lower.to_string(),
                bucket.push.to_string(),
                blank(),
                blank(),
                blank(),
                blank(),
            ]);
        }
        for (units, bucket) in &stat.totals {
            let samples = bucket.total();
            let over_rate = (samples > 0).then(|| bucket.over as f64 / samples as f64 * 100.0);
            rows.push(vec![
                stat.league.clone(),
                format!("total {}", from_quarter_units(*units)),
                samples.to_string(),
                blank(),
                blank(),
                blank(),
                blank(),
                blank(),
                blank(),
                bucket.push.to_string(),
                blank(),
                bucket.over.to_string(),
                bucket.under.to_string(),
                opt_fixed(over_rate),
            ]);
        }
    }
    rows
}

fn combination_rows(combination: &Combination) -> Vec<Vec<String>> {
    let mut rows = vec![
        ["match_id", "time", "league", "fixture", "pick", "price", "reason"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>(),
    ];
    for leg in &combination.legs {
        rows.push(vec![
            leg.match_id.clone(),
            leg.match_time.clone(),
            leg.league.clone(),
            leg.fixture.clone(),
            leg.label.clone(),
            format!("{:.2}", leg.price),
            leg.reason.clone(),
        ]);
    }
    rows.push(vec![
        "total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        format!("{:.2}", combination.price),
        String::new(),
    ]);
    rows
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_fixed(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchRecord, MatchStatus, PredictionSource};

    #[test]
    fn prediction_rows_have_a_header_and_fixed_width() {
        let p = PredictionRecord {
            match_id: "1".to_string(),
            source: PredictionSource::Automatic,
            league: "L".to_string(),
            match_time: "2024-05-01 20:00".to_string(),
            home_team: "H".to_string(),
            away_team: "A".to_string(),
            outcome: Some(MarketPrediction::undetermined(40, vec![])),
            handicap: None,
            handicap_line: None,
            goals: None,
            total_line: Some(2.5),
            warnings: vec!["possible trap".to_string()],
            predicted_at: String::new(),
            review: None,
        };
        let rows = prediction_rows(&[p]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), rows[1].len());
        assert_eq!(rows[1][6], "undetermined");
        assert_eq!(rows[1][13], "2.5");
    }

    #[test]
    fn league_rows_include_buckets() {
        let mut m = MatchRecord::new("1", MatchStatus::Finished);
        m.league = "L".to_string();
        m.home_score = Some(1);
        m.away_score = Some(0);
        m.index_line = Some(-0.5);
        m.totals.current.line = Some(2.5);
        let table = LeagueTable::build(&[m]);
        let rows = league_rows(&table);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() == rows[0].len()));
        assert_eq!((rows[1][11].as_str(), rows[1][12].as_str()), ("0", "1"));
        assert_eq!(rows[2][1], "line -0.5");

        // 1-0 against a 2.5 total: one under, no overs.
        let total = &rows[3];
        assert_eq!(total[1], "total 2.5");
        assert_eq!(total[2], "1");
        assert_eq!((total[11].as_str(), total[12].as_str()), ("0", "1"));
        assert_eq!(total[13], opt_fixed(Some(0.0)));
    }
}
