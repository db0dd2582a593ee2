use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::ingest::load_dump;
use crate::league_stats::LeagueTable;
use crate::model::{MatchRecord, MatchStatus, PredictionRecord, PredictionSource};
use crate::movement::MovementThresholds;
use crate::review::{effective_prediction, grade};
use crate::scorer::{ScoringContext, score};
use crate::store;

fn build_pool(workers: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

/// Score matches on a bounded pool. Matches not yet started when `cancel` is
/// raised are skipped; order of the input is kept.
pub fn score_batch(
    records: &[MatchRecord],
    ctx: &ScoringContext<'_>,
    workers: usize,
    cancel: &AtomicBool,
) -> Vec<PredictionRecord> {
    let pool = build_pool(workers);
    with_pool(&pool, || {
        records
            .par_iter()
            .filter_map(|record| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(score(record, ctx))
            })
            .collect()
    })
}

pub fn ingest_file(
    conn: &mut Connection,
    path: &Path,
    thresholds: MovementThresholds,
) -> Result<usize> {
    let records = load_dump(path, thresholds)?;
    let written = store::upsert_matches(conn, &records, thresholds)?;
    info!(path = %path.display(), written, "ingested dump");
    Ok(written)
}

/// Load hand-written predictions (a JSON array of prediction records) and store
/// them as manual rows. Rows whose match is unknown are skipped.
pub fn import_manual(conn: &Connection, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let predictions: Vec<PredictionRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing manual predictions in {}", path.display()))?;

    let now = Local::now().to_rfc3339();
    let mut written = 0usize;
    for mut prediction in predictions {
        let Some(record) = store::load_match(conn, &prediction.match_id)? else {
            warn!(match_id = %prediction.match_id, "manual prediction for unknown match");
            continue;
        };
        fill_from_record(&mut prediction, &record);
        prediction.source = PredictionSource::Manual;
        prediction.review = None;
        if prediction.predicted_at.trim().is_empty() {
            prediction.predicted_at = now.clone();
        }
        if store::upsert_prediction(conn, &prediction)? {
            written += 1;
        }
    }
    info!(path = %path.display(), written, "imported manual predictions");
    Ok(written)
}

fn fill_from_record(prediction: &mut PredictionRecord, record: &MatchRecord) {
    for (field, value) in [
        (&mut prediction.league, &record.league),
        (&mut prediction.match_time, &record.match_time),
        (&mut prediction.home_team, &record.home_team),
        (&mut prediction.away_team, &record.away_team),
    ] {
        if field.trim().is_empty() {
            field.clone_from(value);
        }
    }
    if prediction.total_line.is_none() {
        prediction.total_line = record.total_line();
    }
}

/// Recompute every stored movement label. Returns the label distribution.
pub fn relabel_all(
    conn: &mut Connection,
    thresholds: MovementThresholds,
) -> Result<BTreeMap<String, usize>> {
    let records = store::load_matches(conn)?;
    store::upsert_matches(conn, &records, thresholds)?;

    let counts: BTreeMap<String, usize> = store::label_distribution(conn)?
        .into_iter()
        .map(|(label, count)| (label.map_or("none", |l| l.as_str()).to_string(), count))
        .collect();
    info!(matches = records.len(), labels = counts.len(), "relabelled matches");
    Ok(counts)
}

#[derive(Debug, Clone, Default)]
pub struct DayRun {
    pub date: String,
    pub predictions: Vec<PredictionRecord>,
    pub written: usize,
    /// Rows left alone because they were already reviewed.
    pub kept_reviewed: usize,
    pub cancelled: bool,
}

/// Score every not-started match of `date` and upsert the automatic predictions.
pub fn predict_day(
    conn: &Connection,
    ctx: ScoringContext<'_>,
    date: &str,
    workers: usize,
    cancel: &AtomicBool,
) -> Result<DayRun> {
    let upcoming = store::load_matches_for_date(conn, date, MatchStatus::NotStarted)?;
    if upcoming.is_empty() {
        warn!(date, "no upcoming matches");
        return Ok(DayRun {
            date: date.to_string(),
            ..DayRun::default()
        });
    }

    let finished = store::load_matches_by_status(conn, MatchStatus::Finished)?;
    let leagues = LeagueTable::build(&finished);
    let ctx = ctx.with_leagues(&leagues);

    let predictions = score_batch(&upcoming, &ctx, workers, cancel);
    let cancelled = predictions.len() < upcoming.len();

    let mut written = 0usize;
    let mut kept_reviewed = 0usize;
    for prediction in &predictions {
        if store::upsert_prediction(conn, prediction)? {
            written += 1;
        } else {
            kept_reviewed += 1;
        }
    }
    info!(
        date,
        upcoming = upcoming.len(),
        scored = predictions.len(),
        written,
        cancelled,
        "prediction run finished"
    );

    Ok(DayRun {
        date: date.to_string(),
        predictions,
        written,
        kept_reviewed,
        cancelled,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ReviewRun {
    pub reviewed: usize,
    /// Matches whose game has not finished yet.
    pub pending: usize,
    pub rows_written: usize,
}

/// Grade every unreviewed prediction whose match has finished.
pub fn review_finished(conn: &mut Connection, cancel: &AtomicBool) -> Result<ReviewRun> {
    let reviewed_at = Local::now().to_rfc3339();
    let mut run = ReviewRun::default();

    for match_id in store::unreviewed_match_ids(conn)? {
        if cancel.load(Ordering::Relaxed) {
            warn!("review cancelled");
            break;
        }
        let Some(record) = store::load_match(conn, &match_id)? else {
            debug!(match_id = %match_id, "prediction without a stored match");
            run.pending += 1;
            continue;
        };
        let rows = store::load_predictions_for_match(conn, &match_id)?;
        let Some(prediction) = effective_prediction(&rows) else { continue };
        let Some(review) = grade(&prediction, &record, &reviewed_at) else {
            run.pending += 1;
            continue;
        };
        run.rows_written += store::write_review(conn, &match_id, &review)
            .with_context(|| format!("review {match_id}"))?;
        run.reviewed += 1;
        debug!(
            match_id = %match_id,
            league = %record.league,
            correct = review.correct,
            graded = review.graded,
            "reviewed prediction"
        );
    }
    info!(
        reviewed = run.reviewed,
        pending = run.pending,
        "review run finished"
    );
    Ok(run)
}
