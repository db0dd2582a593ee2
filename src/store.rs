use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};

use crate::model::{MatchRecord, MatchStatus, PredictionRecord, Review};
use crate::movement::{MovementLabel, MovementThresholds, refresh_label};

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            league TEXT NOT NULL,
            owner_date TEXT NOT NULL,
            match_time TEXT NOT NULL,
            status INTEGER NOT NULL,
            movement_label TEXT NULL,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_owner_date ON matches(owner_date);
        CREATE INDEX IF NOT EXISTS idx_matches_status ON matches(status);
        CREATE INDEX IF NOT EXISTS idx_matches_league ON matches(league);

        CREATE TABLE IF NOT EXISTS predictions (
            match_id TEXT NOT NULL,
            source TEXT NOT NULL,
            league TEXT NOT NULL,
            predicted_at TEXT NOT NULL,
            reviewed INTEGER NOT NULL DEFAULT 0,
            reviewed_at TEXT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (match_id, source)
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_reviewed ON predictions(reviewed);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Atomic upsert by `match_id`. The movement label is recomputed from the odds
/// being written, so a stored label never lags its snapshot.
pub fn upsert_match(
    conn: &Connection,
    record: &MatchRecord,
    thresholds: MovementThresholds,
) -> Result<()> {
    let mut record = record.clone();
    refresh_label(&mut record, thresholds);
    let data = serde_json::to_string(&record).context("serialize match")?;
    conn.execute(
        r#"
        INSERT INTO matches(match_id, league, owner_date, match_time, status, movement_label, data, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(match_id) DO UPDATE SET
            league = excluded.league,
            owner_date = excluded.owner_date,
            match_time = excluded.match_time,
            status = excluded.status,
            movement_label = excluded.movement_label,
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
        params![
            record.match_id,
            record.league,
            record.owner_date,
            record.match_time,
            record.status.code(),
            record.movement_label.map(|l| l.as_str()),
            data,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert match {}", record.match_id))?;
    Ok(())
}

pub fn upsert_matches(
    conn: &mut Connection,
    records: &[MatchRecord],
    thresholds: MovementThresholds,
) -> Result<usize> {
    let tx = conn.transaction().context("begin match transaction")?;
    for record in records {
        upsert_match(&tx, record, thresholds)?;
    }
    tx.commit().context("commit match transaction")?;
    debug!(count = records.len(), "upserted matches");
    Ok(records.len())
}

fn decode<T: serde::de::DeserializeOwned>(row: &Row<'_>) -> rusqlite::Result<T> {
    let data: String = row.get(0)?;
    serde_json::from_str(&data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn query_json<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql).context("prepare query")?;
    let rows = stmt.query_map(params, decode::<T>).context("run query")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode row")?);
    }
    Ok(out)
}

pub fn load_match(conn: &Connection, match_id: &str) -> Result<Option<MatchRecord>> {
    conn.query_row(
        "SELECT data FROM matches WHERE match_id = ?1",
        params![match_id],
        decode::<MatchRecord>,
    )
    .optional()
    .with_context(|| format!("load match {match_id}"))
}

pub fn load_matches(conn: &Connection) -> Result<Vec<MatchRecord>> {
    query_json(
        conn,
        "SELECT data FROM matches ORDER BY match_time ASC, match_id ASC",
        [],
    )
}

pub fn load_matches_by_status(conn: &Connection, status: MatchStatus) -> Result<Vec<MatchRecord>> {
    query_json(
        conn,
        "SELECT data FROM matches WHERE status = ?1 ORDER BY match_time ASC, match_id ASC",
        params![status.code()],
    )
}

pub fn load_matches_for_date(
    conn: &Connection,
    owner_date: &str,
    status: MatchStatus,
) -> Result<Vec<MatchRecord>> {
    query_json(
        conn,
        "SELECT data FROM matches WHERE owner_date = ?1 AND status = ?2 ORDER BY match_time ASC, match_id ASC",
        params![owner_date, status.code()],
    )
}

/// Match count per stored movement label; `None` counts unlabelled matches.
/// Label text the current vocabulary does not know is skipped with a warning.
pub fn label_distribution(conn: &Connection) -> Result<Vec<(Option<MovementLabel>, usize)>> {
    let mut stmt = conn
        .prepare(
            "SELECT movement_label, COUNT(*) FROM matches GROUP BY movement_label ORDER BY movement_label ASC",
        )
        .context("prepare label distribution")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
        })
        .context("run label distribution")?;

    let mut out = Vec::new();
    for row in rows {
        let (raw, count) = row.context("decode label row")?;
        let label = match raw.as_deref() {
            None => None,
            Some(text) => match MovementLabel::parse(text) {
                Some(label) => Some(label),
                None => {
                    warn!(label = text, count, "unknown movement label in store");
                    continue;
                }
            },
        };
        out.push((label, count.max(0) as usize));
    }
    Ok(out)
}

/// Write a prediction keyed by `(match_id, source)`. A row that has already
/// been reviewed is left untouched; returns whether the row was written.
pub fn upsert_prediction(conn: &Connection, prediction: &PredictionRecord) -> Result<bool> {
    let data = serde_json::to_string(prediction).context("serialize prediction")?;
    let changed = conn
        .execute(
            r#"
            INSERT INTO predictions(match_id, source, league, predicted_at, reviewed, reviewed_at, data)
            VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5)
            ON CONFLICT(match_id, source) DO UPDATE SET
                league = excluded.league,
                predicted_at = excluded.predicted_at,
                data = excluded.data
            WHERE predictions.reviewed = 0
            "#,
            params![
                prediction.match_id,
                prediction.source.as_str(),
                prediction.league,
                prediction.predicted_at,
                data,
            ],
        )
        .with_context(|| format!("upsert prediction {}", prediction.match_id))?;
    Ok(changed > 0)
}

pub fn load_predictions_for_match(
    conn: &Connection,
    match_id: &str,
) -> Result<Vec<PredictionRecord>> {
    query_json(
        conn,
        "SELECT data FROM predictions WHERE match_id = ?1 ORDER BY source ASC",
        params![match_id],
    )
}

pub fn load_predictions_for_date(
    conn: &Connection,
    owner_date: &str,
) -> Result<Vec<PredictionRecord>> {
    query_json(
        conn,
        r#"
        SELECT p.data FROM predictions p
        JOIN matches m ON m.match_id = p.match_id
        WHERE m.owner_date = ?1
        ORDER BY m.match_time ASC, p.match_id ASC, p.source ASC
        "#,
        params![owner_date],
    )
}

/// Match ids that still have an unreviewed prediction row.
pub fn unreviewed_match_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT match_id FROM predictions WHERE reviewed = 0 ORDER BY match_id")
        .context("prepare unreviewed query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query unreviewed")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match id")?);
    }
    Ok(out)
}

pub fn load_reviewed_predictions(conn: &Connection) -> Result<Vec<PredictionRecord>> {
    query_json(
        conn,
        "SELECT data FROM predictions WHERE reviewed = 1 ORDER BY reviewed_at DESC, source ASC",
        [],
    )
}

/// Attach the review to every unreviewed row of the match. Reviewed rows are
/// never touched again; returns the number of rows written.
pub fn write_review(conn: &mut Connection, match_id: &str, review: &Review) -> Result<usize> {
    let tx = conn.transaction().context("begin review transaction")?;
    let rows: Vec<PredictionRecord> = query_json(
        &tx,
        "SELECT data FROM predictions WHERE match_id = ?1 AND reviewed = 0",
        params![match_id],
    )?;
    let mut written = 0usize;
    for mut prediction in rows {
        prediction.review = Some(review.clone());
        let data = serde_json::to_string(&prediction).context("serialize reviewed prediction")?;
        written += tx
            .execute(
                r#"
                UPDATE predictions
                SET reviewed = 1, reviewed_at = ?1, data = ?2
                WHERE match_id = ?3 AND source = ?4 AND reviewed = 0
                "#,
                params![review.reviewed_at, data, match_id, prediction.source.as_str()],
            )
            .with_context(|| format!("write review {match_id}"))?;
    }
    tx.commit().context("commit review transaction")?;
    Ok(written)
}
