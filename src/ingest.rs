use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::handicap::is_quarter_ball;
use crate::model::{
    AsianSnapshot, EuroSnapshot, IndexSnapshot, Market, MatchRecord, MatchStatus, TotalsSnapshot,
};
use crate::movement::{MovementThresholds, refresh_label};
use crate::odds::{to_goals, to_price, to_signed};

/// Scraped cells arrive as strings, numbers or null; keep them as text.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// One match as the scraper dumps it: flat, textual, unvalidated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMatch {
    #[serde(deserialize_with = "text")]
    pub match_id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub league: Option<String>,
    #[serde(deserialize_with = "text")]
    pub home_team: Option<String>,
    #[serde(deserialize_with = "text")]
    pub away_team: Option<String>,
    #[serde(deserialize_with = "text")]
    pub match_time: Option<String>,
    #[serde(deserialize_with = "text")]
    pub owner_date: Option<String>,
    #[serde(deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "text")]
    pub home_score: Option<String>,
    #[serde(deserialize_with = "text")]
    pub away_score: Option<String>,

    #[serde(deserialize_with = "text")]
    pub euro_initial_win: Option<String>,
    #[serde(deserialize_with = "text")]
    pub euro_initial_draw: Option<String>,
    #[serde(deserialize_with = "text")]
    pub euro_initial_lose: Option<String>,
    #[serde(deserialize_with = "text")]
    pub euro_current_win: Option<String>,
    #[serde(deserialize_with = "text")]
    pub euro_current_draw: Option<String>,
    #[serde(deserialize_with = "text")]
    pub euro_current_lose: Option<String>,

    #[serde(deserialize_with = "text")]
    pub asian_initial_home_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub asian_initial_handicap: Option<String>,
    #[serde(deserialize_with = "text")]
    pub asian_initial_away_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub asian_current_home_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub asian_current_handicap: Option<String>,
    #[serde(deserialize_with = "text")]
    pub asian_current_away_odds: Option<String>,

    #[serde(deserialize_with = "text")]
    pub ou_initial_over_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub ou_initial_total: Option<String>,
    #[serde(deserialize_with = "text")]
    pub ou_initial_under_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub ou_current_over_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub ou_current_total: Option<String>,
    #[serde(deserialize_with = "text")]
    pub ou_current_under_odds: Option<String>,

    /// Three-way handicap value, already home-relative in the source.
    #[serde(deserialize_with = "text")]
    pub hi_handicap_value: Option<String>,
    #[serde(deserialize_with = "text")]
    pub hi_initial_home_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub hi_initial_draw_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub hi_initial_away_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub hi_current_home_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub hi_current_draw_odds: Option<String>,
    #[serde(deserialize_with = "text")]
    pub hi_current_away_odds: Option<String>,
}

fn cell(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn owned(raw: &Option<String>) -> String {
    cell(raw).unwrap_or_default().to_string()
}

/// Tokens are kept textual; blanks and placeholders become `None`.
fn handicap_token(raw: &Option<String>) -> Option<String> {
    cell(raw)
        .filter(|s| !matches!(*s, "-" | "--" | "—"))
        .map(str::to_string)
}

impl RawMatch {
    /// Normalize into a [`MatchRecord`] and label its movement. `None` when the
    /// id is missing or the status code is unknown.
    pub fn into_record(self, thresholds: MovementThresholds) -> Option<MatchRecord> {
        let match_id = cell(&self.match_id)?.to_string();
        let code = cell(&self.status)?.parse::<i64>().ok()?;
        let status = MatchStatus::from_code(code)?;

        let (home_score, away_score) = match (
            to_goals(self.home_score.as_deref()),
            to_goals(self.away_score.as_deref()),
        ) {
            (Some(h), Some(a)) if status.has_score() => (Some(h), Some(a)),
            _ => (None, None),
        };

        let index_line = to_signed(self.hi_handicap_value.as_deref()).filter(|v| is_quarter_ball(*v));

        let mut record = MatchRecord {
            match_id,
            league: owned(&self.league),
            home_team: owned(&self.home_team),
            away_team: owned(&self.away_team),
            match_time: owned(&self.match_time),
            owner_date: owned(&self.owner_date),
            status,
            home_score,
            away_score,
            euro: Market {
                initial: EuroSnapshot {
                    home: to_price(self.euro_initial_win.as_deref()),
                    draw: to_price(self.euro_initial_draw.as_deref()),
                    away: to_price(self.euro_initial_lose.as_deref()),
                },
                current: EuroSnapshot {
                    home: to_price(self.euro_current_win.as_deref()),
                    draw: to_price(self.euro_current_draw.as_deref()),
                    away: to_price(self.euro_current_lose.as_deref()),
                },
            },
            asian: Market {
                initial: AsianSnapshot {
                    home: to_price(self.asian_initial_home_odds.as_deref()),
                    handicap: handicap_token(&self.asian_initial_handicap),
                    away: to_price(self.asian_initial_away_odds.as_deref()),
                },
                current: AsianSnapshot {
                    home: to_price(self.asian_current_home_odds.as_deref()),
                    handicap: handicap_token(&self.asian_current_handicap),
                    away: to_price(self.asian_current_away_odds.as_deref()),
                },
            },
            totals: Market {
                initial: TotalsSnapshot {
                    over: to_price(self.ou_initial_over_odds.as_deref()),
                    line: to_price(self.ou_initial_total.as_deref()),
                    under: to_price(self.ou_initial_under_odds.as_deref()),
                },
                current: TotalsSnapshot {
                    over: to_price(self.ou_current_over_odds.as_deref()),
                    line: to_price(self.ou_current_total.as_deref()),
                    under: to_price(self.ou_current_under_odds.as_deref()),
                },
            },
            index_line,
            index: Market {
                initial: IndexSnapshot {
                    home: to_price(self.hi_initial_home_odds.as_deref()),
                    draw: to_price(self.hi_initial_draw_odds.as_deref()),
                    away: to_price(self.hi_initial_away_odds.as_deref()),
                },
                current: IndexSnapshot {
                    home: to_price(self.hi_current_home_odds.as_deref()),
                    draw: to_price(self.hi_current_draw_odds.as_deref()),
                    away: to_price(self.hi_current_away_odds.as_deref()),
                },
            },
            movement_label: None,
        };
        refresh_label(&mut record, thresholds);
        Some(record)
    }
}

pub fn parse_dump(raw: &str) -> Result<Vec<RawMatch>> {
    serde_json::from_str(raw).context("parsing scraper dump")
}

/// Normalize a whole dump, skipping (and logging) records that cannot be used.
pub fn normalize(raw: Vec<RawMatch>, thresholds: MovementThresholds) -> Vec<MatchRecord> {
    let total = raw.len();
    let mut out = Vec::with_capacity(total);
    for item in raw {
        let id = item.match_id.clone().unwrap_or_default();
        let status = item.status.clone().unwrap_or_default();
        match item.into_record(thresholds) {
            Some(record) => out.push(record),
            None => warn!(match_id = %id, status = %status, "skipping unusable record"),
        }
    }
    debug!(total, kept = out.len(), "normalized dump");
    out
}

pub fn load_dump(path: &Path, thresholds: MovementThresholds) -> Result<Vec<MatchRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed = parse_dump(&raw).with_context(|| format!("in {}", path.display()))?;
    Ok(normalize(parsed, thresholds))
}
