use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Qualitative league tags consumed by the scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeagueTag {
    /// Draws are frequent overall.
    HighDraw,
    HighScoring,
    LowScoring,
    /// A home price drop tends to precede an away result.
    Trap,
    /// A home price drop is a reliable home signal.
    PriceDropSignal,
    /// Deep lines tend to favour the receiving side.
    DeepHandicap,
    /// Level lines end in draws often.
    LevelDraw,
    /// Level lines go to the away side often.
    LevelAway,
}

/// Human-maintained league -> tag sets. Immutable once loaded and passed into
/// scoring explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaguePriors {
    pub high_draw: HashSet<String>,
    pub high_scoring: HashSet<String>,
    pub low_scoring: HashSet<String>,
    pub trap: HashSet<String>,
    pub price_drop_signal: HashSet<String>,
    pub deep_handicap: HashSet<String>,
    pub level_draw: HashSet<String>,
    pub level_away: HashSet<String>,
}

impl LeaguePriors {
    /// Tag sets observed on the source's historical data.
    pub fn builtin() -> Self {
        Self {
            high_draw: set(&["意甲", "德乙", "西甲", "法乙"]),
            high_scoring: set(&["荷甲", "世外欧洲", "德甲", "挪超", "欧冠", "美职联"]),
            low_scoring: set(&["日职乙", "法乙", "意甲", "德乙", "瑞典超"]),
            trap: set(&[
                "瑞典超",
                "葡超",
                "世外欧洲",
                "挪超",
                "日职乙",
                "德甲",
                "日职",
                "美职联",
            ]),
            price_drop_signal: set(&[
                "欧罗巴",
                "法乙",
                "英冠",
                "葡超",
                "世外欧洲",
                "日职",
                "英超",
                "法甲",
            ]),
            deep_handicap: set(&["世外欧洲", "葡超", "荷甲"]),
            level_draw: set(&["葡超", "英超", "法乙", "K1联赛", "瑞典超"]),
            level_away: set(&["日职乙", "美职联", "荷乙"]),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Priors {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn tags(&self, tag: LeagueTag) -> &HashSet<String> {
        match tag {
            LeagueTag::HighDraw => &self.high_draw,
            LeagueTag::HighScoring => &self.high_scoring,
            LeagueTag::LowScoring => &self.low_scoring,
            LeagueTag::Trap => &self.trap,
            LeagueTag::PriceDropSignal => &self.price_drop_signal,
            LeagueTag::DeepHandicap => &self.deep_handicap,
            LeagueTag::LevelDraw => &self.level_draw,
            LeagueTag::LevelAway => &self.level_away,
        }
    }

    pub fn has(&self, league: &str, tag: LeagueTag) -> bool {
        self.tags(tag).contains(league.trim())
    }
}

fn set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tags_lookup() {
        let p = LeaguePriors::builtin();
        assert!(p.has("意甲", LeagueTag::HighDraw));
        assert!(p.has(" 葡超 ", LeagueTag::Trap));
        assert!(!p.has("英超", LeagueTag::Trap));
    }

    #[test]
    fn partial_json_leaves_other_sets_empty() {
        let p = LeaguePriors::from_json(r#"{"high_draw":["Serie A"]}"#).unwrap();
        assert!(p.has("Serie A", LeagueTag::HighDraw));
        assert!(p.trap.is_empty());
    }
}
