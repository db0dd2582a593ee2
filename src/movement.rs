use std::fmt;

use serde::{Deserialize, Serialize};

use crate::handicap::parse_handicap;
use crate::model::{AsianSnapshot, EuroSnapshot, Market, MatchRecord};

pub const DEFAULT_LINE_THRESHOLD: f64 = 0.01;
pub const DEFAULT_PRICE_THRESHOLD: f64 = 0.02;

// 1X2 trend constants.
const EURO_MOVE_THRESHOLD: f64 = 0.05;
const EURO_TENDENCY_DROP: f64 = 0.10;

/// How the Asian line and the home price moved between opening and now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovementLabel {
    LineUpPriceDown,
    LineUpPriceUp,
    LineUp,
    LineDownPriceDown,
    LineDownPriceUp,
    LineDown,
    PriceDown,
    PriceUp,
    Unchanged,
}

impl MovementLabel {
    pub const ALL: [MovementLabel; 9] = [
        Self::LineUpPriceDown,
        Self::LineUpPriceUp,
        Self::LineUp,
        Self::LineDownPriceDown,
        Self::LineDownPriceUp,
        Self::LineDown,
        Self::PriceDown,
        Self::PriceUp,
        Self::Unchanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LineUpPriceDown => "line-up-price-down",
            Self::LineUpPriceUp => "line-up-price-up",
            Self::LineUp => "line-up",
            Self::LineDownPriceDown => "line-down-price-down",
            Self::LineDownPriceUp => "line-down-price-up",
            Self::LineDown => "line-down",
            Self::PriceDown => "price-down",
            Self::PriceUp => "price-up",
            Self::Unchanged => "unchanged",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == raw)
    }

    /// Reading of the movement for reports.
    pub fn tendency(self) -> Option<&'static str> {
        match self {
            Self::LineUpPriceDown => Some("market backs the home side"),
            Self::LineDownPriceDown => Some("market backs the away side"),
            Self::LineUpPriceUp | Self::LineDownPriceUp => Some("possible trap"),
            _ => None,
        }
    }
}

impl fmt::Display for MovementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementThresholds {
    /// Handicap changes smaller than this are "no line change".
    pub line: f64,
    /// Home price changes smaller than this are "no price change".
    pub price: f64,
}

impl Default for MovementThresholds {
    fn default() -> Self {
        Self {
            line: DEFAULT_LINE_THRESHOLD,
            price: DEFAULT_PRICE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Flat,
}

fn direction(delta: f64, threshold: f64) -> Direction {
    if delta > threshold {
        Direction::Up
    } else if delta < -threshold {
        Direction::Down
    } else {
        Direction::Flat
    }
}

/// Classify from already computed deltas. Line change is evaluated first.
pub fn classify_deltas(
    handicap_delta: f64,
    price_delta: f64,
    thresholds: MovementThresholds,
) -> MovementLabel {
    let line = direction(handicap_delta, thresholds.line);
    let price = direction(price_delta, thresholds.price);
    match (line, price) {
        (Direction::Up, Direction::Down) => MovementLabel::LineUpPriceDown,
        (Direction::Up, Direction::Up) => MovementLabel::LineUpPriceUp,
        (Direction::Up, Direction::Flat) => MovementLabel::LineUp,
        (Direction::Down, Direction::Down) => MovementLabel::LineDownPriceDown,
        (Direction::Down, Direction::Up) => MovementLabel::LineDownPriceUp,
        (Direction::Down, Direction::Flat) => MovementLabel::LineDown,
        (Direction::Flat, Direction::Down) => MovementLabel::PriceDown,
        (Direction::Flat, Direction::Up) => MovementLabel::PriceUp,
        (Direction::Flat, Direction::Flat) => MovementLabel::Unchanged,
    }
}

/// Classify from the four raw inputs. Any missing or unparseable input yields
/// `None`; a label is never guessed from partial data.
pub fn classify(
    initial_handicap: Option<&str>,
    current_handicap: Option<&str>,
    initial_home_price: Option<f64>,
    current_home_price: Option<f64>,
    thresholds: MovementThresholds,
) -> Option<MovementLabel> {
    let h_init = parse_handicap(initial_handicap?)?;
    let h_curr = parse_handicap(current_handicap?)?;
    let p_init = initial_home_price?;
    let p_curr = current_home_price?;
    Some(classify_deltas(h_curr - h_init, p_curr - p_init, thresholds))
}

pub fn classify_market(
    market: &Market<AsianSnapshot>,
    thresholds: MovementThresholds,
) -> Option<MovementLabel> {
    classify(
        market.initial.handicap.as_deref(),
        market.current.handicap.as_deref(),
        market.initial.home,
        market.current.home,
        thresholds,
    )
}

/// Recompute the label from the record's own odds and store it on the record.
pub fn refresh_label(record: &mut MatchRecord, thresholds: MovementThresholds) {
    record.movement_label = classify_market(&record.asian, thresholds);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EuroTendency {
    Home,
    Away,
    Draw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EuroMovement {
    pub home_change: f64,
    pub draw_change: f64,
    pub away_change: f64,
    pub home: Trend,
    pub draw: Trend,
    pub away: Trend,
    pub tendency: Option<EuroTendency>,
}

/// 1X2 price trend between opening and current prices. Needs all six prices.
pub fn euro_movement(market: &Market<EuroSnapshot>) -> Option<EuroMovement> {
    let home_change = market.current.home? - market.initial.home?;
    let draw_change = market.current.draw? - market.initial.draw?;
    let away_change = market.current.away? - market.initial.away?;

    let trend = |delta: f64| match direction(delta, EURO_MOVE_THRESHOLD) {
        Direction::Up => Trend::Up,
        Direction::Down => Trend::Down,
        Direction::Flat => Trend::Flat,
    };

    let tendency = if home_change < -EURO_TENDENCY_DROP {
        Some(EuroTendency::Home)
    } else if away_change < -EURO_TENDENCY_DROP {
        Some(EuroTendency::Away)
    } else if draw_change < -EURO_TENDENCY_DROP {
        Some(EuroTendency::Draw)
    } else {
        None
    };

    Some(EuroMovement {
        home_change,
        draw_change,
        away_change,
        home: trend(home_change),
        draw: trend(draw_change),
        away: trend(away_change),
        tendency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> MovementThresholds {
        MovementThresholds::default()
    }

    #[test]
    fn level_to_half_with_price_drop_is_line_up_price_down() {
        let label = classify(Some("平手"), Some("半球"), Some(1.95), Some(1.80), t());
        assert_eq!(label, Some(MovementLabel::LineUpPriceDown));
    }

    #[test]
    fn full_table() {
        let cases = [
            (0.5, -0.1, MovementLabel::LineUpPriceDown),
            (0.5, 0.1, MovementLabel::LineUpPriceUp),
            (0.5, 0.0, MovementLabel::LineUp),
            (-0.25, -0.1, MovementLabel::LineDownPriceDown),
            (-0.25, 0.1, MovementLabel::LineDownPriceUp),
            (-0.25, 0.01, MovementLabel::LineDown),
            (0.0, -0.05, MovementLabel::PriceDown),
            (0.0, 0.05, MovementLabel::PriceUp),
            (0.0, 0.0, MovementLabel::Unchanged),
        ];
        for (hd, pd, want) in cases {
            assert_eq!(classify_deltas(hd, pd, t()), want, "hd={hd} pd={pd}");
        }
    }

    #[test]
    fn receiving_side_moving_toward_level_is_line_up() {
        // Home receiving half a ball, then level: home is asked to give more.
        let label = classify(Some("受半球"), Some("平手"), Some(0.90), Some(0.90), t());
        assert_eq!(label, Some(MovementLabel::LineUp));
    }

    #[test]
    fn labels_round_trip_through_strings() {
        for label in MovementLabel::ALL {
            assert_eq!(MovementLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(MovementLabel::parse("sideways"), None);
    }

    #[test]
    fn unparseable_handicap_gives_none() {
        assert_eq!(
            classify(Some("?"), Some("半球"), Some(1.0), Some(1.0), t()),
            None
        );
    }

    #[test]
    fn euro_tendency_prefers_home_drop() {
        let market = Market {
            initial: EuroSnapshot {
                home: Some(2.10),
                draw: Some(3.20),
                away: Some(3.40),
            },
            current: EuroSnapshot {
                home: Some(1.90),
                draw: Some(3.30),
                away: Some(3.80),
            },
        };
        let mv = euro_movement(&market).expect("all prices present");
        assert_eq!(mv.home, Trend::Down);
        assert_eq!(mv.draw, Trend::Up);
        assert_eq!(mv.away, Trend::Up);
        assert_eq!(mv.tendency, Some(EuroTendency::Home));
    }

    #[test]
    fn euro_movement_needs_all_prices() {
        let mut market = Market::<EuroSnapshot>::default();
        market.initial.home = Some(2.0);
        market.current.home = Some(1.8);
        assert!(euro_movement(&market).is_none());
    }
}
