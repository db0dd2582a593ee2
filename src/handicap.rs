use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Marks the listed home side as *receiving* the handicap rather than giving it.
pub const RECEIVING_MARKER: char = '受';

/// Textual Asian-handicap phrases (without the receiving marker) and the
/// number of goals the nominal home side gives.
const VOCABULARY: &[(&str, f64)] = &[
    ("平手", 0.0),
    ("平/半", 0.25),
    ("平手/半球", 0.25),
    ("半球", 0.5),
    ("半/一", 0.75),
    ("半球/一球", 0.75),
    ("一球", 1.0),
    ("一/球半", 1.25),
    ("一球/球半", 1.25),
    ("球半", 1.5),
    ("球半/两", 1.75),
    ("球半/两球", 1.75),
    ("两球", 2.0),
    ("两/两球半", 2.25),
    ("两球/两球半", 2.25),
    ("两球半", 2.5),
    ("两球半/三", 2.75),
    ("两球半/三球", 2.75),
    ("三球", 3.0),
    ("三/三球半", 3.25),
    ("三球/三球半", 3.25),
    ("三球半", 3.5),
    ("三球半/四", 3.75),
    ("三球半/四球", 3.75),
    ("四球", 4.0),
];

static PHRASES: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| VOCABULARY.iter().copied().collect());

/// Every phrase the parser knows, in ascending order of value.
pub fn vocabulary() -> &'static [(&'static str, f64)] {
    VOCABULARY
}

/// Parse a textual Asian-handicap token into the number of goals the nominal
/// home side gives. A receiving marker anywhere in the token negates the value.
///
/// Returns `None` when the token is blank, has no recognizable value, or the
/// value is not on quarter-ball granularity. Callers must treat `None` as
/// unusable, never as a level line.
pub fn parse_handicap(token: &str) -> Option<f64> {
    let receiving = token.contains(RECEIVING_MARKER);
    let clean = normalize_token(token);
    if clean.is_empty() {
        return None;
    }

    let value = match PHRASES.get(clean.as_str()) {
        Some(v) => *v,
        None => first_number(&clean)?,
    };
    if !is_quarter_ball(value) {
        return None;
    }

    Some(signed(value, receiving))
}

/// Canonical internal line: relative to the home side, negative when home is
/// favored. This is the only place the textual "home gives" convention is
/// flipped.
pub fn home_relative_line(token: &str) -> Option<f64> {
    parse_handicap(token).map(|gives| signed(gives, true))
}

pub fn is_quarter_ball(value: f64) -> bool {
    if !value.is_finite() {
        return false;
    }
    let units = value * 4.0;
    (units - units.round()).abs() < 1e-9
}

/// Line expressed in quarter-ball units (0.25 -> 1). Used as a hashable bucket key.
pub fn quarter_units(value: f64) -> Option<i32> {
    if !is_quarter_ball(value) {
        return None;
    }
    Some((value * 4.0).round() as i32)
}

pub fn from_quarter_units(units: i32) -> f64 {
    units as f64 / 4.0
}

fn signed(value: f64, negate: bool) -> f64 {
    if value == 0.0 {
        0.0
    } else if negate {
        -value
    } else {
        value
    }
}

fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| *c != RECEIVING_MARKER && !c.is_whitespace())
        .map(|c| match c {
            '／' => '/',
            '．' => '.',
            other => other,
        })
        .collect()
}

// First run of ASCII digits, optionally followed by a fractional part.
fn first_number(raw: &str) -> Option<f64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let rest = &raw[start..];
    let mut end = 0usize;
    let mut seen_dot = false;
    for (idx, c) in rest.char_indices() {
        if c.is_ascii_digit() {
            end = idx + 1;
        } else if c == '.' && !seen_dot {
            seen_dot = true;
        } else {
            break;
        }
    }
    rest[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_phrases() {
        assert_eq!(parse_handicap("球半"), Some(1.5));
        assert_eq!(parse_handicap("平手"), Some(0.0));
        assert_eq!(parse_handicap("球半/两球"), Some(1.75));
        assert_eq!(parse_handicap("三球半"), Some(3.5));
    }

    #[test]
    fn receiving_marker_negates() {
        assert_eq!(parse_handicap("受一球"), Some(-1.0));
        assert_eq!(parse_handicap("受平/半"), Some(-0.25));
        assert_eq!(parse_handicap("受平手"), Some(0.0));
    }

    #[test]
    fn whitespace_and_fullwidth_slash_are_ignored() {
        assert_eq!(parse_handicap(" 半球 / 一球 "), Some(0.75));
        assert_eq!(parse_handicap("半球／一球"), Some(0.75));
    }

    #[test]
    fn numeric_fallback_takes_first_number() {
        assert_eq!(parse_handicap("0.5/1"), Some(0.5));
        assert_eq!(parse_handicap("受1.25"), Some(-1.25));
        assert_eq!(parse_handicap("2"), Some(2.0));
    }

    #[test]
    fn unusable_tokens_are_none() {
        assert_eq!(parse_handicap(""), None);
        assert_eq!(parse_handicap("受"), None);
        assert_eq!(parse_handicap("未开盘"), None);
        assert_eq!(parse_handicap("0.3"), None);
    }

    #[test]
    fn home_relative_flips_sign() {
        assert_eq!(home_relative_line("半球"), Some(-0.5));
        assert_eq!(home_relative_line("受球半"), Some(1.5));
        assert_eq!(home_relative_line("平手"), Some(0.0));
    }

    #[test]
    fn quarter_units_round_trip() {
        assert_eq!(quarter_units(2.75), Some(11));
        assert_eq!(quarter_units(-0.5), Some(-2));
        assert_eq!(quarter_units(0.1), None);
        assert_eq!(from_quarter_units(-3), -0.75);
    }
}
