/// Arrow glyphs some sources print next to a price to show its direction.
const ARROWS: &[char] = &['↑', '↓', '↗', '↘', '→', '←', '▲', '▼'];

/// Placeholders the source uses for "no value yet".
const PLACEHOLDERS: &[&str] = &["-", "--", "—", "N/A", "null", "None"];

/// Convert a scraped price cell to a decimal price.
///
/// Never fails: blanks, placeholders, non-numeric text and non-positive values
/// all come back as `None`.
pub fn to_price(raw: Option<&str>) -> Option<f64> {
    let cleaned = clean_number(raw?)?;
    let value = cleaned.parse::<f64>().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Signed numeric cell (the three-way handicap value can be negative or zero).
pub fn to_signed(raw: Option<&str>) -> Option<f64> {
    let cleaned = clean_number(raw?)?;
    let value = cleaned.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Goals scored by one side. `"-"` and blanks mean "not played yet".
pub fn to_goals(raw: Option<&str>) -> Option<u32> {
    let cleaned = clean_number(raw?)?;
    cleaned.parse::<u32>().ok()
}

/// Hong-Kong style prices (profit per unit staked) to decimal prices.
pub fn hk_to_decimal(hk: f64) -> f64 {
    hk + 1.0
}

fn clean_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed) {
        return None;
    }
    let cleaned = trimmed
        .chars()
        .filter(|c| !ARROWS.contains(c) && !c.is_whitespace())
        .collect::<String>();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}
