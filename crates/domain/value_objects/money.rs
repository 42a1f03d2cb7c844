/// Converts a major-unit amount (e.g. dollars) into minor units (cents), rounding half away from zero.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_minor_units(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

/// Renders `4900, "usd"` as `49.00 USD`.
pub fn format_amount(amount_minor: i64, currency: &str) -> String {
    format!(
        "{:.2} {}",
        from_minor_units(amount_minor),
        currency.to_ascii_uppercase()
    )
}
