/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use survey_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(6.5, 2), "6.50");
/// assert_eq!(format_number(-3.0, 1), "-3.0");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let units = round_to_units(value, decimals);
    let scale = 10_u128.pow(decimals);
    let magnitude = units.unsigned_abs();

    let sign = if units < 0 { "-" } else { "" };
    let whole = group_thousands(&(magnitude / scale).to_string());
    if decimals == 0 {
        format!("{sign}{whole}")
    } else {
        let frac = magnitude % scale;
        format!("{sign}{whole}.{frac:0width$}", width = decimals as usize)
    }
}

/// Format a record count with thousands separators.
///
/// ```
/// use survey_core::formatting::format_count;
///
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// assert_eq!(format_count(0), "0");
/// ```
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero.
///
/// ```
/// use survey_core::formatting::percentage;
///
/// assert!((percentage(3.0, 5.0, 1) - 60.0).abs() < 1e-9);
/// assert_eq!(percentage(1.0, 0.0, 1), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let units = round_to_units(part / whole * 100.0, decimal_places);
    units as f64 / 10_f64.powi(decimal_places as i32)
}

/// Share of `part` in `whole` as a display string with one decimal place.
///
/// ```
/// use survey_core::formatting::format_share;
///
/// assert_eq!(format_share(1, 3), "33.3%");
/// assert_eq!(format_share(0, 0), "0.0%");
/// ```
pub fn format_share(part: u64, whole: u64) -> String {
    format!("{}%", format_number(percentage(part as f64, whole as f64, 1), 1))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// `value * 10^decimals` rounded half away from zero.
fn round_to_units(value: f64, decimals: u32) -> i128 {
    let scaled = value * 10_f64.powi(decimals as i32);
    // Decimal midpoints such as 1.005 are stored just below the half.
    let lift = (scaled.abs() * f64::EPSILON).copysign(scaled);
    (scaled + lift).round() as i128
}

/// `"1234567"` becomes `"1,234,567"`. Expects ASCII digits.
fn group_thousands(digits: &str) -> String {
    digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
