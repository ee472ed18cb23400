//! Lap time strings
//!
//! The API reports lap and qualifying times as `"m:ss.mmm"` (e.g.
//! `"1:23.456"`); bare seconds (`"83.456"`) show up in older data.

/// Parse a lap time into milliseconds.
///
/// Accepts `"m:ss.mmm"`, `"m:ss"` and bare seconds. A fractional part is
/// read as a decimal fraction, so `"1:23.4"` is 83 400 ms. Empty strings
/// and the `\N` null marker return `None`, as do values too large for
/// a `u64` millisecond count.
pub fn parse_lap_time(input: &str) -> Option<u64> {
    let input = input.trim();
    if input.is_empty() || input == r"\N" {
        return None;
    }

    let (minutes, seconds) = match input.split_once(':') {
        Some((minutes, seconds)) => (minutes.trim().parse::<u64>().ok()?, seconds),
        None => (0, input),
    };

    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (seconds, ""),
    };
    let whole: u64 = whole.trim().parse().ok()?;
    if input.contains(':') && whole >= 60 {
        return None;
    }

    minutes
        .checked_mul(60_000)?
        .checked_add(whole.checked_mul(1000)?)?
        .checked_add(fraction_millis(fraction)?)
}

/// Format milliseconds as `"m:ss.mmm"`.
pub fn format_lap_time(millis: u64) -> String {
    let minutes = millis / 60_000;
    let seconds = (millis / 1000) % 60;
    let millis = millis % 1000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

fn fraction_millis(fraction: &str) -> Option<u64> {
    if fraction.is_empty() {
        return Some(0);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: String = fraction.chars().chain("000".chars()).take(3).collect();
    digits.parse().ok()
}
