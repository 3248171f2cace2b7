//! Display formatting and parsing for playback positions

use anyhow::{ensure, Context, Result};

/// Format seconds as `MM:SS.d`.
///
/// Whole seconds are floored, the tenths digit is truncated rather than
/// rounded, and minutes are not wrapped into hours.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };
    let total_seconds = seconds.floor();
    let minutes = (total_seconds / 60.0).floor() as u64;
    let secs = total_seconds as u64 % 60;
    let tenths = (((seconds - total_seconds) * 10.0).floor() as u64).min(9);
    format!("{:02}:{:02}.{}", minutes, secs, tenths)
}

/// Parse a position given as plain seconds or `MM:SS(.d)` / `HH:MM:SS(.d)`
pub fn parse_time_to_seconds(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.contains(':') {
        return parse_clock_time(raw);
    }

    let seconds: f64 = raw
        .parse()
        .with_context(|| format!("Failed to parse seconds value '{}'", raw))?;
    ensure!(
        seconds.is_finite() && seconds >= 0.0,
        "Time values must be non-negative"
    );
    Ok(seconds)
}

fn parse_clock_time(raw: &str) -> Result<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    ensure!(
        (2..=3).contains(&parts.len()),
        "Time format must be MM:SS or HH:MM:SS"
    );

    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => ("0", *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => unreachable!("length checked above"),
    };

    let seconds = parse_component(seconds, "seconds")?;
    let minutes = parse_component(minutes, "minutes")?;
    let hours = parse_component(hours, "hours")?;
    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_component(value: &str, label: &str) -> Result<f64> {
    let parsed = value
        .parse::<f64>()
        .with_context(|| format!("Invalid {} component '{}'", label, value))?;
    ensure!(
        parsed.is_finite() && parsed >= 0.0,
        "{} must be a non-negative number",
        label
    );
    Ok(parsed)
}
