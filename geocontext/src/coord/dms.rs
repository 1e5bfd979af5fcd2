//! Decimal and degree/minute/second coordinate parsing.

use std::sync::OnceLock;

use regex::Regex;

use super::{ParseError, QueryPoint, Srid};

/// Splits `27°49'23.2"E` and `27:49:23.2:E` into their components.
fn dms_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r#"[°'":]+"#).expect("static regex is valid"))
}

fn invalid_dms(input: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidDms {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn parse_component(input: &str, token: &str, name: &str) -> Result<f64, ParseError> {
    // The direction carries the sign, components are unsigned
    if token.starts_with('-') || token.starts_with('+') {
        return Err(invalid_dms(input, format!("{} must be unsigned", name)));
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid_dms(input, format!("{} '{}' is not a number", name, token)))
}

/// Parses a `degrees:minutes:seconds:direction` string.
///
/// Components may be separated by `°`, `'`, `"` or `:`. Exactly four
/// components are required and the direction must be one of N, E, S or W
/// (case-insensitive).
///
/// # Returns
///
/// `(degrees, minutes, seconds)` with degrees negated for S and W.
pub fn parse_dms(text: &str) -> Result<(f64, f64, f64), ParseError> {
    let parts: Vec<&str> = dms_separator()
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() != 4 {
        return Err(invalid_dms(
            text,
            format!("expected 4 components, found {}", parts.len()),
        ));
    }

    let degrees = parse_component(text, parts[0], "degrees")?;
    let minutes = parse_component(text, parts[1], "minutes")?;
    let seconds = parse_component(text, parts[2], "seconds")?;

    let sign = match parts[3].to_ascii_uppercase().as_str() {
        "N" | "E" => 1.0,
        "S" | "W" => -1.0,
        other => {
            return Err(invalid_dms(
                text,
                format!("direction '{}' must be one of N, E, S, W", other),
            ))
        }
    };

    Ok((sign * degrees, minutes, seconds))
}

/// Converts degrees, minutes and seconds to decimal degrees.
///
/// The sign of the result follows the sign of `degrees`; minutes and seconds
/// always move the value away from zero.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    let fraction = minutes.abs() / 60.0 + seconds.abs() / 3600.0;
    if degrees.is_sign_negative() {
        degrees - fraction
    } else {
        degrees + fraction
    }
}

fn parse_axis(axis: char, value: &str) -> Result<f64, ParseError> {
    let trimmed = value.trim();
    if let Some(decimal) = trimmed.parse::<f64>().ok().filter(|v| v.is_finite()) {
        return Ok(decimal);
    }

    parse_dms(trimmed)
        .map(|(d, m, s)| dms_to_decimal(d, m, s))
        .map_err(|_| ParseError::InvalidCoordinate {
            axis,
            value: value.to_string(),
        })
}

/// Parses a user supplied coordinate pair.
///
/// Each axis is tried as a plain decimal number first and falls back to DMS.
///
/// # Arguments
///
/// * `x` - Longitude / easting text
/// * `y` - Latitude / northing text
/// * `srid` - SRID text, must be a positive integer
pub fn parse_coordinate(x: &str, y: &str, srid: &str) -> Result<QueryPoint, ParseError> {
    let srid = srid
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|code| *code > 0)
        .map(Srid)
        .ok_or_else(|| ParseError::InvalidSrid(srid.to_string()))?;

    let x = parse_axis('x', x)?;
    let y = parse_axis('y', y)?;

    Ok(QueryPoint::new(x, y, srid))
}
