//! Replay log parser: one recorded reading per line
//!
//! Line format (any field order, whitespace or comma separated):
//!   t=<ms> energy=<float> [distance=<float>]
//! `#` starts a comment. `energy=-` / `energy=nan` records a tick without a
//! reading. Aliases: time/now_ms for t, e for energy, d for distance.

use lazy_static::lazy_static;
use regex::Regex;
use crate::error::ParseError;
use crate::types::Tick;

lazy_static! {
    static ref RE_FIELD: Regex = Regex::new(
        r"^(?P<key>[A-Za-z_]+)=(?P<value>\S+)$"
    ).unwrap();

    static ref RE_SEPARATOR: Regex = Regex::new(r"[\s,]+").unwrap();
}

/// Replay parser
#[derive(Debug, Default)]
pub struct TickParser;

impl TickParser {
    /// Create new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse one line; `Ok(None)` for blank and comment lines
    pub fn parse_line(&self, line_no: usize, line: &str) -> Result<Option<Tick>, ParseError> {
        let content = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let mut now_ms: Option<u64> = None;
        let mut energy: Option<f64> = None;
        let mut distance: Option<f64> = None;

        for token in RE_SEPARATOR.split(content).filter(|t| !t.is_empty()) {
            let caps = RE_FIELD.captures(token).ok_or_else(|| ParseError::BadToken {
                line: line_no,
                token: token.to_string(),
            })?;
            let key = caps["key"].to_ascii_lowercase();
            let value = &caps["value"];

            match key.as_str() {
                "t" | "time" | "now_ms" => {
                    let ms = value.parse::<u64>().map_err(|_| bad_value(line_no, &key, value))?;
                    now_ms = Some(ms);
                }
                "energy" | "e" => energy = parse_reading(value).map_err(|_| bad_value(line_no, &key, value))?,
                "distance" | "d" => distance = parse_reading(value).map_err(|_| bad_value(line_no, &key, value))?,
                _ => {
                    return Err(ParseError::UnknownField { line: line_no, key });
                }
            }
        }

        let now_ms = now_ms.ok_or(ParseError::MissingTime { line: line_no })?;
        Ok(Some(Tick { energy, distance, now_ms }))
    }

    /// Parse a whole log; line numbers start at 1
    pub fn parse_all(&self, input: &str) -> Result<Vec<Tick>, ParseError> {
        let mut ticks = Vec::new();
        for (idx, line) in input.lines().enumerate() {
            if let Some(tick) = self.parse_line(idx + 1, line)? {
                ticks.push(tick);
            }
        }
        Ok(ticks)
    }
}

/// A reading or an explicit "no reading" marker
fn parse_reading(value: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    match value.to_ascii_lowercase().as_str() {
        "-" | "nan" | "none" | "unknown" => Ok(None),
        other => other.parse::<f64>().map(Some),
    }
}

fn bad_value(line: usize, key: &str, value: &str) -> ParseError {
    ParseError::BadValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
