//! Parsing of durations written the way Go's `time.ParseDuration` accepts them.
//!
//! A duration is a sequence of decimal numbers, each with an optional fraction and a required
//! unit suffix, such as `300ms`, `1.5h` or `2h45m`.  Valid units are `ns`, `us` (or `µs`), `ms`,
//! `s`, `m` and `h`.  A bare `0` is also accepted.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseDurationError {
	#[error("empty duration")]
	Empty,
	#[error("negative durations are not supported: `{0}`")]
	Negative(String),
	#[error("invalid duration `{0}`")]
	Invalid(String),
	#[error("missing unit in duration `{0}` (expected one of ns, us, ms, s, m, h)")]
	MissingUnit(String),
	#[error("unknown unit `{unit}` in duration `{input}`")]
	UnknownUnit { unit: String, input: String },
	#[error("duration `{0}` is too large")]
	Overflow(String),
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
	match unit {
		"ns" => Some(1),
		"us" | "µs" | "μs" => Some(1_000),
		"ms" => Some(1_000_000),
		"s" => Some(NANOS_PER_SEC),
		"m" => Some(60 * NANOS_PER_SEC),
		"h" => Some(60 * 60 * NANOS_PER_SEC),
		_ => None,
	}
}

/// Parses a duration such as `500ms` or `1m30s`.
pub fn parse(input: &str) -> Result<Duration, ParseDurationError> {
	let s = input.trim();
	let s = s.strip_prefix('+').unwrap_or(s);
	if s.is_empty() {
		return Err(ParseDurationError::Empty);
	}
	if s.starts_with('-') {
		return Err(ParseDurationError::Negative(input.to_owned()));
	}
	if s == "0" {
		return Ok(Duration::ZERO);
	}

	let invalid = || ParseDurationError::Invalid(input.to_owned());
	let overflow = || ParseDurationError::Overflow(input.to_owned());

	let mut total: u128 = 0;
	let mut rest = s;
	while !rest.is_empty() {
		let number_len = rest
			.find(|c: char| !(c.is_ascii_digit() || c == '.'))
			.unwrap_or(rest.len());
		let (number, tail) = rest.split_at(number_len);
		let unit_len = tail
			.find(|c: char| c.is_ascii_digit() || c == '.')
			.unwrap_or(tail.len());
		let (unit, tail) = tail.split_at(unit_len);

		let (whole, frac) = match number.split_once('.') {
			Some((whole, frac)) => (whole, frac),
			None => (number, ""),
		};
		if whole.is_empty() && frac.is_empty() {
			return Err(invalid());
		}
		if unit.is_empty() {
			return Err(ParseDurationError::MissingUnit(input.to_owned()));
		}
		let scale = unit_nanos(unit).ok_or_else(|| ParseDurationError::UnknownUnit {
			unit: unit.to_owned(),
			input: input.to_owned(),
		})?;

		let whole: u128 = if whole.is_empty() {
			0
		} else {
			whole.parse().map_err(|_| invalid())?
		};
		let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

		// digits past nanosecond precision can't change the result
		let frac = &frac[..frac.len().min(18)];
		if !frac.is_empty() {
			let digits: u128 = frac.parse().map_err(|_| invalid())?;
			let divisor = 10u128.pow(frac.len() as u32);
			nanos += digits * scale / divisor;
		}

		total = total.checked_add(nanos).ok_or_else(overflow)?;
		rest = tail;
	}

	let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
	Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}
