//! Time-bucket interval helpers for the GROUP BY `time(<interval>)` column.

use chrono::Duration;

const MAX_BUCKET_SECS: i64 = 31 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("interval is empty")]
    Empty,
    #[error("interval amount must be a positive integer")]
    InvalidAmount,
    #[error("interval supports only s|m|h|d suffixes")]
    InvalidUnit,
    #[error("interval must be between 1s and 31d")]
    OutOfRange,
}

/// Parses bucket intervals such as `10s`, `5m` or `1h`.
pub fn parse_interval(raw: &str) -> Result<Duration, IntervalError> {
    let raw = raw.trim().to_lowercase();
    if raw.is_empty() {
        return Err(IntervalError::Empty);
    }

    let split = raw
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let amount = digits
        .parse::<i64>()
        .map_err(|_| IntervalError::InvalidAmount)?;
    if amount <= 0 {
        return Err(IntervalError::InvalidAmount);
    }

    let multiplier = match unit.trim() {
        "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        _ => return Err(IntervalError::InvalidUnit),
    };

    let seconds = amount.saturating_mul(multiplier);
    if seconds > MAX_BUCKET_SECS {
        return Err(IntervalError::OutOfRange);
    }
    Ok(Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_intervals() {
        for interval in crate::catalog::TIME_INTERVALS {
            assert!(
                parse_interval(interval).is_ok(),
                "catalog interval {interval} should parse"
            );
        }
        assert_eq!(parse_interval("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_interval(" 1H ").unwrap(), Duration::hours(1));
    }

    #[test]
    fn rejects_malformed_intervals() {
        assert_eq!(parse_interval(""), Err(IntervalError::Empty));
        assert_eq!(parse_interval("h"), Err(IntervalError::InvalidAmount));
        assert_eq!(parse_interval("0s"), Err(IntervalError::InvalidAmount));
        assert_eq!(parse_interval("5w"), Err(IntervalError::InvalidUnit));
        assert_eq!(parse_interval("40d"), Err(IntervalError::OutOfRange));
    }
}
