//! Countdown normalization.
//!
//! The timer crop recognizes as up to two whitespace-separated integers. A
//! white countdown reads hours/minutes, a red one minutes/seconds. OCR
//! occasionally drops the leading component, leaving only the trailing value;
//! a zero in the last slot therefore means the pair arrived reversed.

use crate::error::PipelineError;
use crate::preprocess::TimerColor;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// Parses recognized countdown text into a duration in milliseconds.
pub fn parse_duration(text: &str, color: TimerColor) -> Result<i64, PipelineError> {
    let mut values: Vec<i64> = text
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .take(2)
        .collect();

    if values.is_empty() {
        return Err(PipelineError::DurationParse(text.trim().to_string()));
    }

    // Right-pad to two components, then compensate for a dropped leading
    // value: a trailing zero means the single real value is the minor unit.
    while values.len() < 2 {
        values.push(0);
    }
    if values[1] == 0 {
        values.reverse();
    }

    let ms = match color {
        TimerColor::Other => values[0] * MS_PER_HOUR + values[1] * MS_PER_MINUTE,
        TimerColor::Red => values[0] * MS_PER_MINUTE + values[1] * MS_PER_SECOND,
    };

    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_and_minutes() {
        assert_eq!(
            parse_duration("4 30", TimerColor::Other).unwrap(),
            4 * MS_PER_HOUR + 30 * MS_PER_MINUTE
        );
        assert_eq!(
            parse_duration("1 1", TimerColor::Other).unwrap(),
            MS_PER_HOUR + MS_PER_MINUTE
        );
    }

    #[test]
    fn test_red_is_minutes_and_seconds() {
        assert_eq!(
            parse_duration("12 45", TimerColor::Red).unwrap(),
            12 * MS_PER_MINUTE + 45 * MS_PER_SECOND
        );
    }

    #[test]
    fn test_single_value_becomes_minor_unit() {
        // "37" with a dropped leading value: pad to [37, 0], trailing zero,
        // reverse to [0, 37] -> 37 minutes on a white timer.
        assert_eq!(
            parse_duration("37", TimerColor::Other).unwrap(),
            37 * MS_PER_MINUTE
        );
        assert_eq!(
            parse_duration("37", TimerColor::Red).unwrap(),
            37 * MS_PER_SECOND
        );
    }

    #[test]
    fn test_trailing_zero_reverses_pair() {
        assert_eq!(
            parse_duration("5 0", TimerColor::Other).unwrap(),
            5 * MS_PER_MINUTE
        );
    }

    #[test]
    fn test_garbage_tokens_are_skipped() {
        assert_eq!(
            parse_duration("x 2 30", TimerColor::Other).unwrap(),
            2 * MS_PER_HOUR + 30 * MS_PER_MINUTE
        );
    }

    #[test]
    fn test_no_numbers_is_an_error() {
        assert!(matches!(
            parse_duration("   ", TimerColor::Other),
            Err(PipelineError::DurationParse(_))
        ));
        assert!(matches!(
            parse_duration("ab cd", TimerColor::Red),
            Err(PipelineError::DurationParse(_))
        ));
    }
}
