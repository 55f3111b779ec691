use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;

/// A parsed cron schedule used to trigger sweeps.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    /// The normalized cron expression string.
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    /// Create a new cron schedule from an expression.
    pub fn new(expression: &str) -> Result<Self, CronParseError> {
        // Normalize expression (add seconds if missing)
        let normalized = normalize_cron_expression(expression);

        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| CronParseError::InvalidExpression(e.to_string()))?;

        Ok(Self {
            expression: normalized,
            schedule,
        })
    }

    /// Get the cron expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Get the next scheduled time after the given time, evaluated in UTC.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Get the next scheduled time after the given time, with the
    /// expression evaluated in `tz` wall-clock time.
    pub fn next_after_in_tz(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local_time = after.with_timezone(&tz);

        self.schedule
            .after(&local_time)
            .next()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Normalize a cron expression to include seconds.
fn normalize_cron_expression(expr: &str) -> String {
    let parts: Vec<&str> = expr.split_whitespace().collect();

    match parts.len() {
        5 => format!("0 {}", expr.trim()), // Add "0" for seconds
        _ => expr.trim().to_string(),      // Let the parser handle the rest
    }
}

/// Cron parsing error.
#[derive(Debug, Clone)]
pub enum CronParseError {
    /// Invalid cron expression.
    InvalidExpression(String),
}

impl std::fmt::Display for CronParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExpression(e) => write!(f, "Invalid cron expression: {}", e),
        }
    }
}

impl std::error::Error for CronParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_five_part_cron() {
        let schedule = CronSchedule::new("0 6 * * *").unwrap();
        assert_eq!(schedule.expression(), "0 0 6 * * *");
    }

    #[test]
    fn test_parse_six_part_cron() {
        let schedule = CronSchedule::new("30 0 6 * * *").unwrap();
        assert_eq!(schedule.expression(), "30 0 6 * * *");
    }

    #[test]
    fn test_next_after() {
        let schedule = CronSchedule::new("0 6 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        let next = schedule.next_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 2, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_next_after_in_tz() {
        let schedule = CronSchedule::new("0 6 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let next = schedule
            .next_after_in_tz(now, chrono_tz::Europe::Paris)
            .unwrap();
        // 06:00 in Paris is 05:00 UTC in winter
        assert_eq!(next.hour(), 5);
    }

    #[test]
    fn test_invalid_cron() {
        let result = CronSchedule::new("invalid");
        assert!(result.is_err());
    }
}
