//! Day-count windows used by cross-validation (`"30 days"`, `"2 weeks"`, `"9d"`).

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Window {
    days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window '{0}' has no leading day count")]
    MissingCount(String),

    #[error("window '{0}' has unknown unit (expected days or weeks)")]
    UnknownUnit(String),

    #[error("window '{0}' must be at least one day")]
    NotPositive(String),
}

impl Window {
    pub fn days(days: i64) -> Self {
        Self { days }
    }

    pub fn weeks(weeks: i64) -> Self {
        Self { days: weeks * 7 }
    }

    pub fn num_days(&self) -> i64 {
        self.days
    }

    pub fn as_duration(&self) -> Duration {
        Duration::days(self.days)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days == 1 {
            write!(f, "1 day")
        } else {
            write!(f, "{} days", self.days)
        }
    }
}

impl FromStr for Window {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(split);
        let count: i64 = count
            .parse()
            .map_err(|_| WindowError::MissingCount(s.to_string()))?;

        let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "d" | "day" | "days" => 1,
            "w" | "week" | "weeks" => 7,
            _ => return Err(WindowError::UnknownUnit(s.to_string())),
        };

        let days = count * multiplier;
        if days < 1 {
            return Err(WindowError::NotPositive(s.to_string()));
        }
        Ok(Self { days })
    }
}

impl TryFrom<String> for Window {
    type Error = WindowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Window> for String {
    fn from(w: Window) -> Self {
        w.to_string()
    }
}
