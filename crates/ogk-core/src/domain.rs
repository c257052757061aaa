use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::Deserialize;

use crate::{errors::Error, Result};

/// One disclosure record as published by the portal.
///
/// Built once per fetch and never mutated afterwards. `url` is empty when the
/// portal did not expose a registration id for the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub produced_at: NaiveDateTime,
    pub agency_name: String,
    pub url: String,
}

impl Document {
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Formatter input unit: one agency and whatever it published in the range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgencyResult {
    pub agency_name: String,
    pub documents: Vec<Document>,
}

impl AgencyResult {
    pub fn new(agency_name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            agency_name: agency_name.into(),
            documents,
        }
    }
}

/// A monitored agency (portal institution code + display name).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Agency {
    pub code: String,
    pub name: String,
}

impl Agency {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Inclusive `start..=end` date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::Config(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Range covering the last publishing window before `today`.
    ///
    /// Monday looks back over Friday..=Sunday; every other day covers yesterday.
    pub fn previous_window(today: NaiveDate) -> Self {
        let yesterday = today - Duration::days(1);
        if today.weekday() == Weekday::Mon {
            return Self {
                start: today - Duration::days(3),
                end: yesterday,
            };
        }
        Self::single(yesterday)
    }

    /// `2025-12-27` or `2025-12-27 ~ 2025-12-28`.
    pub fn label(&self) -> String {
        if self.start == self.end {
            return self.start.format("%Y-%m-%d").to_string();
        }
        format!(
            "{} ~ {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| Error::Config(format!("invalid date `{raw}` (expected YYYY-MM-DD): {e}")))
}

/// Messenger destination: a numeric chat id or a public `@channel` username.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl FromStr for ChatTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Config("chat target is empty".to_string()));
        }
        if let Ok(id) = s.parse::<i64>() {
            return Ok(ChatTarget::Id(id));
        }
        if s.starts_with('@') && s.len() > 1 {
            return Ok(ChatTarget::Username(s.to_string()));
        }
        Err(Error::Config(format!(
            "chat target `{s}` must be a numeric id or an @username"
        )))
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{id}"),
            ChatTarget::Username(name) => f.write_str(name),
        }
    }
}

/// Message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);
