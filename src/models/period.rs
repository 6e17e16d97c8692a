// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregation windows: period kinds, period keys and their time bounds.
//!
//! Weekly keys use the ISO-8601 week-based year, so the last days of
//! December can belong to week 1 of the following year (and the first days
//! of January to week 52/53 of the previous one). All resolution is done
//! in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::AppError;

/// Granularity of an aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PeriodKind {
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodKind {
    /// Every kind, in the order the scheduler recomputes them.
    pub const ALL: [PeriodKind; 3] = [PeriodKind::Weekly, PeriodKind::Monthly, PeriodKind::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Weekly => "WEEKLY",
            PeriodKind::Monthly => "MONTHLY",
            PeriodKind::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WEEKLY" => Ok(PeriodKind::Weekly),
            "MONTHLY" => Ok(PeriodKind::Monthly),
            "YEARLY" => Ok(PeriodKind::Yearly),
            _ => Err(AppError::InvalidPeriod(format!(
                "unknown period kind '{}'",
                s
            ))),
        }
    }
}

/// Identifies one aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKey {
    /// ISO week-based year and ISO week number (1..=53).
    Weekly { year: i32, week: u32 },
    /// Calendar year and month (1..=12).
    Monthly { year: i32, month: u32 },
    Yearly { year: i32 },
}

/// Derive the `(iso_year, iso_week)` an instant falls into.
pub fn resolve_weekly(instant: DateTime<Utc>) -> (i32, u32) {
    let iso = instant.iso_week();
    (iso.year(), iso.week())
}

/// Derive the calendar `(year, month)` an instant falls into.
pub fn resolve_monthly(instant: DateTime<Utc>) -> (i32, u32) {
    (instant.year(), instant.month())
}

/// Derive the calendar year an instant falls into.
pub fn resolve_yearly(instant: DateTime<Utc>) -> i32 {
    instant.year()
}

impl PeriodKey {
    /// Key of the `kind` window containing `instant`.
    pub fn resolve(kind: PeriodKind, instant: DateTime<Utc>) -> Self {
        match kind {
            PeriodKind::Weekly => {
                let (year, week) = resolve_weekly(instant);
                PeriodKey::Weekly { year, week }
            }
            PeriodKind::Monthly => {
                let (year, month) = resolve_monthly(instant);
                PeriodKey::Monthly { year, month }
            }
            PeriodKind::Yearly => PeriodKey::Yearly {
                year: resolve_yearly(instant),
            },
        }
    }

    /// Build a key from loose parts (as received from a query string),
    /// rejecting missing or out-of-range components.
    pub fn from_parts(
        kind: PeriodKind,
        year: i32,
        month: Option<u32>,
        week: Option<u32>,
    ) -> Result<Self, AppError> {
        let key = match kind {
            PeriodKind::Weekly => PeriodKey::Weekly {
                year,
                week: week.ok_or_else(|| {
                    AppError::InvalidPeriod("weekly period requires a week".to_string())
                })?,
            },
            PeriodKind::Monthly => PeriodKey::Monthly {
                year,
                month: month.ok_or_else(|| {
                    AppError::InvalidPeriod("monthly period requires a month".to_string())
                })?,
            },
            PeriodKind::Yearly => PeriodKey::Yearly { year },
        };
        key.validate()?;
        Ok(key)
    }

    pub fn kind(&self) -> PeriodKind {
        match self {
            PeriodKey::Weekly { .. } => PeriodKind::Weekly,
            PeriodKey::Monthly { .. } => PeriodKind::Monthly,
            PeriodKey::Yearly { .. } => PeriodKind::Yearly,
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            PeriodKey::Weekly { year, .. }
            | PeriodKey::Monthly { year, .. }
            | PeriodKey::Yearly { year } => year,
        }
    }

    pub fn week(&self) -> Option<u32> {
        match *self {
            PeriodKey::Weekly { week, .. } => Some(week),
            _ => None,
        }
    }

    pub fn month(&self) -> Option<u32> {
        match *self {
            PeriodKey::Monthly { month, .. } => Some(month),
            _ => None,
        }
    }

    /// Check that the key names a window that actually exists.
    pub fn validate(&self) -> Result<(), AppError> {
        self.start_date().map(|_| ())
    }

    /// Half-open UTC bounds `[start, end)` of the window.
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let start = self.start_date()?;
        let end = match *self {
            PeriodKey::Weekly { .. } => start + Duration::days(7),
            PeriodKey::Monthly { year, month } => {
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                NaiveDate::from_ymd_opt(next_year, next_month, 1)
                    .ok_or_else(|| self.out_of_range())?
            }
            PeriodKey::Yearly { year } => {
                NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(|| self.out_of_range())?
            }
        };
        Ok((midnight_utc(start), midnight_utc(end)))
    }

    /// Whether `instant` falls inside this window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        PeriodKey::resolve(self.kind(), instant) == *self
    }

    /// Stable label used in document ids and API responses.
    pub fn label(&self) -> String {
        match *self {
            PeriodKey::Weekly { year, week } => format!("{:04}-W{:02}", year, week),
            PeriodKey::Monthly { year, month } => format!("{:04}-{:02}", year, month),
            PeriodKey::Yearly { year } => format!("{:04}", year),
        }
    }

    fn start_date(&self) -> Result<NaiveDate, AppError> {
        let date = match *self {
            PeriodKey::Weekly { year, week } => {
                NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            }
            PeriodKey::Monthly { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            PeriodKey::Yearly { year } => NaiveDate::from_ymd_opt(year, 1, 1),
        };
        date.ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> AppError {
        AppError::InvalidPeriod(format!("{} {} is out of range", self.kind(), self.label()))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PeriodKey::Weekly { year, week } => write!(f, "{} week {}", year, week),
            PeriodKey::Monthly { year, month } => write!(f, "{}-{:02}", year, month),
            PeriodKey::Yearly { year } => write!(f, "{}", year),
        }
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}
