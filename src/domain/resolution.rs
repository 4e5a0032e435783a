//! Bar resolutions and retention policies.
//!
//! A [`Resolution`] is a fixed bucket width. Buckets are anchored at the Unix
//! epoch, so every bar of a given resolution begins on the same grid no matter
//! when the first quote arrived.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resolution {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Resolution {
    pub fn seconds(&self) -> i64 {
        match self {
            Resolution::M1 => 60,
            Resolution::M5 => 5 * 60,
            Resolution::M15 => 15 * 60,
            Resolution::M30 => 30 * 60,
            Resolution::H1 => 60 * 60,
            Resolution::H4 => 4 * 60 * 60,
            Resolution::D1 => 24 * 60 * 60,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::M1 => "M1",
            Resolution::M5 => "M5",
            Resolution::M15 => "M15",
            Resolution::M30 => "M30",
            Resolution::H1 => "H1",
            Resolution::H4 => "H4",
            Resolution::D1 => "D1",
        }
    }

    pub fn all() -> &'static [Resolution] {
        &[
            Resolution::M1,
            Resolution::M5,
            Resolution::M15,
            Resolution::M30,
            Resolution::H1,
            Resolution::H4,
            Resolution::D1,
        ]
    }

    /// Start of the bucket containing `time`.
    pub fn bucket_start(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let offset = time.timestamp().rem_euclid(self.seconds());
        time - TimeDelta::seconds(offset)
            - TimeDelta::nanoseconds(time.timestamp_subsec_nanos() as i64)
    }

    /// Whether `other` buckets tile exactly into this resolution's buckets.
    pub fn is_multiple_of(&self, other: Resolution) -> bool {
        self.seconds() % other.seconds() == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Resolution::all()
            .iter()
            .copied()
            .find(|r| r.label() == wanted)
            .ok_or_else(|| format!("unknown resolution '{}'", s.trim()))
    }
}

/// How many trailing bars a series keeps resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    Unbounded,
    Bounded(usize),
}

impl FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unbounded") {
            return Ok(RetentionPolicy::Unbounded);
        }
        trimmed
            .parse::<usize>()
            .map(RetentionPolicy::Bounded)
            .map_err(|_| format!("expected 'unbounded' or a bar count, got '{}'", trimmed))
    }
}

/// A resolution paired with its retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesDefinition {
    pub resolution: Resolution,
    pub retention: RetentionPolicy,
}

impl SeriesDefinition {
    pub fn unlimited(resolution: Resolution) -> Self {
        SeriesDefinition {
            resolution,
            retention: RetentionPolicy::Unbounded,
        }
    }

    pub fn limited(resolution: Resolution, bars: usize) -> Self {
        SeriesDefinition {
            resolution,
            retention: RetentionPolicy::Bounded(bars),
        }
    }
}
