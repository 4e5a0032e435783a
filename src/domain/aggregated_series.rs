//! Coarser-resolution view of an instrument.
//!
//! An aggregated series buckets the same raw quote stream as the primary
//! series, independently, at its own resolution. Reads are addressed in the
//! primary series' index space and translated by age:
//!
//! ```text
//! age = primary_end - index
//! age == 0            -> own last bar
//! 0 < age < own count -> own bar `age` positions before its end
//! otherwise           -> NaN sentinel bar
//! ```
//!
//! History is never re-derived from the primary bars on read.

use chrono::{DateTime, Utc};

use crate::domain::bar::Bar;
use crate::domain::error::QuantframeError;
use crate::domain::primary_series::PrimarySeries;
use crate::domain::resolution::{Resolution, SeriesDefinition};

#[derive(Debug, Clone)]
pub struct AggregatedSeries {
    own: PrimarySeries,
}

/// Result of translating a primary index into this series' own storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Bars back from the own end.
    Resident(usize),
    /// Outside the own retention window.
    Sentinel,
}

/// Map an age (distance from the primary end) onto own storage of `own_count` bars.
pub fn translate_age(age: usize, own_count: usize) -> Translation {
    if own_count == 0 {
        return Translation::Sentinel;
    }
    if age == 0 || age < own_count {
        Translation::Resident(age)
    } else {
        Translation::Sentinel
    }
}

impl AggregatedSeries {
    pub fn new(symbol: &str, definition: SeriesDefinition) -> Self {
        AggregatedSeries {
            own: PrimarySeries::new(symbol, definition),
        }
    }

    pub fn symbol(&self) -> &str {
        self.own.symbol()
    }

    pub fn resolution(&self) -> Resolution {
        self.own.resolution()
    }

    pub fn definition(&self) -> SeriesDefinition {
        self.own.definition()
    }

    /// Number of resident bars at this resolution.
    pub fn bar_count(&self) -> usize {
        self.own.bar_count()
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.own.last_bar()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.own.last_update()
    }

    /// Own bars, oldest first, without index translation.
    pub fn bars(&self) -> impl Iterator<Item = &Bar> {
        self.own.iter().map(|(_, bar)| bar)
    }

    pub fn on_quote(
        &mut self,
        time: DateTime<Utc>,
        bid: Option<f64>,
        ask: Option<f64>,
    ) -> Result<bool, QuantframeError> {
        self.own.on_quote(time, bid, ask)
    }

    /// Fold one base-resolution historical bar into the matching coarse bucket.
    pub fn merge_bar(&mut self, bar: &Bar) -> Result<(), QuantframeError> {
        self.own.merge_bar(bar)
    }

    pub(crate) fn check_quote(&self, time: DateTime<Utc>) -> Result<(), QuantframeError> {
        self.own.check_quote(time)
    }

    pub(crate) fn check_merge(&self, bar: &Bar) -> Result<(), QuantframeError> {
        self.own.check_merge(bar).map(|_| ())
    }

    /// Bar at `index` in the primary index space, given the primary end index.
    pub fn bar_at(&self, primary_end: Option<usize>, index: usize) -> Result<Bar, QuantframeError> {
        let end = match primary_end {
            Some(end) if index <= end => end,
            _ => {
                return Err(QuantframeError::index_out_of_range(
                    index as i64,
                    Some(0),
                    primary_end,
                ));
            }
        };

        match translate_age(end - index, self.own.bar_count()) {
            Translation::Resident(back) => {
                let own_end = self.own.end_index().ok_or_else(|| {
                    QuantframeError::index_out_of_range(index as i64, Some(0), primary_end)
                })?;
                self.own.bar(own_end - back)
            }
            Translation::Sentinel => Ok(Bar::nan(self.resolution())),
        }
    }

    /// Bar at `index` in `primary`'s index space.
    pub fn bar(&self, primary: &PrimarySeries, index: usize) -> Result<Bar, QuantframeError> {
        self.bar_at(primary.end_index(), index)
    }
}
