//! Base-resolution series for one instrument.
//!
//! Indices are absolute: the first bar ever created is index 0 and an index is
//! never reused. With a bounded retention the oldest bars are evicted and
//! [`PrimarySeries::first_index`] moves forward; the end index only grows.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::domain::bar::Bar;
use crate::domain::error::QuantframeError;
use crate::domain::resolution::{Resolution, RetentionPolicy, SeriesDefinition};

#[derive(Debug, Clone)]
pub struct PrimarySeries {
    symbol: String,
    definition: SeriesDefinition,
    bars: VecDeque<Bar>,
    evicted: usize,
    last_update: Option<DateTime<Utc>>,
}

impl PrimarySeries {
    pub fn new(symbol: &str, definition: SeriesDefinition) -> Self {
        let capacity = match definition.retention {
            RetentionPolicy::Bounded(n) => n + 1,
            RetentionPolicy::Unbounded => 256,
        };
        PrimarySeries {
            symbol: symbol.to_string(),
            definition,
            bars: VecDeque::with_capacity(capacity),
            evicted: 0,
            last_update: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn resolution(&self) -> Resolution {
        self.definition.resolution
    }

    pub fn definition(&self) -> SeriesDefinition {
        self.definition
    }

    /// Index of the most recently created bar, `None` before the first quote.
    pub fn end_index(&self) -> Option<usize> {
        if self.bars.is_empty() {
            None
        } else {
            Some(self.evicted + self.bars.len() - 1)
        }
    }

    /// Index of the oldest resident bar.
    pub fn first_index(&self) -> Option<usize> {
        if self.bars.is_empty() {
            None
        } else {
            Some(self.evicted)
        }
    }

    /// Number of resident bars.
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn bar(&self, index: usize) -> Result<Bar, QuantframeError> {
        let out_of_range =
            || QuantframeError::index_out_of_range(index as i64, self.first_index(), self.end_index());
        let offset = index.checked_sub(self.evicted).ok_or_else(out_of_range)?;
        self.bars.get(offset).copied().ok_or_else(out_of_range)
    }

    /// Resident bars with their absolute indices, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Bar)> {
        let first = self.evicted;
        self.bars.iter().enumerate().map(move |(i, bar)| (first + i, bar))
    }

    /// Apply one quote. Returns `true` when the quote opened a new bar.
    pub fn on_quote(
        &mut self,
        time: DateTime<Utc>,
        bid: Option<f64>,
        ask: Option<f64>,
    ) -> Result<bool, QuantframeError> {
        self.check_order(time)?;
        let bid = bid.filter(|p| !p.is_nan());
        let ask = ask.filter(|p| !p.is_nan());

        let created = match self.bars.back_mut() {
            Some(bar) if !bar.closed && bar.contains(time) => {
                bar.add_price(bid, ask);
                false
            }
            _ => {
                let mut bar = Bar::open_at(self.resolution(), time);
                bar.add_price(bid, ask);
                self.append(bar);
                true
            }
        };
        self.last_update = Some(time);
        Ok(created)
    }

    /// Append an already formed historical bar; it is stored closed.
    pub fn push_bar(&mut self, bar: Bar) -> Result<(), QuantframeError> {
        let begin = self.check_push(&bar)?;
        let mut bar = bar;
        bar.close_bar();
        self.append(bar);
        self.last_update = Some(begin);
        Ok(())
    }

    /// Fold a finer historical bar into this series' own bucket for it.
    pub(crate) fn merge_bar(&mut self, bar: &Bar) -> Result<(), QuantframeError> {
        let begin = self.check_merge(bar)?;
        match self.bars.back_mut() {
            Some(current) if !current.closed && current.contains(begin) => current.merge(bar),
            _ => {
                let mut current = Bar::open_at(self.resolution(), begin);
                current.merge(bar);
                self.append(current);
            }
        }
        self.last_update = Some(begin);
        Ok(())
    }

    /// Errors `on_quote` would return for `time`, without applying anything.
    pub(crate) fn check_quote(&self, time: DateTime<Utc>) -> Result<(), QuantframeError> {
        self.check_order(time)
    }

    /// Errors `push_bar` would return for `bar`; yields its begin time.
    pub(crate) fn check_push(&self, bar: &Bar) -> Result<DateTime<Utc>, QuantframeError> {
        let begin = self.validate_historical(bar)?;
        self.check_order(begin)?;
        if let Some(last) = self.bars.back() {
            if last.begin == Some(begin) {
                return Err(self.out_of_order(begin, begin));
            }
        }
        Ok(begin)
    }

    /// Errors `merge_bar` would return for `bar`; yields its begin time.
    pub(crate) fn check_merge(&self, bar: &Bar) -> Result<DateTime<Utc>, QuantframeError> {
        if !self.resolution().is_multiple_of(bar.period) || bar.period >= self.resolution() {
            return Err(QuantframeError::UnknownResolution {
                symbol: self.symbol.clone(),
                resolution: bar.period,
            });
        }
        let begin = bar.begin.ok_or_else(|| QuantframeError::DataSource {
            reason: format!("{}: cannot merge a NaN bar", self.symbol),
        })?;
        self.check_order(begin)?;
        Ok(begin)
    }

    pub(crate) fn validate_historical(&self, bar: &Bar) -> Result<DateTime<Utc>, QuantframeError> {
        if bar.period != self.resolution() {
            return Err(QuantframeError::UnknownResolution {
                symbol: self.symbol.clone(),
                resolution: bar.period,
            });
        }
        let begin = bar.begin.ok_or_else(|| QuantframeError::DataSource {
            reason: format!("{}: cannot append a NaN bar", self.symbol),
        })?;
        if self.resolution().bucket_start(begin) != begin {
            return Err(QuantframeError::DataSource {
                reason: format!(
                    "{}: bar at {} is not aligned to {}",
                    self.symbol,
                    begin,
                    self.resolution()
                ),
            });
        }
        Ok(begin)
    }

    fn check_order(&self, time: DateTime<Utc>) -> Result<(), QuantframeError> {
        if let Some(last) = self.last_update {
            if time < last {
                return Err(self.out_of_order(time, last));
            }
        }
        if let Some(bar) = self.bars.back() {
            if bar.closed {
                if let Some(end) = bar.end_time() {
                    if time < end {
                        return Err(self.out_of_order(time, end));
                    }
                }
            }
        }
        Ok(())
    }

    fn out_of_order(&self, time: DateTime<Utc>, last: DateTime<Utc>) -> QuantframeError {
        QuantframeError::OutOfOrderUpdate {
            symbol: self.symbol.clone(),
            time,
            last,
        }
    }

    fn append(&mut self, bar: Bar) {
        if let Some(previous) = self.bars.back_mut() {
            previous.close_bar();
        }
        self.bars.push_back(bar);
        if let RetentionPolicy::Bounded(limit) = self.definition.retention {
            while self.bars.len() > limit {
                self.bars.pop_front();
                self.evicted += 1;
            }
        }
    }
}
