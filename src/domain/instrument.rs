//! Per-instrument bundle of one primary series and its aggregated views.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::aggregated_series::AggregatedSeries;
use crate::domain::bar::Bar;
use crate::domain::error::QuantframeError;
use crate::domain::primary_series::PrimarySeries;
use crate::domain::resolution::{Resolution, SeriesDefinition};

/// Read-only handle on one resolution of an instrument, addressed in the
/// primary index space.
#[derive(Debug, Clone, Copy)]
pub enum SeriesView<'a> {
    Primary(&'a PrimarySeries),
    Aggregated {
        series: &'a AggregatedSeries,
        primary: &'a PrimarySeries,
    },
}

impl<'a> SeriesView<'a> {
    pub fn resolution(&self) -> Resolution {
        match self {
            SeriesView::Primary(p) => p.resolution(),
            SeriesView::Aggregated { series, .. } => series.resolution(),
        }
    }

    pub fn bar(&self, index: usize) -> Result<Bar, QuantframeError> {
        match self {
            SeriesView::Primary(p) => p.bar(index),
            SeriesView::Aggregated { series, primary } => series.bar(primary, index),
        }
    }

    pub fn end_index(&self) -> Option<usize> {
        self.primary().end_index()
    }

    pub fn first_index(&self) -> Option<usize> {
        self.primary().first_index()
    }

    pub fn primary(&self) -> &'a PrimarySeries {
        match *self {
            SeriesView::Primary(p) => p,
            SeriesView::Aggregated { primary, .. } => primary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentSeriesSet {
    primary: PrimarySeries,
    aggregated: BTreeMap<Resolution, AggregatedSeries>,
}

impl InstrumentSeriesSet {
    pub fn new(symbol: &str, base: SeriesDefinition, aggregated: &[SeriesDefinition]) -> Self {
        InstrumentSeriesSet {
            primary: PrimarySeries::new(symbol, base),
            aggregated: aggregated
                .iter()
                .map(|def| (def.resolution, AggregatedSeries::new(symbol, *def)))
                .collect(),
        }
    }

    pub fn symbol(&self) -> &str {
        self.primary.symbol()
    }

    pub fn primary(&self) -> &PrimarySeries {
        &self.primary
    }

    pub fn aggregated(&self, resolution: Resolution) -> Option<&AggregatedSeries> {
        self.aggregated.get(&resolution)
    }

    /// Configured resolutions, base first then coarser ones ascending.
    pub fn resolutions(&self) -> Vec<Resolution> {
        std::iter::once(self.primary.resolution())
            .chain(self.aggregated.keys().copied())
            .collect()
    }

    pub fn series(&self, resolution: Resolution) -> Result<SeriesView<'_>, QuantframeError> {
        if resolution == self.primary.resolution() {
            return Ok(SeriesView::Primary(&self.primary));
        }
        self.aggregated
            .get(&resolution)
            .map(|series| SeriesView::Aggregated {
                series,
                primary: &self.primary,
            })
            .ok_or_else(|| QuantframeError::UnknownResolution {
                symbol: self.symbol().to_string(),
                resolution,
            })
    }

    /// Fan a quote out: primary first, then every aggregated series. Every
    /// series is checked before any is touched, so a rejected quote changes
    /// nothing.
    pub fn on_quote(
        &mut self,
        time: DateTime<Utc>,
        bid: Option<f64>,
        ask: Option<f64>,
    ) -> Result<(), QuantframeError> {
        self.primary.check_quote(time)?;
        for series in self.aggregated.values() {
            series.check_quote(time)?;
        }
        self.primary.on_quote(time, bid, ask)?;
        for series in self.aggregated.values_mut() {
            series.on_quote(time, bid, ask)?;
        }
        Ok(())
    }

    /// Fan a historical base-resolution bar out: primary first, then
    /// aggregated. A bar any series would reject changes nothing.
    pub fn on_bar(&mut self, bar: Bar) -> Result<(), QuantframeError> {
        self.primary.check_push(&bar)?;
        for series in self.aggregated.values() {
            series.check_merge(&bar)?;
        }
        self.primary.push_bar(bar)?;
        for series in self.aggregated.values_mut() {
            series.merge_bar(&bar)?;
        }
        Ok(())
    }
}
