//! Market data catalog: instrument symbol to series set.
//!
//! The set of instruments and their resolutions is fixed by [`CatalogConfig`]
//! at construction; afterwards the catalog only changes through price updates.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::domain::bar::Bar;
use crate::domain::error::QuantframeError;
use crate::domain::instrument::{InstrumentSeriesSet, SeriesView};
use crate::domain::quote::Quote;
use crate::domain::resolution::{Resolution, RetentionPolicy, SeriesDefinition};

const SECTION: &str = "market";

/// Validated, immutable catalog configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    base: SeriesDefinition,
    symbols: Vec<String>,
    aggregations: BTreeMap<String, Vec<SeriesDefinition>>,
}

impl CatalogConfig {
    pub fn builder(base: SeriesDefinition) -> CatalogConfigBuilder {
        CatalogConfigBuilder {
            base,
            symbols: Vec::new(),
            aggregations: Vec::new(),
            aggregate_all: Vec::new(),
        }
    }

    pub fn base(&self) -> SeriesDefinition {
        self.base
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn aggregations_for(&self, symbol: &str) -> &[SeriesDefinition] {
        self.aggregations
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfigBuilder {
    base: SeriesDefinition,
    symbols: Vec<String>,
    aggregations: Vec<(String, SeriesDefinition)>,
    aggregate_all: Vec<SeriesDefinition>,
}

impl CatalogConfigBuilder {
    pub fn symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// Add a coarser series for one symbol.
    pub fn aggregate(mut self, symbol: &str, definition: SeriesDefinition) -> Self {
        self.aggregations.push((symbol.to_string(), definition));
        self
    }

    /// Add a coarser series for every configured symbol.
    pub fn aggregate_all(mut self, definition: SeriesDefinition) -> Self {
        self.aggregate_all.push(definition);
        self
    }

    pub fn build(self) -> Result<CatalogConfig, QuantframeError> {
        validate_retention(&self.base, "retention")?;
        if self.symbols.is_empty() {
            return Err(QuantframeError::config_invalid(
                SECTION,
                "symbols",
                "at least one symbol is required",
            ));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(QuantframeError::config_invalid(
                    SECTION,
                    "symbols",
                    "empty symbol",
                ));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(QuantframeError::config_invalid(
                    SECTION,
                    "symbols",
                    format!("duplicate symbol {}", symbol),
                ));
            }
        }

        let mut aggregations: BTreeMap<String, Vec<SeriesDefinition>> = BTreeMap::new();
        let per_symbol = self.symbols.iter().flat_map(|s| {
            self.aggregate_all.iter().map(move |def| (s.clone(), *def))
        });
        for (symbol, definition) in per_symbol.chain(self.aggregations.iter().cloned()) {
            if !seen.contains(symbol.as_str()) {
                return Err(QuantframeError::config_invalid(
                    SECTION,
                    "aggregate",
                    format!("aggregation for undeclared symbol {}", symbol),
                ));
            }
            validate_retention(&definition, "aggregate_retention")?;
            let base = self.base.resolution;
            if definition.resolution <= base || !definition.resolution.is_multiple_of(base) {
                return Err(QuantframeError::config_invalid(
                    SECTION,
                    "aggregate",
                    format!(
                        "{} is not a coarser multiple of base resolution {}",
                        definition.resolution, base
                    ),
                ));
            }
            let entry = aggregations.entry(symbol.clone()).or_default();
            if entry.iter().any(|d| d.resolution == definition.resolution) {
                return Err(QuantframeError::config_invalid(
                    SECTION,
                    "aggregate",
                    format!("duplicate resolution {} for {}", definition.resolution, symbol),
                ));
            }
            entry.push(definition);
        }

        Ok(CatalogConfig {
            base: self.base,
            symbols: self.symbols,
            aggregations,
        })
    }
}

fn validate_retention(definition: &SeriesDefinition, key: &str) -> Result<(), QuantframeError> {
    if definition.retention == RetentionPolicy::Bounded(0) {
        return Err(QuantframeError::config_invalid(
            SECTION,
            key,
            "bounded retention must keep at least one bar",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MarketDataCatalog {
    base: Resolution,
    instruments: BTreeMap<String, InstrumentSeriesSet>,
}

impl MarketDataCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        let instruments = config
            .symbols()
            .iter()
            .map(|symbol| {
                let set = InstrumentSeriesSet::new(
                    symbol,
                    config.base(),
                    config.aggregations_for(symbol),
                );
                debug!(symbol = %symbol, resolutions = ?set.resolutions(), "registered instrument");
                (symbol.clone(), set)
            })
            .collect();
        MarketDataCatalog {
            base: config.base().resolution,
            instruments,
        }
    }

    pub fn base_resolution(&self) -> Resolution {
        self.base
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn instrument(&self, symbol: &str) -> Result<&InstrumentSeriesSet, QuantframeError> {
        self.instruments
            .get(symbol)
            .ok_or_else(|| QuantframeError::UnknownInstrument {
                symbol: symbol.to_string(),
            })
    }

    fn instrument_mut(&mut self, symbol: &str) -> Result<&mut InstrumentSeriesSet, QuantframeError> {
        self.instruments
            .get_mut(symbol)
            .ok_or_else(|| QuantframeError::UnknownInstrument {
                symbol: symbol.to_string(),
            })
    }

    pub fn on_quote(
        &mut self,
        symbol: &str,
        time: DateTime<Utc>,
        bid: f64,
        ask: f64,
    ) -> Result<(), QuantframeError> {
        self.instrument_mut(symbol)?.on_quote(time, Some(bid), Some(ask))
    }

    pub fn on_price(
        &mut self,
        symbol: &str,
        time: DateTime<Utc>,
        price: f64,
    ) -> Result<(), QuantframeError> {
        self.instrument_mut(symbol)?.on_quote(time, Some(price), None)
    }

    pub fn on(&mut self, quote: &Quote) -> Result<(), QuantframeError> {
        self.instrument_mut(&quote.symbol)?
            .on_quote(quote.time, Some(quote.bid), quote.ask)
    }

    pub fn on_bar(&mut self, symbol: &str, bar: Bar) -> Result<(), QuantframeError> {
        self.instrument_mut(symbol)?.on_bar(bar)
    }

    pub fn series_for(
        &self,
        symbol: &str,
        resolution: Resolution,
    ) -> Result<SeriesView<'_>, QuantframeError> {
        self.instrument(symbol)?.series(resolution)
    }

    pub fn last_bar_index(&self, symbol: &str) -> Result<Option<usize>, QuantframeError> {
        Ok(self.instrument(symbol)?.primary().end_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
    }

    fn config() -> CatalogConfig {
        CatalogConfig::builder(SeriesDefinition::limited(Resolution::M1, 100))
            .symbols(["EURUSD", "GBPUSD"])
            .aggregate("EURUSD", SeriesDefinition::unlimited(Resolution::M5))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_collects_aggregations() {
        let cfg = config();
        assert_eq!(cfg.symbols(), ["EURUSD".to_string(), "GBPUSD".to_string()]);
        assert_eq!(cfg.aggregations_for("EURUSD").len(), 1);
        assert!(cfg.aggregations_for("GBPUSD").is_empty());
    }

    #[test]
    fn aggregate_all_applies_to_every_symbol() {
        let cfg = CatalogConfig::builder(SeriesDefinition::unlimited(Resolution::M1))
            .symbols(["A", "B"])
            .aggregate_all(SeriesDefinition::unlimited(Resolution::H1))
            .build()
            .unwrap();
        assert_eq!(cfg.aggregations_for("A")[0].resolution, Resolution::H1);
        assert_eq!(cfg.aggregations_for("B")[0].resolution, Resolution::H1);
    }

    #[test]
    fn builder_rejects_bad_configs() {
        let base = SeriesDefinition::unlimited(Resolution::M5);
        let cases = vec![
            CatalogConfig::builder(base),
            CatalogConfig::builder(base).symbols(["A", "A"]),
            CatalogConfig::builder(base).symbols([""]),
            CatalogConfig::builder(SeriesDefinition::limited(Resolution::M5, 0)).symbols(["A"]),
            CatalogConfig::builder(base)
                .symbols(["A"])
                .aggregate("B", SeriesDefinition::unlimited(Resolution::H1)),
            CatalogConfig::builder(base)
                .symbols(["A"])
                .aggregate("A", SeriesDefinition::unlimited(Resolution::M1)),
            CatalogConfig::builder(base)
                .symbols(["A"])
                .aggregate("A", SeriesDefinition::unlimited(Resolution::M5)),
            CatalogConfig::builder(base)
                .symbols(["A"])
                .aggregate("A", SeriesDefinition::unlimited(Resolution::H1))
                .aggregate("A", SeriesDefinition::limited(Resolution::H1, 5)),
            CatalogConfig::builder(base)
                .symbols(["A"])
                .aggregate("A", SeriesDefinition::limited(Resolution::H1, 0)),
        ];
        for builder in cases {
            let result = builder.clone().build();
            assert!(
                matches!(result, Err(QuantframeError::ConfigInvalid { .. })),
                "expected rejection for {:?}",
                builder
            );
        }
    }

    #[test]
    fn symbols_are_case_sensitive() {
        let catalog = MarketDataCatalog::new(&config());
        assert!(catalog.instrument("EURUSD").is_ok());
        assert!(matches!(
            catalog.instrument("eurusd"),
            Err(QuantframeError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn series_for_resolves_primary_and_aggregated() {
        let catalog = MarketDataCatalog::new(&config());
        assert_eq!(
            catalog.series_for("EURUSD", Resolution::M1).unwrap().resolution(),
            Resolution::M1
        );
        assert_eq!(
            catalog.series_for("EURUSD", Resolution::M5).unwrap().resolution(),
            Resolution::M5
        );
        assert!(matches!(
            catalog.series_for("GBPUSD", Resolution::M5),
            Err(QuantframeError::UnknownResolution { .. })
        ));
        assert!(matches!(
            catalog.series_for("USDJPY", Resolution::M1),
            Err(QuantframeError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn quotes_route_by_symbol() {
        let mut catalog = MarketDataCatalog::new(&config());
        catalog.on_quote("EURUSD", start(), 1.1, 1.1002).unwrap();
        catalog.on_price("GBPUSD", start(), 1.27).unwrap();
        catalog
            .on(&Quote::bid_ask("EURUSD", start() + TimeDelta::minutes(1), 1.2, 1.2002))
            .unwrap();

        assert_eq!(catalog.last_bar_index("EURUSD").unwrap(), Some(1));
        assert_eq!(catalog.last_bar_index("GBPUSD").unwrap(), Some(0));
        let gbp = catalog.series_for("GBPUSD", Resolution::M1).unwrap();
        assert!(!gbp.bar(0).unwrap().ask.is_set());
        assert!(matches!(
            catalog.on_price("USDJPY", start(), 150.0),
            Err(QuantframeError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn symbols_listed() {
        let catalog = MarketDataCatalog::new(&config());
        let symbols: Vec<&str> = catalog.symbols().collect();
        assert_eq!(symbols, vec!["EURUSD", "GBPUSD"]);
        assert_eq!(catalog.base_resolution(), Resolution::M1);
    }
}
