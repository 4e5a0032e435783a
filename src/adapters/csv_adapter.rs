//! CSV history and quote files.
//!
//! Bar files live at `<dir>/<SYMBOL>_<RES>.csv` with the header
//! `time,bid_open,bid_high,bid_low,bid_close,ask_open,ask_high,ask_low,ask_close,volume`.
//! Ask columns may be left empty for one-sided data. Quote files have the
//! header `symbol,time,bid,ask` with an optional ask.

use chrono::{DateTime, Utc};
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::bar::{Bar, Ohlc};
use crate::domain::error::QuantframeError;
use crate::domain::quote::Quote;
use crate::domain::resolution::Resolution;
use crate::ports::history_port::HistoryPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn data_error(reason: String) -> QuantframeError {
    QuantframeError::DataSource { reason }
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str, line: u64) -> Result<&'r str, QuantframeError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| data_error(format!("line {}: missing {} column", line, name)))
}

fn parse_price(raw: &str, name: &str, line: u64) -> Result<f64, QuantframeError> {
    raw.parse()
        .map_err(|e| data_error(format!("line {}: invalid {} value '{}': {}", line, name, raw, e)))
}

fn optional_price(record: &StringRecord, idx: usize, name: &str, line: u64) -> Result<Option<f64>, QuantframeError> {
    match record.get(idx).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_price(raw, name, line).map(Some),
    }
}

pub fn parse_time(raw: &str) -> Result<DateTime<Utc>, QuantframeError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| data_error(format!("invalid timestamp '{}': {}", raw, e)))
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, resolution: Resolution) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, resolution.label()))
    }

    fn parse_bar(record: &StringRecord, resolution: Resolution) -> Result<Bar, QuantframeError> {
        let line = line_of(record);
        let time = parse_time(field(record, 0, "time", line)?)?;

        let mut prices = [0.0; 4];
        for (i, name) in ["bid_open", "bid_high", "bid_low", "bid_close"].iter().enumerate() {
            prices[i] = parse_price(field(record, i + 1, name, line)?, name, line)?;
        }
        let bid = Ohlc::new(prices[0], prices[1], prices[2], prices[3]);

        let mut ask_prices = [None; 4];
        for (i, name) in ["ask_open", "ask_high", "ask_low", "ask_close"].iter().enumerate() {
            ask_prices[i] = optional_price(record, i + 5, name, line)?;
        }
        let ask = match ask_prices {
            [Some(o), Some(h), Some(l), Some(c)] => Ohlc::new(o, h, l, c),
            [None, None, None, None] => Ohlc::NAN,
            _ => {
                return Err(data_error(format!(
                    "line {}: ask columns must be all set or all empty",
                    line
                )));
            }
        };

        let volume = optional_price(record, 9, "volume", line)?.unwrap_or(0.0);
        Ok(Bar::historical(resolution, time, bid, ask, volume))
    }
}

impl HistoryPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, QuantframeError> {
        let path = self.csv_path(symbol, resolution);
        let content = fs::read_to_string(&path).map_err(|e| {
            data_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let bar = Self::parse_bar(&record, resolution)?;
            if bar.begin.is_some_and(|t| t >= from && t < to) {
                bars.push(bar);
            }
        }

        bars.sort_by_key(|b| b.begin);
        Ok(bars)
    }
}

/// Read every quote of a quote file, in file order.
pub fn read_quotes(path: &Path) -> Result<Vec<Quote>, QuantframeError> {
    let content = fs::read_to_string(path)
        .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut quotes = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
        let line = line_of(&record);
        let symbol = field(&record, 0, "symbol", line)?;
        if symbol.is_empty() {
            return Err(data_error(format!("line {}: empty symbol", line)));
        }
        let time = parse_time(field(&record, 1, "time", line)?)?;
        let bid = parse_price(field(&record, 2, "bid", line)?, "bid", line)?;
        let ask = optional_price(&record, 3, "ask", line)?;
        quotes.push(Quote {
            symbol: symbol.to_string(),
            time,
            bid,
            ask,
        });
    }
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use tempfile::TempDir;

    const HEADER: &str =
        "time,bid_open,bid_high,bid_low,bid_close,ask_open,ask_high,ask_low,ask_close,volume\n";

    fn t(m: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + TimeDelta::minutes(m)
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let content = format!(
            "{}\
             2024-01-15T00:02:00Z,1.3,1.4,1.2,1.35,1.3002,1.4002,1.2002,1.3502,7\n\
             2024-01-15T00:00:00Z,1.1,1.2,1.0,1.15,1.1002,1.2002,1.0002,1.1502,5\n\
             2024-01-15T00:01:00Z,1.2,1.3,1.1,1.25,,,,,\n",
            HEADER
        );
        fs::write(path.join("EURUSD_M1.csv"), content).unwrap();
        fs::write(path.join("GBPUSD_M1.csv"), HEADER).unwrap();
        fs::write(
            path.join("BROKEN_M1.csv"),
            format!("{}2024-01-15T00:00:00Z,abc,1,1,1,,,,,\n", HEADER),
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_sorted_and_parsed() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let bars = adapter
            .fetch_bars("EURUSD", Resolution::M1, t(0), t(60))
            .unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].begin, Some(t(0)));
        assert_eq!(bars[0].bid, Ohlc::new(1.1, 1.2, 1.0, 1.15));
        assert_eq!(bars[0].ask.close, 1.1502);
        assert_eq!(bars[0].volume, 5.0);
        assert!(bars[0].closed);
        assert!(!bars[1].ask.is_set());
        assert_eq!(bars[1].volume, 0.0);
        assert_eq!(bars[2].begin, Some(t(2)));
    }

    #[test]
    fn fetch_bars_filters_half_open_window() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let bars = adapter
            .fetch_bars("EURUSD", Resolution::M1, t(1), t(2))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].begin, Some(t(1)));
    }

    #[test]
    fn fetch_bars_empty_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let bars = adapter
            .fetch_bars("GBPUSD", Resolution::M1, t(0), t(60))
            .unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn fetch_bars_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_bars("EURUSD", Resolution::H1, t(0), t(60));
        assert!(matches!(result, Err(QuantframeError::DataSource { .. })));
    }

    #[test]
    fn fetch_bars_bad_value() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter
            .fetch_bars("BROKEN", Resolution::M1, t(0), t(60))
            .unwrap_err();
        assert!(err.to_string().contains("bid_open"));
    }

    #[test]
    fn read_quotes_with_and_without_ask() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.csv");
        fs::write(
            &path,
            "symbol,time,bid,ask\n\
             EURUSD,2024-01-15T00:00:10Z,1.1000,1.1002\n\
             EURUSD,2024-01-15T00:00:20+00:00,1.1001,\n",
        )
        .unwrap();
        let quotes = read_quotes(&path).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0], Quote::bid_ask("EURUSD", t(0) + TimeDelta::seconds(10), 1.1, 1.1002));
        assert_eq!(quotes[1].ask, None);
    }

    #[test]
    fn read_quotes_bad_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.csv");
        fs::write(&path, "symbol,time,bid,ask\nEURUSD,yesterday,1.1,1.2\n").unwrap();
        assert!(matches!(
            read_quotes(&path),
            Err(QuantframeError::DataSource { .. })
        ));
    }
}
