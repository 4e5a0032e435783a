//! Two-sided (bid/ask) time-bucketed price bar.
//!
//! A bar is open while its bucket is current and is closed for good once a
//! later bucket starts. Single-sided bars leave the unused side NaN; the
//! one-sided accessors ([`Bar::open`], [`Bar::close`], ...) read the bid side.

use chrono::{DateTime, Utc};

use crate::domain::resolution::Resolution;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    pub const NAN: Ohlc = Ohlc {
        open: f64::NAN,
        high: f64::NAN,
        low: f64::NAN,
        close: f64::NAN,
    };

    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Ohlc {
            open,
            high,
            low,
            close,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.open.is_nan()
    }

    fn add(&mut self, price: f64) {
        if !self.is_set() {
            *self = Ohlc::new(price, price, price, price);
            return;
        }
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    fn merge(&mut self, later: &Ohlc) {
        if !later.is_set() {
            return;
        }
        if !self.is_set() {
            *self = *later;
            return;
        }
        self.high = self.high.max(later.high);
        self.low = self.low.min(later.low);
        self.close = later.close;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub period: Resolution,
    /// Bucket-aligned begin time; `None` only for the NaN sentinel.
    pub begin: Option<DateTime<Utc>>,
    pub bid: Ohlc,
    pub ask: Ohlc,
    pub volume: f64,
    pub ticks: u64,
    pub closed: bool,
}

impl Bar {
    /// An open, still empty bar for the bucket containing `time`.
    pub fn open_at(period: Resolution, time: DateTime<Utc>) -> Self {
        Bar {
            period,
            begin: Some(period.bucket_start(time)),
            bid: Ohlc::NAN,
            ask: Ohlc::NAN,
            volume: 0.0,
            ticks: 0,
            closed: false,
        }
    }

    /// A fully formed historical bar. Stored closed by the series that accepts it.
    pub fn historical(
        period: Resolution,
        begin: DateTime<Utc>,
        bid: Ohlc,
        ask: Ohlc,
        volume: f64,
    ) -> Self {
        Bar {
            period,
            begin: Some(begin),
            bid,
            ask,
            volume,
            ticks: 0,
            closed: true,
        }
    }

    /// The sentinel returned for reads outside an aggregated series' retention.
    pub fn nan(period: Resolution) -> Self {
        Bar {
            period,
            begin: None,
            bid: Ohlc::NAN,
            ask: Ohlc::NAN,
            volume: f64::NAN,
            ticks: 0,
            closed: true,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.begin.is_none()
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.begin.map(|b| b + self.period.duration())
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        match (self.begin, self.end_time()) {
            (Some(begin), Some(end)) => time >= begin && time < end,
            _ => false,
        }
    }

    pub fn open(&self) -> f64 {
        self.bid.open
    }

    pub fn high(&self) -> f64 {
        self.bid.high
    }

    pub fn low(&self) -> f64 {
        self.bid.low
    }

    pub fn close(&self) -> f64 {
        self.bid.close
    }

    /// Close price a buyer pays: ask side when present, bid otherwise.
    pub fn buy_close(&self) -> f64 {
        if self.ask.is_set() {
            self.ask.close
        } else {
            self.bid.close
        }
    }

    pub(crate) fn add_price(&mut self, bid: Option<f64>, ask: Option<f64>) {
        debug_assert!(!self.closed, "closed bars are immutable");
        if let Some(price) = bid {
            self.bid.add(price);
        }
        if let Some(price) = ask {
            self.ask.add(price);
        }
        self.ticks += 1;
    }

    /// Fold a finer, later bar of the same bucket into this one.
    pub(crate) fn merge(&mut self, later: &Bar) {
        debug_assert!(!self.closed, "closed bars are immutable");
        self.bid.merge(&later.bid);
        self.ask.merge(&later.ask);
        self.volume += later.volume;
        self.ticks += later.ticks;
    }

    pub(crate) fn close_bar(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 10, m, s).unwrap()
    }

    #[test]
    fn first_update_sets_all_prices() {
        let mut bar = Bar::open_at(Resolution::M1, at(0, 12));
        bar.add_price(Some(1.1000), Some(1.1002));
        assert_eq!(bar.bid, Ohlc::new(1.1000, 1.1000, 1.1000, 1.1000));
        assert_eq!(bar.ask, Ohlc::new(1.1002, 1.1002, 1.1002, 1.1002));
        assert_eq!(bar.ticks, 1);
    }

    #[test]
    fn updates_extend_high_low_and_move_close() {
        let mut bar = Bar::open_at(Resolution::M1, at(0, 0));
        bar.add_price(Some(10.0), None);
        bar.add_price(Some(12.0), None);
        bar.add_price(Some(9.0), None);
        bar.add_price(Some(11.0), None);
        assert_eq!(bar.bid, Ohlc::new(10.0, 12.0, 9.0, 11.0));
        assert_eq!(bar.open(), 10.0);
        assert_eq!(bar.high(), 12.0);
        assert_eq!(bar.low(), 9.0);
        assert_eq!(bar.close(), 11.0);
    }

    #[test]
    fn single_sided_bar_keeps_ask_unset() {
        let mut bar = Bar::open_at(Resolution::M1, at(0, 0));
        bar.add_price(Some(10.0), None);
        assert!(!bar.ask.is_set());
        assert_eq!(bar.buy_close(), 10.0);
    }

    #[test]
    fn begin_is_bucket_aligned() {
        let bar = Bar::open_at(Resolution::M5, at(7, 30));
        assert_eq!(bar.begin, Some(at(5, 0)));
        assert_eq!(bar.end_time(), Some(at(10, 0)));
        assert!(bar.contains(at(9, 59)));
        assert!(!bar.contains(at(10, 0)));
    }

    #[test]
    fn nan_sentinel() {
        let bar = Bar::nan(Resolution::M5);
        assert!(bar.is_nan());
        assert!(bar.close().is_nan());
        assert!(bar.ask.close.is_nan());
        assert!(bar.end_time().is_none());
        assert!(!bar.contains(at(0, 0)));
    }

    #[test]
    fn merge_folds_later_bar() {
        let mut coarse = Bar::open_at(Resolution::M5, at(0, 0));
        let first = Bar::historical(
            Resolution::M1,
            at(0, 0),
            Ohlc::new(10.0, 11.0, 9.5, 10.5),
            Ohlc::NAN,
            100.0,
        );
        let second = Bar::historical(
            Resolution::M1,
            at(1, 0),
            Ohlc::new(10.5, 12.0, 10.0, 11.5),
            Ohlc::NAN,
            50.0,
        );
        coarse.merge(&first);
        coarse.merge(&second);
        assert_eq!(coarse.bid, Ohlc::new(10.0, 12.0, 9.5, 11.5));
        assert!(!coarse.ask.is_set());
        assert!((coarse.volume - 150.0).abs() < f64::EPSILON);
    }
}
