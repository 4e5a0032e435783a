//! Backtest runner: replays history through strategies.
//!
//! A replay pushes the window's bars one by one into a fresh series set and
//! asks the strategy for a decision after each bar, so a strategy never sees
//! a bar beyond the one it decides on.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::domain::error::QuantframeError;
use crate::domain::execution::{ExecutionConfig, SimulatedExecution};
use crate::domain::instrument::InstrumentSeriesSet;
use crate::domain::order::{Order, OrderReport};
use crate::domain::parameter::{ParameterKey, ParameterValues};
use crate::domain::parameter_space::ParameterSpace;
use crate::domain::producer::Producer;
use crate::domain::resolution::SeriesDefinition;
use crate::domain::scenario::{ScenarioResult, TradeScenario};
use crate::domain::strategy::{StrategyContext, TradeStrategy};
use crate::domain::trading_record::{TradeEvent, TradingRecord};
use crate::ports::history_port::HistoryPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub from: DateTime<Utc>,
    pub window: TimeDelta,
    /// Amount bought per entry.
    pub amount: f64,
    /// Price increment of one pip.
    pub pip: f64,
    /// Starting deposit, in pips.
    pub deposit: f64,
    pub execution: ExecutionConfig,
}

impl BacktestConfig {
    pub fn new(from: DateTime<Utc>, window: TimeDelta) -> Self {
        BacktestConfig {
            from,
            window,
            amount: 1000.0,
            pip: 0.0001,
            deposit: 100.0,
            execution: ExecutionConfig::default(),
        }
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.from + self.window
    }
}

pub struct BacktestRunner<'a> {
    history: &'a dyn HistoryPort,
    config: BacktestConfig,
}

fn replay_failed(strategy: &str, err: QuantframeError) -> QuantframeError {
    match err {
        QuantframeError::ReplayFailed { .. } => err,
        other => QuantframeError::ReplayFailed {
            strategy: strategy.to_string(),
            reason: other.to_string(),
        },
    }
}

impl<'a> BacktestRunner<'a> {
    pub fn new(history: &'a dyn HistoryPort, config: BacktestConfig) -> Self {
        BacktestRunner { history, config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay `strategy` over the bars beginning in `[from, from + window)`.
    pub fn run<S: TradeStrategy>(
        &self,
        mut strategy: S,
        from: DateTime<Utc>,
        window: TimeDelta,
    ) -> Result<TradeScenario<S::Key>, QuantframeError> {
        let name = strategy.name().to_string();
        let symbol = strategy.symbol().to_string();
        let resolution = strategy.resolution();

        if window <= TimeDelta::zero() {
            return Err(replay_failed(
                &name,
                QuantframeError::InvalidRange {
                    reason: format!("window must be positive, got {}", window),
                },
            ));
        }
        let to = from + window;

        let bars = self
            .history
            .fetch_bars(&symbol, resolution, from, to)
            .map_err(|e| replay_failed(&name, e))?;
        let bars: Vec<_> = bars
            .into_iter()
            .filter(|b| b.begin.is_some_and(|t| t >= from && t < to))
            .collect();
        if bars.is_empty() {
            return Err(QuantframeError::ReplayFailed {
                strategy: name,
                reason: format!("no {} {} history in [{}, {})", symbol, resolution, from, to),
            });
        }
        debug!(strategy = %name, bars = bars.len(), %from, %to, "replaying");

        let mut market =
            InstrumentSeriesSet::new(&symbol, SeriesDefinition::unlimited(resolution), &[]);
        let mut orders = SimulatedExecution::new(self.config.execution.clone());
        let mut record = TradingRecord::new();
        let unstable = strategy.unstable_period();

        for bar in bars {
            market.on_bar(bar).map_err(|e| replay_failed(&name, e))?;
            let index = market
                .primary()
                .end_index()
                .ok_or_else(|| QuantframeError::ReplayFailed {
                    strategy: name.clone(),
                    reason: "series empty after push".to_string(),
                })?;
            if index < unstable {
                continue;
            }

            let mut ctx = StrategyContext::new(&market, &mut orders, index)
                .map_err(|e| replay_failed(&name, e))?;
            let decided = if record.is_flat() {
                strategy.should_enter(index, &record, &mut ctx)
            } else {
                strategy.should_exit(index, &record, &mut ctx)
            }
            .map_err(|e| replay_failed(&name, e))?;

            let reports = ctx.into_reports();
            if decided && !reports.iter().any(OrderReport::is_accepted) {
                debug!(strategy = %name, index, "signal without accepted fill");
            }
            for report in reports.into_iter().filter(OrderReport::is_accepted) {
                apply_fill(&mut record, index, report, &name);
            }
        }

        let scenario = TradeScenario {
            strategy: name,
            symbol,
            resolution,
            parameters: strategy.parameters().clone(),
            from,
            to,
            series: market.primary().clone(),
            record,
        };
        info!(
            strategy = %scenario.strategy,
            parameters = %scenario.parameters,
            bars = scenario.bar_count(),
            trades = scenario.trades().len(),
            "backtest finished"
        );
        Ok(scenario)
    }

    /// Build and replay one strategy per combination of `space`, in
    /// combination order. A failing combination does not stop the others.
    pub fn run_space<K, S, F>(
        &self,
        space: &ParameterSpace<K>,
        recipe: F,
        from: DateTime<Utc>,
        window: TimeDelta,
    ) -> Vec<ScenarioResult<K>>
    where
        K: ParameterKey,
        S: TradeStrategy<Key = K>,
        F: Fn(&ParameterValues<K>) -> Result<S, QuantframeError>,
    {
        let producer = Producer::from_recipe(recipe);
        info!(combinations = space.len(), "running parameter space");
        producer
            .stream(space)
            .map(|(parameters, built)| {
                let outcome = built.and_then(|strategy| self.run(strategy, from, window));
                if let Err(e) = &outcome {
                    warn!(parameters = %parameters, error = %e, "scenario failed");
                }
                ScenarioResult {
                    parameters,
                    outcome,
                }
            })
            .collect()
    }
}

fn apply_fill(record: &mut TradingRecord, index: usize, report: OrderReport, strategy: &str) {
    let event = TradeEvent {
        index,
        time: report.time,
        price: report.price,
        amount: report.amount,
        label: report.order.label().to_string(),
    };
    match &report.order {
        Order::Open(_) => {
            if !record.enter(event) {
                warn!(strategy, index, "entry fill while a position is open, ignored");
            }
        }
        Order::Close(close) => {
            let matches = record
                .current_entry()
                .is_some_and(|entry| entry.label == close.label);
            if matches {
                record.exit(event);
            } else {
                warn!(strategy, index, label = %close.label, "exit fill for unknown entry, ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::{Bar, Ohlc};
    use crate::domain::parameter::ValueKind;
    use crate::domain::resolution::Resolution;
    use chrono::TimeZone;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Key {
        EnterAt,
    }

    impl ParameterKey for Key {
        fn name(&self) -> &'static str {
            "ENTER_AT"
        }
        fn kind(&self) -> ValueKind {
            ValueKind::Int
        }
        fn all() -> &'static [Self] {
            &[Key::EnterAt]
        }
    }

    /// Enters at a fixed index and exits two bars later.
    struct Scripted {
        enter_at: usize,
        parameters: ParameterValues<Key>,
    }

    impl TradeStrategy for Scripted {
        type Key = Key;
        fn name(&self) -> &str {
            "scripted"
        }
        fn symbol(&self) -> &str {
            "EURUSD"
        }
        fn resolution(&self) -> Resolution {
            Resolution::M1
        }
        fn unstable_period(&self) -> usize {
            1
        }
        fn parameters(&self) -> &ParameterValues<Key> {
            &self.parameters
        }
        fn should_enter(
            &mut self,
            index: usize,
            _record: &TradingRecord,
            ctx: &mut StrategyContext<'_>,
        ) -> Result<bool, QuantframeError> {
            if index != self.enter_at {
                return Ok(false);
            }
            ctx.execute(Order::open("scripted", "EURUSD", index, 10.0));
            Ok(true)
        }
        fn should_exit(
            &mut self,
            index: usize,
            record: &TradingRecord,
            ctx: &mut StrategyContext<'_>,
        ) -> Result<bool, QuantframeError> {
            let entry = record.current_entry().map(|e| (e.index, e.label.clone()));
            match entry {
                Some((at, label)) if index == at + 2 => {
                    ctx.execute(Order::close(&label));
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    struct FixedHistory(Vec<Bar>);

    impl HistoryPort for FixedHistory {
        fn fetch_bars(
            &self,
            _symbol: &str,
            _resolution: Resolution,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<Bar>, QuantframeError> {
            Ok(self.0.clone())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn history(n: i64) -> FixedHistory {
        FixedHistory(
            (0..n)
                .map(|m| {
                    let p = 1.0 + m as f64 / 10.0;
                    Bar::historical(
                        Resolution::M1,
                        start() + TimeDelta::minutes(m),
                        Ohlc::new(p, p, p, p),
                        Ohlc::NAN,
                        1.0,
                    )
                })
                .collect(),
        )
    }

    fn scripted(enter_at: usize) -> Scripted {
        Scripted {
            enter_at,
            parameters: ParameterValues::new()
                .with(Key::EnterAt, enter_at as i64)
                .unwrap(),
        }
    }

    #[test]
    fn records_accepted_round_trip() {
        let history = history(10);
        let runner = BacktestRunner::new(&history, BacktestConfig::new(start(), TimeDelta::hours(1)));
        let scenario = runner
            .run(scripted(3), start(), TimeDelta::hours(1))
            .unwrap();
        assert_eq!(scenario.bar_count(), 10);
        assert_eq!(scenario.trades().len(), 1);
        let trade = &scenario.trades()[0];
        assert_eq!(trade.entry.index, 3);
        assert_eq!(trade.exit.index, 5);
        assert_eq!(trade.entry.label, "scripted:EURUSD:3");
        assert!(scenario.record.is_flat());
    }

    #[test]
    fn window_filters_bars() {
        let history = history(10);
        let runner = BacktestRunner::new(&history, BacktestConfig::new(start(), TimeDelta::minutes(5)));
        let scenario = runner
            .run(scripted(3), start() + TimeDelta::minutes(2), TimeDelta::minutes(5))
            .unwrap();
        // bars 00:02..00:06 become indices 0..4; entry at 3, exit would be 5
        assert_eq!(scenario.bar_count(), 5);
        assert!(scenario.trades().is_empty());
        assert!(!scenario.record.is_flat());
    }

    #[test]
    fn unstable_period_skips_first_bars() {
        let history = history(5);
        let runner = BacktestRunner::new(&history, BacktestConfig::new(start(), TimeDelta::hours(1)));
        let scenario = runner.run(scripted(0), start(), TimeDelta::hours(1)).unwrap();
        assert!(scenario.trades().is_empty());
        assert!(scenario.record.is_flat());
    }

    #[test]
    fn empty_history_fails() {
        let history = FixedHistory(Vec::new());
        let runner = BacktestRunner::new(&history, BacktestConfig::new(start(), TimeDelta::hours(1)));
        assert!(matches!(
            runner.run(scripted(1), start(), TimeDelta::hours(1)),
            Err(QuantframeError::ReplayFailed { .. })
        ));
    }

    #[test]
    fn non_positive_window_fails() {
        let history = history(5);
        let runner = BacktestRunner::new(&history, BacktestConfig::new(start(), TimeDelta::hours(1)));
        assert!(matches!(
            runner.run(scripted(1), start(), TimeDelta::zero()),
            Err(QuantframeError::ReplayFailed { .. })
        ));
    }

    #[test]
    fn space_run_keeps_failures_in_place() {
        let history = history(10);
        let runner = BacktestRunner::new(&history, BacktestConfig::new(start(), TimeDelta::hours(1)));
        let space = ParameterSpace::new()
            .with_axis(
                crate::domain::parameter_space::ParameterAxis::values_of(
                    Key::EnterAt,
                    [2_i64, 99, 4],
                )
                .unwrap(),
            )
            .unwrap();
        let results = runner.run_space(
            &space,
            |values: &ParameterValues<Key>| {
                let at = values.get_int(Key::EnterAt)?;
                if at > 50 {
                    return Err(QuantframeError::StrategyConstructionFailed {
                        reason: "too late".into(),
                    });
                }
                Ok(scripted(at as usize))
            },
            start(),
            TimeDelta::hours(1),
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].scenario().unwrap().trades()[0].entry.index, 2);
        assert!(matches!(
            results[1].error(),
            Some(QuantframeError::StrategyConstructionFailed { .. })
        ));
        assert_eq!(results[1].parameters.get_int(Key::EnterAt).unwrap(), 99);
        assert_eq!(results[2].scenario().unwrap().trades()[0].entry.index, 4);
    }
}
