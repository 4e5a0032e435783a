//! Scalar metrics over replay results.

use crate::domain::parameter::ParameterKey;
use crate::domain::scenario::TradeScenario;

pub trait Criterion<K: ParameterKey> {
    fn name(&self) -> &'static str;

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64;
}

/// Sum of trade profits (price difference times amount).
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalProfitLoss;

impl<K: ParameterKey> Criterion<K> for TotalProfitLoss {
    fn name(&self) -> &'static str {
        "p/l"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        scenario.trades().iter().map(|t| t.profit()).sum()
    }
}

/// Mean profit per closed trade, 0 without trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageProfitLoss;

impl<K: ParameterKey> Criterion<K> for AverageProfitLoss {
    fn name(&self) -> &'static str {
        "avg p/l"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        let trades = scenario.trades();
        if trades.is_empty() {
            return 0.0;
        }
        TotalProfitLoss.calculate(scenario) / trades.len() as f64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberOfTrades;

impl<K: ParameterKey> Criterion<K> for NumberOfTrades {
    fn name(&self) -> &'static str {
        "trades"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        scenario.trades().len() as f64
    }
}

/// Share of profitable trades in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitableTradesRatio;

impl<K: ParameterKey> Criterion<K> for ProfitableTradesRatio {
    fn name(&self) -> &'static str {
        "winning trades"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        let trades = scenario.trades();
        if trades.is_empty() {
            return 0.0;
        }
        let winning = trades.iter().filter(|t| t.is_profitable()).count();
        winning as f64 / trades.len() as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProfitLossPips {
    pub pip: f64,
}

impl<K: ParameterKey> Criterion<K> for ProfitLossPips {
    fn name(&self) -> &'static str {
        "p/l pips"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        scenario.trades().iter().map(|t| t.pips(self.pip)).sum()
    }
}

/// Deposit (in pips) after adding the summed pip result of every trade.
#[derive(Debug, Clone, Copy)]
pub struct FinishDeposit {
    pub deposit: f64,
    pub pip: f64,
}

impl<K: ParameterKey> Criterion<K> for FinishDeposit {
    fn name(&self) -> &'static str {
        "finish deposit"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        self.deposit + ProfitLossPips { pip: self.pip }.calculate(scenario)
    }
}

/// Deposit after each closed trade, starting with the deposit itself.
fn equity_curve<K: ParameterKey>(scenario: &TradeScenario<K>, deposit: f64, pip: f64) -> Vec<f64> {
    let mut equity = deposit;
    let mut curve = Vec::with_capacity(scenario.trades().len() + 1);
    curve.push(equity);
    for trade in scenario.trades() {
        equity += trade.pips(pip);
        curve.push(equity);
    }
    curve
}

fn max_drawdown(curve: &[f64]) -> f64 {
    let Some(&first) = curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &equity in curve {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }
    max_dd
}

/// Largest peak-to-trough decline of the deposit as a fraction of the peak.
#[derive(Debug, Clone, Copy)]
pub struct MaximumDrawdown {
    pub deposit: f64,
    pub pip: f64,
}

impl<K: ParameterKey> Criterion<K> for MaximumDrawdown {
    fn name(&self) -> &'static str {
        "max drawdown"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        max_drawdown(&equity_curve(scenario, self.deposit, self.pip))
    }
}

/// Total return on the deposit divided by the maximum drawdown.
///
/// Without any drawdown the ratio is infinite for a gain and 0 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RewardRiskRatio {
    pub deposit: f64,
    pub pip: f64,
}

impl<K: ParameterKey> Criterion<K> for RewardRiskRatio {
    fn name(&self) -> &'static str {
        "rwrd/risk"
    }

    fn calculate(&self, scenario: &TradeScenario<K>) -> f64 {
        let curve = equity_curve(scenario, self.deposit, self.pip);
        let finish = curve.last().copied().unwrap_or(self.deposit);
        let reward = if self.deposit > 0.0 {
            (finish - self.deposit) / self.deposit
        } else {
            0.0
        };
        let risk = max_drawdown(&curve);
        if risk > 0.0 {
            reward / risk
        } else if reward > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}
