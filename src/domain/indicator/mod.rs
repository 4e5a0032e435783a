//! Technical indicators and threshold-crossing checks.

pub mod rsi;

pub use rsi::{Rsi, calculate_rsi};

/// The last of `values` moved above `level`.
///
/// Values sitting exactly on `level` before the last one are skipped, so
/// `20, 30, 30, 35` crosses 30 upwards at the final value while
/// `40, 30, 35` does not cross at all.
pub fn crossed_above(values: &[Option<f64>], level: f64) -> bool {
    crossed(values, level, |v| v > level, |v| v < level)
}

/// The last of `values` moved below `level`, skipping values on `level`.
pub fn crossed_below(values: &[Option<f64>], level: f64) -> bool {
    crossed(values, level, |v| v < level, |v| v > level)
}

fn crossed(
    values: &[Option<f64>],
    level: f64,
    beyond: impl Fn(f64) -> bool,
    before: impl Fn(f64) -> bool,
) -> bool {
    let Some((&Some(curr), earlier)) = values.split_last() else {
        return false;
    };
    if !beyond(curr) {
        return false;
    }
    for value in earlier.iter().rev() {
        match *value {
            Some(v) if v == level => continue,
            Some(v) => return before(v),
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn cross_above() {
        assert!(crossed_above(&series(&[25.0, 35.0]), 30.0));
        assert!(!crossed_above(&series(&[35.0, 40.0]), 30.0));
        assert!(!crossed_above(&series(&[25.0, 30.0]), 30.0));
        assert!(!crossed_above(&[None, Some(35.0)], 30.0));
        assert!(!crossed_above(&[], 30.0));
    }

    #[test]
    fn cross_above_skips_values_on_the_level() {
        let values = series(&[20.0, 30.0, 30.0, 35.0]);
        assert!(!crossed_above(&values[..3], 30.0));
        assert!(crossed_above(&values, 30.0));
        // came down onto the level, so leaving it upwards is no cross
        assert!(!crossed_above(&series(&[40.0, 30.0, 35.0]), 30.0));
        assert!(!crossed_above(&series(&[30.0, 30.5]), 30.0));
        assert!(!crossed_above(&[None, Some(30.0), Some(31.0)], 30.0));
    }

    #[test]
    fn cross_below() {
        assert!(crossed_below(&series(&[75.0, 65.0]), 70.0));
        assert!(!crossed_below(&series(&[65.0, 60.0]), 70.0));
        assert!(!crossed_below(&[Some(75.0), None], 70.0));
        assert!(crossed_below(&series(&[80.0, 70.0, 70.0, 69.0]), 70.0));
        assert!(!crossed_below(&series(&[60.0, 70.0, 69.0]), 70.0));
    }
}
