//! Parameter axes and their lazy cartesian product.
//!
//! An axis produces the candidate values for one key. A space combines axes
//! in declaration order; [`ParameterSpace::combinations`] walks the product
//! like nested loops (first axis outermost) and never materializes it.

use crate::domain::error::QuantframeError;
use crate::domain::parameter::{
    ParameterKey, ParameterValue, ParameterValues, ValueKind, check_kind, mistyped,
};

#[derive(Debug, Clone, PartialEq)]
enum AxisSource {
    List(Vec<ParameterValue>),
    IntRange { start: i64, stop: i64, step: i64 },
    FloatRange { start: f64, stop: f64, step: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAxis<K: ParameterKey> {
    key: K,
    source: AxisSource,
}

fn expect_kind<K: ParameterKey>(key: K, kind: ValueKind) -> Result<(), QuantframeError> {
    if key.kind() != kind {
        return Err(mistyped(
            key,
            format!("{} range on a {} parameter", kind, key.kind()),
        ));
    }
    Ok(())
}

fn float_in_range(value: f64, stop: f64, step: f64) -> bool {
    if step > 0.0 { value <= stop } else { value >= stop }
}

impl<K: ParameterKey> ParameterAxis<K> {
    /// Explicit list of values, yielded in the given order.
    pub fn values_of<I, V>(key: K, values: I) -> Result<Self, QuantframeError>
    where
        I: IntoIterator<Item = V>,
        V: Into<ParameterValue>,
    {
        let values: Vec<ParameterValue> = values.into_iter().map(Into::into).collect();
        for value in &values {
            check_kind(key, value)?;
        }
        Ok(ParameterAxis {
            key,
            source: AxisSource::List(values),
        })
    }

    pub fn fixed(key: K, value: impl Into<ParameterValue>) -> Result<Self, QuantframeError> {
        Self::values_of(key, [value.into()])
    }

    /// `start, start + step, ...` while the value has not passed `stop`.
    pub fn int_range(key: K, start: i64, stop: i64, step: i64) -> Result<Self, QuantframeError> {
        expect_kind(key, ValueKind::Int)?;
        if step == 0 {
            return Err(QuantframeError::InvalidRange {
                reason: format!("{}: step must not be zero", key.name()),
            });
        }
        Ok(ParameterAxis {
            key,
            source: AxisSource::IntRange { start, stop, step },
        })
    }

    /// Float counterpart of [`ParameterAxis::int_range`]; the n-th value is
    /// computed as `start + n * step`.
    pub fn float_range(key: K, start: f64, stop: f64, step: f64) -> Result<Self, QuantframeError> {
        expect_kind(key, ValueKind::Float)?;
        if step == 0.0 || !step.is_finite() || !start.is_finite() || !stop.is_finite() {
            return Err(QuantframeError::InvalidRange {
                reason: format!(
                    "{}: range({}, {}, {}) needs finite bounds and a non-zero step",
                    key.name(),
                    start,
                    stop,
                    step
                ),
            });
        }
        Ok(ParameterAxis {
            key,
            source: AxisSource::FloatRange { start, stop, step },
        })
    }

    /// Parse `range(a, b, s)` or a comma separated list, typed by the key's kind.
    pub fn parse(key: K, text: &str) -> Result<Self, QuantframeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(mistyped(key, "no values given"));
        }

        let lowered = text.to_ascii_lowercase();
        if lowered.starts_with("range(") && text.ends_with(')') {
            let inner = &text["range(".len()..text.len() - 1];
            let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(QuantframeError::InvalidRange {
                    reason: format!("{}: expected range(start, stop, step), got '{}'", key.name(), text),
                });
            }
            return match key.kind() {
                ValueKind::Int => {
                    let nums = parts
                        .iter()
                        .map(|p| parse_value(key, p))
                        .collect::<Result<Vec<_>, _>>()?;
                    match nums.as_slice() {
                        [ParameterValue::Int(a), ParameterValue::Int(b), ParameterValue::Int(s)] => {
                            Self::int_range(key, *a, *b, *s)
                        }
                        _ => Err(mistyped(key, format!("bad range '{}'", text))),
                    }
                }
                ValueKind::Float => {
                    let nums = parts
                        .iter()
                        .map(|p| parse_value(key, p))
                        .collect::<Result<Vec<_>, _>>()?;
                    match nums.as_slice() {
                        [
                            ParameterValue::Float(a),
                            ParameterValue::Float(b),
                            ParameterValue::Float(s),
                        ] => Self::float_range(key, *a, *b, *s),
                        _ => Err(mistyped(key, format!("bad range '{}'", text))),
                    }
                }
                ValueKind::Text => Err(mistyped(key, "ranges are not supported for text values")),
            };
        }

        let values = text
            .split(',')
            .map(str::trim)
            .map(|part| {
                if part.is_empty() {
                    Err(mistyped(key, format!("empty entry in '{}'", text)))
                } else {
                    parse_value(key, part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::values_of(key, values)
    }

    pub fn key(&self) -> K {
        self.key
    }

    /// Lazy iterator over this axis' values. Each call starts over.
    pub fn values(&self) -> AxisValues<'_> {
        match &self.source {
            AxisSource::List(values) => AxisValues::List(values.iter()),
            AxisSource::IntRange { start, stop, step } => AxisValues::Int {
                next: Some(*start),
                stop: *stop,
                step: *step,
            },
            AxisSource::FloatRange { start, stop, step } => AxisValues::Float {
                start: *start,
                n: 0,
                stop: *stop,
                step: *step,
            },
        }
    }

    /// Number of values, computed without iterating.
    pub fn len(&self) -> usize {
        match &self.source {
            AxisSource::List(values) => values.len(),
            AxisSource::IntRange { start, stop, step } => {
                let (start, stop, step) = (*start as i128, *stop as i128, *step as i128);
                let span = if step > 0 { stop - start } else { start - stop };
                if span < 0 {
                    0
                } else {
                    usize::try_from(span / step.abs() + 1).unwrap_or(usize::MAX)
                }
            }
            AxisSource::FloatRange { start, stop, step } => {
                let estimate = ((stop - start) / step).floor();
                if estimate < 0.0 {
                    return usize::from(float_in_range(*start, *stop, *step));
                }
                let mut n = estimate as u64;
                while float_in_range(start + (n + 1) as f64 * step, *stop, *step) {
                    n += 1;
                }
                while n > 0 && !float_in_range(start + n as f64 * step, *stop, *step) {
                    n -= 1;
                }
                if float_in_range(start + n as f64 * step, *stop, *step) {
                    usize::try_from(n + 1).unwrap_or(usize::MAX)
                } else {
                    0
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_value<K: ParameterKey>(key: K, raw: &str) -> Result<ParameterValue, QuantframeError> {
    match key.kind() {
        ValueKind::Int => raw
            .parse::<i64>()
            .map(ParameterValue::Int)
            .map_err(|_| mistyped(key, format!("'{}' is not an integer", raw))),
        ValueKind::Float => raw
            .parse::<f64>()
            .map(ParameterValue::Float)
            .map_err(|_| mistyped(key, format!("'{}' is not a number", raw))),
        ValueKind::Text => Ok(ParameterValue::Text(raw.to_string())),
    }
}

/// Values of one axis; see [`ParameterAxis::values`].
#[derive(Debug, Clone)]
pub enum AxisValues<'a> {
    List(std::slice::Iter<'a, ParameterValue>),
    Int {
        next: Option<i64>,
        stop: i64,
        step: i64,
    },
    Float {
        start: f64,
        n: u64,
        stop: f64,
        step: f64,
    },
}

impl Iterator for AxisValues<'_> {
    type Item = ParameterValue;

    fn next(&mut self) -> Option<ParameterValue> {
        match self {
            AxisValues::List(iter) => iter.next().cloned(),
            AxisValues::Int { next, stop, step } => {
                let current = (*next)?;
                let in_range = if *step > 0 { current <= *stop } else { current >= *stop };
                if !in_range {
                    *next = None;
                    return None;
                }
                *next = current.checked_add(*step);
                Some(ParameterValue::Int(current))
            }
            AxisValues::Float { start, n, stop, step } => {
                let value = *start + *n as f64 * *step;
                if !float_in_range(value, *stop, *step) {
                    return None;
                }
                *n += 1;
                Some(ParameterValue::Float(value))
            }
        }
    }
}

/// Ordered set of axes, at most one per key.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace<K: ParameterKey> {
    axes: Vec<ParameterAxis<K>>,
}

impl<K: ParameterKey> Default for ParameterSpace<K> {
    fn default() -> Self {
        ParameterSpace { axes: Vec::new() }
    }
}

impl<K: ParameterKey> ParameterSpace<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, axis: ParameterAxis<K>) -> Result<(), QuantframeError> {
        if self.axes.iter().any(|a| a.key == axis.key) {
            return Err(mistyped(axis.key, "declared more than once"));
        }
        self.axes.push(axis);
        Ok(())
    }

    pub fn with_axis(mut self, axis: ParameterAxis<K>) -> Result<Self, QuantframeError> {
        self.add(axis)?;
        Ok(self)
    }

    pub fn axes(&self) -> &[ParameterAxis<K>] {
        &self.axes
    }

    /// Size of the product. A space without axes has exactly one (empty)
    /// combination.
    pub fn len(&self) -> usize {
        self.axes
            .iter()
            .fold(1usize, |acc, axis| acc.saturating_mul(axis.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn combinations(&self) -> Combinations<'_, K> {
        Combinations {
            space: self,
            iters: Vec::with_capacity(self.axes.len()),
            current: Vec::with_capacity(self.axes.len()),
            state: CombinationState::Fresh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombinationState {
    Fresh,
    Running,
    Done,
}

/// Odometer over the axes of a [`ParameterSpace`]: the last axis turns
/// fastest and inner axes restart from their first value on carry.
#[derive(Debug, Clone)]
pub struct Combinations<'a, K: ParameterKey> {
    space: &'a ParameterSpace<K>,
    iters: Vec<AxisValues<'a>>,
    current: Vec<ParameterValue>,
    state: CombinationState,
}

impl<'a, K: ParameterKey> Combinations<'a, K> {
    fn snapshot(&self) -> ParameterValues<K> {
        let mut values = ParameterValues::new();
        for (axis, value) in self.space.axes.iter().zip(&self.current) {
            values.insert_checked(axis.key, value.clone());
        }
        values
    }

    fn start(&mut self) -> bool {
        let space: &'a ParameterSpace<K> = self.space;
        for axis in &space.axes {
            let mut iter = axis.values();
            match iter.next() {
                Some(first) => {
                    self.current.push(first);
                    self.iters.push(iter);
                }
                None => return false,
            }
        }
        true
    }

    fn advance(&mut self) -> bool {
        let space: &'a ParameterSpace<K> = self.space;
        let axes = &space.axes;
        for i in (0..axes.len()).rev() {
            if let Some(value) = self.iters[i].next() {
                self.current[i] = value;
                for j in i + 1..axes.len() {
                    let mut iter = axes[j].values();
                    match iter.next() {
                        Some(first) => self.current[j] = first,
                        None => return false,
                    }
                    self.iters[j] = iter;
                }
                return true;
            }
        }
        false
    }
}

impl<K: ParameterKey> Iterator for Combinations<'_, K> {
    type Item = ParameterValues<K>;

    fn next(&mut self) -> Option<ParameterValues<K>> {
        let produced = match self.state {
            CombinationState::Fresh => self.start(),
            CombinationState::Running => self.advance(),
            CombinationState::Done => false,
        };
        if produced {
            self.state = CombinationState::Running;
            Some(self.snapshot())
        } else {
            self.state = CombinationState::Done;
            None
        }
    }
}
