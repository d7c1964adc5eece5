use crate::stats::{mean, mean_abs_deviation};
use crate::Indicator;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Lambert's constant: scales CCI so that most values fall within ±100.
const CCI_CONSTANT: Decimal = Decimal::from_parts(15, 0, 0, false, 3);

/// Typical price `(high + low + close) / 3`.
pub fn typical_price(high: Decimal, low: Decimal, close: Decimal) -> Decimal {
    (high + low + close) / Decimal::from(3)
}

/// Result of feeding one typical price into [`Cci`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CciValue {
    /// Fewer than `period` values seen.
    Warmup,
    /// Zero mean absolute deviation over the window; CCI is undefined.
    Degenerate,
    Value(Decimal),
}

impl CciValue {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            CciValue::Value(v) => Some(*v),
            CciValue::Warmup | CciValue::Degenerate => None,
        }
    }
}

/// Commodity Channel Index over a trailing window of typical prices.
///
/// `CCI = (tp - MA) / (0.015 * MD)` where MA is the window mean and MD the
/// mean absolute deviation from it.
#[derive(Debug, Clone)]
pub struct Cci {
    len: usize,
    buffer: VecDeque<Decimal>,
    last: CciValue,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "CCI period must be > 0");
        Self {
            len: period,
            buffer: VecDeque::with_capacity(period),
            last: CciValue::Warmup,
        }
    }

    pub fn last(&self) -> CciValue {
        self.last
    }

    /// Feed a typical price.
    pub fn next_value(&mut self, tp: Decimal) -> CciValue {
        self.buffer.push_back(tp);
        if self.buffer.len() > self.len {
            self.buffer.pop_front();
        }

        self.last = if self.buffer.len() < self.len {
            CciValue::Warmup
        } else {
            let window: &[Decimal] = self.buffer.make_contiguous();
            match mean(window) {
                Some(ma) => match mean_abs_deviation(window, ma) {
                    Some(md) if !md.is_zero() => {
                        CciValue::Value((tp - ma) / (CCI_CONSTANT * md))
                    }
                    _ => CciValue::Degenerate,
                },
                None => CciValue::Warmup,
            }
        };

        self.last
    }
}

impl Indicator for Cci {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.next_value(value).value()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last = CciValue::Warmup;
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.len
    }
}
