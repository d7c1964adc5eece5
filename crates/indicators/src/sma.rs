use crate::stats::mean;
use crate::Indicator;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple Moving Average (SMA) over a trailing window, current value included.
/// Each output is the mean of the stored window.
#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    buffer: VecDeque<Decimal>,
    last: Option<Decimal>,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "SMA period must be > 0");
        Self {
            window,
            buffer: VecDeque::with_capacity(window),
            last: None,
        }
    }

    /// Most recent output, if the window has filled.
    pub fn value(&self) -> Option<Decimal> {
        self.last
    }
}

impl Indicator for Sma {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);

        self.last = if self.is_ready() {
            mean(self.buffer.make_contiguous())
        } else {
            None
        };
        self.last
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last = None;
    }

    fn period(&self) -> usize {
        self.window
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.window
    }
}

/// Trailing mean of `values` over `window`; `None` until the window fills.
pub fn rolling_mean(values: &[Decimal], window: usize) -> Vec<Option<Decimal>> {
    crate::rolling(&mut Sma::new(window), values)
}
