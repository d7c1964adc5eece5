use crate::stats::{mean, sample_std_dev};
use crate::Indicator;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bollinger Bands.
///
/// The middle band is the SMA of the trailing window; the bands sit
/// `num_std` sample standard deviations above and below it.
/// `Indicator::next` returns the middle band. Use `next_output()` for all three.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    len: usize,
    num_std: Decimal,
    buffer: VecDeque<Decimal>,
    current: Option<BollingerOutput>,
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
    pub std_dev: Decimal,
}

impl BollingerOutput {
    pub fn bandwidth(&self) -> Decimal {
        self.upper - self.lower
    }
}

impl BollingerBands {
    pub fn new(period: usize, num_std_dev: Decimal) -> Self {
        assert!(period > 0, "Bollinger period must be > 0");
        Self {
            len: period,
            num_std: num_std_dev,
            buffer: VecDeque::with_capacity(period),
            current: None,
        }
    }

    /// Standard Bollinger Bands (20, 2).
    pub fn default_periods() -> Self {
        Self::new(20, Decimal::TWO)
    }

    /// Feed a close and return the bands once the window is full.
    ///
    /// A window of one value has no sample deviation, so `period == 1` never
    /// produces output.
    pub fn next_output(&mut self, value: Decimal) -> Option<BollingerOutput> {
        self.buffer.push_back(value);
        if self.buffer.len() > self.len {
            self.buffer.pop_front();
        }

        let num_std = self.num_std;
        self.current = if self.buffer.len() == self.len {
            let window: &[Decimal] = self.buffer.make_contiguous();
            mean(window).and_then(|mid| {
                sample_std_dev(window, mid).map(|sd| {
                    let half = num_std * sd;
                    BollingerOutput {
                        upper: mid + half,
                        middle: mid,
                        lower: mid - half,
                        std_dev: sd,
                    }
                })
            })
        } else {
            None
        };

        self.current
    }
}

impl Indicator for BollingerBands {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.next_output(value).map(|o| o.middle)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.current = None;
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bollinger_basic() {
        let mut bb = BollingerBands::new(3, Decimal::TWO);
        assert!(bb.next_output(dec!(10)).is_none());
        assert!(bb.next_output(dec!(11)).is_none());
        let out = bb.next_output(dec!(12)).unwrap();
        assert_eq!(out.middle, dec!(11));
        // sample std of 10, 11, 12 is exactly 1
        assert!((out.std_dev - dec!(1)).abs() < dec!(0.0000001));
        assert!((out.upper - dec!(13)).abs() < dec!(0.0000001));
        assert!((out.lower - dec!(9)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_bands_collapse_on_constant_prices() {
        let mut bb = BollingerBands::default_periods();
        let mut last = None;
        for _ in 0..25 {
            last = bb.next_output(dec!(10));
        }
        let out = last.unwrap();
        assert_eq!(out.upper, dec!(10));
        assert_eq!(out.middle, dec!(10));
        assert_eq!(out.lower, dec!(10));
        assert_eq!(out.bandwidth(), Decimal::ZERO);
    }

    #[test]
    fn test_bands_are_ordered() {
        let closes = [
            dec!(88.1), dec!(88.4), dec!(87.9), dec!(89.2), dec!(90.0), dec!(89.6),
            dec!(89.1), dec!(90.3), dec!(91.0), dec!(90.7), dec!(90.2), dec!(89.8),
        ];
        let mut bb = BollingerBands::new(5, Decimal::TWO);
        for close in closes {
            if let Some(out) = bb.next_output(close) {
                assert!(out.upper > out.middle);
                assert!(out.middle > out.lower);
            }
        }
        assert!(bb.is_ready());
    }

    #[test]
    fn test_window_of_one_never_ready() {
        let mut bb = BollingerBands::new(1, Decimal::TWO);
        assert_eq!(bb.next(dec!(1)), None);
        assert_eq!(bb.next(dec!(2)), None);
        assert!(!bb.is_ready());
    }

    #[test]
    fn test_reset() {
        let mut bb = BollingerBands::new(2, Decimal::TWO);
        bb.next(dec!(1));
        bb.next(dec!(3));
        assert!(bb.is_ready());
        bb.reset();
        assert!(!bb.is_ready());
        assert_eq!(bb.next(dec!(5)), None);
    }
}
