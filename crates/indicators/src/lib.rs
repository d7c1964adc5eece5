pub mod bollinger;
pub mod cci;
pub mod sma;
pub mod stats;

use rust_decimal::Decimal;

/// Trait for streaming (incremental) indicators.
/// Feed one value at a time; the indicator maintains internal state.
pub trait Indicator: Send + Sync {
    /// Process the next value and return the indicator output (if ready).
    fn next(&mut self, value: Decimal) -> Option<Decimal>;

    /// Reset the indicator to its initial state.
    fn reset(&mut self);

    /// The minimum number of data points needed before the indicator produces output.
    fn period(&self) -> usize;

    /// Whether the indicator has enough data to produce output.
    fn is_ready(&self) -> bool;
}

/// Run an indicator over a whole slice, one output per input.
///
/// The first `period() - 1` outputs are always `None`.
pub fn rolling<I: Indicator + ?Sized>(indicator: &mut I, values: &[Decimal]) -> Vec<Option<Decimal>> {
    indicator.reset();
    values.iter().map(|v| indicator.next(*v)).collect()
}
