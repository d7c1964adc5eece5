//! Window statistics shared by the moving-average, band and CCI indicators.

use rust_decimal::Decimal;

/// Arithmetic mean. `None` for an empty window.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<Decimal>() / Decimal::from(values.len()))
}

/// Sample standard deviation (divisor `n - 1`). `None` for fewer than two values.
pub fn sample_std_dev(values: &[Decimal], mean: Decimal) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq: Decimal = values
        .iter()
        .map(|v| {
            let diff = *v - mean;
            diff * diff
        })
        .sum();
    Some(decimal_sqrt(sum_sq / Decimal::from(values.len() - 1)))
}

/// Mean absolute deviation from `mean`.
pub fn mean_abs_deviation(values: &[Decimal], mean: Decimal) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().map(|v| (*v - mean).abs()).sum();
    Some(total / Decimal::from(values.len()))
}

/// Newton's method square root for Decimal.
pub fn decimal_sqrt(value: Decimal) -> Decimal {
    if value.is_zero() || value < Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = if value > Decimal::ONE {
        value / Decimal::TWO
    } else {
        Decimal::ONE
    };
    let epsilon = Decimal::new(1, 16);
    for _ in 0..100 {
        let next_guess = (guess + value / guess) / Decimal::TWO;
        let diff = (next_guess - guess).abs();
        guess = next_guess;
        if diff < epsilon {
            break;
        }
    }
    guess
}
