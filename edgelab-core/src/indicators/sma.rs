//! Simple Moving Average (SMA) of closes.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling_mean(&closes, self.period)
    }
}

/// Rolling mean with NaN warmup. Recomputes the window sum every `period`
/// steps to keep floating-point drift bounded.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        if i % period == 0 {
            sum = values[i + 1 - period..=i].iter().sum();
        } else {
            sum += values[i] - values[i - period];
        }
        result[i] = sum / period as f64;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn sma_5_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).compute(&bars);

        assert_eq!(result.len(), 7);
        for value in result.iter().take(4) {
            assert!(value.is_nan());
        }
        assert!((result[4] - 12.0).abs() < 1e-12);
        assert!((result[5] - 13.0).abs() < 1e-12);
        assert!((result[6] - 14.0).abs() < 1e-12);
    }

    #[test]
    fn sma_1_is_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        assert_eq!(Sma::new(1).compute(&bars), vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn short_series_is_all_nan() {
        let bars = make_bars(&[1.0, 2.0]);
        assert!(Sma::new(3).compute(&bars).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn no_lookahead() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let full = Sma::new(7).compute(&make_bars(&closes));
        let truncated = Sma::new(7).compute(&make_bars(&closes[..25]));
        for i in 6..25 {
            assert!((full[i] - truncated[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn sma_lookback() {
        assert_eq!(Sma::new(20).lookback(), 19);
        assert_eq!(Sma::new(0).lookback(), 0);
    }
}
