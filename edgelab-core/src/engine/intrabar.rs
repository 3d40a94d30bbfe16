//! Intrabar exit resolution — which protective level fills, and where.
//!
//! A bar that opens beyond a level fills at the open (gap). Otherwise a level
//! fills at its own price when the bar's range reaches it. When the range
//! covers both stop and target the [`IntrabarPolicy`] picks one.

use super::config::IntrabarPolicy;
use crate::domain::{Bar, Direction, ExitReason};

/// Resolve a stop/target exit on `bar`. Returns the raw (pre-slippage) fill
/// price and the reason, or `None` when neither level is reached.
pub fn resolve_exit(
    direction: Direction,
    stop: f64,
    target: Option<f64>,
    bar: &Bar,
    policy: IntrabarPolicy,
) -> Option<(f64, ExitReason)> {
    let sign = direction.sign();

    // Gaps through a level fill at the open.
    if sign * (bar.open - stop) <= 0.0 {
        return Some((bar.open, ExitReason::StopLoss));
    }
    if let Some(t) = target {
        if sign * (bar.open - t) >= 0.0 {
            return Some((bar.open, ExitReason::TakeProfit));
        }
    }

    let stop_hit = match direction {
        Direction::Long => bar.low <= stop,
        Direction::Short => bar.high >= stop,
    };
    let target_hit = target.map_or(false, |t| match direction {
        Direction::Long => bar.high >= t,
        Direction::Short => bar.low <= t,
    });

    let stop_fill = Some((stop, ExitReason::StopLoss));
    let target_fill = target.map(|t| (t, ExitReason::TakeProfit));

    match (stop_hit, target_hit) {
        (false, false) => None,
        (true, false) => stop_fill,
        (false, true) => target_fill,
        (true, true) => {
            if stop_first(direction, bar, policy) {
                stop_fill
            } else {
                target_fill
            }
        }
    }
}

/// Heuristic path: if |open − high| ≤ |open − low| the bar visited the high
/// first (open → high → low → close), otherwise the low first.
fn stop_first(direction: Direction, bar: &Bar, policy: IntrabarPolicy) -> bool {
    match policy {
        IntrabarPolicy::WorstCase => true,
        IntrabarPolicy::BestCase => false,
        IntrabarPolicy::OhlcPath => {
            let high_first = (bar.open - bar.high).abs() <= (bar.open - bar.low).abs();
            // A long's stop sits below, a short's above.
            match direction {
                Direction::Long => !high_first,
                Direction::Short => high_first,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Bar::new(ts, open, high, low, close, 1_000.0)
    }

    #[test]
    fn no_touch_no_exit() {
        let b = bar(100.0, 101.0, 99.5, 100.5);
        assert_eq!(resolve_exit(Direction::Long, 99.0, Some(102.0), &b, IntrabarPolicy::WorstCase), None);
    }

    #[test]
    fn long_stop_fills_at_stop() {
        let b = bar(100.0, 100.5, 98.0, 98.5);
        assert_eq!(
            resolve_exit(Direction::Long, 99.0, None, &b, IntrabarPolicy::WorstCase),
            Some((99.0, ExitReason::StopLoss))
        );
    }

    #[test]
    fn gap_through_stop_fills_at_open() {
        let b = bar(97.0, 98.0, 96.0, 97.5);
        assert_eq!(
            resolve_exit(Direction::Long, 99.0, Some(102.0), &b, IntrabarPolicy::BestCase),
            Some((97.0, ExitReason::StopLoss))
        );
    }

    #[test]
    fn short_gap_through_target_fills_at_open() {
        let b = bar(94.0, 95.0, 93.0, 94.5);
        assert_eq!(
            resolve_exit(Direction::Short, 101.0, Some(95.0), &b, IntrabarPolicy::WorstCase),
            Some((94.0, ExitReason::TakeProfit))
        );
    }

    #[test]
    fn ambiguous_bar_follows_policy() {
        let b = bar(100.0, 103.0, 98.0, 100.0);
        let worst = resolve_exit(Direction::Long, 99.0, Some(102.0), &b, IntrabarPolicy::WorstCase);
        let best = resolve_exit(Direction::Long, 99.0, Some(102.0), &b, IntrabarPolicy::BestCase);
        assert_eq!(worst, Some((99.0, ExitReason::StopLoss)));
        assert_eq!(best, Some((102.0, ExitReason::TakeProfit)));
    }

    #[test]
    fn ohlc_path_visits_nearer_extreme_first() {
        // open closer to high → high first → long target first
        let high_first = bar(102.5, 103.0, 98.0, 99.0);
        assert_eq!(
            resolve_exit(Direction::Long, 99.0, Some(102.8), &high_first, IntrabarPolicy::OhlcPath),
            Some((102.8, ExitReason::TakeProfit))
        );
        // open closer to low → low first → long stop first
        let low_first = bar(98.5, 103.0, 98.0, 102.0);
        assert_eq!(
            resolve_exit(Direction::Long, 98.2, Some(102.8), &low_first, IntrabarPolicy::OhlcPath),
            Some((98.2, ExitReason::StopLoss))
        );
        // short: high first → stop (above) first
        assert_eq!(
            resolve_exit(Direction::Short, 102.8, Some(98.2), &high_first, IntrabarPolicy::OhlcPath),
            Some((102.8, ExitReason::StopLoss))
        );
    }
}
