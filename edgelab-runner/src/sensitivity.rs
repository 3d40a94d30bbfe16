//! Parameter sensitivity — grid search plus per-parameter stability.
//!
//! Every Cartesian combination of the grid is backtested. For each parameter,
//! points are grouped by the values of all *other* parameters, and the CV of
//! the metric across the parameter's values is taken inside each group. A high
//! CV means the apparent edge depends on the exact parameter value.

use anyhow::{Context, Result};
use edgelab_core::domain::Bar;
use edgelab_core::engine::{BacktestEngine, BacktestResult};
use edgelab_core::strategy::{StrategyFactory, StrategyParams};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::metrics::coefficient_of_variation;

/// Values to sweep per parameter name.
pub type ParamGrid = BTreeMap<String, Vec<f64>>;

#[derive(Debug, Error, PartialEq)]
pub enum SensitivityError {
    #[error("parameter grid is empty")]
    EmptyGrid,

    #[error("parameter '{0}' has no values")]
    EmptyParam(String),

    #[error("parameter '{0}' was not swept")]
    UnknownParam(String),
}

/// Metric recorded at each grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMetric {
    ProfitFactor,
    SharpeRatio,
    TotalPnl,
    WinRate,
}

impl SweepMetric {
    pub fn name(&self) -> &'static str {
        match self {
            SweepMetric::ProfitFactor => "profit_factor",
            SweepMetric::SharpeRatio => "sharpe_ratio",
            SweepMetric::TotalPnl => "total_pnl",
            SweepMetric::WinRate => "win_rate",
        }
    }

    pub fn all() -> [SweepMetric; 4] {
        [
            SweepMetric::ProfitFactor,
            SweepMetric::SharpeRatio,
            SweepMetric::TotalPnl,
            SweepMetric::WinRate,
        ]
    }

    pub fn value(&self, result: &BacktestResult) -> f64 {
        match self {
            SweepMetric::ProfitFactor => result.profit_factor,
            SweepMetric::SharpeRatio => result.sharpe_ratio,
            SweepMetric::TotalPnl => result.total_pnl,
            SweepMetric::WinRate => result.win_rate,
        }
    }
}

impl Default for SweepMetric {
    fn default() -> Self {
        SweepMetric::ProfitFactor
    }
}

/// One backtest in the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Full parameter set: base params overridden by this combination.
    pub params: StrategyParams,
    /// Every sweep metric, so one grid can be analyzed under any of them.
    pub metrics: BTreeMap<SweepMetric, f64>,
    pub total_trades: usize,
}

impl GridPoint {
    pub fn value(&self, metric: SweepMetric) -> f64 {
        self.metrics.get(&metric).copied().unwrap_or(0.0)
    }
}

/// Stability of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSensitivity {
    pub param: String,
    /// Mean CV across groups.
    pub cv: f64,
    /// Largest CV of any group.
    pub worst_cv: f64,
    /// Groups with at least two values of this parameter.
    pub groups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub metric: SweepMetric,
    pub points: Vec<GridPoint>,
    pub per_param: BTreeMap<String, ParamSensitivity>,
}

/// What a validation run should sweep.
pub struct SensitivityRequest<'a> {
    pub factory: &'a dyn StrategyFactory,
    pub base_params: StrategyParams,
    pub grid: ParamGrid,
    pub metric: SweepMetric,
}

impl std::fmt::Debug for SensitivityRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensitivityRequest")
            .field("base_params", &self.base_params)
            .field("grid", &self.grid)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

/// Grid-search executor over one engine and one strategy factory.
pub struct SensitivityAnalyzer<'a> {
    engine: &'a BacktestEngine,
    factory: &'a dyn StrategyFactory,
    parallel: bool,
}

impl<'a> SensitivityAnalyzer<'a> {
    pub fn new(engine: &'a BacktestEngine, factory: &'a dyn StrategyFactory) -> Self {
        Self {
            engine,
            factory,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution. Results are identical either way.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Backtest every combination of `grid` layered over `base_params`.
    ///
    /// Points come back in lexicographic grid order (parameter names sorted,
    /// values in the order given).
    pub fn grid_search(
        &self,
        bars: &[Bar],
        base_params: &StrategyParams,
        grid: &ParamGrid,
        metric: SweepMetric,
    ) -> Result<Vec<GridPoint>> {
        let combos = combinations(base_params, grid)?;
        info!(points = combos.len(), metric = metric.name(), "grid search started");

        let run = |params: &StrategyParams| -> Result<GridPoint> {
            let strategy = self
                .factory
                .build(params)
                .with_context(|| format!("building strategy for {params:?}"))?;
            let result = self
                .engine
                .run(strategy.as_ref(), bars)
                .with_context(|| format!("backtesting {params:?}"))?;
            let point = GridPoint {
                params: params.clone(),
                metrics: SweepMetric::all().into_iter().map(|m| (m, m.value(&result))).collect(),
                total_trades: result.total_trades,
            };
            debug!(params = ?point.params, value = point.value(metric), trades = point.total_trades, "grid point");
            Ok(point)
        };

        let points = if self.parallel {
            combos.par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            combos.iter().map(run).collect::<Result<Vec<_>>>()?
        };

        if let Some(best) = points
            .iter()
            .max_by(|a, b| a.value(metric).total_cmp(&b.value(metric)))
        {
            info!(params = ?best.params, value = best.value(metric), "best grid point");
        }
        Ok(points)
    }

    /// Grid search, then stability of every swept parameter.
    pub fn run(
        &self,
        bars: &[Bar],
        base_params: &StrategyParams,
        grid: &ParamGrid,
        metric: SweepMetric,
    ) -> Result<SensitivityReport> {
        let points = self.grid_search(bars, base_params, grid, metric)?;
        let per_param = grid
            .keys()
            .map(|name| -> Result<(String, ParamSensitivity)> {
                Ok((name.clone(), analyze_sensitivity(&points, name, metric)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        for s in per_param.values() {
            info!(param = %s.param, cv = s.cv, worst_cv = s.worst_cv, "parameter sensitivity");
        }
        Ok(SensitivityReport {
            metric,
            points,
            per_param,
        })
    }
}

/// Stability of `param` across `points`: group by every other parameter,
/// take the CV of `metric` inside each group, report mean and worst.
///
/// A parameter swept over a single value has nothing to vary and scores 0.
pub fn analyze_sensitivity(
    points: &[GridPoint],
    param: &str,
    metric: SweepMetric,
) -> Result<ParamSensitivity, SensitivityError> {
    if !points.iter().any(|p| p.params.contains_key(param)) {
        return Err(SensitivityError::UnknownParam(param.to_string()));
    }

    let mut groups: BTreeMap<Vec<(&str, u64)>, Vec<f64>> = BTreeMap::new();
    for point in points {
        let key: Vec<(&str, u64)> = point
            .params
            .iter()
            .filter(|(name, _)| name.as_str() != param)
            .map(|(name, value)| (name.as_str(), value.to_bits()))
            .collect();
        groups.entry(key).or_default().push(point.value(metric));
    }

    let cvs: Vec<f64> = groups
        .values()
        .filter(|values| values.len() >= 2)
        .map(|values| coefficient_of_variation(values))
        .collect();
    let cv = if cvs.is_empty() {
        0.0
    } else {
        cvs.iter().sum::<f64>() / cvs.len() as f64
    };

    Ok(ParamSensitivity {
        param: param.to_string(),
        cv,
        worst_cv: cvs.iter().copied().fold(0.0, f64::max),
        groups: cvs.len(),
    })
}

/// Cartesian product of the grid, each layered over the base params.
fn combinations(base: &StrategyParams, grid: &ParamGrid) -> Result<Vec<StrategyParams>, SensitivityError> {
    if grid.is_empty() {
        return Err(SensitivityError::EmptyGrid);
    }
    let mut combos = vec![base.clone()];
    for (name, values) in grid {
        if values.is_empty() {
            return Err(SensitivityError::EmptyParam(name.clone()));
        }
        combos = combos
            .iter()
            .flat_map(|combo| {
                values.iter().map(move |&v| {
                    let mut next = combo.clone();
                    next.insert(name.clone(), v);
                    next
                })
            })
            .collect();
    }
    Ok(combos)
}
