//! Trend forecaster
//!
//! Projects a region's CO2 or methane emissions a few years into the future with an
//! ordinary least-squares model whose predictors lag the target.
//!
//! # Alignment
//!
//! For a horizon $H$ and a training cutoff $T$, only years after $T$ are used. Let
//! $A$ be the last year in which the target and every predictor are present and $L$
//! the last year in the series. Then
//!
//! - `years_cut_off` $= L - A$
//! - `shift_by` $= H + (L - A)$
//! - `predict_from` $= A + 1 - \text{shift\_by}$
//!
//! A training row at year $y < \text{predict\_from}$ pairs the predictors at $y$ with
//! the target at $y + \text{shift\_by}$, so predictors always come from the past. Rows
//! from `predict_from` up to $A$ are the prediction inputs, and their forecasts are
//! reported at $y + \text{shift\_by}$.
//!
//! Regions without any complete year, or without enough training rows to estimate the
//! model, produce an empty series. This is expected for sparse data and is not an error.

use crate::dataset::EmissionsDataset;
use crate::errors::{GhgError, GhgResult};
use crate::observation::{FloatValue, Observation, Year};
use crate::utils::linear_algebra::{upper_tail, OlsFit};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Greenhouse gas being forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gas {
    Co2,
    Methane,
}

impl Gas {
    /// Target value of an observation
    pub fn target(&self, obs: &Observation) -> Option<FloatValue> {
        match self {
            Gas::Co2 => obs.co2,
            Gas::Methane => obs.methane,
        }
    }

    /// Predictors of the lagged regression, in design-matrix column order
    pub fn predictors(&self) -> &'static [Predictor] {
        match self {
            Gas::Co2 => &[
                Predictor::Year,
                Predictor::Population,
                Predictor::EnergyPerCapita,
            ],
            Gas::Methane => &[Predictor::Year, Predictor::Methane, Predictor::Population],
        }
    }

    fn predictor_values(&self, obs: &Observation) -> Option<Vec<FloatValue>> {
        self.predictors()
            .iter()
            .map(|predictor| predictor.value(obs))
            .collect()
    }

    /// Test if the target and every predictor are present
    pub fn is_complete(&self, obs: &Observation) -> bool {
        self.target(obs).is_some() && self.predictor_values(obs).is_some()
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gas::Co2 => f.write_str("CO2"),
            Gas::Methane => f.write_str("methane"),
        }
    }
}

/// Explanatory variable of the regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predictor {
    Year,
    Population,
    EnergyPerCapita,
    Methane,
}

impl Predictor {
    pub fn value(&self, obs: &Observation) -> Option<FloatValue> {
        match self {
            Predictor::Year => Some(FloatValue::from(obs.year)),
            Predictor::Population => obs.population,
            Predictor::EnergyPerCapita => obs.energy_per_capita,
            Predictor::Methane => obs.methane,
        }
    }
}

/// Longest accepted forecast horizon in years
pub const MAX_HORIZON: u32 = 1000;

/// Parameters for a trend forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastParameters {
    /// Number of years to project beyond the last complete year.
    ///
    /// Default: 5
    pub horizon: u32,

    /// Training cutoff: only years strictly after this one are used.
    ///
    /// Default: 1980
    pub train_from: Year,

    /// Confidence level of the prediction interval.
    ///
    /// Default: 0.95
    pub confidence: FloatValue,

    /// Add a constant column to the design matrix.
    ///
    /// Default: false (predictors used as given)
    pub fit_intercept: bool,
}

impl Default for ForecastParameters {
    fn default() -> Self {
        Self {
            horizon: 5,
            train_from: 1980,
            confidence: 0.95,
            fit_intercept: false,
        }
    }
}

impl ForecastParameters {
    /// Parameters used for methane, whose records are sparse before 2000
    pub fn methane_default() -> Self {
        Self {
            train_from: 2000,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> GhgResult<()> {
        if self.horizon == 0 || self.horizon > MAX_HORIZON {
            return Err(GhgError::InvalidParameter {
                name: "horizon".to_string(),
                reason: format!(
                    "must be between 1 and {MAX_HORIZON} years, got {}",
                    self.horizon
                ),
            });
        }
        // The upper tail probability must stay representable below 1
        if !(self.confidence > 0.0 && upper_tail(self.confidence) < 1.0) {
            return Err(GhgError::InvalidParameter {
                name: "confidence".to_string(),
                reason: format!("must be strictly between 0 and 1, got {}", self.confidence),
            });
        }
        Ok(())
    }

    /// Horizon as a calendar-year offset
    fn horizon_years(&self) -> Option<Year> {
        Year::try_from(self.horizon).ok()
    }
}

/// Year alignment of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastPlan {
    /// Last year with the target and every predictor present
    pub available_data_year: Year,
    /// Last year in the training window
    pub last_year: Year,
    pub years_cut_off: Year,
    pub shift_by: Year,
    /// First year used as prediction input
    pub predict_from: Year,
}

impl ForecastPlan {
    /// Calendar year a prediction made from `input_year` refers to
    pub fn forecast_year(&self, input_year: Year) -> Year {
        input_year + self.shift_by
    }
}

/// Training and prediction rows of a forecast
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDesign {
    pub plan: ForecastPlan,
    /// Input years of the training rows
    pub training_years: Vec<Year>,
    training: Vec<(Vec<FloatValue>, FloatValue)>,
    /// Input years and predictor values of the prediction rows
    prediction: Vec<(Year, Vec<FloatValue>)>,
}

impl ForecastDesign {
    pub fn prediction_years(&self) -> impl Iterator<Item = Year> + '_ {
        self.prediction.iter().map(|(year, _)| *year)
    }

    /// Calendar years the forecast will be reported at
    pub fn forecast_years(&self) -> impl Iterator<Item = Year> + '_ {
        self.prediction_years()
            .map(|year| self.plan.forecast_year(year))
    }

    fn fit(&self) -> Option<OlsFit> {
        let n = self.training.len();
        let p = self.training.first()?.0.len();
        let design = DMatrix::from_fn(n, p, |i, j| self.training[i].0[j]);
        let target = DVector::from_iterator(n, self.training.iter().map(|(_, y)| *y));
        OlsFit::fit(&design, &target)
    }
}

/// A single projected value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub year: Year,
    pub estimate: FloatValue,
    pub lower: FloatValue,
    pub upper: FloatValue,
}

/// Projected values for one (region, gas) pair, ordered by year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub region: String,
    pub gas: Gas,
    pub plan: Option<ForecastPlan>,
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn empty(region: impl Into<String>, gas: Gas) -> Self {
        Self {
            region: region.into(),
            gas,
            plan: None,
            points: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, year: Year) -> Option<&ForecastPoint> {
        self.points.iter().find(|point| point.year == year)
    }
}

/// Lagged least-squares forecaster for one gas
#[derive(Debug, Clone, PartialEq)]
pub struct TrendForecaster {
    gas: Gas,
    parameters: ForecastParameters,
}

impl TrendForecaster {
    /// Create a new forecaster, validating the parameters
    pub fn from_parameters(gas: Gas, parameters: ForecastParameters) -> GhgResult<Self> {
        parameters.validate()?;
        Ok(Self { gas, parameters })
    }

    pub fn gas(&self) -> Gas {
        self.gas
    }

    pub fn parameters(&self) -> &ForecastParameters {
        &self.parameters
    }

    fn window<'a>(&self, series: &'a [Observation]) -> impl Iterator<Item = &'a Observation> {
        let train_from = self.parameters.train_from;
        series.iter().filter(move |obs| obs.year > train_from)
    }

    /// Year alignment for a region's series
    ///
    /// Returns `None` if no year after the training cutoff is complete.
    pub fn plan(&self, series: &[Observation]) -> Option<ForecastPlan> {
        let last_year = self.window(series).map(|obs| obs.year).max()?;
        let available_data_year = self
            .window(series)
            .filter(|obs| self.gas.is_complete(obs))
            .map(|obs| obs.year)
            .max()?;

        let years_cut_off = last_year - available_data_year;
        let shift_by = self
            .parameters
            .horizon_years()?
            .checked_add(years_cut_off)?;
        Some(ForecastPlan {
            available_data_year,
            last_year,
            years_cut_off,
            shift_by,
            predict_from: available_data_year.checked_add(1)?.checked_sub(shift_by)?,
        })
    }

    /// Split a region's series into training and prediction rows
    pub fn design(&self, series: &[Observation]) -> Option<ForecastDesign> {
        let plan = self.plan(series)?;

        let targets: BTreeMap<Year, FloatValue> = self
            .window(series)
            .filter_map(|obs| self.gas.target(obs).map(|value| (obs.year, value)))
            .collect();

        let mut training_years = vec![];
        let mut training = vec![];
        let mut prediction = vec![];
        for obs in self.window(series) {
            let Some(row) = self.design_row(obs) else {
                continue;
            };
            if obs.year < plan.predict_from {
                if let Some(target) = targets.get(&plan.forecast_year(obs.year)) {
                    training_years.push(obs.year);
                    training.push((row, *target));
                }
            } else if obs.year <= plan.available_data_year {
                prediction.push((obs.year, row));
            }
        }

        Some(ForecastDesign {
            plan,
            training_years,
            training,
            prediction,
        })
    }

    fn design_row(&self, obs: &Observation) -> Option<Vec<FloatValue>> {
        let mut row = self.gas.predictor_values(obs)?;
        if self.parameters.fit_intercept {
            row.insert(0, 1.0);
        }
        Some(row)
    }

    /// Forecast a region's series.
    ///
    /// The series must belong to a single region and be sorted by year, as returned by
    /// [`EmissionsDataset::region_series`].
    pub fn forecast(&self, region: &str, series: &[Observation]) -> ForecastSeries {
        let Some(design) = self.design(series) else {
            debug!(region, gas = %self.gas, "No complete year after the training cutoff");
            return ForecastSeries::empty(region, self.gas);
        };
        let Some(fit) = design.fit() else {
            debug!(
                region,
                gas = %self.gas,
                training_rows = design.training_years.len(),
                "Not enough training data to fit a trend"
            );
            return ForecastSeries {
                plan: Some(design.plan),
                ..ForecastSeries::empty(region, self.gas)
            };
        };

        let points = design
            .prediction
            .iter()
            .map(|(year, row)| {
                let prediction = fit.predict_interval(
                    &DVector::from_column_slice(row),
                    self.parameters.confidence,
                );
                ForecastPoint {
                    year: design.plan.forecast_year(*year),
                    estimate: prediction.estimate,
                    lower: prediction.lower,
                    upper: prediction.upper,
                }
            })
            .collect();

        ForecastSeries {
            region: region.to_string(),
            gas: self.gas,
            plan: Some(design.plan),
            points,
        }
    }

    /// Forecast a region of the dataset by name
    pub fn forecast_region(
        &self,
        dataset: &EmissionsDataset,
        region: &str,
    ) -> GhgResult<ForecastSeries> {
        Ok(self.forecast(region, dataset.region_series(region)?))
    }
}
