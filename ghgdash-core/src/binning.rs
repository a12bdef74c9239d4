//! Choropleth binner
//!
//! For every year in a range, and for each map metric, computes the class breakpoints
//! used to colour the countries and packages them with the per-country values.
//!
//! Two binning schemes are supported:
//!
//! - [`BinSchedule::Quantiles`]: breakpoints at fixed empirical quantiles, using linear
//!   interpolation between order statistics
//! - [`BinSchedule::EqualInterval`]: equally spaced breakpoints between the minimum and
//!   maximum value
//!
//! Missing values are excluded before binning. When fewer than two values remain the
//! layer collapses to a single class.

use crate::normalize::{NormalizedRow, NormalizedTable};
use crate::observation::{FloatValue, Year, YearRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Probabilities for the CO2-per-capita breakpoints
pub const CO2_PER_CAPITA_QUANTILES: [FloatValue; 9] =
    [0.0, 0.3, 0.5, 0.6, 0.7, 0.8, 0.9, 0.97, 1.0];
/// Probabilities for the total-CO2 breakpoints
pub const CO2_QUANTILES: [FloatValue; 8] = [0.0, 0.2, 0.3, 0.5, 0.6, 0.8, 0.97, 1.0];
/// Number of classes used for the growth-percentage layer
pub const GROWTH_CLASSES: usize = 6;

/// How breakpoints are placed for a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinSchedule {
    Quantiles(&'static [FloatValue]),
    EqualInterval { classes: usize },
}

impl BinSchedule {
    /// Breakpoints for a set of values.
    ///
    /// Missing and non-finite values must already be removed. The result is
    /// non-decreasing and starts and ends with the minimum and maximum value.
    /// An empty input gives no breakpoints and a single input gives `[v, v]`.
    pub fn breakpoints(&self, values: &[FloatValue]) -> Vec<FloatValue> {
        let mut sorted = values.to_vec();
        sorted.sort_by(FloatValue::total_cmp);

        match sorted.len() {
            0 => vec![],
            1 => vec![sorted[0], sorted[0]],
            _ => match self {
                BinSchedule::Quantiles(probabilities) => probabilities
                    .iter()
                    .map(|p| quantile_sorted(&sorted, *p))
                    .collect(),
                BinSchedule::EqualInterval { classes } => {
                    let classes = (*classes).max(1);
                    let min = sorted[0];
                    let max = sorted[sorted.len() - 1];
                    let width = (max - min) / classes as FloatValue;
                    let mut edges: Vec<FloatValue> =
                        (0..classes).map(|i| min + width * i as FloatValue).collect();
                    edges.push(max);
                    edges
                }
            },
        }
    }
}

/// Empirical quantile of sorted data with linear interpolation
///
/// $$ h = (n - 1) p, \quad Q(p) = x_{\lfloor h \rfloor} + (h - \lfloor h \rfloor)(x_{\lfloor h \rfloor + 1} - x_{\lfloor h \rfloor}) $$
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile_sorted(sorted: &[FloatValue], probability: FloatValue) -> FloatValue {
    assert!(!sorted.is_empty(), "Cannot take a quantile of no values");
    let p = probability.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as FloatValue * p;
    let lower = h.floor() as usize;
    if lower + 1 >= sorted.len() {
        return sorted[sorted.len() - 1];
    }
    let fraction = h - lower as FloatValue;
    sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower])
}

/// Quantity shown on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Co2PerCapita,
    Co2,
    Co2GrowthPrct,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Co2PerCapita, Metric::Co2, Metric::Co2GrowthPrct];

    pub fn value(&self, row: &NormalizedRow) -> Option<FloatValue> {
        let obs = &row.observation;
        match self {
            Metric::Co2PerCapita => obs.co2_per_capita,
            Metric::Co2 => obs.co2,
            Metric::Co2GrowthPrct => obs.co2_growth_prct,
        }
    }

    pub fn schedule(&self) -> BinSchedule {
        match self {
            Metric::Co2PerCapita => BinSchedule::Quantiles(&CO2_PER_CAPITA_QUANTILES),
            Metric::Co2 => BinSchedule::Quantiles(&CO2_QUANTILES),
            Metric::Co2GrowthPrct => BinSchedule::EqualInterval {
                classes: GROWTH_CLASSES,
            },
        }
    }

    /// Name of the layer in the map's layer control
    pub fn layer_name(&self) -> &'static str {
        match self {
            Metric::Co2PerCapita => "CO2 emissions per capita",
            Metric::Co2 => "total CO2 emissions",
            Metric::Co2GrowthPrct => "CO2 growth percentage",
        }
    }

    pub fn legend_name(&self) -> &'static str {
        match self {
            Metric::Co2PerCapita => "CO2 emissions per capita in tonnes (t)",
            Metric::Co2 => "CO2 emissions in million tonnes (Mt)",
            Metric::Co2GrowthPrct => "CO2 Growth Percentage",
        }
    }

    /// Colour scheme name understood by the map renderer
    pub fn fill_color(&self) -> &'static str {
        match self {
            Metric::Co2PerCapita => "Reds",
            Metric::Co2 => "RdPu",
            Metric::Co2GrowthPrct => "PuBu",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.layer_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryValue {
    pub country: String,
    pub value: Option<FloatValue>,
}

/// Breakpoints and values for one (year, metric) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinnedLayer {
    pub year: Year,
    pub metric: Metric,
    pub layer_name: &'static str,
    pub legend_name: &'static str,
    pub fill_color: &'static str,
    pub breakpoints: Vec<FloatValue>,
    pub values: Vec<CountryValue>,
}

impl BinnedLayer {
    /// Bin the rows of a single year
    pub fn from_rows<'a>(
        year: Year,
        metric: Metric,
        rows: impl IntoIterator<Item = &'a NormalizedRow>,
    ) -> Self {
        let values: Vec<CountryValue> = rows
            .into_iter()
            .map(|row| CountryValue {
                country: row.country().to_string(),
                value: metric.value(row).filter(|v| v.is_finite()),
            })
            .collect();
        let present: Vec<FloatValue> = values.iter().filter_map(|v| v.value).collect();

        Self {
            year,
            metric,
            layer_name: metric.layer_name(),
            legend_name: metric.legend_name(),
            fill_color: metric.fill_color(),
            breakpoints: metric.schedule().breakpoints(&present),
            values,
        }
    }

    /// Number of display classes
    pub fn classes(&self) -> usize {
        self.breakpoints.len().saturating_sub(1).max(1)
    }

    /// Display class of a value.
    ///
    /// Class `i` covers `(b[i], b[i+1]]`, with the first class also including the
    /// lowest breakpoint. Values outside the breakpoints are clamped to the outer
    /// classes. Missing values have no class.
    pub fn class_of(&self, value: Option<FloatValue>) -> Option<usize> {
        let value = value.filter(|v| v.is_finite())?;
        if self.breakpoints.len() <= 2 {
            return Some(0);
        }
        let upper_edges = &self.breakpoints[1..];
        let class = upper_edges.partition_point(|edge| *edge < value);
        Some(class.min(self.classes() - 1))
    }
}

/// All layers for a year range, keyed by (year, metric)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoroplethLayers {
    layers: BTreeMap<(Year, Metric), BinnedLayer>,
}

impl ChoroplethLayers {
    pub fn get(&self, year: Year, metric: Metric) -> Option<&BinnedLayer> {
        self.layers.get(&(year, metric))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers ordered by year, then metric
    pub fn iter(&self) -> impl Iterator<Item = &BinnedLayer> {
        self.layers.values()
    }

    pub fn into_layers(self) -> Vec<BinnedLayer> {
        self.layers.into_values().collect()
    }
}

/// Compute the layers for every year in `range` and every [`Metric`]
pub fn bin_layers(table: &NormalizedTable, range: YearRange) -> ChoroplethLayers {
    let mut by_year: BTreeMap<Year, Vec<&NormalizedRow>> = BTreeMap::new();
    for row in table.rows().iter().filter(|row| range.contains(row.year())) {
        by_year.entry(row.year()).or_default().push(row);
    }

    let mut layers = BTreeMap::new();
    for year in range.years() {
        let rows = by_year.get(&year).map(Vec::as_slice).unwrap_or_default();
        for metric in Metric::ALL {
            layers.insert(
                (year, metric),
                BinnedLayer::from_rows(year, metric, rows.iter().copied()),
            );
        }
    }

    ChoroplethLayers { layers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::EmissionsDataset;
    use crate::normalize::normalize;
    use crate::observation::Observation;
    use is_close::is_close;

    fn row(country: &str, year: Year, co2_per_capita: Option<FloatValue>) -> Observation {
        let mut obs = Observation::empty(country, year);
        obs.co2_per_capita = co2_per_capita;
        obs.co2 = co2_per_capita.map(|v| v * 10.0);
        obs.co2_growth_prct = co2_per_capita.map(|v| v - 5.0);
        obs
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 5.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 3.0);
        assert!(is_close!(quantile_sorted(&sorted, 0.3), 2.2));
        assert!(is_close!(quantile_sorted(&sorted, 0.97), 4.88));
    }

    #[test]
    fn quantile_breakpoints_span_values() {
        let values = [7.0, 0.5, 3.0, 12.0, 3.0, 1.0, 9.5];
        let breakpoints = BinSchedule::Quantiles(&CO2_PER_CAPITA_QUANTILES).breakpoints(&values);

        assert_eq!(breakpoints.len(), CO2_PER_CAPITA_QUANTILES.len());
        assert_eq!(breakpoints[0], 0.5);
        assert_eq!(*breakpoints.last().unwrap(), 12.0);
        assert!(breakpoints.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn equal_interval_breakpoints() {
        let breakpoints = BinSchedule::EqualInterval { classes: 4 }.breakpoints(&[-10.0, 30.0, 0.0]);
        assert_eq!(breakpoints, vec![-10.0, 0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn degenerate_inputs_collapse_to_one_class() {
        let schedule = BinSchedule::Quantiles(&CO2_QUANTILES);
        assert!(schedule.breakpoints(&[]).is_empty());
        assert_eq!(schedule.breakpoints(&[4.2]), vec![4.2, 4.2]);
    }

    #[test]
    fn layers_cover_every_year_and_metric() {
        let dataset = EmissionsDataset::from_observations(vec![
            row("Finland", 2000, Some(10.0)),
            row("Sweden", 2000, Some(5.0)),
            row("Norway", 2000, None),
            row("Finland", 2001, Some(9.0)),
        ]);
        let range = YearRange::new(2000, 2002).unwrap();
        let table = normalize(&dataset, range);
        let layers = bin_layers(&table, range);

        assert_eq!(layers.len(), 9);

        let layer = layers.get(2000, Metric::Co2PerCapita).unwrap();
        assert_eq!(layer.values.len(), 3);
        assert_eq!(layer.breakpoints.first(), Some(&5.0));
        assert_eq!(layer.breakpoints.last(), Some(&10.0));

        // a single value in 2001 and none in 2002
        let single = layers.get(2001, Metric::Co2).unwrap();
        assert_eq!(single.breakpoints, vec![90.0, 90.0]);
        assert_eq!(single.class_of(Some(90.0)), Some(0));
        let empty = layers.get(2002, Metric::Co2GrowthPrct).unwrap();
        assert!(empty.breakpoints.is_empty());
        assert!(empty.values.is_empty());
    }

    #[test]
    fn class_of_value() {
        let layer = BinnedLayer {
            year: 2000,
            metric: Metric::Co2,
            layer_name: Metric::Co2.layer_name(),
            legend_name: Metric::Co2.legend_name(),
            fill_color: Metric::Co2.fill_color(),
            breakpoints: vec![0.0, 1.0, 5.0, 10.0],
            values: vec![],
        };
        assert_eq!(layer.classes(), 3);
        assert_eq!(layer.class_of(Some(0.0)), Some(0));
        assert_eq!(layer.class_of(Some(1.0)), Some(0));
        assert_eq!(layer.class_of(Some(1.5)), Some(1));
        assert_eq!(layer.class_of(Some(10.0)), Some(2));
        assert_eq!(layer.class_of(Some(50.0)), Some(2));
        assert_eq!(layer.class_of(None), None);
    }
}
