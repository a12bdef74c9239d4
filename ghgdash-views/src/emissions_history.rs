//! Historical CO2 and methane emissions of a region, merged with both forecasts
//!
//! The three series are outer-joined on year: a year present in only one of them keeps
//! `None` in the columns of the others.

use ghgdash_core::dataset::EmissionsDataset;
use ghgdash_core::errors::GhgResult;
use ghgdash_core::forecast::{ForecastSeries, TrendForecaster};
use ghgdash_core::observation::{FloatValue, Observation, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Settings of the history chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// First historical year shown
    ///
    /// Default: 1850
    pub from_year: Year,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { from_year: 1850 }
    }
}

/// Events marked on the chart: label, year and vertical offset factor
pub const EVENTS: [(&str, Year, FloatValue); 7] = [
    ("Paris agreement", 2016, 1.05),
    ("Kyoto protocol", 2005, 1.05),
    ("WW1", 1914, 1.3),
    ("WW2", 1939, 1.3),
    ("Early 1980's recession", 1980, 1.05),
    ("The Great Depression", 1930, 1.3),
    ("COVID pandemic", 2019, 0.99),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryRow {
    pub year: Year,
    pub co2: Option<FloatValue>,
    pub methane: Option<FloatValue>,
    pub co2_prediction: Option<FloatValue>,
    pub co2_lower: Option<FloatValue>,
    pub co2_upper: Option<FloatValue>,
    pub methane_prediction: Option<FloatValue>,
    pub methane_lower: Option<FloatValue>,
    pub methane_upper: Option<FloatValue>,
}

impl HistoryRow {
    fn empty(year: Year) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: &'static str,
    pub year: Year,
    pub y: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsHistory {
    pub region: String,
    pub title: String,
    pub rows: Vec<HistoryRow>,
    pub annotations: Vec<Annotation>,
}

impl EmissionsHistory {
    /// Merge a region's history with its CO2 and methane forecasts.
    ///
    /// Only history from `from_year` onwards is kept. Forecast rows are never
    /// filtered.
    pub fn merge(
        region: &str,
        history: &[Observation],
        from_year: Year,
        co2: &ForecastSeries,
        methane: &ForecastSeries,
    ) -> Self {
        let mut rows: BTreeMap<Year, HistoryRow> = BTreeMap::new();

        for obs in history.iter().filter(|obs| obs.year >= from_year) {
            let row = rows
                .entry(obs.year)
                .or_insert_with(|| HistoryRow::empty(obs.year));
            row.co2 = obs.co2;
            row.methane = obs.methane;
        }
        for point in &co2.points {
            let row = rows
                .entry(point.year)
                .or_insert_with(|| HistoryRow::empty(point.year));
            row.co2_prediction = Some(point.estimate);
            row.co2_lower = Some(point.lower);
            row.co2_upper = Some(point.upper);
        }
        for point in &methane.points {
            let row = rows
                .entry(point.year)
                .or_insert_with(|| HistoryRow::empty(point.year));
            row.methane_prediction = Some(point.estimate);
            row.methane_lower = Some(point.lower);
            row.methane_upper = Some(point.upper);
        }

        let annotations = EVENTS
            .iter()
            .filter_map(|(text, year, factor)| {
                let co2 = rows.get(year)?.co2?;
                Some(Annotation {
                    text: *text,
                    year: *year,
                    y: co2.trunc() * factor,
                })
            })
            .collect();

        Self {
            region: region.to_string(),
            title: format!("CO2 and methane emissions history for {region}"),
            rows: rows.into_values().collect(),
            annotations,
        }
    }

    pub fn get(&self, year: Year) -> Option<&HistoryRow> {
        self.rows
            .binary_search_by_key(&year, |row| row.year)
            .ok()
            .map(|index| &self.rows[index])
    }
}

/// Build the history chart of a dataset region
pub fn emissions_history(
    dataset: &EmissionsDataset,
    region: &str,
    settings: &HistorySettings,
    co2: &TrendForecaster,
    methane: &TrendForecaster,
) -> GhgResult<EmissionsHistory> {
    let series = dataset.region_series(region)?;
    let co2_forecast = co2.forecast(region, series);
    let methane_forecast = methane.forecast(region, series);
    debug!(
        region,
        co2_points = co2_forecast.points.len(),
        methane_points = methane_forecast.points.len(),
        "Merging emissions history"
    );
    Ok(EmissionsHistory::merge(
        region,
        series,
        settings.from_year,
        &co2_forecast,
        &methane_forecast,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghgdash_core::forecast::{ForecastPoint, Gas};

    fn observation(year: Year, co2: Option<FloatValue>, methane: Option<FloatValue>) -> Observation {
        let mut obs = Observation::empty("Testland", year);
        obs.co2 = co2;
        obs.methane = methane;
        obs
    }

    fn series(gas: Gas, years: &[Year], estimate: FloatValue) -> ForecastSeries {
        ForecastSeries {
            points: years
                .iter()
                .map(|year| ForecastPoint {
                    year: *year,
                    estimate,
                    lower: estimate - 1.0,
                    upper: estimate + 1.0,
                })
                .collect(),
            ..ForecastSeries::empty("Testland", gas)
        }
    }

    #[test]
    fn outer_join_keeps_missing_columns() {
        let history = vec![
            observation(1840, Some(1.0), None),
            observation(2016, Some(10.6), Some(3.0)),
            observation(2017, Some(11.0), None),
        ];
        let merged = EmissionsHistory::merge(
            "Testland",
            &history,
            1850,
            &series(Gas::Co2, &[2017, 2018], 12.0),
            &series(Gas::Methane, &[2019], 4.0),
        );

        assert_eq!(merged.title, "CO2 and methane emissions history for Testland");
        let years: Vec<Year> = merged.rows.iter().map(|row| row.year).collect();
        assert_eq!(years, vec![2016, 2017, 2018, 2019]);

        let row = merged.get(2017).unwrap();
        assert_eq!(row.co2, Some(11.0));
        assert_eq!(row.co2_prediction, Some(12.0));
        assert_eq!(row.methane, None);
        assert_eq!(row.methane_prediction, None);

        let row = merged.get(2019).unwrap();
        assert_eq!(row.co2, None);
        assert_eq!(row.methane_lower, Some(3.0));
        assert_eq!(row.methane_upper, Some(5.0));
    }

    #[test]
    fn empty_forecasts_leave_history() {
        let history = vec![observation(2000, Some(5.0), Some(1.0))];
        let merged = EmissionsHistory::merge(
            "Testland",
            &history,
            1850,
            &ForecastSeries::empty("Testland", Gas::Co2),
            &ForecastSeries::empty("Testland", Gas::Methane),
        );
        assert_eq!(merged.rows.len(), 1);
        assert_eq!(merged.rows[0].co2_prediction, None);
    }

    #[test]
    fn annotations_follow_truncated_co2() {
        let history = vec![
            observation(2016, Some(10.6), None),
            observation(2019, Some(100.9), None),
            observation(1939, None, None),
        ];
        let merged = EmissionsHistory::merge(
            "Testland",
            &history,
            1850,
            &ForecastSeries::empty("Testland", Gas::Co2),
            &ForecastSeries::empty("Testland", Gas::Methane),
        );

        assert_eq!(merged.annotations.len(), 2);
        assert_eq!(merged.annotations[0].text, "Paris agreement");
        assert_eq!(merged.annotations[0].y, 10.0 * 1.05);
        assert_eq!(merged.annotations[1].text, "COVID pandemic");
        assert_eq!(merged.annotations[1].y, 100.0 * 0.99);
    }
}
