//! Annual CO2 output against its growth percentage for a single year

use ghgdash_core::errors::{GhgError, GhgResult};
use ghgdash_core::normalize::NormalizedTable;
use ghgdash_core::observation::{FloatValue, Year};
use serde::Serialize;

/// Range of the growth axis.
///
/// Growth values are clipped one unit inside the range so that outliers stay visible
/// at the edge of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipRange {
    lower: FloatValue,
    upper: FloatValue,
}

impl ClipRange {
    pub fn new(lower: FloatValue, upper: FloatValue) -> GhgResult<Self> {
        if !(lower.is_finite() && upper.is_finite()) || upper - lower < 2.0 {
            return Err(GhgError::InvalidParameter {
                name: "clip_range".to_string(),
                reason: format!("[{lower}, {upper}] must be finite and at least 2 wide"),
            });
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> FloatValue {
        self.lower
    }

    pub fn upper(&self) -> FloatValue {
        self.upper
    }

    pub fn clip(&self, value: FloatValue) -> FloatValue {
        value.clamp(self.lower + 1.0, self.upper - 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangesPoint {
    pub country: String,
    pub co2_growth_prct: FloatValue,
    pub co2: FloatValue,
    pub gdp_per_capita: Option<FloatValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangesFrame {
    pub year: Year,
    pub title: String,
    pub range: Option<ClipRange>,
    pub points: Vec<ChangesPoint>,
}

/// Scatter of one year of the country-level table.
///
/// Countries without both a CO2 value and a growth percentage are left out.
pub fn changes_frame(table: &NormalizedTable, year: Year, range: Option<ClipRange>) -> ChangesFrame {
    let points = table
        .year(year)
        .filter_map(|row| {
            let obs = &row.observation;
            let growth = obs.co2_growth_prct?;
            Some(ChangesPoint {
                country: row.country().to_string(),
                co2_growth_prct: range.map_or(growth, |range| range.clip(growth)),
                co2: obs.co2?,
                gdp_per_capita: row.gdp_per_capita,
            })
        })
        .collect();

    ChangesFrame {
        year,
        title: format!("Annual CO2 output and percentage change in {year}"),
        range,
        points,
    }
}
