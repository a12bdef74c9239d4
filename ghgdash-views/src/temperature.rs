//! Global temperature against the 1 °C and 1.5 °C warming thresholds
//!
//! The pre-industrial baseline is the rolling mean at the reference year, less one
//! degree. The thresholds are drawn relative to that baseline.

use ghgdash_core::errors::{GhgError, GhgResult};
use ghgdash_core::observation::{FloatValue, Year};
use ghgdash_core::temperature::TemperatureRecord;
use serde::{Deserialize, Serialize};

/// Display range of the temperature axis
pub const Y_RANGE: (FloatValue, FloatValue) = (-0.8, 1.8);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSettings {
    /// Length of the trailing rolling mean in years
    ///
    /// Default: 30
    pub window: usize,
    /// Year whose rolling mean is taken as 1 °C above pre-industrial
    ///
    /// Default: 2017
    pub reference_year: Year,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            window: 30,
            reference_year: 2017,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRow {
    pub year: Year,
    pub temperature: FloatValue,
    pub rolling_average: Option<FloatValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureChart {
    pub title: String,
    pub y_range: (FloatValue, FloatValue),
    pub pre_industrial: FloatValue,
    pub one_degree: FloatValue,
    pub one_and_half_degree: FloatValue,
    pub rows: Vec<TemperatureRow>,
}

pub fn temperature_chart(
    record: &TemperatureRecord,
    settings: &TemperatureSettings,
) -> GhgResult<TemperatureChart> {
    if settings.window == 0 {
        return Err(GhgError::InvalidParameter {
            name: "window".to_string(),
            reason: "must be at least one year".to_string(),
        });
    }
    let pre_industrial = record.rolling_mean_at(settings.window, settings.reference_year)? - 1.0;

    let rows = record
        .years()
        .iter()
        .zip(record.temperatures().iter())
        .zip(record.rolling_mean(settings.window))
        .map(|((year, temperature), rolling_average)| TemperatureRow {
            year: *year,
            temperature: *temperature,
            rolling_average,
        })
        .collect();

    Ok(TemperatureChart {
        title: "Global mean temperature history".to_string(),
        y_range: Y_RANGE,
        pre_industrial,
        one_degree: pre_industrial + 1.0,
        one_and_half_degree: pre_industrial + 1.5,
        rows,
    })
}
