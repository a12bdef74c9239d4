//! Global mean temperature record.
//!
//! The source file starts with a single descriptive line before the `Year,Temperature`
//! header. Temperatures are anomalies in °C.

use crate::errors::{GhgError, GhgResult};
use crate::observation::{FloatValue, Year};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureObservation {
    #[serde(rename = "Year")]
    pub year: Year,
    #[serde(rename = "Temperature")]
    pub temperature: FloatValue,
}

/// Annual global temperature anomalies, sorted by year
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureRecord {
    years: Vec<Year>,
    temperatures: Array1<FloatValue>,
}

impl TemperatureRecord {
    pub fn from_observations(observations: impl IntoIterator<Item = TemperatureObservation>) -> Self {
        let mut observations: Vec<_> = observations.into_iter().collect();
        observations.sort_by_key(|obs| obs.year);
        Self {
            years: observations.iter().map(|obs| obs.year).collect(),
            temperatures: observations.iter().map(|obs| obs.temperature).collect(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> GhgResult<Self> {
        let path = path.as_ref();
        let record = Self::from_reader(File::open(path)?)?;
        info!(
            path = %path.display(),
            years = record.len(),
            "Loaded temperature record"
        );
        Ok(record)
    }

    /// Parse the record, skipping the one-line preamble
    pub fn from_reader<R: Read>(reader: R) -> GhgResult<Self> {
        let mut reader = BufReader::new(reader);
        let mut preamble = String::new();
        reader.read_line(&mut preamble)?;

        let mut csv_reader = csv::Reader::from_reader(reader);
        let observations = csv_reader
            .deserialize::<TemperatureObservation>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_observations(observations))
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn temperatures(&self) -> &Array1<FloatValue> {
        &self.temperatures
    }

    /// Trailing rolling mean over `window` years.
    ///
    /// The first `window - 1` entries are undefined.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn rolling_mean(&self, window: usize) -> Vec<Option<FloatValue>> {
        assert!(window > 0, "Rolling window must be at least one year");
        let mut result = vec![None; self.len().min(window - 1)];
        result.extend(
            self.temperatures
                .windows(window)
                .into_iter()
                .map(|values| values.mean()),
        );
        result
    }

    /// Rolling mean at a given year
    pub fn rolling_mean_at(&self, window: usize, year: Year) -> GhgResult<FloatValue> {
        let index = self
            .years
            .iter()
            .position(|y| *y == year)
            .ok_or(GhgError::MissingReferenceYear(year))?;
        self.rolling_mean(window)[index].ok_or(GhgError::MissingReferenceYear(year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    const SOURCE: &str = "Global Land and Ocean Temperature Anomalies, January-December\n\
                          Year,Temperature\n\
                          2001,0.5\n\
                          2000,0.3\n\
                          2002,0.7\n\
                          2003,0.9\n";

    #[test]
    fn skips_preamble_and_sorts() {
        let record = TemperatureRecord::from_reader(SOURCE.as_bytes()).unwrap();
        assert_eq!(record.years(), &[2000, 2001, 2002, 2003]);
        assert_eq!(record.temperatures()[0], 0.3);
    }

    #[test]
    fn trailing_rolling_mean() {
        let record = TemperatureRecord::from_reader(SOURCE.as_bytes()).unwrap();
        let rolling = record.rolling_mean(3);

        assert_eq!(rolling.len(), 4);
        assert_eq!(rolling[0], None);
        assert_eq!(rolling[1], None);
        assert!(is_close!(rolling[2].unwrap(), 0.5));
        assert!(is_close!(rolling[3].unwrap(), 0.7));
    }

    #[test]
    fn window_longer_than_record() {
        let record = TemperatureRecord::from_reader(SOURCE.as_bytes()).unwrap();
        assert_eq!(record.rolling_mean(10), vec![None; 4]);
    }

    #[test]
    fn missing_reference_year() {
        let record = TemperatureRecord::from_reader(SOURCE.as_bytes()).unwrap();
        assert!(matches!(
            record.rolling_mean_at(3, 2001),
            Err(GhgError::MissingReferenceYear(2001))
        ));
        assert!(matches!(
            record.rolling_mean_at(3, 2017),
            Err(GhgError::MissingReferenceYear(2017))
        ));
        assert!(is_close!(record.rolling_mean_at(3, 2003).unwrap(), 0.7));
    }
}
