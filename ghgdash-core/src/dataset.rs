//! The emissions dataset.
//!
//! The dataset is loaded once per process and is read-only afterwards. Every stage of the
//! pipeline borrows it; none of them mutate it.

use crate::errors::{GhgError, GhgResult};
use crate::observation::{Observation, Year};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Columns that must be present in the source table
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "country",
    "year",
    "co2",
    "co2_per_capita",
    "co2_growth_prct",
    "methane",
    "gdp",
    "population",
    "energy_per_capita",
];

/// Per-country, per-year emissions and macroeconomic indicators.
///
/// Rows are grouped by region name (countries as well as aggregates such as "World")
/// and sorted by year within each region.
#[derive(Debug, Clone, Default)]
pub struct EmissionsDataset {
    regions: BTreeMap<String, Vec<Observation>>,
}

impl EmissionsDataset {
    /// Build a dataset from already parsed observations
    ///
    /// Duplicate (region, year) pairs keep the last observation.
    pub fn from_observations(observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut regions: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for obs in observations {
            regions.entry(obs.country.clone()).or_default().push(obs);
        }
        for series in regions.values_mut() {
            series.sort_by_key(|obs| obs.year);
            series.reverse();
            series.dedup_by_key(|obs| obs.year);
            series.reverse();
        }
        Self { regions }
    }

    /// Load a dataset from a CSV file
    pub fn from_path(path: impl AsRef<Path>) -> GhgResult<Self> {
        let path = path.as_ref();
        let dataset = Self::from_reader(File::open(path)?)?;
        info!(
            path = %path.display(),
            regions = dataset.regions.len(),
            rows = dataset.len(),
            "Loaded emissions dataset"
        );
        Ok(dataset)
    }

    /// Parse a dataset from CSV.
    ///
    /// The header must contain every column in [`REQUIRED_COLUMNS`]; additional columns
    /// are ignored and padding around header names is dropped. Empty cells are read as
    /// missing values.
    ///
    /// # Errors
    ///
    /// * [`GhgError::Schema`] if any required column is absent
    /// * [`GhgError::InvalidRecord`] if a row has a non-positive year
    pub fn from_reader<R: Read>(reader: R) -> GhgResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|h| h == **column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(GhgError::Schema { missing });
        }

        let mut observations = Vec::new();
        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record)? {
            let obs: Observation = record.deserialize(Some(&headers))?;
            if obs.year <= 0 {
                return Err(GhgError::InvalidRecord {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    reason: format!("year must be positive, got {}", obs.year),
                });
            }
            observations.push(obs);
        }

        Ok(Self::from_observations(observations))
    }

    /// Number of rows across all regions
    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Latest year present anywhere in the dataset
    pub fn max_year(&self) -> Option<Year> {
        self.regions
            .values()
            .filter_map(|series| series.last().map(|obs| obs.year))
            .max()
    }

    /// Names of all regions in the dataset, including aggregates
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn has_region(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    /// Rows for a single region, sorted by year
    pub fn region_series(&self, name: &str) -> GhgResult<&[Observation]> {
        self.regions
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| GhgError::UnknownRegion(name.to_string()))
    }

    /// Iterate over every row, grouped by region
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.regions.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "iso_code,country,year,co2,co2_per_capita,co2_growth_prct,methane,gdp,population,energy_per_capita";

    #[test]
    fn parses_rows_and_missing_values() {
        let csv = format!(
            "{HEADER}\nFIN,Finland,2018,45.9,8.3,-2.1,5.1,2.1e11,5.5e6,\nFIN,Finland,2017,46.9,8.5,,5.2,2.0e11,5.5e6,65000\n"
        );
        let dataset = EmissionsDataset::from_reader(csv.as_bytes()).unwrap();

        let series = dataset.region_series("Finland").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].year, 2017);
        assert_eq!(series[0].co2_growth_prct, None);
        assert_eq!(series[0].energy_per_capita, Some(65000.0));
        assert_eq!(series[1].energy_per_capita, None);
        assert_eq!(dataset.max_year(), Some(2018));
    }

    #[test]
    fn missing_columns_are_a_schema_error() {
        let csv = "country,year,co2,population\nFinland,2018,45.9,5.5e6\n";
        let err = EmissionsDataset::from_reader(csv.as_bytes()).unwrap_err();

        match err {
            GhgError::Schema { missing } => {
                assert_eq!(
                    missing,
                    vec![
                        "co2_per_capita",
                        "co2_growth_prct",
                        "methane",
                        "gdp",
                        "energy_per_capita"
                    ]
                );
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_year_is_rejected() {
        let csv = format!("{HEADER}\nFIN,Finland,0,,,,,,,\n");
        let err = EmissionsDataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, GhgError::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn unknown_region() {
        let dataset = EmissionsDataset::from_observations(vec![Observation::empty("World", 2000)]);
        assert!(dataset.has_region("World"));
        assert!(matches!(
            dataset.region_series("Atlantis"),
            Err(GhgError::UnknownRegion(_))
        ));
    }

    #[test]
    fn duplicate_years_keep_last_row() {
        let mut first = Observation::empty("Testland", 2000);
        first.co2 = Some(1.0);
        let mut second = Observation::empty("Testland", 2000);
        second.co2 = Some(2.0);

        let dataset = EmissionsDataset::from_observations(vec![first, second]);
        let series = dataset.region_series("Testland").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].co2, Some(2.0));
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}\nSWE,Sweden,2019,41.8,4.1,-1.5,4.5,5.3e11,1.0e7,").unwrap();

        let dataset = EmissionsDataset::from_path(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.regions().collect::<Vec<_>>(), vec!["Sweden"]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmissionsDataset::from_path(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, GhgError::Io(_)));
    }

    #[test]
    fn padded_header_names() {
        let csv = "iso_code, country , year,co2,co2_per_capita,co2_growth_prct,methane,gdp,population,energy_per_capita\n\
                   FIN,Finland,2018,45.9,8.3,-2.1,5.1,2.1e11,5.5e6,\n";
        let dataset = EmissionsDataset::from_reader(csv.as_bytes()).unwrap();
        let series = dataset.region_series("Finland").unwrap();
        assert_eq!(series[0].year, 2018);

        let csv = "country, yr,co2,co2_per_capita,co2_growth_prct,methane,gdp,population,energy_per_capita\n\
                   Finland,2018,45.9,8.3,-2.1,5.1,2.1e11,5.5e6,\n";
        match EmissionsDataset::from_reader(csv.as_bytes()) {
            Err(GhgError::Schema { missing }) => assert_eq!(missing, vec!["year".to_string()]),
            other => panic!("expected a schema error, got {other:?}"),
        }
    }
}
