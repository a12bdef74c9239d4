//! Data normalizer
//!
//! Turns the raw emissions table into a country-level table suitable for the map:
//!
//! - aggregate rows (continents, trade blocs, "World") are removed
//! - country names are renamed to the identifiers used by the map geometry
//! - GDP per capita is derived from GDP and population
//! - rows outside the requested year range are dropped

use crate::dataset::EmissionsDataset;
use crate::geometry::GeometryIndex;
use crate::observation::{FloatValue, Observation, Year, YearRange};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Region names in the source data that are not countries
pub const NON_COUNTRIES: [&str; 14] = [
    "Africa",
    "Asia (excl. China & India)",
    "Asia",
    "EU-27",
    "EU-28",
    "Europe",
    "Europe (excl. EU-27)",
    "Europe (excl. EU-28)",
    "International transport",
    "North America (excl. USA)",
    "North America",
    "Oceania",
    "South America",
    "World",
];

/// Dataset country names that differ from the map-geometry identifiers
const GEOMETRY_NAMES: [(&str, &str); 12] = [
    ("United States", "United States of America"),
    ("Czechia", "Czech Republic"),
    ("Serbia", "Republic of Serbia"),
    ("North Macedonia", "Macedonia"),
    ("Congo", "Republic of the Congo"),
    ("Democratic Republic of Congo", "Democratic Republic of the Congo"),
    ("Tanzania", "United Republic of Tanzania"),
    ("Cote d'Ivoire", "Ivory Coast"),
    ("Guinea-Bissau", "Guinea Bissau"),
    ("Eswatini", "Swaziland"),
    ("Bahamas", "The Bahamas"),
    // Timor is the island, East Timor the country
    ("Timor", "East Timor"),
];

/// Test if a region name is an aggregate rather than a country
pub fn is_aggregate(name: &str) -> bool {
    NON_COUNTRIES.contains(&name)
}

/// Name of a country in the map geometry
///
/// Returns the input unchanged when no renaming is needed.
pub fn geometry_name(name: &str) -> &str {
    GEOMETRY_NAMES
        .iter()
        .find(|(source, _)| *source == name)
        .map(|(_, target)| *target)
        .unwrap_or(name)
}

/// A country-level row with its derived columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    /// Observation with `country` renamed to the geometry identifier
    #[serde(flatten)]
    pub observation: Observation,
    pub gdp_per_capita: Option<FloatValue>,
}

impl NormalizedRow {
    pub fn country(&self) -> &str {
        &self.observation.country
    }

    pub fn year(&self) -> Year {
        self.observation.year
    }
}

/// Output of the normalizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    range: YearRange,
    rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn range(&self) -> YearRange {
        self.range
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for a single year
    pub fn year(&self, year: Year) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter().filter(move |row| row.year() == year)
    }

    /// Distinct country names, in sorted order
    pub fn countries(&self) -> BTreeSet<&str> {
        self.rows.iter().map(NormalizedRow::country).collect()
    }

    /// Restrict the table to countries known to the map geometry.
    ///
    /// Countries missing from the geometry are dropped from the returned table and
    /// logged once each. The table itself is left untouched so that time-series
    /// consumers still see every country.
    pub fn restrict_to_geometry(&self, geometry: &GeometryIndex) -> NormalizedTable {
        let unmatched: BTreeSet<&str> = self
            .countries()
            .into_iter()
            .filter(|country| !geometry.contains(country))
            .collect();

        for country in &unmatched {
            warn!(
                country = %country,
                "Country has no matching map geometry; excluded from map layers"
            );
        }

        NormalizedTable {
            range: self.range,
            rows: self
                .rows
                .iter()
                .filter(|row| !unmatched.contains(row.country()))
                .cloned()
                .collect(),
        }
    }
}

/// Normalize the raw dataset for the years in `range`
pub fn normalize(dataset: &EmissionsDataset, range: YearRange) -> NormalizedTable {
    let rows = dataset
        .iter()
        .filter(|obs| !is_aggregate(&obs.country))
        .filter(|obs| range.contains(obs.year))
        .map(|obs| {
            let gdp_per_capita = obs.gdp_per_capita();
            let mut observation = obs.clone();
            observation.country = geometry_name(&obs.country).to_string();
            NormalizedRow {
                observation,
                gdp_per_capita,
            }
        })
        .collect();

    NormalizedTable { range, rows }
}
