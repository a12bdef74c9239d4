//! Row types for the per-country, per-year emissions table.

use crate::errors::{GhgError, GhgResult};
use serde::{Deserialize, Serialize};

pub type FloatValue = f64;
pub type Year = i32;

/// One row of the emissions table.
///
/// Numeric fields are `None` when the source cell is empty. Missing values are never
/// coerced to zero; downstream stages exclude them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub country: String,
    pub year: Year,
    /// Annual CO2 emissions
    /// unit: Mt
    pub co2: Option<FloatValue>,
    /// unit: t / person
    pub co2_per_capita: Option<FloatValue>,
    /// Annual change in CO2 emissions
    /// unit: %
    pub co2_growth_prct: Option<FloatValue>,
    /// unit: Mt CO2-eq
    pub methane: Option<FloatValue>,
    pub gdp: Option<FloatValue>,
    pub population: Option<FloatValue>,
    /// unit: kWh / person
    pub energy_per_capita: Option<FloatValue>,
}

impl Observation {
    /// Create an observation with every numeric field missing
    pub fn empty(country: impl Into<String>, year: Year) -> Self {
        Self {
            country: country.into(),
            year,
            co2: None,
            co2_per_capita: None,
            co2_growth_prct: None,
            methane: None,
            gdp: None,
            population: None,
            energy_per_capita: None,
        }
    }

    /// GDP divided by population.
    ///
    /// Undefined when either input is missing or the population is zero.
    pub fn gdp_per_capita(&self) -> Option<FloatValue> {
        match (self.gdp, self.population) {
            (Some(gdp), Some(population)) if population != 0.0 => Some(gdp / population),
            _ => None,
        }
    }
}

/// Inclusive range of calendar years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    start: Year,
    end: Year,
}

impl YearRange {
    pub fn new(start: Year, end: Year) -> GhgResult<Self> {
        if start > end {
            return Err(GhgError::InvalidYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Year {
        self.start
    }

    pub fn end(&self) -> Year {
        self.end
    }

    pub fn contains(&self, year: Year) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.start..=self.end
    }
}
