//! Shared data context
//!
//! The context is constructed once at start-up from the loaded datasets and is only
//! ever borrowed afterwards. Views never mutate it, so it can be shared freely between
//! requests.

use ghgdash_core::binning::{bin_layers, BinnedLayer, ChoroplethLayers, Metric};
use ghgdash_core::dataset::EmissionsDataset;
use ghgdash_core::errors::{GhgError, GhgResult};
use ghgdash_core::geometry::GeometryIndex;
use ghgdash_core::normalize::{normalize, NormalizedTable};
use ghgdash_core::observation::{Year, YearRange};
use ghgdash_core::sectors::SectorTable;
use ghgdash_core::temperature::TemperatureRecord;

/// First year offered by the year sliders
pub const DEFAULT_START_YEAR: Year = 1950;

/// Read-only datasets behind the dashboard
#[derive(Debug, Clone)]
pub struct DashboardContext {
    dataset: EmissionsDataset,
    start_year: Year,
    geometry: Option<GeometryIndex>,
    temperature: Option<TemperatureRecord>,
    sectors: Option<SectorTable>,
}

impl DashboardContext {
    pub fn new(dataset: EmissionsDataset) -> Self {
        Self {
            dataset,
            start_year: DEFAULT_START_YEAR,
            geometry: None,
            temperature: None,
            sectors: None,
        }
    }

    pub fn with_start_year(mut self, start_year: Year) -> Self {
        self.start_year = start_year;
        self
    }

    pub fn with_geometry(mut self, geometry: GeometryIndex) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_temperature(mut self, temperature: TemperatureRecord) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_sectors(mut self, sectors: SectorTable) -> Self {
        self.sectors = Some(sectors);
        self
    }

    pub fn dataset(&self) -> &EmissionsDataset {
        &self.dataset
    }

    pub fn geometry(&self) -> Option<&GeometryIndex> {
        self.geometry.as_ref()
    }

    pub fn temperature(&self) -> GhgResult<&TemperatureRecord> {
        self.temperature
            .as_ref()
            .ok_or_else(|| GhgError::Error("No temperature record loaded".to_string()))
    }

    pub fn sectors(&self) -> GhgResult<&SectorTable> {
        self.sectors
            .as_ref()
            .ok_or_else(|| GhgError::Error("No sector breakdown loaded".to_string()))
    }

    /// Bounds of the year sliders: the configured start year up to the dataset's
    /// latest year
    pub fn year_bounds(&self) -> GhgResult<YearRange> {
        let end = self
            .dataset
            .max_year()
            .ok_or_else(|| GhgError::Error("Emissions dataset is empty".to_string()))?;
        YearRange::new(self.start_year, end)
    }

    /// Validate a slider position
    pub fn check_year(&self, year: Year) -> GhgResult<Year> {
        let bounds = self.year_bounds()?;
        if !bounds.contains(year) {
            return Err(GhgError::InvalidParameter {
                name: "year".to_string(),
                reason: format!(
                    "{} is outside the available range {}-{}",
                    year,
                    bounds.start(),
                    bounds.end()
                ),
            });
        }
        Ok(year)
    }

    /// Country-level table over the slider range
    pub fn country_table(&self) -> GhgResult<NormalizedTable> {
        Ok(normalize(&self.dataset, self.year_bounds()?))
    }

    /// Country-level table restricted to countries that can be drawn on the map
    pub fn map_table(&self) -> GhgResult<NormalizedTable> {
        let table = self.country_table()?;
        Ok(match &self.geometry {
            Some(geometry) => table.restrict_to_geometry(geometry),
            None => table,
        })
    }

    /// Choropleth layers for every year in the slider range
    pub fn choropleth(&self) -> GhgResult<ChoroplethLayers> {
        let table = self.map_table()?;
        Ok(bin_layers(&table, table.range()))
    }

    /// The single map layer selected by the year slider and the metric selector
    pub fn map_layer(&self, year: Year, metric: Metric) -> GhgResult<BinnedLayer> {
        let year = self.check_year(year)?;
        let table = self.map_table()?;
        bin_layers(&table, YearRange::new(year, year)?)
            .into_layers()
            .into_iter()
            .find(|layer| layer.metric == metric)
            .ok_or_else(|| GhgError::Error(format!("No {metric} layer for {year}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghgdash_core::observation::Observation;

    fn context() -> DashboardContext {
        let observations = (1940..=2020).flat_map(|year| {
            ["Finland", "Sweden", "World"].map(|country| {
                let mut obs = Observation::empty(country, year);
                obs.co2 = Some(f64::from(year - 1900));
                obs.co2_per_capita = Some(f64::from(year % 7));
                obs
            })
        });
        DashboardContext::new(EmissionsDataset::from_observations(observations))
    }

    #[test]
    fn year_bounds_follow_dataset() {
        let bounds = context().year_bounds().unwrap();
        assert_eq!(bounds.start(), 1950);
        assert_eq!(bounds.end(), 2020);
    }

    #[test]
    fn rejects_year_outside_slider() {
        let ctx = context();
        assert!(ctx.check_year(1949).is_err());
        assert!(ctx.check_year(2021).is_err());
        assert_eq!(ctx.check_year(2000).unwrap(), 2000);
    }

    #[test]
    fn map_layer_respects_geometry() {
        let ctx = context().with_geometry(GeometryIndex::from_names(["Finland"]));
        let layer = ctx.map_layer(2000, Metric::Co2).unwrap();

        assert_eq!(layer.year, 2000);
        assert_eq!(layer.values.len(), 1);
        assert_eq!(layer.values[0].country, "Finland");
        assert_eq!(layer.breakpoints, vec![100.0, 100.0]);

        // Sweden is kept for non-map consumers
        assert_eq!(ctx.country_table().unwrap().countries().len(), 2);
    }

    #[test]
    fn choropleth_covers_slider_range() {
        let ctx = context().with_start_year(2010);
        let layers = ctx.choropleth().unwrap();
        assert_eq!(layers.len(), 11 * Metric::ALL.len());
        assert!(layers.get(2009, Metric::Co2).is_none());
        assert!(layers.get(2020, Metric::Co2GrowthPrct).is_some());
    }

    #[test]
    fn missing_auxiliary_data() {
        let ctx = context();
        assert!(ctx.temperature().is_err());
        assert!(ctx.sectors().is_err());
    }
}
