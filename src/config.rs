//! Dashboard configuration
//!
//! Read from a TOML file. Every section and field is optional and falls back to the
//! values the dashboard was designed around.
//!
//! ```toml
//! [data]
//! emissions = "owid-co2-data.csv"
//! geometry = "countries.geojson"
//! sectors = "Global-GHG-Emissions-by-sector-based-on-WRI-2020.xlsx"
//!
//! [forecast.co2]
//! horizon = 5
//! train_from = 1980
//! ```

use anyhow::{Context, Result};
use ghgdash_core::dataset::EmissionsDataset;
use ghgdash_core::forecast::{ForecastParameters, Gas, TrendForecaster};
use ghgdash_core::geometry::GeometryIndex;
use ghgdash_core::observation::Year;
use ghgdash_core::sectors::SectorTable;
use ghgdash_core::temperature::TemperatureRecord;
use ghgdash_views::animation::AnimationSettings;
use ghgdash_views::changes::ClipRange;
use ghgdash_views::context::{DashboardContext, DEFAULT_START_YEAR};
use ghgdash_views::emissions_history::HistorySettings;
use ghgdash_views::temperature::TemperatureSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Input files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Per-country, per-year emissions table
    ///
    /// Default: `owid-co2-data.csv`
    pub emissions: PathBuf,
    /// GeoJSON country boundaries used to restrict the map layers
    pub geometry: Option<PathBuf>,
    /// Global temperature record
    pub temperature: Option<PathBuf>,
    /// Sector breakdown workbook (sheet `All`), or a CSV export of that sheet
    pub sectors: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            emissions: PathBuf::from("owid-co2-data.csv"),
            geometry: None,
            temperature: None,
            sectors: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Lower bound of the year slider
    ///
    /// Default: 1950
    pub start_year: Year,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
        }
    }
}

/// Forecaster parameters per gas.
///
/// Fields left out of a gas section keep that gas's own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawForecastConfig")]
pub struct ForecastConfig {
    pub co2: ForecastParameters,
    pub methane: ForecastParameters,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialParameters {
    horizon: Option<u32>,
    train_from: Option<Year>,
    confidence: Option<f64>,
    fit_intercept: Option<bool>,
}

impl PartialParameters {
    fn over(self, defaults: ForecastParameters) -> ForecastParameters {
        ForecastParameters {
            horizon: self.horizon.unwrap_or(defaults.horizon),
            train_from: self.train_from.unwrap_or(defaults.train_from),
            confidence: self.confidence.unwrap_or(defaults.confidence),
            fit_intercept: self.fit_intercept.unwrap_or(defaults.fit_intercept),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawForecastConfig {
    co2: PartialParameters,
    methane: PartialParameters,
}

impl From<RawForecastConfig> for ForecastConfig {
    fn from(raw: RawForecastConfig) -> Self {
        Self {
            co2: raw.co2.over(ForecastParameters::default()),
            methane: raw.methane.over(ForecastParameters::methane_default()),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            co2: ForecastParameters::default(),
            methane: ForecastParameters::methane_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub map: MapConfig,
    pub forecast: ForecastConfig,
    pub history: HistorySettings,
    pub animation: AnimationSettings,
    pub temperature: TemperatureSettings,
}

impl DashboardConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("Invalid dashboard configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// Relative data paths are resolved against the directory of the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration {}", path.display()))?;
        let mut config =
            Self::from_toml(&source).with_context(|| format!("Loading {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.data.resolve_against(base);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.forecast.co2.validate()?;
        self.forecast.methane.validate()?;
        self.clip_range()?;
        Ok(())
    }

    pub fn clip_range(&self) -> Result<ClipRange> {
        let [lower, upper] = self.animation.clip_range;
        Ok(ClipRange::new(lower, upper)?)
    }

    pub fn forecasters(&self) -> Result<(TrendForecaster, TrendForecaster)> {
        Ok((
            TrendForecaster::from_parameters(Gas::Co2, self.forecast.co2.clone())?,
            TrendForecaster::from_parameters(Gas::Methane, self.forecast.methane.clone())?,
        ))
    }

    /// Load every configured dataset into a read-only context
    pub fn load_context(&self) -> Result<DashboardContext> {
        let data = &self.data;
        let dataset = EmissionsDataset::from_path(&data.emissions)
            .with_context(|| format!("Loading emissions from {}", data.emissions.display()))?;
        let mut context = DashboardContext::new(dataset).with_start_year(self.map.start_year);

        if let Some(path) = &data.geometry {
            let geometry = GeometryIndex::from_path(path)
                .with_context(|| format!("Loading map geometry from {}", path.display()))?;
            context = context.with_geometry(geometry);
        }
        if let Some(path) = &data.temperature {
            let record = TemperatureRecord::from_path(path)
                .with_context(|| format!("Loading temperatures from {}", path.display()))?;
            context = context.with_temperature(record);
        }
        if let Some(path) = &data.sectors {
            let table = SectorTable::from_path(path)
                .with_context(|| format!("Loading sector breakdown from {}", path.display()))?;
            context = context.with_sectors(table);
        }
        Ok(context)
    }
}

impl DataConfig {
    fn resolve_against(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.emissions);
        self.geometry.iter_mut().for_each(resolve);
        self.temperature.iter_mut().for_each(resolve);
        self.sectors.iter_mut().for_each(resolve);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DashboardConfig::from_toml("").unwrap();

        assert_eq!(config.data.emissions, PathBuf::from("owid-co2-data.csv"));
        assert_eq!(config.map.start_year, 1950);
        assert_eq!(config.forecast.co2.horizon, 5);
        assert_eq!(config.forecast.co2.train_from, 1980);
        assert_eq!(config.forecast.methane.train_from, 2000);
        assert_eq!(config.history.from_year, 1850);
        assert_eq!(config.animation.delay_ms, 500);
        assert_eq!(config.animation.clip_range, [-100.0, 100.0]);
        assert_eq!(config.temperature.window, 30);
        assert_eq!(config.temperature.reference_year, 2017);
    }

    #[test]
    fn partial_sections() {
        let config = DashboardConfig::from_toml(
            r#"
            [forecast.methane]
            horizon = 3

            [temperature]
            window = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.forecast.methane.horizon, 3);
        assert_eq!(config.forecast.methane.train_from, 2000);
        assert_eq!(config.forecast.methane.confidence, 0.95);
        assert_eq!(config.forecast.co2, ForecastParameters::default());
        assert_eq!(config.temperature.window, 20);
        assert_eq!(config.temperature.reference_year, 2017);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(DashboardConfig::from_toml("[forecast.co2]\nhorizon = 0").is_err());
        assert!(DashboardConfig::from_toml("[forecast.co2]\nconfidence = 1.5").is_err());
        assert!(DashboardConfig::from_toml("[animation]\nclip_range = [0.0, 1.0]").is_err());
        assert!(DashboardConfig::from_toml("[map]\nstart_year = \"1950\"").is_err());
    }

    #[test]
    fn toml_round_trip() {
        let mut config = DashboardConfig::default();
        config.data.geometry = Some(PathBuf::from("countries.geojson"));
        config.forecast.co2.fit_intercept = true;

        let serialised = toml::to_string(&config).unwrap();
        assert_eq!(DashboardConfig::from_toml(&serialised).unwrap(), config);
    }

    #[test]
    fn data_paths_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = NamedTempFile::new_in(dir.path()).unwrap();
        writeln!(file, "[data]\nemissions = \"co2.csv\"\ntemperature = \"/abs/temp.csv\"").unwrap();

        let config = DashboardConfig::from_path(file.path()).unwrap();
        assert_eq!(config.data.emissions, dir.path().join("co2.csv"));
        assert_eq!(config.data.temperature, Some(PathBuf::from("/abs/temp.csv")));
    }
}
