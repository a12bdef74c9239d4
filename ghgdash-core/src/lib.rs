//! Core data pipeline for the greenhouse-gas emissions dashboard.
//!
//! The pipeline is three pure stages over an [`EmissionsDataset`](dataset::EmissionsDataset)
//! that is loaded once and shared read-only:
//!
//! - [`normalize`]: restricts the raw table to genuine countries, renames countries to the
//!   map-geometry identifiers and derives GDP per capita
//! - [`binning`]: per-year quantile breakpoints for the choropleth layers
//! - [`forecast`]: least-squares trend extrapolation of CO2 and methane emissions with
//!   prediction intervals
//!
//! Auxiliary datasets used by the dashboard (map geometry, global temperature and the
//! sector breakdown) live in [`geometry`], [`temperature`] and [`sectors`].

pub mod binning;
pub mod dataset;
pub mod forecast;
pub mod geometry;
pub mod normalize;
pub mod observation;
pub mod sectors;
pub mod temperature;
pub mod utils;

pub mod errors;
