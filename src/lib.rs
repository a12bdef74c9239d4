//! Greenhouse-gas emissions dashboard
//!
//! Configuration and the command-line front end for the dashboard. The data pipeline
//! lives in [`ghgdash_core`] and the chart compositions in [`ghgdash_views`]; both are
//! re-exported here.

pub mod config;

pub use ghgdash_core;
pub use ghgdash_views;
