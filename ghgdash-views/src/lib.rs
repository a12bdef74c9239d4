//! Chart compositions for the greenhouse-gas emissions dashboard
//!
//! Each view is a pure function of the read-only [`DashboardContext`](context::DashboardContext)
//! and the user's control selections. Views return serialisable chart data; drawing it is
//! left to the rendering layer.
//!
//! # Views
//!
//! - `context`: the shared data context and the choropleth map layers
//! - `emissions_history`: historical CO2 and methane merged with their forecasts
//! - `changes`: annual CO2 against its growth percentage for one year
//! - `animation`: bounded year-by-year playback of the changes scatter
//! - `temperature`: global temperature with its rolling mean and warming thresholds
//! - `sectors`: global emissions by sector

pub mod animation;
pub mod changes;
pub mod context;
pub mod emissions_history;
pub mod sectors;
pub mod temperature;
