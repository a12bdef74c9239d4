//! Numerical utilities used by the forecaster.

pub mod distributions;
pub mod linear_algebra;
