//! Per-region decomposition, trend fitting and annotation.
//!
//! This module splits each region's monthly chlorophyll series into trend,
//! seasonal and residual components, fits a linear trend against fractional
//! year, averages the components per calendar year and marks the years the
//! arch table flags.

pub mod annotate;
pub mod decompose;
pub mod pipeline;
pub mod trend;
pub mod types;
pub mod utility;
