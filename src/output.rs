//! Run summaries on the log stream.
//!
//! Supports pretty-printing region summaries and JSON serialization of the
//! figure layout. Nothing is written to disk here.

use anyhow::Result;
use tracing::{debug, info};

use crate::analyzers::pipeline::{RegionAnalysis, RegionSummary};
use crate::render::Figure;

/// Logs a region summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &RegionSummary) {
    debug!("{:#?}", summary);
}

/// Logs the figure layout as pretty-printed JSON.
pub fn print_json(figure: &Figure) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(figure)?);
    Ok(())
}

/// Logs one structured line per region with its fit and flagged years.
pub fn log_summaries(analyses: &[RegionAnalysis]) {
    for analysis in analyses {
        let summary = analysis.summary();
        info!(
            region = %summary.region,
            months = summary.months,
            decomposed = summary.decomposed,
            r_squared = summary.r_squared.unwrap_or(f64::NAN),
            p_value = summary.p_value.unwrap_or(f64::NAN),
            flagged_years = ?summary.flagged_years,
            "Region summary"
        );
        print_pretty(&summary);
    }
}
