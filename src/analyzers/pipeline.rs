//! Per-region analysis: decomposition, linear trend fit and annotation.
//!
//! Failures are kept inside the region they belong to, so one short or
//! malformed series never stops the others from being analyzed.

use crate::analyzers::annotate::{Annotator, markers};
use crate::analyzers::decompose::AdditiveDecomposer;
use crate::analyzers::trend::fit_trend;
use crate::analyzers::types::{
    AnnualAggregate, Component, DecompositionOutcome, Marker, TrendFit,
};
use crate::error::TrendFitError;
use crate::series::RegionSeries;
use serde::Serialize;
use tracing::{info, warn};

/// Everything derived from one region's series.
#[derive(Debug, Clone)]
pub struct RegionAnalysis {
    pub series: RegionSeries,
    pub decomposition: DecompositionOutcome,
    pub fit: Result<TrendFit, TrendFitError>,
    pub annual: Vec<AnnualAggregate>,
    pub markers: Vec<Marker>,
}

/// One line of the run summary, logged per region.
#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub months: usize,
    pub decomposed: bool,
    pub decomposition_error: Option<String>,
    pub slope: Option<f64>,
    pub r_squared: Option<f64>,
    pub p_value: Option<f64>,
    pub flagged_years: Vec<i32>,
}

impl RegionAnalysis {
    pub fn summary(&self) -> RegionSummary {
        let fit = self.fit.as_ref().ok();
        RegionSummary {
            region: self.series.region.clone(),
            months: self.series.len(),
            decomposed: self.decomposition.is_decomposed(),
            decomposition_error: self.decomposition.error().map(|e| e.to_string()),
            slope: fit.map(|f| f.slope),
            r_squared: fit.map(|f| f.r_squared),
            p_value: fit.and_then(|f| f.p_value),
            flagged_years: self
                .annual
                .iter()
                .filter(|a| a.flagged)
                .map(|a| a.year)
                .collect(),
        }
    }
}

/// Decomposes, fits and annotates a single region.
///
/// Never fails: a decomposition or trend-fit error is recorded in the
/// returned analysis and logged, leaving other regions unaffected.
pub fn analyze_region(
    series: RegionSeries,
    decomposer: &AdditiveDecomposer,
    annotator: &Annotator<'_>,
    marked: &[Component],
) -> RegionAnalysis {
    let decomposition =
        DecompositionOutcome::from_result(decomposer.decompose(&series.values), series.len());
    if let Some(e) = decomposition.error() {
        warn!(
            region = %series.region,
            period = decomposer.period(),
            error = %e,
            "Decomposition failed, trend and residual left undefined"
        );
    }

    let fit = fit_trend(&series.numeric_years(), &series.values);
    match &fit {
        Ok(f) => info!(
            region = %series.region,
            slope = f.slope,
            intercept = f.intercept,
            r_squared = f.r_squared,
            p_value = f.p_value.unwrap_or(f64::NAN),
            "Linear trend fitted"
        ),
        Err(e) => warn!(region = %series.region, error = %e, "Linear trend fit failed"),
    }

    let annual = annotator.annual_aggregates(&series, &decomposition);
    let markers = markers(&series.region, &annual, marked);

    RegionAnalysis {
        series,
        decomposition,
        fit,
        annual,
        markers,
    }
}

/// Analyzes each region in order. The output keeps the input order.
#[tracing::instrument(skip_all, fields(regions = series.len(), period = decomposer.period()))]
pub fn analyze_regions(
    series: Vec<RegionSeries>,
    decomposer: &AdditiveDecomposer,
    annotator: &Annotator<'_>,
    marked: &[Component],
) -> Vec<RegionAnalysis> {
    let analyses: Vec<RegionAnalysis> = series
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| analyze_region(s, decomposer, annotator, marked))
        .collect();

    let failed = analyses
        .iter()
        .filter(|a| !a.decomposition.is_decomposed())
        .count();
    info!(
        analyzed = analyses.len(),
        failed_decompositions = failed,
        "Region analysis complete"
    );

    analyses
}
