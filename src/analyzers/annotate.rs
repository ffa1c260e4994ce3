//! Annual aggregation and arch-status markers.
//!
//! Each region's observed values, decomposed trend and residual are averaged
//! per calendar year. The year is then looked up in the arch table under the
//! region's code; years whose status matches the sentinel get a marker on
//! every displayed panel.

use crate::analyzers::types::{
    AnnotationTable, AnnualAggregate, Component, DecompositionOutcome, Marker,
};
use crate::analyzers::utility::mean_defined;
use crate::config::{AnalysisConfig, RegionCodes};
use crate::series::RegionSeries;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

/// Status assumed for a (region, year) the arch table does not mention.
pub const DEFAULT_STATUS: &str = "arch";

/// Month and day at which yearly markers are placed.
const MARKER_MONTH: u32 = 7;
const MARKER_DAY: u32 = 1;

/// Joins annual aggregates to the arch table.
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    codes: &'a RegionCodes,
    table: &'a AnnotationTable,
    sentinel: &'a str,
}

impl<'a> Annotator<'a> {
    pub fn new(config: &'a AnalysisConfig, table: &'a AnnotationTable) -> Self {
        Self {
            codes: &config.region_codes,
            table,
            sentinel: &config.sentinel,
        }
    }

    /// Status of `region` in `year`, and whether it matches the sentinel.
    ///
    /// A year without a record reports [`DEFAULT_STATUS`] and is never flagged.
    pub fn classify(&self, region: &str, year: i32) -> (String, bool) {
        let code = self.codes.code_for(region);
        match self.table.status(code, year) {
            Some(recorded) => {
                let status = recorded.trim().to_lowercase();
                let flagged = status == self.sentinel.trim().to_lowercase();
                (status, flagged)
            }
            // no record is never flagged, whatever the sentinel
            None => (DEFAULT_STATUS.to_string(), false),
        }
    }

    /// Calendar-year means of the observed, trend and residual series.
    ///
    /// Only years with at least one observation are returned, ascending.
    pub fn annual_aggregates(
        &self,
        series: &RegionSeries,
        outcome: &DecompositionOutcome,
    ) -> Vec<AnnualAggregate> {
        let trend = outcome.trend();
        let residual = outcome.residual();

        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, date) in series.dates.iter().enumerate() {
            by_year.entry(date.year()).or_default().push(i);
        }

        by_year
            .into_iter()
            .map(|(year, idx)| {
                let (status, flagged) = self.classify(&series.region, year);
                AnnualAggregate {
                    year,
                    observed: mean_defined(idx.iter().map(|&i| Some(series.values[i]))),
                    trend: mean_defined(idx.iter().map(|&i| trend.get(i).copied().flatten())),
                    residual: mean_defined(
                        idx.iter().map(|&i| residual.get(i).copied().flatten()),
                    ),
                    status,
                    flagged,
                }
            })
            .collect()
    }
}

/// Mid-year markers for every flagged year on each of `components`.
///
/// A component without a defined annual mean gets no marker for that year.
pub fn markers(region: &str, aggregates: &[AnnualAggregate], components: &[Component]) -> Vec<Marker> {
    let mut out = Vec::new();
    for agg in aggregates.iter().filter(|a| a.flagged) {
        let Some(date) = NaiveDate::from_ymd_opt(agg.year, MARKER_MONTH, MARKER_DAY) else {
            continue;
        };
        for &component in components {
            if let Some(value) = agg.value(component) {
                out.push(Marker {
                    region: region.to_string(),
                    component,
                    date,
                    value,
                });
            }
        }
    }
    debug!(region, markers = out.len(), "Markers placed");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::decompose::AdditiveDecomposer;
    use crate::analyzers::types::AnnotationRecord;
    use crate::error::DecompositionError;
    use crate::series::month_start;

    fn record(code: &str, year: i32, status: &str) -> AnnotationRecord {
        AnnotationRecord {
            code: code.to_string(),
            year,
            status: status.to_string(),
        }
    }

    fn monthly(region: &str, start_year: i32, months: usize) -> RegionSeries {
        let dates: Vec<NaiveDate> = (0..months)
            .map(|i| month_start(start_year + (i / 12) as i32, (i % 12) as u32 + 1).unwrap())
            .collect();
        let values = (0..months).map(|i| 1.0 + (i % 5) as f64).collect();
        RegionSeries {
            region: region.to_string(),
            dates,
            values,
        }
    }

    #[test]
    fn test_missing_record_is_not_flagged() {
        let config = AnalysisConfig::default();
        let table = AnnotationTable::new(vec![record("JS", 2004, "no arch")]);
        let annotator = Annotator::new(&config, &table);

        let (status, flagged) = annotator.classify("Jones", 2005);
        assert_eq!(status, DEFAULT_STATUS);
        assert!(!flagged);
    }

    #[test]
    fn test_sentinel_comparison_is_trimmed_and_case_insensitive() {
        let config = AnalysisConfig::default();
        let table = AnnotationTable::new(vec![
            record("JS", 2004, "  No Arch "),
            record("LS", 2004, "arch"),
            record("SS", 2004, "no  arch"),
        ]);
        let annotator = Annotator::new(&config, &table);

        assert!(annotator.classify("Jones", 2004).1);
        assert!(!annotator.classify("Lancaster", 2004).1);
        assert!(!annotator.classify("Smith", 2004).1);
    }

    #[test]
    fn test_missing_record_is_not_flagged_for_any_sentinel() {
        let config = AnalysisConfig {
            sentinel: "arch".to_string(),
            ..AnalysisConfig::default()
        };
        config.validate().unwrap();
        let table = AnnotationTable::new(vec![record("JS", 2004, "Arch")]);
        let annotator = Annotator::new(&config, &table);

        assert_eq!(annotator.classify("Jones", 2004), ("arch".to_string(), true));
        assert_eq!(annotator.classify("Jones", 2005), ("arch".to_string(), false));

        let empty = AnnotationTable::default();
        let annotator = Annotator::new(&config, &empty);
        assert!(!annotator.classify("Smith", 2003).1);
    }

    #[test]
    fn test_unmapped_region_looks_up_its_own_name() {
        let config = AnalysisConfig::default();
        let table = AnnotationTable::new(vec![record("Baffin", 2010, "no arch")]);
        let annotator = Annotator::new(&config, &table);

        assert!(annotator.classify("Baffin", 2010).1);
    }

    #[test]
    fn test_first_duplicate_record_wins() {
        let table = AnnotationTable::new(vec![
            record("LS", 2001, "no arch"),
            record("LS", 2001, "arch"),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.status("LS", 2001), Some("no arch"));
    }

    #[test]
    fn test_annual_means() {
        let config = AnalysisConfig::default();
        let table = AnnotationTable::default();
        let annotator = Annotator::new(&config, &table);
        let series = monthly("Jones", 2001, 24);
        let outcome = DecompositionOutcome::from_result(
            AdditiveDecomposer::new(5).decompose(&series.values),
            series.len(),
        );

        let aggregates = annotator.annual_aggregates(&series, &outcome);

        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].year, 2001);
        let expected: f64 = series.values[..12].iter().sum::<f64>() / 12.0;
        assert!((aggregates[0].observed.unwrap() - expected).abs() < 1e-12);

        // the first two months have no trend, so the mean covers ten months
        let trend = outcome.trend();
        let expected_trend: f64 = trend[2..12].iter().map(|t| t.unwrap()).sum::<f64>() / 10.0;
        assert!((aggregates[0].trend.unwrap() - expected_trend).abs() < 1e-12);
    }

    #[test]
    fn test_failed_decomposition_has_no_trend_means() {
        let config = AnalysisConfig::default();
        let table = AnnotationTable::default();
        let annotator = Annotator::new(&config, &table);
        let series = monthly("Smith", 2001, 6);
        let outcome = DecompositionOutcome::Failed {
            error: DecompositionError::InsufficientData { needed: 10, got: 6 },
            len: 6,
        };

        let aggregates = annotator.annual_aggregates(&series, &outcome);
        assert_eq!(aggregates.len(), 1);
        assert!(aggregates[0].observed.is_some());
        assert_eq!(aggregates[0].trend, None);
        assert_eq!(aggregates[0].residual, None);
    }

    #[test]
    fn test_markers_at_mid_year_for_flagged_years_only() {
        let aggregates = vec![
            AnnualAggregate {
                year: 2003,
                observed: Some(1.5),
                trend: Some(1.2),
                residual: None,
                status: "no arch".to_string(),
                flagged: true,
            },
            AnnualAggregate {
                year: 2004,
                observed: Some(2.0),
                trend: Some(1.8),
                residual: Some(0.1),
                status: "arch".to_string(),
                flagged: false,
            },
        ];

        let placed = markers(
            "Lancaster",
            &aggregates,
            &[Component::Observed, Component::Trend, Component::Residual],
        );

        assert_eq!(placed.len(), 2);
        assert!(placed.iter().all(|m| m.date == NaiveDate::from_ymd_opt(2003, 7, 1).unwrap()));
        assert_eq!(placed[0].component, Component::Observed);
        assert_eq!(placed[0].value, 1.5);
        assert_eq!(placed[1].component, Component::Trend);
        assert_eq!(placed[1].value, 1.2);
    }
}
