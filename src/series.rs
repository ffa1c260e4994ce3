//! Monthly observations and per-region alignment.

use crate::config::DuplicatePolicy;
use crate::error::AlignError;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One monthly chlorophyll value for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// First day of the observed month.
    pub date: NaiveDate,
    pub region: String,
    pub value: f64,
}

/// Returns the first day of `month` in `year`, or `None` for an invalid month.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Year plus elapsed months as a fraction: `year + (month - 1) / 12`.
pub fn fractional_year(date: NaiveDate) -> f64 {
    date.year() as f64 + date.month0() as f64 / 12.0
}

/// All observations of one region, sorted ascending by month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSeries {
    pub region: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl RegionSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Fractional-year x values for regression and plotting.
    pub fn numeric_years(&self) -> Vec<f64> {
        self.dates.iter().copied().map(fractional_year).collect()
    }
}

/// Splits observations by region and sorts each region's months ascending.
///
/// Regions are returned in the order they first appear in `observations`.
/// A second row for an already-seen (region, month) is handled according to
/// `policy`.
pub fn align(
    observations: &[Observation],
    policy: DuplicatePolicy,
) -> Result<Vec<RegionSeries>, AlignError> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_region: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();

    for obs in observations {
        let rows = by_region.entry(obs.region.as_str()).or_insert_with(|| {
            order.push(obs.region.as_str());
            Vec::new()
        });

        match rows.iter_mut().find(|(d, _)| *d == obs.date) {
            Some(existing) => match policy {
                DuplicatePolicy::Reject => {
                    return Err(AlignError::DuplicateTimestamp {
                        region: obs.region.clone(),
                        year: obs.date.year(),
                        month: obs.date.month(),
                    });
                }
                DuplicatePolicy::KeepLast => {
                    warn!(
                        region = %obs.region,
                        date = %obs.date,
                        previous = existing.1,
                        replacement = obs.value,
                        "Duplicate observation, keeping the later row"
                    );
                    existing.1 = obs.value;
                }
            },
            None => rows.push((obs.date, obs.value)),
        }
    }

    let series = order
        .into_iter()
        .map(|region| {
            let mut rows = by_region.remove(region).unwrap_or_default();
            rows.sort_by_key(|(d, _)| *d);
            let (dates, values) = rows.into_iter().unzip();
            RegionSeries {
                region: region.to_string(),
                dates,
                values,
            }
        })
        .collect::<Vec<_>>();

    for s in &series {
        debug!(region = %s.region, months = s.len(), "Region series aligned");
    }

    Ok(series)
}
