//! Data types shared by the decomposition and annotation stages.

use crate::error::DecompositionError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A single row of the arch table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRecord {
    pub code: String,
    pub year: i32,
    pub status: String,
}

/// Arch statuses keyed by (region code, year).
///
/// When the table lists the same key twice, the first row wins.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    by_code: HashMap<String, HashMap<i32, String>>,
    len: usize,
}

impl AnnotationTable {
    pub fn new(records: impl IntoIterator<Item = AnnotationRecord>) -> Self {
        let mut table = Self::default();
        for r in records {
            let years = table.by_code.entry(r.code).or_default();
            if !years.contains_key(&r.year) {
                years.insert(r.year, r.status);
                table.len += 1;
            }
        }
        table
    }

    pub fn status(&self, code: &str, year: i32) -> Option<&str> {
        self.by_code.get(code)?.get(&year).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A decomposed series component, one chart panel each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Observed,
    Trend,
    Seasonal,
    Residual,
}

impl Component {
    /// Y-axis label of the component's panel.
    pub fn axis_label(self) -> &'static str {
        match self {
            Component::Observed => "MeanChl",
            Component::Trend => "Decomposed Trend",
            Component::Seasonal => "Seasonal",
            Component::Residual => "Residual",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Observed => "observed",
            Component::Trend => "trend",
            Component::Seasonal => "seasonal",
            Component::Residual => "residual",
        };
        f.write_str(name)
    }
}

/// Additive decomposition `value = trend + seasonal + residual`.
///
/// Trend and residual are `None` where the moving-average window does not fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionResult {
    pub period: usize,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

/// Per-region decomposition, either computed or failed.
///
/// A failed decomposition still has a length, so callers can treat it as a
/// series whose trend and residual are undefined everywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum DecompositionOutcome {
    Decomposed(DecompositionResult),
    Failed {
        error: DecompositionError,
        len: usize,
    },
}

impl DecompositionOutcome {
    pub fn from_result(result: Result<DecompositionResult, DecompositionError>, len: usize) -> Self {
        match result {
            Ok(r) => DecompositionOutcome::Decomposed(r),
            Err(error) => DecompositionOutcome::Failed { error, len },
        }
    }

    pub fn is_decomposed(&self) -> bool {
        matches!(self, DecompositionOutcome::Decomposed(_))
    }

    pub fn error(&self) -> Option<&DecompositionError> {
        match self {
            DecompositionOutcome::Decomposed(_) => None,
            DecompositionOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn trend(&self) -> Vec<Option<f64>> {
        match self {
            DecompositionOutcome::Decomposed(r) => r.trend.clone(),
            DecompositionOutcome::Failed { len, .. } => vec![None; *len],
        }
    }

    pub fn residual(&self) -> Vec<Option<f64>> {
        match self {
            DecompositionOutcome::Decomposed(r) => r.residual.clone(),
            DecompositionOutcome::Failed { len, .. } => vec![None; *len],
        }
    }

    pub fn seasonal(&self) -> Vec<Option<f64>> {
        match self {
            DecompositionOutcome::Decomposed(r) => r.seasonal.iter().copied().map(Some).collect(),
            DecompositionOutcome::Failed { len, .. } => vec![None; *len],
        }
    }
}

/// Ordinary least-squares line of value against fractional year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub r: f64,
    pub r_squared: f64,
    /// Standard error of the slope; `None` with two points.
    pub slope_stderr: Option<f64>,
    /// Two-sided p-value of the slope against zero; `None` with two points.
    pub p_value: Option<f64>,
    pub n: usize,
}

impl TrendFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Calendar-year means of one region's components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualAggregate {
    pub year: i32,
    pub observed: Option<f64>,
    pub trend: Option<f64>,
    pub residual: Option<f64>,
    /// Arch status used for the year, after applying the default.
    pub status: String,
    pub flagged: bool,
}

impl AnnualAggregate {
    pub fn value(&self, component: Component) -> Option<f64> {
        match component {
            Component::Observed => self.observed,
            Component::Trend => self.trend,
            Component::Residual => self.residual,
            Component::Seasonal => None,
        }
    }
}

/// A glyph marking a flagged year on one component panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub region: String,
    pub component: Component,
    /// Mid-year anchor (July 1).
    pub date: NaiveDate,
    pub value: f64,
}
