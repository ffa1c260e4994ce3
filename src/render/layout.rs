//! Figure layout: panels, colored line segments, markers and legends.
//!
//! Nothing here computes analysis results. The layout only arranges the
//! series, fits and markers produced by the analyzers so a backend can draw
//! them.

use crate::analyzers::pipeline::RegionAnalysis;
use crate::analyzers::types::Component;
use crate::config::{AnalysisConfig, Rgb, SensorPeriod};
use crate::series::fractional_year;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

const BASE_LINE_COLOR: Rgb = Rgb(128, 128, 128);
const TREND_LINE_COLOR: Rgb = Rgb::BLACK;

/// How lines are split and colored.
#[derive(Debug, Clone, Copy)]
pub enum Coloring<'a> {
    /// One line per region in the region's configured color.
    ByRegion,
    /// One line per sensor-coverage period, drawn over a faint full-series base line.
    ByPeriod(&'a [SensorPeriod]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
    Faint,
}

/// A labeled line; `None` values in the source split it into segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub label: String,
    pub color: Rgb,
    pub style: LineStyle,
    pub segments: Vec<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerGlyph {
    pub x: f64,
    pub y: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    pub style: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub component: Component,
    pub y_label: String,
    pub lines: Vec<Line>,
    pub markers: Vec<MarkerGlyph>,
    /// One entry per distinct line label, in first-drawn order.
    pub legend: Vec<LegendEntry>,
}

impl Panel {
    /// Padded y extent of every line point and marker.
    pub fn y_range(&self) -> (f64, f64) {
        let ys = self
            .lines
            .iter()
            .flat_map(|l| l.segments.iter().flatten().map(|p| p.1))
            .chain(self.markers.iter().map(|m| m.y));
        padded_extent(ys)
    }
}

/// A vertical stack of panels sharing one time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub panels: Vec<Panel>,
    /// Years whose January 1 falls within the observed span.
    pub year_ticks: Vec<i32>,
    /// Shared x extent in fractional years.
    pub x_range: (f64, f64),
}

/// What to put in the figure and how to color it.
#[derive(Debug, Clone)]
pub struct LayoutOptions<'a> {
    pub title: String,
    pub components: Vec<Component>,
    pub coloring: Coloring<'a>,
    /// Overlay the linear trend line on the observed panel.
    pub trend_line: bool,
}

/// Lays out `analyses` into a figure with one panel per requested component.
pub fn layout(
    analyses: &[RegionAnalysis],
    config: &AnalysisConfig,
    options: &LayoutOptions<'_>,
) -> Figure {
    let panels: Vec<Panel> = options
        .components
        .iter()
        .map(|&component| build_panel(component, analyses, config, options))
        .collect();

    let dates = analyses.iter().flat_map(|a| a.series.dates.iter().copied());
    let year_ticks = year_ticks(dates.clone().min(), dates.max());

    let xs = panels.iter().flat_map(|p| {
        p.lines
            .iter()
            .flat_map(|l| l.segments.iter().flatten().map(|pt| pt.0))
            .chain(p.markers.iter().map(|m| m.x))
    });
    let x_range = extent(xs).unwrap_or((0.0, 1.0));

    Figure {
        title: options.title.clone(),
        panels,
        year_ticks,
        x_range,
    }
}

fn build_panel(
    component: Component,
    analyses: &[RegionAnalysis],
    config: &AnalysisConfig,
    options: &LayoutOptions<'_>,
) -> Panel {
    let mut lines = Vec::new();
    let mut markers = Vec::new();

    for analysis in analyses {
        let xs = analysis.series.numeric_years();
        let ys = component_values(analysis, component);
        let region = analysis.series.region.as_str();
        let region_color = config.region_color(region);

        match options.coloring {
            Coloring::ByRegion => lines.push(Line {
                label: region.to_string(),
                color: region_color,
                style: LineStyle::Solid,
                segments: segments(&xs, &ys),
            }),
            Coloring::ByPeriod(periods) => {
                lines.push(Line {
                    label: base_label(component).to_string(),
                    color: BASE_LINE_COLOR,
                    style: LineStyle::Faint,
                    segments: segments(&xs, &ys),
                });
                for period in periods {
                    let masked: Vec<Option<f64>> = analysis
                        .series
                        .dates
                        .iter()
                        .zip(ys.iter())
                        .map(|(d, y)| if period.contains(*d) { *y } else { None })
                        .collect();
                    lines.push(Line {
                        label: period.label.clone(),
                        color: period.color,
                        style: LineStyle::Solid,
                        segments: segments(&xs, &masked),
                    });
                }
            }
        }

        if component == Component::Observed && options.trend_line {
            if let Ok(fit) = &analysis.fit {
                let label = if analyses.len() > 1 {
                    format!("{region} Trend Line (R²={:.2})", fit.r_squared)
                } else {
                    format!("Trend Line (R²={:.2})", fit.r_squared)
                };
                let line: Vec<Option<f64>> = fit.line(&xs).into_iter().map(Some).collect();
                lines.push(Line {
                    label,
                    color: TREND_LINE_COLOR,
                    style: LineStyle::Dashed,
                    segments: segments(&xs, &line),
                });
            }
        }

        markers.extend(
            analysis
                .markers
                .iter()
                .filter(|m| m.component == component)
                .map(|m| MarkerGlyph {
                    x: fractional_year(m.date),
                    y: m.value,
                    color: region_color,
                }),
        );
    }

    lines.retain(|l| !l.segments.is_empty());
    let legend = dedup_legend(&lines);

    Panel {
        component,
        y_label: component.axis_label().to_string(),
        lines,
        markers,
        legend,
    }
}

fn component_values(analysis: &RegionAnalysis, component: Component) -> Vec<Option<f64>> {
    match component {
        Component::Observed => analysis.series.values.iter().copied().map(Some).collect(),
        Component::Trend => analysis.decomposition.trend(),
        Component::Seasonal => analysis.decomposition.seasonal(),
        Component::Residual => analysis.decomposition.residual(),
    }
}

fn base_label(component: Component) -> &'static str {
    match component {
        Component::Observed => "Original",
        Component::Trend => "Trend",
        Component::Seasonal => "Seasonal",
        Component::Residual => "Residual",
    }
}

/// Splits points into runs of consecutive defined, finite values.
pub fn segments(xs: &[f64], ys: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();

    for (x, y) in xs.iter().zip(ys.iter()) {
        match y {
            Some(y) if y.is_finite() => current.push((*x, *y)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Keeps the first line for each label.
fn dedup_legend(lines: &[Line]) -> Vec<LegendEntry> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter(|l| seen.insert(l.label.as_str()))
        .map(|l| LegendEntry {
            label: l.label.clone(),
            color: l.color,
            style: l.style,
        })
        .collect()
}

/// Years whose January 1 lies within `[first, last]`.
pub fn year_ticks(first: Option<NaiveDate>, last: Option<NaiveDate>) -> Vec<i32> {
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };
    let start = if first.month() == 1 && first.day() == 1 {
        first.year()
    } else {
        first.year() + 1
    };
    (start..=last.year()).collect()
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn padded_extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    match extent(values) {
        None => (0.0, 1.0),
        Some((lo, hi)) if lo == hi => (lo - 1.0, hi + 1.0),
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            (lo - pad, hi + pad)
        }
    }
}
