use crate::config::Rgb;
use crate::render::layout::{Figure, Line, LineStyle, Panel};
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::coord::combinators::BindKeyPoints;
use plotters::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Default output size in pixels, roughly a 14x12 inch figure.
pub const DEFAULT_SIZE: (u32, u32) = (1400, 1200);

const MARKER_HALF_SIZE: i32 = 6;
const DASH_LEN: u32 = 8;
const DASH_GAP: u32 = 5;

/// Draws `figure` as an SVG file at `path`.
#[tracing::instrument(skip_all, fields(path = %path.display(), panels = figure.panels.len()))]
pub fn render_svg(figure: &Figure, path: &Path, size: (u32, u32)) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&figure.title, ("sans-serif", 24))?;

    let areas = root.split_evenly((figure.panels.len().max(1), 1));
    let last = figure.panels.len().saturating_sub(1);

    for (i, (area, panel)) in areas.iter().zip(&figure.panels).enumerate() {
        draw_panel(area, panel, figure, i == last)?;
    }

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Chart written");
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    figure: &Figure,
    is_bottom: bool,
) -> Result<()> {
    let (x0, x1) = widen(figure.x_range);
    let (y0, y1) = panel.y_range();
    let ticks = year_key_points(&figure.year_ticks, (x0, x1));
    let tick_count = ticks.len().max(1);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(if is_bottom { 40 } else { 20 })
        .y_label_area_size(70)
        .build_cartesian_2d((x0..x1).with_key_points(ticks), y0..y1)?;

    chart
        .configure_mesh()
        .x_labels(tick_count)
        .x_label_formatter(&year_label)
        .y_label_formatter(&value_label)
        .y_desc(panel.y_label.as_str())
        .x_desc(if is_bottom { "Year" } else { "" })
        .draw()?;

    let legend_labels: HashSet<&str> = panel.legend.iter().map(|e| e.label.as_str()).collect();
    let mut labeled: HashSet<&str> = HashSet::new();

    for line in &panel.lines {
        let style = shape_style(line);
        for segment in &line.segments {
            let anno = match line.style {
                LineStyle::Dashed => chart.draw_series(DashedLineSeries::new(
                    segment.iter().copied(),
                    DASH_LEN,
                    DASH_GAP,
                    style,
                ))?,
                LineStyle::Solid | LineStyle::Faint => {
                    chart.draw_series(LineSeries::new(segment.iter().copied(), style))?
                }
            };

            let label = line.label.as_str();
            if legend_labels.contains(label) && labeled.insert(label) {
                anno.label(label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], style)
                });
            }
        }
    }

    chart.draw_series(panel.markers.iter().map(|m| {
        let fill = to_color(m.color);
        EmptyElement::at((m.x, m.y))
            + Rectangle::new(
                [
                    (-MARKER_HALF_SIZE, -MARKER_HALF_SIZE),
                    (MARKER_HALF_SIZE, MARKER_HALF_SIZE),
                ],
                fill.filled(),
            )
            + Rectangle::new(
                [
                    (-MARKER_HALF_SIZE, -MARKER_HALF_SIZE),
                    (MARKER_HALF_SIZE, MARKER_HALF_SIZE),
                ],
                BLACK.stroke_width(1),
            )
    }))?;

    if !labeled.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", 12))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    debug!(
        component = %panel.component,
        lines = panel.lines.len(),
        markers = panel.markers.len(),
        "Panel drawn"
    );
    Ok(())
}

fn shape_style(line: &Line) -> ShapeStyle {
    let color = to_color(line.color);
    match line.style {
        LineStyle::Solid => color.stroke_width(2),
        LineStyle::Dashed => color.stroke_width(1),
        LineStyle::Faint => color.mix(0.5).stroke_width(1),
    }
}

fn to_color(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

/// Labels integral x positions with the year; other positions stay blank.
fn year_label(x: &f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{}", x.round() as i32)
    } else {
        String::new()
    }
}

fn value_label(y: &f64) -> String {
    format!("{y:.2}")
}

/// One x key point per year tick inside the plotted range.
fn year_key_points(years: &[i32], (lo, hi): (f64, f64)) -> Vec<f64> {
    years
        .iter()
        .map(|&y| f64::from(y))
        .filter(|x| (lo..=hi).contains(x))
        .collect()
}

fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::Component;
    use crate::render::layout::{LegendEntry, MarkerGlyph};

    #[test]
    fn test_year_label() {
        assert_eq!(year_label(&2005.0), "2005");
        assert_eq!(year_label(&2005.5), "");
    }

    #[test]
    fn test_year_key_points_stay_in_range() {
        assert_eq!(
            year_key_points(&[1999, 2000, 2001, 2002, 2003], (2000.0, 2002.5)),
            vec![2000.0, 2001.0, 2002.0]
        );
    }

    #[test]
    fn test_every_year_tick_is_labeled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticks.svg");

        let points: Vec<(f64, f64)> = (0..61)
            .map(|i| (1998.0 + i as f64 / 12.0, (i % 7) as f64))
            .collect();
        let figure = Figure {
            title: "Ticks".to_string(),
            panels: vec![Panel {
                component: Component::Trend,
                y_label: "Decomposed Trend".to_string(),
                legend: vec![LegendEntry {
                    label: "Trend Line".to_string(),
                    color: Rgb::BLACK,
                    style: LineStyle::Dashed,
                }],
                lines: vec![Line {
                    label: "Trend Line".to_string(),
                    color: Rgb::BLACK,
                    style: LineStyle::Dashed,
                    segments: vec![points],
                }],
                markers: vec![],
            }],
            year_ticks: (1998..=2003).collect(),
            x_range: (1997.5, 2003.5),
        };

        render_svg(&figure, &path, (900, 300)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        for year in 1998..=2003 {
            assert!(content.contains(&format!(">{year}<")), "missing {year}");
        }
    }

    #[test]
    fn test_render_svg_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("figure.svg");

        let line = Line {
            label: "Jones".to_string(),
            color: Rgb(255, 165, 0),
            style: LineStyle::Solid,
            segments: vec![vec![(2000.0, 1.0), (2000.5, 2.0)], vec![(2001.0, 1.5)]],
        };
        let figure = Figure {
            title: "Chlorophyll-a".to_string(),
            panels: vec![Panel {
                component: Component::Observed,
                y_label: "MeanChl".to_string(),
                legend: vec![LegendEntry {
                    label: "Jones".to_string(),
                    color: line.color,
                    style: line.style,
                }],
                lines: vec![line],
                markers: vec![MarkerGlyph {
                    x: 2000.5,
                    y: 1.5,
                    color: Rgb(255, 165, 0),
                }],
            }],
            year_ticks: vec![2001],
            x_range: (2000.0, 2001.0),
        };

        render_svg(&figure, &path, (600, 400)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<svg"));
        assert!(content.contains("Jones"));
    }
}
