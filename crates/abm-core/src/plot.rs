//! Charts
//!
//! SVG line charts of collector series and ODE trajectories, plus the
//! predator-prey phase plot.

use abm_records::{Series, Trajectory};
use plotters::prelude::*;
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

use crate::error::{SimError, SimResult};

const SIZE: (u32, u32) = (800, 480);

fn plot_err<E: Display>(e: E) -> SimError {
    SimError::Plot(e.to_string())
}

/// Axis range covering `values`, padded so flat data still has height
fn span(values: impl Iterator<Item = f64>, floor_at_zero: bool) -> Range<f64> {
    let (mut lo, mut hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if floor_at_zero && lo > 0.0 {
        lo = 0.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { hi.abs().max(1.0) * 0.5 };
    if !(floor_at_zero && lo == 0.0) {
        lo -= pad;
    }
    hi += pad;
    lo..hi
}

/// Draw several named lines sharing one x axis
fn line_chart(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    lines: &[(String, Vec<(f64, f64)>)],
) -> SimResult<()> {
    let x_range = span(lines.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.0)), false);
    let y_range = span(lines.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.1)), true);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(56)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    for (i, (label, points)) in lines.iter().enumerate() {
        let style = Palette99::pick(i).to_rgba().stroke_width(2);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), style))
            .map_err(plot_err)?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Every component of a trajectory against time
pub fn time_series_svg(trajectory: &Trajectory, path: &Path, title: &str) -> SimResult<()> {
    if trajectory.is_empty() {
        return Err(SimError::Plot("empty trajectory".to_string()));
    }
    let times = trajectory.times();
    let lines: Vec<(String, Vec<(f64, f64)>)> = trajectory
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let values = trajectory.component(i);
            (label.clone(), times.iter().copied().zip(values).collect())
        })
        .collect();
    line_chart(path, title, "t", "population", &lines)
}

/// Component `x` against component `y`, with the starting state marked
pub fn phase_portrait_svg(
    trajectory: &Trajectory,
    x: usize,
    y: usize,
    path: &Path,
    title: &str,
) -> SimResult<()> {
    let pairs = trajectory.phase_pairs(x, y);
    let Some(&start) = pairs.first() else {
        return Err(SimError::Plot(format!("no data for components {} and {}", x, y)));
    };
    let label = |i: usize| {
        trajectory
            .labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("y{}", i))
    };

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(56)
        .build_cartesian_2d(
            span(pairs.iter().map(|p| p.0), true),
            span(pairs.iter().map(|p| p.1), true),
        )
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(label(x))
        .y_desc(label(y))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(pairs.iter().copied(), BLUE.stroke_width(2)))
        .map_err(plot_err)?;
    chart
        .draw_series(std::iter::once(Circle::new(start, 4, RED.filled())))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Selected collector columns against step
pub fn series_svg(series: &Series, columns: &[&str], path: &Path, title: &str) -> SimResult<()> {
    let lines: Vec<(String, Vec<(f64, f64)>)> = columns
        .iter()
        .map(|name| {
            let points = series
                .column_with_steps(name)
                .into_iter()
                .map(|(step, v)| (step as f64, v))
                .collect();
            (name.to_string(), points)
        })
        .filter(|(_, points): &(String, Vec<(f64, f64)>)| !points.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(SimError::Plot(format!("no data for columns {:?}", columns)));
    }
    line_chart(path, title, "step", "value", &lines)
}
