//! Elevation and slope profile chart.
//!
//! Draws the smoothed elevation against distance, the slope of the sampled
//! points on a secondary axis, a marker pair per detected loop and a summary
//! box. PNG or SVG is picked from the output extension.
use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{AltitudeError, Result};
use crate::TrackAnalysis;

const CHART_SIZE: (u32, u32) = (1200, 600);
const KM_TICK_M: f64 = 5000.0;
const LOOP_COLOR: RGBColor = MAGENTA;
const SLOPE_COLOR: RGBColor = RGBColor(0, 170, 170);

/// Every `step`-th point with its slope in percent relative to the previous
/// sampled point. The first slope is 0, as is any slope over zero distance.
pub fn sample_slopes(distances: &[f64], elevations: &[f64], step: usize) -> (Vec<f64>, Vec<f64>) {
    let step = step.max(1);
    let sampled_distances: Vec<f64> = distances.iter().copied().step_by(step).collect();
    let sampled_elevations: Vec<f64> = elevations.iter().copied().step_by(step).collect();
    let len = sampled_distances.len().min(sampled_elevations.len());

    let mut slopes = Vec::with_capacity(len);
    if len > 0 {
        slopes.push(0.0);
    }
    for i in 1..len {
        let distance_change = sampled_distances[i] - sampled_distances[i - 1];
        let elevation_change = sampled_elevations[i] - sampled_elevations[i - 1];
        if distance_change > 0.0 {
            slopes.push(elevation_change / distance_change * 100.0);
        } else {
            slopes.push(0.0);
        }
    }

    (sampled_distances[..len].to_vec(), slopes)
}

/// Distance axis ticks in meters: every 5 km from 0, below `total_m + 1000`.
/// The axis is widened to reach the last tick.
pub fn distance_ticks(total_m: f64) -> Vec<f64> {
    let limit = total_m.max(0.0).floor() + 1000.0;
    (0u32..)
        .map(|i| f64::from(i) * KM_TICK_M)
        .take_while(|&tick| tick < limit)
        .collect()
}

/// Summary lines shown in the chart box.
pub fn summary_lines(analysis: &TrackAnalysis, sampling_step: usize) -> Vec<String> {
    let summary = &analysis.elevation;
    vec![
        format!("Sampling step: {}", sampling_step),
        format!("Total ascent: {} m", summary.total_ascent as i64),
        format!("Total descent: {} m", summary.total_descent as i64),
        format!("Net elevation difference: {} m", summary.net_difference as i64),
        format!("Average point spacing: {} m", analysis.average_spacing_m as i64),
    ]
}

/// Render the profile to `path`.
pub fn render_profile(analysis: &TrackAnalysis, sampling_step: usize, path: &Path) -> Result<()> {
    if analysis.distances.is_empty() {
        return Err(AltitudeError::Render("track has no points to draw".into()));
    }

    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    let drawn = if is_svg {
        let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
        draw_profile(root, analysis, sampling_step)
    } else {
        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        draw_profile(root, analysis, sampling_step)
    };

    drawn.map_err(|e| AltitudeError::Render(e.to_string()))
}

fn draw_profile<DB>(
    root: DrawingArea<DB, Shift>,
    analysis: &TrackAnalysis,
    sampling_step: usize,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let distances = &analysis.distances;
    let smoothed = &analysis.elevation.smoothed;
    let (sampled_distances, slopes) = sample_slopes(distances, smoothed, sampling_step);

    let ticks = distance_ticks(distances.last().copied().unwrap_or(0.0));
    let x_max = distances
        .last()
        .copied()
        .unwrap_or(0.0)
        .max(ticks.last().copied().unwrap_or(0.0))
        .max(1.0);
    let (y_min, y_max) = padded_range(smoothed, 10.0);
    let (slope_min, slope_max) = padded_range(&slopes, 1.0);

    root.fill(&WHITE)?;

    let title = analysis.track.name.as_deref().unwrap_or("Elevation profile");
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Right, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d((0.0..x_max).with_key_points(ticks), y_min..y_max)?
        .set_secondary_coord(0.0..x_max, slope_min..slope_max);

    chart
        .configure_mesh()
        .x_label_formatter(&|v| format!("{:.0}", v / 1000.0))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc("Distance (km)")
        .y_desc("Elevation (m)")
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_label_formatter(&|v| format!("{:.0}", v))
        .y_desc("Slope (%)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            distances.iter().copied().zip(smoothed.iter().copied()),
            &BLUE,
        ))?
        .label("Elevation")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_secondary_series(LineSeries::new(
            sampled_distances.into_iter().zip(slopes),
            &SLOPE_COLOR,
        ))?
        .label("Slope")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SLOPE_COLOR));

    let marker_font = ("sans-serif", 14).into_font().color(&LOOP_COLOR);
    for (idx, circle) in analysis.circles.iter().enumerate() {
        let markers = [
            (circle.start_index, format!("BC{}", idx + 1)),
            (circle.end_index, format!("EC{}", idx + 1)),
        ];
        for (index, label) in markers {
            let Some(&x) = distances.get(index) else {
                continue;
            };
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, y_min), (x, y_max)],
                LOOP_COLOR,
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                label,
                (x, y_min),
                marker_font.clone(),
            )))?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    draw_summary_box(&root, &summary_lines(analysis, sampling_step))?;

    root.present()?;
    Ok(())
}

fn draw_summary_box<DB>(
    root: &DrawingArea<DB, Shift>,
    lines: &[String],
) -> std::result::Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (width, height) = root.dim_in_pixel();
    let line_height = 16;
    let box_width = 260;
    let box_height = line_height * lines.len() as i32 + 12;
    let left = width as i32 / 2 - box_width / 2;
    let top = height as i32 - 70 - box_height;

    root.draw(&Rectangle::new(
        [(left, top), (left + box_width, top + box_height)],
        RGBColor(245, 222, 179).mix(0.9).filled(),
    ))?;

    for (i, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.as_str(),
            (left + 8, top + 6 + i as i32 * line_height),
            ("sans-serif", 13).into_font(),
        ))?;
    }
    Ok(())
}

/// Data range with a margin so flat profiles still get a drawable axis.
fn padded_range(values: &[f64], min_span: f64) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, min_span);
    }
    let pad = ((max - min) * 0.05).max(min_span / 2.0);
    (min - pad, max + pad)
}
