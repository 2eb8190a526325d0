//! A plotters-based consumer of render plans.
//!
//! The backend reads only the plan, never the raw descriptor, and draws
//! it into a PNG-encoded RGB buffer. One concrete backend is enough to
//! prove the plan is self-describing; anything consuming the JSON form of a
//! plan can do the same.

use anyhow::{bail, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::palette;
use crate::plan::{CartesianChart, ChartGeometry, PieChart, PointShape, RenderPlan, ScatterChart};

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

enum CartesianMark {
    Line,
    Bar,
    Area,
}

/// Draw a plan into PNG bytes at the given pixel size.
pub fn draw_png(plan: &RenderPlan, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        bail!("Image dimensions must be non-zero");
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        match &plan.chart {
            ChartGeometry::Line(chart) => draw_cartesian(&root, chart, CartesianMark::Line, plan)?,
            ChartGeometry::Bar(chart) => draw_cartesian(&root, chart, CartesianMark::Bar, plan)?,
            ChartGeometry::Area(chart) => draw_cartesian(&root, chart, CartesianMark::Area, plan)?,
            ChartGeometry::Scatter(chart) => draw_scatter(&root, chart, plan)?,
            ChartGeometry::Pie(chart) => draw_pie(&root, chart, plan, width, height)?,
            ChartGeometry::NoData => draw_no_data(&root, width, height)?,
        }

        root.present().context("Failed to finalize drawing")?;
    }

    encode_png(&buffer, width, height)
}

fn rgb(color: palette::Color) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

fn draw_cartesian(
    root: &Canvas,
    chart: &CartesianChart,
    mark: CartesianMark,
    plan: &RenderPlan,
) -> Result<()> {
    let n = chart.categories.len();
    let values: Vec<f64> = chart
        .series
        .iter()
        .flat_map(|series| series.points.iter().flatten().copied())
        .collect();
    // The renderer degrades all-gap charts to NoData, so values is non-empty.
    let data_min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let data_max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = pad_range(data_min.min(0.0), data_max.max(0.0));

    let margins = plan.display.margins;
    let mut builder = ChartBuilder::on(root);
    builder
        .margin_top(margins.top)
        .margin_right(margins.right)
        .margin_bottom(margins.bottom)
        .margin_left(margins.left)
        .x_label_area_size(35)
        .y_label_area_size(45);

    let mut ctx = builder
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
        .context("Failed to build chart coordinates")?;

    let categories = chart.categories.clone();
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n.min(12))
        .x_label_formatter(&move |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 0.25 || idx < 0.0 {
                return String::new();
            }
            categories.get(idx as usize).cloned().unwrap_or_default()
        })
        .draw()
        .context("Failed to draw axes")?;

    let series_count = chart.series.len();
    for (series_idx, series) in chart.series.iter().enumerate() {
        let color = rgb(series.color);
        match mark {
            CartesianMark::Line => {
                for (run_idx, run) in point_runs(&series.points).into_iter().enumerate() {
                    let anno = ctx
                        .draw_series(LineSeries::new(run.clone(), color.stroke_width(2)))
                        .context("Failed to draw line series")?;
                    if run_idx == 0 {
                        anno.label(series.label.clone()).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 16, y)], color)
                        });
                    }
                    ctx.draw_series(
                        run.iter()
                            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
                    )
                    .context("Failed to draw line markers")?;
                }
            }
            CartesianMark::Area => {
                for (run_idx, run) in point_runs(&series.points).into_iter().enumerate() {
                    let anno = ctx
                        .draw_series(
                            AreaSeries::new(run, 0.0, color.mix(0.35)).border_style(color),
                        )
                        .context("Failed to draw area series")?;
                    if run_idx == 0 {
                        anno.label(series.label.clone()).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 16, y)], color)
                        });
                    }
                }
            }
            CartesianMark::Bar => {
                // Bars for one category share a 0.8-wide group, split
                // evenly between the series.
                let group_width = 0.8;
                let bar_width = group_width / series_count as f64;
                let offset = -group_width / 2.0 + series_idx as f64 * bar_width;
                let anno = ctx
                    .draw_series(series.points.iter().enumerate().filter_map(
                        |(record_idx, point)| {
                            point.map(|value| {
                                let x0 = record_idx as f64 + offset;
                                Rectangle::new(
                                    [(x0, 0.0), (x0 + bar_width, value)],
                                    color.filled(),
                                )
                            })
                        },
                    ))
                    .context("Failed to draw bar series")?;
                anno.label(series.label.clone())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                    });
            }
        }
    }

    if plan.display.show_legend {
        ctx.configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_scatter(root: &Canvas, chart: &ScatterChart, plan: &RenderPlan) -> Result<()> {
    let (x_min, x_max) = pad_range(
        chart.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
        chart
            .points
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max),
    );
    let (y_min, y_max) = pad_range(
        chart.points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
        chart
            .points
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max),
    );

    let margins = plan.display.margins;
    let mut ctx = ChartBuilder::on(root)
        .margin_top(margins.top)
        .margin_right(margins.right)
        .margin_bottom(margins.bottom)
        .margin_left(margins.left)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .context("Failed to build chart coordinates")?;

    ctx.configure_mesh()
        .x_desc(chart.x_field.clone())
        .y_desc(chart.y_field.clone())
        .draw()
        .context("Failed to draw axes")?;

    let color = rgb(chart.color);
    let coords = chart.points.iter().map(|p| (p.x, p.y));
    match chart.shape {
        PointShape::Square | PointShape::Diamond => {
            ctx.draw_series(coords.map(|(x, y)| {
                EmptyElement::at((x, y)) + Rectangle::new([(-4, -4), (4, 4)], color.filled())
            }))
        }
        PointShape::Cross | PointShape::Star => {
            ctx.draw_series(coords.map(|(x, y)| Cross::new((x, y), 4, color.filled()).into_dyn()))
        }
        PointShape::Triangle => ctx.draw_series(
            coords.map(|(x, y)| TriangleMarker::new((x, y), 5, color.filled()).into_dyn()),
        ),
        PointShape::Circle => {
            ctx.draw_series(coords.map(|(x, y)| Circle::new((x, y), 4, color.filled()).into_dyn()))
        }
    }
    .context("Failed to draw scatter points")?;

    Ok(())
}

fn draw_pie(root: &Canvas, chart: &PieChart, plan: &RenderPlan, width: u32, height: u32) -> Result<()> {
    // The renderer drops non-positive slices, so the total is positive.
    let total: f64 = chart.slices.iter().map(|slice| slice.value).sum();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = (width.min(height) as f64) * 0.35;

    let mut start_angle = -90.0f64;
    for slice in &chart.slices {
        let sweep = slice.value / total * 360.0;
        let end_angle = start_angle + sweep;

        let mut points: Vec<(i32, i32)> = vec![(center.0 as i32, center.1 as i32)];
        let steps = ((sweep / 2.0).ceil() as usize).max(2);
        for step in 0..=steps {
            let angle = (start_angle + sweep * step as f64 / steps as f64).to_radians();
            points.push((
                (center.0 + radius * angle.cos()) as i32,
                (center.1 + radius * angle.sin()) as i32,
            ));
        }
        root.draw(&Polygon::new(points, rgb(slice.color).filled()))
            .context("Failed to draw pie slice")?;

        if plan.display.show_legend {
            let mid = (start_angle + sweep / 2.0).to_radians();
            let label_pos = (
                (center.0 + radius * 1.12 * mid.cos()) as i32,
                (center.1 + radius * 1.12 * mid.sin()) as i32,
            );
            root.draw(&Text::new(
                slice.label.clone(),
                label_pos,
                ("sans-serif", 14).into_font().color(&BLACK),
            ))
            .context("Failed to draw slice label")?;
        }

        start_angle = end_angle;
    }

    Ok(())
}

fn draw_no_data(root: &Canvas, width: u32, height: u32) -> Result<()> {
    root.draw(&Text::new(
        "no data available",
        ((width / 2) as i32 - 70, (height / 2) as i32 - 10),
        ("sans-serif", 22).into_font().color(&RGBColor(120, 120, 120)),
    ))
    .context("Failed to draw empty state")?;
    Ok(())
}

/// Split a row-aligned point column into contiguous runs of present values,
/// keeping category-index x coordinates. Gaps separate runs so lines and
/// areas do not bridge missing values.
fn point_runs(points: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (idx, point) in points.iter().enumerate() {
        match point {
            Some(value) => current.push((idx as f64, *value)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// 5% padding around a data range, widening equal endpoints by one unit.
fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png);
    encoder
        .write_image(buffer, width, height, image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png)
}
