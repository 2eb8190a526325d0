//! The visualization renderer: a pure mapping from (dataset, descriptor,
//! config) to a render plan. Validation happens up front, so an invalid
//! descriptor never produces a half-built chart; per-record coercion
//! failures are dropped and counted instead of aborting the batch.

use log::debug;

use crate::data::{Dataset, Record};
use crate::descriptor::{ChartFamily, Descriptor, DisplayOptions, WidthSpec};
use crate::error::RenderError;
use crate::palette::{Color, Palette};
use crate::plan::{
    CartesianChart, ChartGeometry, Dimension, DisplayPlan, PieChart, PointShape, RenderPlan,
    ScatterChart, ScatterPoint, SeriesPlan, SlicePlan,
};
use crate::tooltip::TooltipTemplate;
use crate::RenderConfig;

/// Resolve a descriptor against a dataset into a render plan.
///
/// An empty dataset yields the no-data plan before any validation runs, so
/// callers always get the explicit empty state regardless of descriptor
/// validity.
pub fn render(
    dataset: &Dataset,
    descriptor: &Descriptor,
    config: &RenderConfig,
) -> Result<RenderPlan, RenderError> {
    if dataset.is_empty() {
        return Ok(RenderPlan {
            chart: ChartGeometry::NoData,
            display: resolve_display(&descriptor.display_options, config, None),
            dropped_records: 0,
        });
    }

    let family = descriptor
        .chart_family
        .parse::<ChartFamily>()
        .map_err(|_| RenderError::UnknownChartFamily {
            family: descriptor.chart_family.clone(),
        })?;

    let tooltip = match &descriptor.display_options.tooltip {
        Some(text) => Some(TooltipTemplate::parse(text).map_err(RenderError::BadTooltipTemplate)?),
        None => None,
    };

    let (chart, dropped_records) = match family {
        ChartFamily::Line | ChartFamily::Bar | ChartFamily::Area => {
            resolve_cartesian(family, dataset, descriptor, &config.palette)?
        }
        ChartFamily::Pie => resolve_pie(dataset, descriptor, &config.palette)?,
        ChartFamily::Scatter => resolve_scatter(dataset, descriptor, &config.palette)?,
    };

    Ok(RenderPlan {
        chart,
        display: resolve_display(&descriptor.display_options, config, tooltip),
        dropped_records,
    })
}

/// Line, bar, and area charts share one category axis and one renderable
/// series per binding entry. A cell that fails numeric coercion becomes a
/// gap (`None`) rather than dropping the whole record, which would
/// desynchronize the shared axis across series.
fn resolve_cartesian(
    family: ChartFamily,
    dataset: &Dataset,
    descriptor: &Descriptor,
    palette: &Palette,
) -> Result<(ChartGeometry, usize), RenderError> {
    let bindings = &descriptor.field_bindings;
    let category_field = require_binding(family, "categoryField", bindings.category_field.as_deref())?;
    if bindings.series.is_empty() {
        return Err(RenderError::missing_binding(family, "series"));
    }

    let first = first_record(dataset);
    check_field(first, category_field)?;
    for (idx, series) in bindings.series.iter().enumerate() {
        if series.field.trim().is_empty() {
            return Err(RenderError::missing_binding(
                family,
                format!("series[{}].field", idx),
            ));
        }
        check_field(first, &series.field)?;
    }

    let categories: Vec<String> = dataset
        .records
        .iter()
        .map(|record| {
            record
                .get(category_field)
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
        .collect();

    let mut gapped_records = vec![false; dataset.len()];
    let series: Vec<SeriesPlan> = bindings
        .series
        .iter()
        .enumerate()
        .map(|(idx, binding)| {
            let color = resolve_color(binding.color.as_deref(), idx, palette);
            let points: Vec<Option<f64>> = dataset
                .records
                .iter()
                .enumerate()
                .map(|(record_idx, record)| {
                    let value = record.get(&binding.field).and_then(|v| v.as_f64());
                    if value.is_none() {
                        debug!(
                            "record {}: field '{}' is not numeric; leaving a gap",
                            record_idx, binding.field
                        );
                        gapped_records[record_idx] = true;
                    }
                    value
                })
                .collect();
            SeriesPlan {
                field: binding.field.clone(),
                label: binding
                    .label
                    .clone()
                    .unwrap_or_else(|| binding.field.clone()),
                color,
                points,
            }
        })
        .collect();

    let dropped = gapped_records.iter().filter(|&&gapped| gapped).count();
    if series
        .iter()
        .all(|series| series.points.iter().all(Option::is_none))
    {
        return Ok((ChartGeometry::NoData, dataset.len()));
    }
    let chart = CartesianChart {
        category_field: category_field.to_string(),
        categories,
        series,
    };
    let geometry = match family {
        ChartFamily::Line => ChartGeometry::Line(chart),
        ChartFamily::Bar => ChartGeometry::Bar(chart),
        ChartFamily::Area => ChartGeometry::Area(chart),
        _ => unreachable!("resolve_cartesian only handles cartesian families"),
    };
    Ok((geometry, dropped))
}

/// One slice per record. Slices with a non-positive or missing value are
/// dropped so angle computation never divides by zero; dropping every
/// record degrades to the no-data state.
fn resolve_pie(
    dataset: &Dataset,
    descriptor: &Descriptor,
    palette: &Palette,
) -> Result<(ChartGeometry, usize), RenderError> {
    let bindings = &descriptor.field_bindings;
    let value_field = require_binding(ChartFamily::Pie, "valueField", bindings.value_field.as_deref())?;
    let label_field = require_binding(ChartFamily::Pie, "labelField", bindings.label_field.as_deref())?;

    let first = first_record(dataset);
    check_field(first, value_field)?;
    check_field(first, label_field)?;

    let mut slices = Vec::with_capacity(dataset.len());
    let mut dropped = 0usize;
    for (record_idx, record) in dataset.records.iter().enumerate() {
        let value = record.get(value_field).and_then(|v| v.as_f64());
        match value {
            Some(value) if value > 0.0 => {
                let label = record
                    .get(label_field)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let slice_index = slices.len();
                slices.push(SlicePlan {
                    label,
                    value,
                    color: palette.color_at(slice_index),
                });
            }
            Some(value) => {
                debug!(
                    "record {}: non-positive pie value {} in '{}'; slice dropped",
                    record_idx, value, value_field
                );
                dropped += 1;
            }
            None => {
                debug!(
                    "record {}: field '{}' is not numeric; slice dropped",
                    record_idx, value_field
                );
                dropped += 1;
            }
        }
    }

    if slices.is_empty() {
        return Ok((ChartGeometry::NoData, dropped));
    }

    Ok((
        ChartGeometry::Pie(PieChart {
            value_field: value_field.to_string(),
            label_field: label_field.to_string(),
            slices,
        }),
        dropped,
    ))
}

/// One point per record at (x, y). A record whose coordinates fail numeric
/// coercion is skipped, not fatal; skipping every record degrades to the
/// no-data state.
fn resolve_scatter(
    dataset: &Dataset,
    descriptor: &Descriptor,
    palette: &Palette,
) -> Result<(ChartGeometry, usize), RenderError> {
    let bindings = &descriptor.field_bindings;
    let x_field = require_binding(ChartFamily::Scatter, "xField", bindings.x_field.as_deref())?;
    let y_field = require_binding(ChartFamily::Scatter, "yField", bindings.y_field.as_deref())?;

    let first = first_record(dataset);
    check_field(first, x_field)?;
    check_field(first, y_field)?;

    let mut points = Vec::with_capacity(dataset.len());
    let mut dropped = 0usize;
    for (record_idx, record) in dataset.records.iter().enumerate() {
        let x = record.get(x_field).and_then(|v| v.as_f64());
        let y = record.get(y_field).and_then(|v| v.as_f64());
        match (x, y) {
            (Some(x), Some(y)) => points.push(ScatterPoint {
                x,
                y,
                record_index: record_idx,
            }),
            _ => {
                debug!(
                    "record {}: '{}'/'{}' not numeric; point dropped",
                    record_idx, x_field, y_field
                );
                dropped += 1;
            }
        }
    }

    if points.is_empty() {
        return Ok((ChartGeometry::NoData, dropped));
    }

    let point_meta = bindings.point.as_ref();
    let color = resolve_color(
        point_meta.and_then(|p| p.color.as_deref()),
        0,
        palette,
    );
    let shape = point_meta
        .and_then(|p| p.shape.as_deref())
        .map(PointShape::parse_lenient)
        .unwrap_or_default();

    Ok((
        ChartGeometry::Scatter(ScatterChart {
            x_field: x_field.to_string(),
            y_field: y_field.to_string(),
            name: point_meta.and_then(|p| p.name.clone()),
            shape,
            color,
            points,
        }),
        dropped,
    ))
}

fn resolve_display(
    options: &DisplayOptions,
    config: &RenderConfig,
    tooltip: Option<TooltipTemplate>,
) -> DisplayPlan {
    let defaults = &config.defaults;
    let width = match &options.width {
        Some(WidthSpec::Pixels(px)) => Dimension::Px(*px),
        Some(WidthSpec::Text(text)) => parse_percent(text).unwrap_or(defaults.width),
        None => defaults.width,
    };
    DisplayPlan {
        show_legend: options.show_legend.unwrap_or(defaults.show_legend),
        margins: options.margins.unwrap_or(defaults.margins),
        width,
        height: options.height.unwrap_or(defaults.height),
        tooltip,
    }
}

fn parse_percent(text: &str) -> Option<Dimension> {
    let text = text.trim();
    let digits = text.strip_suffix('%')?;
    let pct = digits.trim().parse::<u8>().ok()?;
    (pct > 0 && pct <= 100).then_some(Dimension::Percent(pct))
}

/// Explicit descriptor colors are parsed leniently: an unparseable color
/// falls back to the palette instead of failing the render.
fn resolve_color(explicit: Option<&str>, index: usize, palette: &Palette) -> Color {
    explicit
        .and_then(Color::parse)
        .unwrap_or_else(|| palette.color_at(index))
}

fn require_binding<'a>(
    family: ChartFamily,
    binding: &str,
    value: Option<&'a str>,
) -> Result<&'a str, RenderError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RenderError::missing_binding(family, binding)),
    }
}

fn check_field(first: &Record, field: &str) -> Result<(), RenderError> {
    if first.has_field(field) {
        Ok(())
    } else {
        Err(RenderError::UnknownField {
            field: field.to_string(),
        })
    }
}

fn first_record(dataset: &Dataset) -> &Record {
    // render() returns the no-data plan before any resolver runs, so a
    // resolver always sees at least one record.
    &dataset.records[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Scalar;
    use crate::descriptor::{FieldBindings, PointBinding, SeriesBinding};
    use crate::plan::Margins;
    use crate::DisplayDefaults;
    use serde_json::json;

    fn dataset(value: serde_json::Value) -> Dataset {
        Dataset::from_json(&value).unwrap()
    }

    fn cartesian_descriptor(family: &str, category: &str, fields: &[&str]) -> Descriptor {
        Descriptor {
            chart_family: family.to_string(),
            field_bindings: FieldBindings {
                category_field: Some(category.to_string()),
                series: fields.iter().map(|f| SeriesBinding::for_field(f)).collect(),
                ..FieldBindings::default()
            },
            ..Descriptor::default()
        }
    }

    fn pie_descriptor(value_field: &str, label_field: &str) -> Descriptor {
        Descriptor {
            chart_family: "pie".to_string(),
            field_bindings: FieldBindings {
                value_field: Some(value_field.to_string()),
                label_field: Some(label_field.to_string()),
                ..FieldBindings::default()
            },
            ..Descriptor::default()
        }
    }

    fn scatter_descriptor(x: &str, y: &str) -> Descriptor {
        Descriptor {
            chart_family: "scatter".to_string(),
            field_bindings: FieldBindings {
                x_field: Some(x.to_string()),
                y_field: Some(y.to_string()),
                ..FieldBindings::default()
            },
            ..Descriptor::default()
        }
    }

    #[test]
    fn test_bar_chart_scenario() {
        let dataset = dataset(json!([
            {"month": "Jan", "sales": 100},
            {"month": "Feb", "sales": 150}
        ]));
        let descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();

        assert_eq!(plan.family(), Some(ChartFamily::Bar));
        assert_eq!(plan.dropped_records, 0);
        let ChartGeometry::Bar(chart) = &plan.chart else {
            panic!("expected bar geometry");
        };
        assert_eq!(chart.categories, vec!["Jan", "Feb"]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points, vec![Some(100.0), Some(150.0)]);
        assert_eq!(chart.series[0].color, Palette::dashboard().color_at(0));
    }

    #[test]
    fn test_empty_dataset_wins_over_invalid_descriptor() {
        let dataset = Dataset::default();
        let descriptor = Descriptor::for_family("pie3d");
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        assert!(plan.is_no_data());
        assert_eq!(plan.dropped_records, 0);
    }

    #[test]
    fn test_unknown_family_names_offending_value() {
        let dataset = dataset(json!([{"a": 1}]));
        let descriptor = Descriptor::for_family("pie3d");
        let err = render(&dataset, &descriptor, &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownChartFamily { .. }));
        assert!(err.to_string().contains("pie3d"));
    }

    #[test]
    fn test_radar_family_rejected() {
        let dataset = dataset(json!([{"a": 1}]));
        let descriptor = Descriptor::for_family("radar");
        let err = render(&dataset, &descriptor, &RenderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("radar"));
    }

    #[test]
    fn test_missing_category_binding() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let mut descriptor = cartesian_descriptor("line", "month", &["sales"]);
        descriptor.field_bindings.category_field = None;
        let err = render(&dataset, &descriptor, &RenderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("categoryField"));
    }

    #[test]
    fn test_blank_series_field_rejected() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let descriptor = cartesian_descriptor("line", "month", &["  "]);
        let err = render(&dataset, &descriptor, &RenderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("series[0].field"));
    }

    #[test]
    fn test_unknown_bound_field_names_field() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let descriptor = cartesian_descriptor("bar", "month", &["profit"]);
        let err = render(&dataset, &descriptor, &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownField { .. }));
        assert!(err.to_string().contains("profit"));
    }

    #[test]
    fn test_cartesian_gap_keeps_row_alignment() {
        let dataset = dataset(json!([
            {"month": "Jan", "sales": 100, "refunds": "n/a"},
            {"month": "Feb", "sales": 150, "refunds": 12}
        ]));
        let descriptor = cartesian_descriptor("line", "month", &["sales", "refunds"]);
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let ChartGeometry::Line(chart) = &plan.chart else {
            panic!("expected line geometry");
        };
        assert_eq!(chart.series[0].points, vec![Some(100.0), Some(150.0)]);
        assert_eq!(chart.series[1].points, vec![None, Some(12.0)]);
        assert_eq!(plan.dropped_records, 1);
    }

    #[test]
    fn test_scatter_drops_uncoercible_record() {
        let dataset = dataset(json!([
            {"x": "a", "y": "not-a-number"},
            {"x": "1", "y": "2"}
        ]));
        let descriptor = scatter_descriptor("x", "y");
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let ChartGeometry::Scatter(chart) = &plan.chart else {
            panic!("expected scatter geometry");
        };
        assert_eq!(chart.points.len(), 1);
        assert_eq!(chart.points[0].x, 1.0);
        assert_eq!(chart.points[0].y, 2.0);
        assert_eq!(chart.points[0].record_index, 1);
        assert_eq!(plan.dropped_records, 1);
    }

    #[test]
    fn test_cartesian_all_gaps_degrades_to_no_data() {
        let dataset = dataset(json!([
            {"month": "Jan", "sales": "pending"},
            {"month": "Feb", "sales": "tbd"}
        ]));
        let descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        assert!(plan.is_no_data());
        assert_eq!(plan.dropped_records, 2);
    }

    #[test]
    fn test_scatter_all_dropped_degrades_to_no_data() {
        let dataset = dataset(json!([
            {"x": "a", "y": "b"},
            {"x": "c", "y": "d"}
        ]));
        let descriptor = scatter_descriptor("x", "y");
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        assert!(plan.is_no_data());
        assert_eq!(plan.dropped_records, 2);
    }

    #[test]
    fn test_scatter_point_metadata() {
        let dataset = dataset(json!([{"x": 1, "y": 2}]));
        let mut descriptor = scatter_descriptor("x", "y");
        descriptor.field_bindings.point = Some(PointBinding {
            name: Some("spending".to_string()),
            shape: Some("star".to_string()),
            color: Some("#112233".to_string()),
        });
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let ChartGeometry::Scatter(chart) = &plan.chart else {
            panic!("expected scatter geometry");
        };
        assert_eq!(chart.name.as_deref(), Some("spending"));
        assert_eq!(chart.shape, PointShape::Star);
        assert_eq!(chart.color, Color::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn test_pie_drops_non_positive_slice() {
        let dataset = dataset(json!([
            {"category": "rent", "amount": 1200},
            {"category": "refund", "amount": -5},
            {"category": "food", "amount": 350}
        ]));
        let descriptor = pie_descriptor("amount", "category");
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let ChartGeometry::Pie(chart) = &plan.chart else {
            panic!("expected pie geometry");
        };
        let labels: Vec<&str> = chart.slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["rent", "food"]);
        assert_eq!(plan.dropped_records, 1);
    }

    #[test]
    fn test_pie_all_dropped_degrades_to_no_data() {
        let dataset = dataset(json!([
            {"category": "a", "amount": 0},
            {"category": "b", "amount": -1}
        ]));
        let descriptor = pie_descriptor("amount", "category");
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        assert!(plan.is_no_data());
        assert_eq!(plan.dropped_records, 2);
    }

    #[test]
    fn test_color_assignment_is_deterministic() {
        let dataset = dataset(json!([
            {"month": "Jan", "a": 1, "b": 2, "c": 3}
        ]));
        let descriptor = cartesian_descriptor("line", "month", &["a", "b", "c"]);
        let config = RenderConfig::default();
        let first = render(&dataset, &descriptor, &config).unwrap();
        let second = render(&dataset, &descriptor, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_palette_cycles_past_its_length() {
        let dataset = dataset(json!([
            {"month": "Jan", "a": 1, "b": 2, "c": 3}
        ]));
        let descriptor = cartesian_descriptor("area", "month", &["a", "b", "c"]);
        let config = RenderConfig {
            palette: Palette::new(vec![Color::new(1, 1, 1), Color::new(2, 2, 2)]),
            defaults: DisplayDefaults::default(),
        };
        let plan = render(&dataset, &descriptor, &config).unwrap();
        let ChartGeometry::Area(chart) = &plan.chart else {
            panic!("expected area geometry");
        };
        assert_eq!(chart.series[0].color, Color::new(1, 1, 1));
        assert_eq!(chart.series[1].color, Color::new(2, 2, 2));
        assert_eq!(chart.series[2].color, Color::new(1, 1, 1));
    }

    #[test]
    fn test_unparseable_explicit_color_falls_back_to_palette() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let mut descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        descriptor.field_bindings.series[0].color = Some("chartreuse-ish".to_string());
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let ChartGeometry::Bar(chart) = &plan.chart else {
            panic!("expected bar geometry");
        };
        assert_eq!(chart.series[0].color, Palette::dashboard().color_at(0));
    }

    #[test]
    fn test_display_defaults_applied() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        assert!(!plan.display.show_legend);
        assert_eq!(plan.display.width, Dimension::Percent(100));
        assert_eq!(plan.display.height, 400);
        assert_eq!(plan.display.margins, Margins::default());
    }

    #[test]
    fn test_display_options_override_defaults() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let mut descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        descriptor.display_options.show_legend = Some(true);
        descriptor.display_options.height = Some(300);
        descriptor.display_options.width = Some(WidthSpec::Pixels(640));
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        assert!(plan.display.show_legend);
        assert_eq!(plan.display.height, 300);
        assert_eq!(plan.display.width, Dimension::Px(640));
    }

    #[test]
    fn test_tooltip_template_resolved_and_formatting() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let mut descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        descriptor.display_options.tooltip = Some("{month}: {sales} USD".to_string());
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let template = plan.display.tooltip.as_ref().unwrap();
        assert_eq!(template.format(&dataset.records[0]), "Jan: 100 USD");
    }

    #[test]
    fn test_malformed_tooltip_is_invalid_descriptor() {
        let dataset = dataset(json!([{"month": "Jan", "sales": 100}]));
        let mut descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        descriptor.display_options.tooltip = Some("{month".to_string());
        let err = render(&dataset, &descriptor, &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::BadTooltipTemplate(_)));
    }

    #[test]
    fn test_csv_string_numerics_coerce() {
        // CSV ingestion yields Text for every column; numeric coercion
        // happens on use.
        let dataset = Dataset::from_csv_reader("month,sales\nJan,100\nFeb,150\n".as_bytes()).unwrap();
        assert_eq!(
            dataset.records[0].get("sales"),
            Some(&Scalar::Text("100".to_string()))
        );
        let descriptor = cartesian_descriptor("bar", "month", &["sales"]);
        let plan = render(&dataset, &descriptor, &RenderConfig::default()).unwrap();
        let ChartGeometry::Bar(chart) = &plan.chart else {
            panic!("expected bar geometry");
        };
        assert_eq!(chart.series[0].points, vec![Some(100.0), Some(150.0)]);
    }
}
