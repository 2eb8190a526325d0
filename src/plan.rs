//! The render plan: the validated, fully resolved, backend-agnostic output
//! of the renderer. A charting backend executes a plan without ever looking
//! at the raw descriptor.

use serde::{Deserialize, Serialize, Serializer};

use crate::descriptor::ChartFamily;
use crate::palette::Color;
use crate::tooltip::TooltipTemplate;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    #[serde(flatten)]
    pub chart: ChartGeometry,
    pub display: DisplayPlan,
    /// Records excluded by coercion or value rules for this render.
    pub dropped_records: usize,
}

impl RenderPlan {
    pub fn family(&self) -> Option<ChartFamily> {
        self.chart.family()
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self.chart, ChartGeometry::NoData)
    }
}

/// Per-family resolved geometry, tagged with the chart family on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chartFamily", rename_all = "lowercase")]
pub enum ChartGeometry {
    Line(CartesianChart),
    Bar(CartesianChart),
    Area(CartesianChart),
    Pie(PieChart),
    Scatter(ScatterChart),
    /// The explicit empty state: zero usable records. Not an error.
    #[serde(rename = "none")]
    NoData,
}

impl ChartGeometry {
    pub fn family(&self) -> Option<ChartFamily> {
        match self {
            ChartGeometry::Line(_) => Some(ChartFamily::Line),
            ChartGeometry::Bar(_) => Some(ChartFamily::Bar),
            ChartGeometry::Area(_) => Some(ChartFamily::Area),
            ChartGeometry::Pie(_) => Some(ChartFamily::Pie),
            ChartGeometry::Scatter(_) => Some(ChartFamily::Scatter),
            ChartGeometry::NoData => None,
        }
    }
}

/// Shared geometry for line, bar, and area charts: one category axis, one
/// or more value series in a single coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartesianChart {
    pub category_field: String,
    /// One label per record, in dataset order.
    pub categories: Vec<String>,
    pub series: Vec<SeriesPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPlan {
    pub field: String,
    pub label: String,
    pub color: Color,
    /// One entry per record; `None` marks a value that failed numeric
    /// coercion (a gap), keeping all series row-aligned.
    pub points: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PieChart {
    pub value_field: String,
    pub label_field: String,
    /// Slices with non-positive or missing values are already dropped.
    pub slices: Vec<SlicePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlicePlan {
    pub label: String,
    pub value: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterChart {
    pub x_field: String,
    pub y_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub shape: PointShape,
    pub color: Color,
    /// Records whose x or y failed numeric coercion are already dropped.
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Index into the source dataset, for tooltip lookup.
    pub record_index: usize,
}

/// Scatter point marker shapes. Unrecognized requests fall back to circles
/// rather than failing the render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointShape {
    #[default]
    Circle,
    Cross,
    Diamond,
    Square,
    Star,
    Triangle,
}

impl PointShape {
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "cross" => PointShape::Cross,
            "diamond" => PointShape::Diamond,
            "square" => PointShape::Square,
            "star" => PointShape::Star,
            "triangle" => PointShape::Triangle,
            _ => PointShape::Circle,
        }
    }
}

/// Fully resolved display options: nothing optional left except the tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPlan {
    pub show_legend: bool,
    pub margins: Margins,
    pub width: Dimension,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<TooltipTemplate>,
}

/// Chart margins in pixels. Partial margin objects in a descriptor fill the
/// remaining sides with the baseline values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20,
            right: 30,
            bottom: 20,
            left: 10,
        }
    }
}

/// A resolved width: absolute pixels or a percentage of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Px(u32),
    Percent(u8),
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dimension::Px(px) => serializer.serialize_u32(*px),
            Dimension::Percent(pct) => serializer.serialize_str(&format!("{}%", pct)),
        }
    }
}
