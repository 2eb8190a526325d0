use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::plan::Margins;

/// The closed set of renderable chart families.
///
/// The descriptor keeps the family as a raw string so validation can quote
/// unrecognized values (e.g. `"pie3d"`) in its error message; parsing into
/// this enum is the gate every render goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFamily {
    Line,
    Bar,
    Pie,
    Scatter,
    Area,
}

impl ChartFamily {
    pub const ALL: [ChartFamily; 5] = [
        ChartFamily::Line,
        ChartFamily::Bar,
        ChartFamily::Pie,
        ChartFamily::Scatter,
        ChartFamily::Area,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartFamily::Line => "line",
            ChartFamily::Bar => "bar",
            ChartFamily::Pie => "pie",
            ChartFamily::Scatter => "scatter",
            ChartFamily::Area => "area",
        }
    }
}

impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartFamily {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartFamily::ALL
            .iter()
            .copied()
            .find(|family| family.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// A visualization descriptor as received from the analysis provider or a
/// saved configuration. Every field is optional and unknown fields are
/// ignored: the input is untrusted, and strictness lives in render-time
/// validation where errors can name the offending field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Descriptor {
    /// Raw chart family string, validated against [`ChartFamily`] later.
    #[serde(alias = "chartType")]
    pub chart_family: String,
    #[serde(alias = "configuration")]
    pub field_bindings: FieldBindings,
    pub display_options: DisplayOptions,
}

impl Descriptor {
    /// Convenience constructor for a descriptor with only a family set.
    pub fn for_family(family: &str) -> Self {
        Self {
            chart_family: family.to_string(),
            ..Self::default()
        }
    }
}

/// Family-specific field bindings. Which of these are required depends on
/// the chart family; the rest are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldBindings {
    /// Shared category axis for line/bar/area charts.
    pub category_field: Option<String>,
    /// Ordered value series for line/bar/area charts.
    pub series: Vec<SeriesBinding>,
    /// Slice value for pie charts.
    #[serde(alias = "valueKey")]
    pub value_field: Option<String>,
    /// Slice label for pie charts.
    #[serde(alias = "nameKey", alias = "labelKey")]
    pub label_field: Option<String>,
    /// Horizontal coordinate for scatter charts.
    pub x_field: Option<String>,
    /// Vertical coordinate for scatter charts.
    pub y_field: Option<String>,
    /// Optional scatter point metadata.
    #[serde(alias = "scatter")]
    pub point: Option<PointBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBinding {
    #[serde(alias = "dataKey")]
    pub field: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl SeriesBinding {
    pub fn for_field(field: &str) -> Self {
        Self {
            field: field.to_string(),
            color: None,
            label: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointBinding {
    pub name: Option<String>,
    pub shape: Option<String>,
    #[serde(alias = "fill")]
    pub color: Option<String>,
}

/// Requested display options. Anything absent falls back to the defaults in
/// [`crate::RenderConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayOptions {
    #[serde(alias = "legend")]
    pub show_legend: Option<bool>,
    #[serde(alias = "margin")]
    pub margins: Option<Margins>,
    pub width: Option<WidthSpec>,
    pub height: Option<u32>,
    /// Tooltip template text, e.g. `"{month}: {sales} USD"`. Parsed and
    /// validated by the renderer; never evaluated as code.
    pub tooltip: Option<String>,
}

/// Width as it appears on the wire: a pixel number or a `"100%"` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WidthSpec {
    Pixels(u32),
    Text(String),
}
