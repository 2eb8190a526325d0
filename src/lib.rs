// Library exports for vizplan

pub mod backend;
pub mod data;
pub mod descriptor;
pub mod error;
pub mod palette;
pub mod plan;
pub mod provider;
pub mod render;
pub mod tooltip;

pub use data::{Dataset, Record, Scalar};
pub use descriptor::{ChartFamily, Descriptor};
pub use error::{ProviderError, RenderError};
pub use palette::{Color, Palette};
pub use plan::{ChartGeometry, Dimension, DisplayPlan, Margins, RenderPlan};
pub use render::render;
pub use tooltip::TooltipTemplate;

/// Renderer configuration: the palette and the baseline display values used
/// wherever a descriptor is silent. Passed into [`render`] explicitly so
/// tests can substitute deterministic palettes.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub palette: Palette,
    pub defaults: DisplayDefaults,
}

#[derive(Debug, Clone)]
pub struct DisplayDefaults {
    pub show_legend: bool,
    pub margins: Margins,
    pub width: Dimension,
    pub height: u32,
}

impl Default for DisplayDefaults {
    fn default() -> Self {
        Self {
            show_legend: false,
            margins: Margins::default(),
            width: Dimension::Percent(100),
            height: 400,
        }
    }
}
