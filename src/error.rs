use thiserror::Error;

use crate::descriptor::ChartFamily;

/// Fatal render failures. All variants are descriptor-validation problems:
/// per-record coercion failures are dropped and counted instead of erroring,
/// and an empty dataset renders as the explicit no-data plan.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid descriptor: unrecognized chart family \"{family}\"")]
    UnknownChartFamily { family: String },
    #[error("invalid descriptor: missing required binding \"{binding}\" for a {family} chart")]
    MissingBinding {
        family: ChartFamily,
        binding: String,
    },
    #[error("invalid descriptor: bound field \"{field}\" is not present in the dataset")]
    UnknownField { field: String },
    #[error("invalid descriptor: bad tooltip template: {0}")]
    BadTooltipTemplate(String),
}

impl RenderError {
    pub fn missing_binding(family: ChartFamily, binding: impl Into<String>) -> Self {
        RenderError::MissingBinding {
            family,
            binding: binding.into(),
        }
    }
}

/// Failures while interpreting an analysis-provider response. All terminal
/// for the request: the caller surfaces "analysis failed" and the user
/// decides whether to resubmit. A provider failure never substitutes a
/// default chart.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("analysis provider returned an empty response")]
    EmptyResponse,
    #[error("analysis provider returned malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("analysis response carries no visualization descriptor")]
    MissingDescriptor,
}
