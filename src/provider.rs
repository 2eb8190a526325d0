//! Interpretation of analysis-provider responses.
//!
//! The upstream provider inspects an uploaded dataset and proposes a
//! visualization as model-generated text: nominally a JSON object, routinely
//! wrapped in markdown code fences, occasionally malformed. This module
//! extracts a [`Descriptor`] from that text and nothing more; the
//! descriptor is still untrusted and goes through full render-time
//! validation. Provider failures are terminal for the request; the caller
//! surfaces them and the user decides whether to resubmit.

use log::warn;
use serde_json::Value;

use crate::descriptor::Descriptor;
use crate::error::ProviderError;

/// A provider's proposal: the descriptor plus its optional prose rationale.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub descriptor: Descriptor,
    pub explanation: Option<String>,
}

/// Parse raw provider output into an [`Analysis`].
pub fn parse_analysis(text: &str) -> Result<Analysis, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let body = strip_code_fence(trimmed);
    let value: Value = serde_json::from_str(body).map_err(|err| {
        warn!("analysis response is not valid JSON: {}", err);
        ProviderError::MalformedJson(err)
    })?;

    let has_family = ["chartFamily", "chartType"]
        .iter()
        .any(|key| matches!(value.get(key), Some(Value::String(s)) if !s.trim().is_empty()));
    if !has_family {
        return Err(ProviderError::MissingDescriptor);
    }

    let explanation = value
        .get("explanation")
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    let mut descriptor: Descriptor = serde_json::from_value(value.clone())?;

    // Providers fold display settings into the same "configuration" object
    // as the field bindings; pick those up when displayOptions is absent.
    if value.get("displayOptions").is_none() {
        if let Some(configuration) = value.get("configuration") {
            if let Ok(display) = serde_json::from_value(configuration.clone()) {
                descriptor.display_options = display;
            }
        }
    }

    Ok(Analysis {
        descriptor,
        explanation,
    })
}

/// Strip a leading ```` ```json ```` (or bare ```` ``` ````) fence and the
/// matching trailing fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}
