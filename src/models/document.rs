use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::{Margin, PageFormat, PdfOptions, PdfOptionsOverride, PipelineError};

/// Body of `POST /generate` as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub template_name: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub options: Option<PdfOptionsOverride>,
}

/// A validated render request, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub id: Uuid,
    pub template_name: String,
    pub data: Map<String, Value>,
    pub options: PdfOptions,
}

impl RenderRequest {
    /// A missing or blank `templateName` is rejected rather than defaulted.
    pub fn from_wire(
        request: GenerateRequest,
        defaults: &PdfOptions,
    ) -> Result<Self, PipelineError> {
        let template_name = request
            .template_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PipelineError::BadRequest("templateName is required".to_string()))?;

        let options = match &request.options {
            Some(overrides) => overrides
                .apply(defaults)
                .map_err(|e| PipelineError::BadRequest(format!("invalid options: {}", e)))?,
            None => defaults.clone(),
        };

        Ok(RenderRequest {
            id: Uuid::new_v4(),
            template_name,
            data: request.data.unwrap_or_default(),
            options,
        })
    }
}

/// Finished PDF plus the page settings that produced it.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub format: PageFormat,
    pub margin: Margin,
}

impl PdfDocument {
    pub fn has_pdf_signature(&self) -> bool {
        self.bytes.starts_with(b"%PDF-")
    }
}
