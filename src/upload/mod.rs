//! Batch upload to the identification endpoint
//!
//! One multipart request per batch, field `images` repeated per file.
//! The server answers with a `results` array aligned to the submitted files.
//! There is no timeout and no retry.
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::state::data::{IdentifyResult, ImageItem};

/// Multipart field name the server reads files from
pub const IMAGES_FIELD: &str = "images";

#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    #[serde(default)]
    results: Option<Vec<IdentifyResult>>,
}

/// HTTP client bound to one endpoint
#[derive(Debug, Clone)]
pub struct Identifier {
    client: reqwest::Client,
    endpoint: String,
}

impl Identifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one batch and return the per-image results in submission order
    pub async fn identify(self, batch: Vec<ImageItem>) -> Result<Vec<IdentifyResult>> {
        let count = batch.len();
        let form = build_form(batch)?;

        info!(endpoint = %self.endpoint, images = count, "uploading batch");

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        interpret_response(status, &body).inspect_err(|e| {
            error!(%status, error = %e, "identification failed");
        })
    }
}

fn build_form(batch: Vec<ImageItem>) -> Result<Form> {
    let mut form = Form::new();
    for item in batch {
        let part = Part::bytes(item.bytes)
            .file_name(item.filename)
            .mime_str(&item.mime)?;
        form = form.part(IMAGES_FIELD, part);
    }
    Ok(form)
}

/// Turn a status and body into results.
///
/// Non-2xx statuses surface the body text; a 2xx body must be JSON with a
/// `results` array.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<Vec<IdentifyResult>> {
    if !status.is_success() {
        return Err(AppError::Server {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let parsed: IdentifyResponse = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "response is not valid JSON");
        AppError::MalformedResponse
    })?;

    parsed.results.ok_or(AppError::MalformedResponse)
}
