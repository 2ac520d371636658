//! OCR collaborators and the image preparation that feeds them.
//!
//! Engines receive PNG bytes. [`prepare_for_ocr`] converts any decoded image to
//! 8-bit grayscale first, so every engine sees the same pixel format.

use crate::config::{OcrBackend, OcrConfig};
use crate::error::IngestError;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

pub trait OcrEngine: Send + Sync {
    /// Returns the recognised text, possibly empty.
    fn extract_text(&self, png: &[u8]) -> Result<String, IngestError>;
}

/// Builds the engine selected in the configuration.
pub fn engine_from_config(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>, IngestError> {
    match config.engine {
        OcrBackend::Tesseract => Ok(Arc::new(TesseractOcr::new(
            config.tesseract_cmd.clone(),
            config.language.clone(),
        ))),
        OcrBackend::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .filter(|endpoint| !endpoint.trim().is_empty())
                .ok_or_else(|| {
                    IngestError::InvalidArgument("ocr.endpoint is not configured".to_string())
                })?;
            Ok(Arc::new(HttpOcr::new(endpoint, config.resolved_api_key())))
        }
    }
}

/// Grayscale-converts the image (when needed) and encodes it as PNG.
pub fn prepare_for_ocr(image: DynamicImage) -> Result<Vec<u8>, IngestError> {
    let gray = match image {
        DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    };

    let mut png = Vec::new();
    gray.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

pub fn load_image(path: &Path) -> Result<DynamicImage, IngestError> {
    Ok(image::open(path)?)
}

/// Runs the `tesseract` command line tool, piping the image through stdin.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn extract_text(&self, png: &[u8]) -> Result<String, IngestError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                IngestError::OcrFailed(format!("failed to start {}: {error}", self.command))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(IngestError::OcrFailed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    image_base64: String,
    mime_type: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    lines: Option<Vec<String>>,
}

/// Posts the image to an OCR service that answers with `{"text": ...}` or
/// `{"lines": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpOcr {
    endpoint: String,
    api_key: Option<String>,
}

impl HttpOcr {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }

    fn extract_text_blocking(&self, png: &[u8]) -> Result<String, IngestError> {
        let payload = OcrRequest {
            image_base64: STANDARD.encode(png),
            mime_type: "image/png",
        };

        let mut request = Client::new()
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;

        if !response.status().is_success() {
            return Err(IngestError::OcrFailed(format!(
                "OCR request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: OcrResponse = response.json()?;
        Ok(response_text(payload))
    }
}

impl OcrEngine for HttpOcr {
    fn extract_text(&self, png: &[u8]) -> Result<String, IngestError> {
        tokio::task::block_in_place(|| self.extract_text_blocking(png))
    }
}

fn response_text(payload: OcrResponse) -> String {
    if let Some(text) = payload.text.map(|text| text.trim().to_string()) {
        if !text.is_empty() {
            return text;
        }
    }

    payload
        .lines
        .unwrap_or_default()
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn rgb_images_are_converted_to_grayscale_png() -> Result<(), Box<dyn std::error::Error>> {
        let rgb = RgbImage::from_pixel(4, 3, Rgb([200, 10, 10]));
        let png = prepare_for_ocr(DynamicImage::ImageRgb8(rgb))?;

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        Ok(())
    }

    #[test]
    fn response_prefers_text_then_lines() {
        let text = OcrResponse {
            text: Some("  Total revenue  ".to_string()),
            lines: Some(vec!["ignored".to_string()]),
        };
        assert_eq!(response_text(text), "Total revenue");

        let lines = OcrResponse {
            text: Some("   ".to_string()),
            lines: Some(vec!["Q1".to_string(), " ".to_string(), "Q2 ".to_string()]),
        };
        assert_eq!(response_text(lines), "Q1\nQ2");

        let empty = OcrResponse {
            text: None,
            lines: None,
        };
        assert_eq!(response_text(empty), "");
    }

    #[test]
    fn http_engine_requires_endpoint() {
        let config = OcrConfig {
            engine: OcrBackend::Http,
            ..OcrConfig::default()
        };
        assert!(engine_from_config(&config).is_err());
    }

    #[test]
    fn missing_tesseract_binary_is_an_ocr_failure() {
        let engine = TesseractOcr::new("definitely-not-a-real-ocr-binary", "eng");
        let result = engine.extract_text(&[]);
        assert!(matches!(result, Err(IngestError::OcrFailed(_))));
    }
}
