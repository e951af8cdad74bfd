//! Export options
//!
//! All knobs of an export in one struct. Every field has a default, so a
//! JSON options file only needs to name what it changes:
//!
//! ```json
//! { "capture": { "scale": 2.0 }, "trailing_pages": "legacy" }
//! ```

use crate::capture::CaptureOptions;
use crate::error::{InvoiceError, Result};
use crate::pagination::{Orientation, PageGeometry, TrailingPagePolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name offered for a downloaded export.
pub const DEFAULT_FILE_NAME: &str = "invoice.pdf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub capture: CaptureOptions,
    pub geometry: PageGeometry,
    pub orientation: Orientation,
    pub trailing_pages: TrailingPagePolicy,
    /// Quality used when a PNG capture is re-encoded for embedding.
    pub jpeg_quality: u8,
    pub file_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            capture: CaptureOptions::default(),
            geometry: PageGeometry::A4,
            orientation: Orientation::Portrait,
            trailing_pages: TrailingPagePolicy::Exact,
            jpeg_quality: 92,
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl ExportOptions {
    pub fn with_capture(mut self, capture: CaptureOptions) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_trailing_pages(mut self, policy: TrailingPagePolicy) -> Self {
        self.trailing_pages = policy;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Page geometry after applying the orientation.
    pub fn page_geometry(&self) -> PageGeometry {
        self.geometry.oriented(self.orientation)
    }

    pub fn validate(&self) -> Result<()> {
        self.capture.validate()?;
        self.geometry.validate()?;
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(InvoiceError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.file_name.trim().is_empty() {
            return Err(InvoiceError::Config("file_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| InvoiceError::Config(format!("Invalid export options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            InvoiceError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}
