//! Capture collaborators
//!
//! A capture turns the rendered form region into a raster image. It is the
//! one asynchronous step of an export: the pipeline awaits it before any
//! pagination happens.
//!
//! Two collaborators are provided:
//!
//! - [`SuppliedImage`]: an image that was captured elsewhere, e.g. uploaded
//!   by a browser or taken as a screenshot file.
//! - [`HeadlessBrowserCapture`]: renders the region HTML with a headless
//!   Chromium-compatible browser and reads back its screenshot.

use crate::error::{InvoiceError, Result};
use crate::render::RenderedRegion;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// Settings passed to the capture collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Resolution multiplier (device pixels per CSS pixel).
    pub scale: f32,
    /// Allow the page to load same-machine assets (logos, stylesheets).
    pub use_cors: bool,
    /// Allow cross-origin content that would otherwise taint the capture.
    pub allow_taint: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 4.0,
            use_cors: true,
            allow_taint: false,
        }
    }
}

impl CaptureOptions {
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.scale.is_finite() && self.scale > 0.0 {
            Ok(())
        } else {
            Err(InvoiceError::InvalidInput(format!(
                "Capture scale must be positive, got {}",
                self.scale
            )))
        }
    }
}

/// Encodings a capture can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Png,
    Jpeg,
}

/// An encoded raster image with known pixel dimensions.
#[derive(Clone, PartialEq)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub format: RasterFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("bytes", &self.data.len())
            .field("format", &self.format)
            .field("pixel_width", &self.pixel_width)
            .field("pixel_height", &self.pixel_height)
            .finish()
    }
}

impl CapturedImage {
    /// Identify the encoding of `data` and read its dimensions.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let detected = image::guess_format(&data)
            .map_err(|e| InvoiceError::CaptureFailed(format!("Unrecognized image data: {e}")))?;

        let format = match detected {
            image::ImageFormat::Png => RasterFormat::Png,
            image::ImageFormat::Jpeg => RasterFormat::Jpeg,
            other => {
                return Err(InvoiceError::CaptureFailed(format!(
                    "Unsupported image format: {other:?}"
                )))
            }
        };

        let (pixel_width, pixel_height) =
            image::ImageReader::with_format(Cursor::new(&data), detected)
                .into_dimensions()
                .map_err(|e| {
                    InvoiceError::CaptureFailed(format!("Failed to read image header: {e}"))
                })?;

        Ok(Self {
            data,
            format,
            pixel_width,
            pixel_height,
        })
    }
}

/// Rasterizes a rendered region.
pub trait Capture {
    fn capture(
        &self,
        region: &RenderedRegion,
        options: &CaptureOptions,
    ) -> impl Future<Output = Result<CapturedImage>> + Send;
}

#[derive(Debug, Clone)]
enum Source {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// An image captured outside this process.
#[derive(Debug, Clone)]
pub struct SuppliedImage {
    source: Source,
}

impl SuppliedImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            source: Source::Bytes(data),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }
}

impl Capture for SuppliedImage {
    async fn capture(
        &self,
        _region: &RenderedRegion,
        options: &CaptureOptions,
    ) -> Result<CapturedImage> {
        options.validate()?;

        let data = match &self.source {
            Source::Bytes(data) => data.clone(),
            Source::File(path) => tokio::fs::read(path).await.map_err(|e| {
                InvoiceError::CaptureFailed(format!("Failed to read {}: {e}", path.display()))
            })?,
        };

        CapturedImage::from_bytes(data)
    }
}

/// Captures the region with a headless Chromium-compatible browser.
#[derive(Debug, Clone)]
pub struct HeadlessBrowserCapture {
    program: PathBuf,
    timeout: Duration,
}

impl HeadlessBrowserCapture {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for one screenshot run.
    pub fn browser_args(
        &self,
        page: &Path,
        screenshot: &Path,
        region: &RenderedRegion,
        options: &CaptureOptions,
    ) -> Vec<String> {
        let mut args = vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--screenshot={}", screenshot.display()),
            format!("--window-size={},{}", region.width_px, region.height_px),
            format!("--force-device-scale-factor={}", options.scale),
        ];
        if options.use_cors {
            args.push("--allow-file-access-from-files".to_string());
        }
        if options.allow_taint {
            args.push("--disable-web-security".to_string());
        }
        args.push(format!("file://{}", page.display()));
        args
    }
}

impl Capture for HeadlessBrowserCapture {
    async fn capture(
        &self,
        region: &RenderedRegion,
        options: &CaptureOptions,
    ) -> Result<CapturedImage> {
        options.validate()?;

        let workdir = tempfile::tempdir().map_err(|e| {
            InvoiceError::CaptureFailed(format!("Failed to create capture directory: {e}"))
        })?;
        let page = workdir.path().join("invoice.html");
        let screenshot = workdir.path().join("capture.png");

        tokio::fs::write(&page, &region.html).await.map_err(|e| {
            InvoiceError::CaptureFailed(format!("Failed to write {}: {e}", page.display()))
        })?;

        let args = self.browser_args(&page, &screenshot, region, options);
        tracing::debug!(program = %self.program.display(), ?args, "starting browser capture");

        let run = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                InvoiceError::CaptureFailed(format!(
                    "Browser did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                InvoiceError::CaptureFailed(format!(
                    "Failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InvoiceError::CaptureFailed(format!(
                "Browser exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let data = tokio::fs::read(&screenshot).await.map_err(|e| {
            InvoiceError::CaptureFailed(format!("Browser produced no screenshot: {e}"))
        })?;

        CapturedImage::from_bytes(data)
    }
}
