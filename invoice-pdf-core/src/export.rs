//! Export pipeline
//!
//! Render, capture, paginate, assemble, strictly in that order. The capture
//! is awaited before pagination starts, so pagination always sees the
//! final image. Any failure aborts the export; the form itself is only
//! borrowed and stays usable.

use crate::assembly::{place_pages, OxidizeAssembler, PdfAssembler, PreparedImage};
use crate::capture::Capture;
use crate::error::{InvoiceError, Result};
use crate::form::InvoiceForm;
use crate::options::ExportOptions;
use crate::pagination::{paginate, PaginationPlan};
use crate::render::render_region;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A finished PDF, held in memory until saved or sent.
#[derive(Clone, PartialEq)]
pub struct ExportedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl std::fmt::Debug for ExportedPdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedPdf")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl ExportedPdf {
    /// Save under `file_name` inside `dir`.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        self.save_as(&path)?;
        Ok(path)
    }

    /// Save to `path`. The bytes go to a temporary file next to the target
    /// which is then renamed, so a failed save never leaves a partial file.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(&self.bytes)?;
        staged.flush()?;
        staged
            .persist(path)
            .map_err(|e| InvoiceError::Io(e.error))?;
        Ok(())
    }
}

/// Runs exports with one capture collaborator and one set of options.
#[derive(Debug, Clone)]
pub struct Exporter<C> {
    capture: C,
    options: ExportOptions,
}

impl<C: Capture> Exporter<C> {
    pub fn new(capture: C) -> Self {
        Self::with_options(capture, ExportOptions::default())
    }

    pub fn with_options(capture: C, options: ExportOptions) -> Self {
        Self { capture, options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export `form` into an in-memory PDF using the `oxidize-pdf` assembler.
    pub async fn export(&self, form: &InvoiceForm) -> Result<ExportedPdf> {
        let (plan, image) = self.capture_and_paginate(form).await?;
        let assembler = OxidizeAssembler::create(self.options.geometry, self.options.orientation)?;
        self.assemble(&plan, &image, assembler)
    }

    /// Export `form` through a caller-supplied assembler.
    pub async fn export_with<A: PdfAssembler>(
        &self,
        form: &InvoiceForm,
        assembler: A,
    ) -> Result<ExportedPdf> {
        let (plan, image) = self.capture_and_paginate(form).await?;
        self.assemble(&plan, &image, assembler)
    }

    async fn capture_and_paginate(
        &self,
        form: &InvoiceForm,
    ) -> Result<(PaginationPlan, PreparedImage)> {
        self.options.validate()?;
        info!(items = form.items.len(), "starting invoice export");

        let region = render_region(form);
        let captured = self
            .capture
            .capture(&region, &self.options.capture)
            .await
            .inspect_err(|e| warn!("capture failed: {e}"))?;
        info!(
            width = captured.pixel_width,
            height = captured.pixel_height,
            "captured form region"
        );

        let plan = paginate(
            captured.pixel_width,
            captured.pixel_height,
            self.options.page_geometry(),
            self.options.trailing_pages,
        )?;
        let image = PreparedImage::from_captured(&captured, self.options.jpeg_quality)?;
        Ok((plan, image))
    }

    fn assemble<A: PdfAssembler>(
        &self,
        plan: &PaginationPlan,
        image: &PreparedImage,
        mut assembler: A,
    ) -> Result<ExportedPdf> {
        place_pages(plan, image, &mut assembler)?;
        let mut bytes = Vec::new();
        assembler.write(&mut bytes)?;

        info!(
            pages = plan.page_count(),
            bytes = bytes.len(),
            "invoice export finished"
        );

        Ok(ExportedPdf {
            file_name: self.options.file_name.clone(),
            bytes,
            page_count: plan.page_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exported() -> ExportedPdf {
        ExportedPdf {
            file_name: "invoice.pdf".to_string(),
            bytes: b"%PDF-1.7 test".to_vec(),
            page_count: 1,
        }
    }

    #[test]
    fn test_save_in_uses_file_name() {
        let dir = tempdir().unwrap();
        let path = exported().save_in(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("invoice.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 test");
    }

    #[test]
    fn test_save_as_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"old").unwrap();

        exported().save_as(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 test");
    }

    #[test]
    fn test_save_into_missing_dir_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("invoice.pdf");

        assert!(exported().save_as(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_debug_omits_bytes() {
        let debug = format!("{:?}", exported());
        assert!(debug.contains("bytes: 13"));
    }
}
