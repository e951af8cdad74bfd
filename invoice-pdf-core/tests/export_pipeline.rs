//! End-to-end tests for the export pipeline
//!
//! Exercises form editing, capture, pagination and assembly together using
//! in-memory PNG captures.

use image::{ImageFormat, Rgb, RgbImage};
use invoice_pdf::{
    Capture, CaptureOptions, CapturedImage, ExportOptions, Exporter, InvoiceError, InvoiceForm,
    ItemField, PdfAssembler, PreparedImage, RenderedRegion, SuppliedImage, TrailingPagePolicy,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |_, y| {
        if y % 20 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn sample_form() -> InvoiceForm {
    let mut form = InvoiceForm::new();
    form.invoice_number = "INV-2001".to_string();
    form.items
        .update_field(0, ItemField::Description, "Design work")
        .unwrap();
    form.items.update_field(0, ItemField::Quantity, "10").unwrap();
    form.items
        .update_field(0, ItemField::UnitPrice, "85")
        .unwrap();
    form
}

/// Records what the pipeline hands to the capture step.
#[derive(Clone, Default)]
struct SpyCapture {
    seen: Arc<Mutex<Vec<String>>>,
    width: u32,
    height: u32,
}

impl Capture for SpyCapture {
    async fn capture(
        &self,
        region: &RenderedRegion,
        _options: &CaptureOptions,
    ) -> invoice_pdf::Result<CapturedImage> {
        self.seen.lock().unwrap().push(region.html.clone());
        CapturedImage::from_bytes(png(self.width, self.height))
    }
}

struct FailingCapture;

impl Capture for FailingCapture {
    async fn capture(
        &self,
        _region: &RenderedRegion,
        _options: &CaptureOptions,
    ) -> invoice_pdf::Result<CapturedImage> {
        Err(InvoiceError::CaptureFailed(
            "tainted canvas: cross-origin image".to_string(),
        ))
    }
}

struct FailingAssembler;

impl PdfAssembler for FailingAssembler {
    fn add_image(&mut self, _: &PreparedImage, _: f64, _: f64, _: f64, _: f64) -> invoice_pdf::Result<()> {
        Err(InvoiceError::AssemblyFailed("out of memory".to_string()))
    }

    fn add_page(&mut self) -> invoice_pdf::Result<()> {
        Ok(())
    }

    fn page_count(&self) -> usize {
        1
    }

    fn write(&mut self, _: &mut Vec<u8>) -> invoice_pdf::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_single_page_export() {
    let exporter = Exporter::new(SuppliedImage::from_bytes(png(400, 400)));
    let pdf = exporter.export(&sample_form()).await.unwrap();

    assert_eq!(pdf.file_name, "invoice.pdf");
    assert_eq!(pdf.page_count, 1);
    assert!(pdf.bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_tall_capture_spans_pages() {
    // 100 x 400 px maps to 210 x 840 mm: three A4 pages
    let exporter = Exporter::new(SuppliedImage::from_bytes(png(100, 400)));
    let pdf = exporter.export(&sample_form()).await.unwrap();
    assert_eq!(pdf.page_count, 3);
}

#[tokio::test]
async fn test_trailing_page_policy_on_exact_multiple() {
    // 210 x 594 px maps to exactly two pages of height
    let exact = Exporter::new(SuppliedImage::from_bytes(png(210, 594)));
    assert_eq!(exact.export(&sample_form()).await.unwrap().page_count, 2);

    let legacy = Exporter::with_options(
        SuppliedImage::from_bytes(png(210, 594)),
        ExportOptions::default().with_trailing_pages(TrailingPagePolicy::Legacy),
    );
    assert_eq!(legacy.export(&sample_form()).await.unwrap().page_count, 3);
}

#[tokio::test]
async fn test_capture_sees_rendered_form() {
    let spy = SpyCapture {
        width: 50,
        height: 50,
        ..Default::default()
    };
    let exporter = Exporter::new(spy.clone());
    exporter.export(&sample_form()).await.unwrap();

    let seen = spy.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("INV-2001"));
    assert!(seen[0].contains("Design work"));
    assert!(seen[0].contains("850.00"));
}

#[tokio::test]
async fn test_capture_failure_aborts_and_keeps_form() {
    let form = sample_form();
    let before = form.clone();

    let exporter = Exporter::new(FailingCapture);
    let err = exporter.export(&form).await.unwrap_err();

    assert!(matches!(err, InvoiceError::CaptureFailed(_)));
    assert_eq!(form, before);
}

#[tokio::test]
async fn test_assembly_failure_is_reported() {
    let exporter = Exporter::new(SuppliedImage::from_bytes(png(10, 10)));
    let err = exporter
        .export_with(&sample_form(), FailingAssembler)
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::AssemblyFailed(_)));
}

#[tokio::test]
async fn test_invalid_options_block_export() {
    let exporter = Exporter::with_options(
        SuppliedImage::from_bytes(png(10, 10)),
        ExportOptions::default().with_jpeg_quality(0),
    );
    assert!(matches!(
        exporter.export(&sample_form()).await,
        Err(InvoiceError::Config(_))
    ));
}

#[tokio::test]
async fn test_export_then_save() {
    let dir = tempdir().unwrap();
    let capture_path = dir.path().join("capture.png");
    std::fs::write(&capture_path, png(120, 90)).unwrap();

    let exporter = Exporter::new(SuppliedImage::from_path(&capture_path));
    let pdf = exporter.export(&sample_form()).await.unwrap();
    let saved = pdf.save_in(dir.path()).unwrap();

    assert_eq!(saved.file_name().unwrap(), "invoice.pdf");
    let content = std::fs::read(saved).unwrap();
    assert!(content.starts_with(b"%PDF-"));
}

#[test]
fn test_append_three_then_delete_index_one() {
    let mut form = InvoiceForm::new();
    for _ in 0..3 {
        form.items.append();
    }
    for (index, name) in ["zero", "one", "two", "three"].iter().enumerate() {
        form.items
            .update_field(index, ItemField::Description, name)
            .unwrap();
    }

    form.items.remove_at(1).unwrap();

    let names: Vec<&str> = form.items.iter().map(|i| i.description.as_str()).collect();
    assert_eq!(names, vec!["zero", "two", "three"]);
    assert_eq!(form.items.len(), 3);
}
