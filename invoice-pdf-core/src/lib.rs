//! # invoice-pdf
//!
//! Invoice form state and paginated PDF export of the rendered form.
//!
//! ## Features
//!
//! - **Line-Item Store**: ordered, position-addressed invoice rows with
//!   validated quantities and prices and derived line totals
//! - **Form Rendering**: the printable form region as a standalone HTML document
//! - **Capture**: pluggable render-to-image collaborators (supplied image,
//!   headless browser)
//! - **Pagination**: tiles one tall capture across A4 pages without gaps
//! - **PDF Assembly**: places the tiles with `oxidize-pdf`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice_pdf::{Exporter, InvoiceForm, ItemField, SuppliedImage};
//!
//! # async fn run() -> invoice_pdf::Result<()> {
//! let mut form = InvoiceForm::new();
//! form.invoice_number = "INV-1001".to_string();
//! form.items.update_field(0, ItemField::Description, "Consulting")?;
//! form.items.update_field(0, ItemField::Quantity, "3")?;
//! form.items.update_field(0, ItemField::UnitPrice, "120")?;
//!
//! // A screenshot of the rendered form taken elsewhere
//! let exporter = Exporter::new(SuppliedImage::from_path("capture.png"));
//! let pdf = exporter.export(&form).await?;
//! pdf.save_in(".")?;
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod capture;
pub mod error;
pub mod export;
pub mod form;
pub mod items;
pub mod options;
pub mod pagination;
pub mod render;

pub use assembly::{place_pages, OxidizeAssembler, PdfAssembler, PreparedImage};
pub use capture::{
    Capture, CaptureOptions, CapturedImage, HeadlessBrowserCapture, RasterFormat, SuppliedImage,
};
pub use error::{ErrorKind, InvoiceError, Result};
pub use export::{ExportedPdf, Exporter};
pub use form::{HeaderField, InvoiceForm};
pub use items::{format_amount, Amount, ItemField, ItemRow, LineItem, LineItemList};
pub use options::{ExportOptions, DEFAULT_FILE_NAME};
pub use pagination::{
    paginate, Orientation, PageGeometry, PagePlacement, PaginationPlan, TrailingPagePolicy,
    MAX_PAGES,
};
pub use render::{render_region, RenderedRegion};
