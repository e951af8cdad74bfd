//! PDF assembly
//!
//! The assembler is the document-building collaborator: it starts a
//! document with one page, places images at absolute millimeter
//! coordinates measured from the page's top-left corner, appends pages and
//! finally writes the file. [`place_pages`] feeds a [`PaginationPlan`]
//! into any assembler as a sequence of `add_image` / `add_page` calls.

use crate::capture::{CapturedImage, RasterFormat};
use crate::error::{InvoiceError, Result};
use crate::pagination::{Orientation, PageGeometry, PaginationPlan};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use oxidize_pdf::{Document, Image, Page};

const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// A captured image in the encoding the document embeds (JPEG).
#[derive(Clone, PartialEq)]
pub struct PreparedImage {
    jpeg: Vec<u8>,
    pixel_width: u32,
    pixel_height: u32,
}

impl std::fmt::Debug for PreparedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedImage")
            .field("bytes", &self.jpeg.len())
            .field("pixel_width", &self.pixel_width)
            .field("pixel_height", &self.pixel_height)
            .finish()
    }
}

impl PreparedImage {
    /// Convert a capture for embedding. JPEG data is used as is; PNG data
    /// is flattened onto a white background and re-encoded at `jpeg_quality`.
    pub fn from_captured(captured: &CapturedImage, jpeg_quality: u8) -> Result<Self> {
        let jpeg = match captured.format {
            RasterFormat::Jpeg => captured.data.clone(),
            RasterFormat::Png => reencode_png(&captured.data, jpeg_quality)?,
        };

        Ok(Self {
            jpeg,
            pixel_width: captured.pixel_width,
            pixel_height: captured.pixel_height,
        })
    }

    pub fn jpeg_data(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }
}

fn reencode_png(data: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| InvoiceError::AssemblyFailed(format!("Failed to decode capture: {e}")))?;

    let rgba = decoded.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode_image(&flattened)
        .map_err(|e| InvoiceError::AssemblyFailed(format!("Failed to encode JPEG: {e}")))?;
    Ok(jpeg)
}

/// Document-building operations the export pipeline relies on.
///
/// Coordinates are millimeters from the top-left corner of the current page.
pub trait PdfAssembler {
    /// Draw `image` on the current page.
    fn add_image(
        &mut self,
        image: &PreparedImage,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    ) -> Result<()>;

    /// Start a new page and make it current.
    fn add_page(&mut self) -> Result<()>;

    /// Pages in the document, including the current one.
    fn page_count(&self) -> usize;

    /// Finish the document and append its bytes to `out`.
    fn write(&mut self, out: &mut Vec<u8>) -> Result<()>;
}

/// Replay `plan` on `assembler`: the image on the first page, then one
/// `add_page` + `add_image` per further placement.
pub fn place_pages<A: PdfAssembler>(
    plan: &PaginationPlan,
    image: &PreparedImage,
    assembler: &mut A,
) -> Result<()> {
    for placement in &plan.placements {
        if placement.page_index > 0 {
            assembler.add_page()?;
        }
        tracing::debug!(
            page = placement.page_index,
            x_mm = placement.x_offset_mm,
            y_mm = placement.y_offset_mm,
            "placing image"
        );
        assembler.add_image(
            image,
            placement.x_offset_mm,
            placement.y_offset_mm,
            plan.image_width_mm,
            plan.image_height_mm,
        )?;
    }
    Ok(())
}

/// [`PdfAssembler`] backed by `oxidize-pdf`.
pub struct OxidizeAssembler {
    document: Document,
    current: Option<Page>,
    geometry: PageGeometry,
    written_pages: usize,
    images_placed: usize,
    finished: bool,
}

impl OxidizeAssembler {
    /// Start a document whose first page is already current.
    pub fn create(geometry: PageGeometry, orientation: Orientation) -> Result<Self> {
        geometry.validate()?;
        let geometry = geometry.oriented(orientation);

        let mut document = Document::new();
        document.set_title("Invoice");
        document.set_creator("invoice-pdf");

        Ok(Self {
            document,
            current: Some(blank_page(geometry)),
            geometry,
            written_pages: 0,
            images_placed: 0,
            finished: false,
        })
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    fn flush_current(&mut self) {
        if let Some(page) = self.current.take() {
            self.document.add_page(page);
            self.written_pages += 1;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(InvoiceError::AssemblyFailed(
                "Document has already been written".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn blank_page(geometry: PageGeometry) -> Page {
    Page::new(
        geometry.width_mm * POINTS_PER_MM,
        geometry.height_mm * POINTS_PER_MM,
    )
}

impl PdfAssembler for OxidizeAssembler {
    fn add_image(
        &mut self,
        image: &PreparedImage,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    ) -> Result<()> {
        self.ensure_open()?;

        let page_height_pt = self.geometry.height_mm * POINTS_PER_MM;
        let page = self
            .current
            .as_mut()
            .ok_or_else(|| InvoiceError::AssemblyFailed("No current page".to_string()))?;

        self.images_placed += 1;
        let name = format!("Im{}", self.images_placed);
        page.add_image(name.clone(), Image::from_jpeg_data(image.jpeg.clone())?);

        // PDF user space has its origin at the bottom-left corner
        let x = x_mm * POINTS_PER_MM;
        let y = page_height_pt - (y_mm + height_mm) * POINTS_PER_MM;
        page.draw_image(
            &name,
            x,
            y,
            width_mm * POINTS_PER_MM,
            height_mm * POINTS_PER_MM,
        )?;
        Ok(())
    }

    fn add_page(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_current();
        self.current = Some(blank_page(self.geometry));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.written_pages + usize::from(self.current.is_some())
    }

    fn write(&mut self, out: &mut Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.flush_current();
        self.finished = true;
        self.document.write(out)?;
        Ok(())
    }
}
