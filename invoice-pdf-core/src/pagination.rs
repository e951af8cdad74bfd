//! Pagination engine
//!
//! Tiles one tall captured image across fixed-size pages. The image is
//! scaled so its width matches the page width; every page draws the same
//! full image, shifted up by one page height per page, so each page shows
//! the next vertical slice.
//!
//! # Example
//!
//! ```rust
//! use invoice_pdf::pagination::{paginate, PageGeometry, TrailingPagePolicy};
//!
//! # fn main() -> invoice_pdf::Result<()> {
//! let plan = paginate(1000, 4000, PageGeometry::A4, TrailingPagePolicy::Exact)?;
//! let offsets: Vec<f64> = plan.placements.iter().map(|p| p.y_offset_mm).collect();
//! assert_eq!(offsets, vec![0.0, -297.0, -594.0]);
//! # Ok(())
//! # }
//! ```

use crate::error::{InvoiceError, Result};
use serde::{Deserialize, Serialize};

/// Heights closer than this to a page boundary count as on the boundary.
const BOUNDARY_EPSILON_MM: f64 = 1e-9;

/// Largest number of pages a single export may span.
pub const MAX_PAGES: usize = 1000;

/// Page size in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageGeometry {
    /// ISO A4, 210 x 297 mm.
    pub const A4: PageGeometry = PageGeometry {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    pub fn new(width_mm: f64, height_mm: f64) -> Result<Self> {
        let geometry = Self {
            width_mm,
            height_mm,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width_mm) && valid(self.height_mm) {
            Ok(())
        } else {
            Err(InvoiceError::InvalidInput(format!(
                "Page size must be positive, got {} x {} mm",
                self.width_mm, self.height_mm
            )))
        }
    }

    /// The same page turned to `orientation`.
    pub fn oriented(self, orientation: Orientation) -> Self {
        let (short, long) = if self.width_mm <= self.height_mm {
            (self.width_mm, self.height_mm)
        } else {
            (self.height_mm, self.width_mm)
        };
        match orientation {
            Orientation::Portrait => Self {
                width_mm: short,
                height_mm: long,
            },
            Orientation::Landscape => Self {
                width_mm: long,
                height_mm: short,
            },
        }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// How many pages to emit when the image height is an exact multiple of
/// the page height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingPagePolicy {
    /// `ceil(image_height / page_height)` pages, never a blank trailing page.
    #[default]
    Exact,
    /// `floor(image_height / page_height) + 1` pages: keeps emitting while
    /// the remaining height is `>= 0`, which adds a blank page on exact
    /// multiples.
    Legacy,
}

/// Where the shared image is drawn on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    /// 0-based page number.
    pub page_index: usize,
    /// Horizontal offset of the image's left edge from the page's left edge.
    pub x_offset_mm: f64,
    /// Vertical offset of the image's top edge from the page's top edge.
    /// Zero on the first page, then more negative by one page height per page.
    pub y_offset_mm: f64,
}

impl PagePlacement {
    /// The vertical slice of the image visible on this page, as
    /// `(start_mm, end_mm)` measured from the top of the image. Empty
    /// (start == end) for a blank trailing page.
    pub fn visible_window(&self, page_height_mm: f64, image_height_mm: f64) -> (f64, f64) {
        let start = (-self.y_offset_mm).min(image_height_mm);
        let end = (start + page_height_mm).min(image_height_mm);
        (start, end)
    }
}

/// The full set of placements for one captured image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationPlan {
    pub geometry: PageGeometry,
    pub image_width_mm: f64,
    pub image_height_mm: f64,
    pub placements: Vec<PagePlacement>,
}

impl PaginationPlan {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }
}

/// Compute the page placements for an image of `pixel_width` x `pixel_height`.
///
/// Fails with [`InvoiceError::InvalidInput`] if either dimension is zero or
/// the image would need more than [`MAX_PAGES`] pages.
pub fn paginate(
    pixel_width: u32,
    pixel_height: u32,
    geometry: PageGeometry,
    policy: TrailingPagePolicy,
) -> Result<PaginationPlan> {
    if pixel_width == 0 || pixel_height == 0 {
        return Err(InvoiceError::InvalidInput(format!(
            "Captured image has no area ({pixel_width} x {pixel_height} px)"
        )));
    }
    geometry.validate()?;

    let image_width_mm = geometry.width_mm;
    let image_height_mm = f64::from(pixel_height) * geometry.width_mm / f64::from(pixel_width);
    let x_offset_mm = (geometry.width_mm - image_width_mm) / 2.0;

    let ratio = image_height_mm / geometry.height_mm;
    let pages = match policy {
        TrailingPagePolicy::Exact => (ratio - BOUNDARY_EPSILON_MM).ceil().max(1.0),
        TrailingPagePolicy::Legacy => (ratio + BOUNDARY_EPSILON_MM).floor() + 1.0,
    };
    // Checked in f64 so the cast below never sees an unbounded count
    if pages > MAX_PAGES as f64 {
        return Err(InvoiceError::InvalidInput(format!(
            "Captured image ({pixel_width} x {pixel_height} px) would span {pages} pages, more than the limit of {MAX_PAGES}"
        )));
    }
    let pages = pages as usize;

    let placements = (0..pages)
        .map(|page_index| PagePlacement {
            page_index,
            x_offset_mm,
            y_offset_mm: -(page_index as f64 * geometry.height_mm),
        })
        .collect();

    Ok(PaginationPlan {
        geometry,
        image_width_mm,
        image_height_mm,
        placements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(plan: &PaginationPlan) -> Vec<f64> {
        plan.placements.iter().map(|p| p.y_offset_mm).collect()
    }

    #[test]
    fn test_square_image_fits_one_page() {
        let plan = paginate(1000, 1000, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        assert_eq!(plan.image_width_mm, 210.0);
        assert_eq!(plan.image_height_mm, 210.0);
        assert_eq!(offsets(&plan), vec![0.0]);
    }

    #[test]
    fn test_tall_image_spans_three_pages() {
        for policy in [TrailingPagePolicy::Exact, TrailingPagePolicy::Legacy] {
            let plan = paginate(1000, 4000, PageGeometry::A4, policy).unwrap();
            assert_eq!(plan.image_height_mm, 840.0);
            // 840 - 3 * 297 = -51, so no fourth page under either policy
            assert_eq!(offsets(&plan), vec![0.0, -297.0, -594.0], "{policy:?}");
        }
    }

    #[test]
    fn test_zero_width_is_invalid_input() {
        let result = paginate(0, 1000, PageGeometry::A4, TrailingPagePolicy::Exact);
        assert!(matches!(result, Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_height_is_invalid_input() {
        let result = paginate(1000, 0, PageGeometry::A4, TrailingPagePolicy::Legacy);
        assert!(matches!(result, Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn test_exact_multiple_exact_policy() {
        // 210 px wide maps 1:1 to mm, so 594 px is exactly two pages
        let plan = paginate(210, 594, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        assert_eq!(plan.image_height_mm, 594.0);
        assert_eq!(offsets(&plan), vec![0.0, -297.0]);
    }

    #[test]
    fn test_exact_multiple_legacy_policy_adds_blank_page() {
        let plan = paginate(210, 594, PageGeometry::A4, TrailingPagePolicy::Legacy).unwrap();
        assert_eq!(offsets(&plan), vec![0.0, -297.0, -594.0]);

        let last = plan.placements.last().unwrap();
        let (start, end) = last.visible_window(297.0, plan.image_height_mm);
        assert_eq!(start, end, "trailing page shows nothing");
    }

    #[test]
    fn test_exactly_one_page_tall() {
        let exact = paginate(210, 297, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        assert_eq!(exact.page_count(), 1);

        let legacy = paginate(210, 297, PageGeometry::A4, TrailingPagePolicy::Legacy).unwrap();
        assert_eq!(legacy.page_count(), 2);
    }

    #[test]
    fn test_extreme_height_is_rejected_before_allocating() {
        for policy in [TrailingPagePolicy::Exact, TrailingPagePolicy::Legacy] {
            let result = paginate(1, u32::MAX, PageGeometry::A4, policy);
            assert!(matches!(result, Err(InvoiceError::InvalidInput(_))), "{policy:?}");
        }

        let result = paginate(1, 10_000_000, PageGeometry::A4, TrailingPagePolicy::Exact);
        assert!(matches!(result, Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn test_page_limit_boundary() {
        // 210 px wide maps 1:1 to mm, so each page is 297 px tall
        let at_limit = 297 * MAX_PAGES as u32;
        let plan = paginate(210, at_limit, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        assert_eq!(plan.page_count(), MAX_PAGES);

        let over = paginate(210, at_limit + 1, PageGeometry::A4, TrailingPagePolicy::Exact);
        assert!(matches!(over, Err(InvoiceError::InvalidInput(_))));

        // Legacy adds the trailing page, which crosses the limit
        let legacy = paginate(210, at_limit, PageGeometry::A4, TrailingPagePolicy::Legacy);
        assert!(matches!(legacy, Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn test_short_image_gets_one_page() {
        let plan = paginate(4000, 10, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        assert_eq!(plan.page_count(), 1);
        assert!(plan.image_height_mm < 1.0);
    }

    #[test]
    fn test_horizontal_offset_is_zero() {
        let plan = paginate(795, 9000, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        assert!(plan.page_count() > 1);
        for placement in &plan.placements {
            assert_eq!(placement.x_offset_mm, 0.0);
        }
    }

    #[test]
    fn test_visible_windows_cover_image() {
        let plan = paginate(1000, 4000, PageGeometry::A4, TrailingPagePolicy::Exact).unwrap();
        let windows: Vec<(f64, f64)> = plan
            .placements
            .iter()
            .map(|p| p.visible_window(297.0, plan.image_height_mm))
            .collect();

        assert_eq!(windows, vec![(0.0, 297.0), (297.0, 594.0), (594.0, 840.0)]);
    }

    #[test]
    fn test_landscape_geometry() {
        let landscape = PageGeometry::A4.oriented(Orientation::Landscape);
        assert_eq!(landscape.width_mm, 297.0);
        assert_eq!(landscape.height_mm, 210.0);
        assert_eq!(landscape.oriented(Orientation::Portrait), PageGeometry::A4);

        let plan = paginate(1000, 1000, landscape, TrailingPagePolicy::Exact).unwrap();
        assert_eq!(plan.image_height_mm, 297.0);
        assert_eq!(offsets(&plan), vec![0.0, -210.0]);
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(PageGeometry::new(0.0, 297.0).is_err());
        assert!(PageGeometry::new(210.0, f64::NAN).is_err());
        assert_eq!(PageGeometry::new(210.0, 297.0).unwrap(), PageGeometry::A4);
    }
}
