//! Form region rendering
//!
//! Produces the standalone HTML document that the capture step rasterizes.
//! The layout follows the on-screen form: header, bill-to / ship-to block,
//! item table and notes. Controls (add, delete, download) are not part of
//! the printable region.

use crate::form::InvoiceForm;
use crate::items::format_amount;
use std::fmt::Write;

/// Layout width of the region in CSS pixels (A4 width at 96 dpi).
pub const REGION_WIDTH_PX: u32 = 794;

const PADDING_PX: u32 = 40;
const HEADER_PX: u32 = 70;
const LINE_PX: u32 = 20;
const BLOCK_CHROME_PX: u32 = 40;
const MIN_TEXTAREA_LINES: u32 = 3;
const TABLE_HEAD_PX: u32 = 40;
const ROW_PX: u32 = 44;

// Text box widths inside the 714 px content area, and a glyph advance wide
// enough for the 14 px body font that wrapped text is never under-counted.
const CHAR_PX: u32 = 8;
const INFO_TEXT_PX: u32 = 328;
const DESCRIPTION_TEXT_PX: u32 = 300;
const NOTES_TEXT_PX: u32 = 700;

const STYLE: &str = "\
body { margin: 0; background: #ffffff; font-family: Helvetica, Arial, sans-serif; font-size: 14px; color: #222; }
.invoice-container { box-sizing: border-box; width: 794px; padding: 40px; }
.invoice-header, .invoice-info { display: flex; justify-content: space-between; margin-bottom: 20px; }
.invoice-info > div { width: 48%; }
label { display: block; font-weight: bold; margin-bottom: 4px; }
.field { border: 1px solid #ccc; padding: 6px; min-height: 18px; white-space: pre-wrap; }
.invoice-table { width: 100%; border-collapse: collapse; margin-bottom: 20px; }
.invoice-table th, .invoice-table td { border: 1px solid #ccc; padding: 8px; text-align: left; }
.invoice-table td.num { text-align: right; }
";

/// The rendered form region handed to a capture collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRegion {
    /// Complete HTML document.
    pub html: String,
    /// Layout width in CSS pixels.
    pub width_px: u32,
    /// Estimated content height in CSS pixels. Errs on the tall side so a
    /// window-sized capture never cuts off wrapped text.
    pub height_px: u32,
}

/// Render the printable region of `form`.
pub fn render_region(form: &InvoiceForm) -> RenderedRegion {
    let mut html = String::with_capacity(2048 + form.items.len() * 256);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Invoice</title>\n<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"invoice-container\">\n");

    html.push_str("<div class=\"invoice-header\">\n");
    push_field(&mut html, "Invoice Number:", &form.invoice_number);
    push_field(&mut html, "Invoice Date:", &form.display_date());
    html.push_str("</div>\n");

    html.push_str("<div class=\"invoice-info\">\n");
    push_field(&mut html, "Bill To:", &form.bill_to);
    push_field(&mut html, "Ship To:", &form.ship_to);
    html.push_str("</div>\n");

    html.push_str("<table class=\"invoice-table\">\n<thead>\n<tr>");
    for heading in ["Description", "Quantity", "Price", "Total"] {
        let _ = write!(html, "<th>{heading}</th>");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in form.items.rows() {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
            escape_html(&row.item.description),
            row.item.quantity,
            row.item.unit_price,
            format_amount(row.total),
        );
    }
    html.push_str("</tbody>\n</table>\n");

    html.push_str("<div class=\"invoice-notes\">\n");
    push_field(&mut html, "Notes:", &form.notes);
    html.push_str("</div>\n");

    html.push_str("</div>\n</body>\n</html>\n");

    RenderedRegion {
        html,
        width_px: REGION_WIDTH_PX,
        height_px: estimate_height(form),
    }
}

fn push_field(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        html,
        "<div><label>{}</label><div class=\"field\">{}</div></div>",
        label,
        escape_html(value)
    );
}

/// Lines `text` takes in a box `width_px` wide, counting both explicit
/// breaks and soft wraps.
fn wrapped_lines(text: &str, width_px: u32) -> u32 {
    let per_line = (width_px / CHAR_PX).max(1) as usize;
    let lines: usize = text
        .lines()
        .map(|line| line.chars().count().div_ceil(per_line).max(1))
        .sum();
    u32::try_from(lines.max(1)).unwrap_or(u32::MAX)
}

fn estimate_height(form: &InvoiceForm) -> u32 {
    let info_lines = wrapped_lines(&form.bill_to, INFO_TEXT_PX)
        .max(wrapped_lines(&form.ship_to, INFO_TEXT_PX))
        .max(MIN_TEXTAREA_LINES);
    let notes_lines = wrapped_lines(&form.notes, NOTES_TEXT_PX).max(MIN_TEXTAREA_LINES);
    let rows_px = form.items.iter().fold(0u32, |total, item| {
        let extra_lines = wrapped_lines(&item.description, DESCRIPTION_TEXT_PX) - 1;
        total
            .saturating_add(ROW_PX)
            .saturating_add(extra_lines.saturating_mul(LINE_PX))
    });

    (2 * PADDING_PX + HEADER_PX + 2 * BLOCK_CHROME_PX + TABLE_HEAD_PX)
        .saturating_add(info_lines.saturating_mul(LINE_PX))
        .saturating_add(rows_px)
        .saturating_add(notes_lines.saturating_mul(LINE_PX))
}

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
