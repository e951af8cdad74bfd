//! Invoice form state
//!
//! Everything the user can type into the invoice form, held in one owned
//! value that render and export functions borrow.

use crate::error::{InvoiceError, Result};
use crate::items::LineItemList;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Free-text fields outside the line-item table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    InvoiceNumber,
    BillTo,
    ShipTo,
    Notes,
}

impl FromStr for HeaderField {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "invoice_number" | "number" => Ok(HeaderField::InvoiceNumber),
            "bill_to" => Ok(HeaderField::BillTo),
            "ship_to" => Ok(HeaderField::ShipTo),
            "notes" => Ok(HeaderField::Notes),
            _ => Err(InvoiceError::UnknownField(s.to_string())),
        }
    }
}

/// The invoice form.
///
/// `invoice_date` is filled in when the form is created and cannot be
/// edited: it is skipped when deserializing, so a loaded form always shows
/// the current date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceForm {
    #[serde(default)]
    pub invoice_number: String,
    #[serde(skip_deserializing, default = "today")]
    invoice_date: NaiveDate,
    #[serde(default)]
    pub bill_to: String,
    #[serde(default)]
    pub ship_to: String,
    #[serde(default)]
    pub items: LineItemList,
    #[serde(default)]
    pub notes: String,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Default for InvoiceForm {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceForm {
    /// A blank form dated today with a single blank line item.
    pub fn new() -> Self {
        Self::with_date(today())
    }

    pub fn with_date(invoice_date: NaiveDate) -> Self {
        Self {
            invoice_number: String::new(),
            invoice_date,
            bill_to: String::new(),
            ship_to: String::new(),
            items: LineItemList::new(),
            notes: String::new(),
        }
    }

    pub fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    /// The date as shown in the read-only date field, e.g. `3/7/2025`.
    pub fn display_date(&self) -> String {
        self.invoice_date.format("%-m/%-d/%Y").to_string()
    }

    pub fn set_header(&mut self, field: HeaderField, value: impl Into<String>) {
        let value = value.into();
        match field {
            HeaderField::InvoiceNumber => self.invoice_number = value,
            HeaderField::BillTo => self.bill_to = value,
            HeaderField::ShipTo => self.ship_to = value,
            HeaderField::Notes => self.notes = value,
        }
    }

    pub fn header(&self, field: HeaderField) -> &str {
        match field {
            HeaderField::InvoiceNumber => &self.invoice_number,
            HeaderField::BillTo => &self.bill_to,
            HeaderField::ShipTo => &self.ship_to,
            HeaderField::Notes => &self.notes,
        }
    }

    /// Parse a form from JSON. The line items are validated on the way in.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| InvoiceError::InvalidInput(format!("Invalid invoice form: {e}")))
    }
}
