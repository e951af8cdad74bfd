//! Line-item store
//!
//! An ordered, editable list of invoice rows. Items have no identity beyond
//! their position: removing an item shifts every later item down by one.
//! Line totals are derived on every read and never stored.

use crate::error::{InvoiceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A finite, non-negative number entered into a quantity or price field.
///
/// Values only enter the store through [`Amount::new`] or parsing, so raw
/// text never reaches the total arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    pub const ZERO: Amount = Amount(0.0);
    pub const ONE: Amount = Amount(1.0);

    /// Validate a raw number.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value >= 0.0 {
            // Normalize -0.0 so it prints as 0.00
            Ok(Amount(value + 0.0))
        } else {
            Err(InvoiceError::InvalidNumber {
                field: "amount".to_string(),
                value: value.to_string(),
            })
        }
    }

    /// Parse user text, reporting failures against `field`.
    pub fn parse_field(field: ItemField, text: &str) -> Result<Self> {
        Self::parse_named(field.name(), text)
    }

    fn parse_named(name: &str, text: &str) -> Result<Self> {
        let invalid = || InvoiceError::InvalidNumber {
            field: name.to_string(),
            value: text.to_string(),
        };

        let value: f64 = text.trim().parse().map_err(|_| invalid())?;
        Amount::new(value).map_err(|_| invalid())
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_named("amount", s)
    }
}

impl TryFrom<f64> for Amount {
    type Error = InvoiceError;

    fn try_from(value: f64) -> Result<Self> {
        Amount::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> f64 {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format a money value with two decimals, as shown in the Total column.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Editable fields of a [`LineItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    Description,
    Quantity,
    #[serde(alias = "price", alias = "unitPrice")]
    UnitPrice,
}

impl ItemField {
    pub fn name(self) -> &'static str {
        match self {
            ItemField::Description => "description",
            ItemField::Quantity => "quantity",
            ItemField::UnitPrice => "unit_price",
        }
    }
}

impl FromStr for ItemField {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "description" => Ok(ItemField::Description),
            "quantity" | "qty" => Ok(ItemField::Quantity),
            "price" | "unit_price" | "unitprice" => Ok(ItemField::UnitPrice),
            _ => Err(InvoiceError::UnknownField(s.to_string())),
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One invoice row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: Amount,
    #[serde(default, alias = "price")]
    pub unit_price: Amount,
}

fn default_quantity() -> Amount {
    Amount::ONE
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            description: String::new(),
            quantity: Amount::ONE,
            unit_price: Amount::ZERO,
        }
    }
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Amount, unit_price: Amount) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// `quantity * unit_price` for the current field values.
    pub fn line_total(&self) -> f64 {
        self.quantity.value() * self.unit_price.value()
    }
}

/// A row as displayed: position, item and its derived total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRow<'a> {
    pub index: usize,
    pub item: &'a LineItem,
    pub total: f64,
}

/// Ordered list of line items. Insertion order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemList {
    items: Vec<LineItem>,
}

impl Default for LineItemList {
    fn default() -> Self {
        Self::new()
    }
}

impl LineItemList {
    /// A list holding a single blank item, the state of a fresh form.
    pub fn new() -> Self {
        Self {
            items: vec![LineItem::default()],
        }
    }

    pub fn from_items(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    /// Add a blank item at the end.
    pub fn append(&mut self) {
        self.items.push(LineItem::default());
    }

    /// Add a prepared item at the end.
    pub fn push(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// Remove the item at `index`. Out of range positions are rejected and
    /// leave the list untouched.
    pub fn remove_at(&mut self, index: usize) -> Result<LineItem> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    /// Overwrite one field of the item at `index`.
    ///
    /// Numeric fields are parsed into an [`Amount`]; if parsing fails the
    /// item keeps its previous value.
    pub fn update_field(&mut self, index: usize, field: ItemField, value: &str) -> Result<()> {
        self.check_index(index)?;

        let item = &mut self.items[index];
        match field {
            ItemField::Description => item.description = value.to_string(),
            ItemField::Quantity => item.quantity = Amount::parse_field(field, value)?,
            ItemField::UnitPrice => item.unit_price = Amount::parse_field(field, value)?,
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&LineItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Rows with their totals recomputed from the current values.
    pub fn rows(&self) -> impl Iterator<Item = ItemRow<'_>> {
        self.items.iter().enumerate().map(|(index, item)| ItemRow {
            index,
            item,
            total: item.line_total(),
        })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(InvoiceError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a LineItemList {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
