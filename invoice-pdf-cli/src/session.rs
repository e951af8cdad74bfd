//! Interactive editing session
//!
//! Reads one command per line and applies it to an in-memory form. A failed
//! command is reported and the session carries on; nothing is written to
//! disk except an explicit export.

use anyhow::{anyhow, bail, Context, Result};
use invoice_pdf::{
    format_amount, Amount, ExportOptions, Exporter, HeaderField, InvoiceForm, ItemField, LineItem,
    SuppliedImage,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  add                       append a blank line item
  remove <index>            delete the line item at <index>
  set <index> <field> <v>   set description, quantity or price of a line item
  header <field> <value>    set number, bill_to, ship_to or notes
  show                      print the form
  export <output> <image>   export using a captured image of the form
  help                      show this help
  quit                      leave the session";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add,
    Remove(usize),
    Set {
        index: usize,
        field: ItemField,
        value: String,
    },
    Header {
        field: HeaderField,
        value: String,
    },
    Show,
    Export {
        output: PathBuf,
        image: PathBuf,
    },
    Help,
    Quit,
}

fn parse_index(text: Option<&str>) -> Result<usize> {
    let text = text.ok_or_else(|| anyhow!("missing line item index"))?;
    text.parse()
        .with_context(|| format!("invalid line item index '{text}'"))
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => Command::Add,
        "remove" | "rm" | "delete" => Command::Remove(parse_index(rest.split_whitespace().next())?),
        "set" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let index = parse_index(parts.next())?;
            let field = parts
                .next()
                .ok_or_else(|| anyhow!("missing field name"))?
                .parse::<ItemField>()?;
            let value = parts.next().unwrap_or("").to_string();
            Command::Set {
                index,
                field,
                value,
            }
        }
        "header" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if field.is_empty() {
                bail!("missing header field");
            }
            Command::Header {
                field: field.parse()?,
                value: value.trim_start().replace("\\n", "\n"),
            }
        }
        "show" | "ls" => Command::Show,
        "export" => {
            let mut parts = rest.split_whitespace();
            let output = parts.next().ok_or_else(|| anyhow!("missing output path"))?;
            let image = parts.next().ok_or_else(|| anyhow!("missing image path"))?;
            Command::Export {
                output: PathBuf::from(output),
                image: PathBuf::from(image),
            }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}' (try 'help')"),
    };

    Ok(Some(command))
}

/// Parse a `description:quantity:price` line item. The description may
/// itself contain colons.
pub fn parse_item_spec(spec: &str) -> Result<LineItem> {
    let mut parts = spec.rsplitn(3, ':');
    let price = parts.next();
    let quantity = parts.next();
    let description = parts.next();

    match (description, quantity, price) {
        (Some(description), Some(quantity), Some(price)) => Ok(LineItem::new(
            description,
            Amount::parse_field(ItemField::Quantity, quantity)?,
            Amount::parse_field(ItemField::UnitPrice, price)?,
        )),
        _ => bail!("line item '{spec}' must look like description:quantity:price"),
    }
}

/// Plain-text view of the form.
pub fn format_form(form: &InvoiceForm) -> String {
    let mut out = String::new();
    out.push_str(&format!("Invoice Number: {}\n", form.invoice_number));
    out.push_str(&format!("Invoice Date:   {}\n", form.display_date()));
    out.push_str(&format!("Bill To:        {}\n", form.bill_to.replace('\n', ", ")));
    out.push_str(&format!("Ship To:        {}\n", form.ship_to.replace('\n', ", ")));
    out.push_str(&format!(
        "\n{:>3}  {:<30} {:>10} {:>10} {:>12}\n",
        "#", "Description", "Quantity", "Price", "Total"
    ));
    for row in form.items.rows() {
        out.push_str(&format!(
            "{:>3}  {:<30} {:>10} {:>10} {:>12}\n",
            row.index,
            row.item.description,
            row.item.quantity.to_string(),
            row.item.unit_price.to_string(),
            format_amount(row.total)
        ));
    }
    if form.items.is_empty() {
        out.push_str("     (no line items)\n");
    }
    out.push_str(&format!("\nNotes: {}\n", form.notes.replace('\n', ", ")));
    out
}

/// What the read loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Session {
    form: InvoiceForm,
    options: ExportOptions,
}

impl Session {
    pub fn new(form: InvoiceForm, options: ExportOptions) -> Self {
        Self { form, options }
    }

    pub fn form(&self) -> &InvoiceForm {
        &self.form
    }

    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        match command {
            Command::Add => {
                self.form.items.append();
                writeln!(out, "Added line item {}", self.form.items.len() - 1)?;
            }
            Command::Remove(index) => {
                let removed = self.form.items.remove_at(index)?;
                writeln!(out, "Removed line item {index} ({:?})", removed.description)?;
            }
            Command::Set {
                index,
                field,
                value,
            } => {
                self.form.items.update_field(index, field, &value)?;
                let total = self
                    .form
                    .items
                    .get(index)
                    .map(LineItem::line_total)
                    .unwrap_or_default();
                writeln!(out, "Line item {index} total: {}", format_amount(total))?;
            }
            Command::Header { field, value } => {
                self.form.set_header(field, value);
                writeln!(out, "Updated {field:?}")?;
            }
            Command::Show => write!(out, "{}", format_form(&self.form))?,
            Command::Export { output, image } => {
                let exporter =
                    Exporter::with_options(SuppliedImage::from_path(image), self.options.clone());
                let pdf = exporter.export(&self.form).await?;
                pdf.save_as(&output)?;
                writeln!(
                    out,
                    "✓ Exported {} page(s) to {}",
                    pdf.page_count,
                    output.display()
                )?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    /// Run commands from `input` until it ends or `quit` is read.
    pub async fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        write!(out, "> ")?;
        out.flush()?;

        for line in input.lines() {
            let line = line?;
            let flow = match parse_command(&line) {
                Ok(Some(command)) => match self.execute(command, out).await {
                    Ok(flow) => flow,
                    Err(e) => {
                        writeln!(out, "Error: {e:#}")?;
                        Flow::Continue
                    }
                },
                Ok(None) => Flow::Continue,
                Err(e) => {
                    writeln!(out, "Error: {e:#}")?;
                    Flow::Continue
                }
            };

            if flow == Flow::Stop {
                return Ok(());
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }
}
