mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use invoice_pdf::{
    paginate, render_region, Capture, ExportOptions, Exporter, HeadlessBrowserCapture,
    InvoiceForm, LineItemList, Orientation, SuppliedImage, TrailingPagePolicy,
};
use session::{parse_item_spec, Session};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "invoice-pdf",
    about = "Fill in invoice line items and export the rendered form as a paginated PDF",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a captured image of the given size is spread over pages
    Paginate {
        /// Image width in pixels
        #[arg(long)]
        width: u32,

        /// Image height in pixels
        #[arg(long)]
        height: u32,

        /// Keep emitting pages while the remaining height is >= 0
        #[arg(long)]
        legacy_trailing_page: bool,

        /// Use landscape pages
        #[arg(long)]
        landscape: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the printable form region as HTML
    Render {
        /// Invoice form as JSON (defaults to a blank form)
        #[arg(short, long)]
        form: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the form as a paginated PDF
    Export {
        /// Invoice form as JSON (defaults to a blank form)
        #[arg(short, long)]
        form: Option<PathBuf>,

        /// Line item as "description:quantity:price" (repeatable)
        #[arg(short, long = "item")]
        items: Vec<String>,

        /// Captured image of the rendered form (PNG or JPEG)
        #[arg(long, conflicts_with = "browser", required_unless_present = "browser")]
        image: Option<PathBuf>,

        /// Headless Chromium-compatible browser used to capture the form
        #[arg(long)]
        browser: Option<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = invoice_pdf::DEFAULT_FILE_NAME)]
        output: PathBuf,

        /// Capture resolution multiplier
        #[arg(long)]
        scale: Option<f32>,

        /// Export options as JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep emitting pages while the remaining height is >= 0
        #[arg(long)]
        legacy_trailing_page: bool,
    },

    /// Edit a form interactively and export it
    Edit {
        /// Invoice form as JSON to start from
        #[arg(short, long)]
        form: Option<PathBuf>,

        /// Export options as JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invoice_pdf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_form(path: Option<&Path>) -> Result<InvoiceForm> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read form {}", path.display()))?;
            Ok(InvoiceForm::from_json(&json)?)
        }
        None => Ok(InvoiceForm::new()),
    }
}

fn load_options(path: Option<&Path>) -> Result<ExportOptions> {
    match path {
        Some(path) => Ok(ExportOptions::load(path)?),
        None => Ok(ExportOptions::default()),
    }
}

fn trailing_policy(legacy: bool) -> TrailingPagePolicy {
    if legacy {
        TrailingPagePolicy::Legacy
    } else {
        TrailingPagePolicy::Exact
    }
}

async fn export_with<C: Capture>(
    capture: C,
    options: ExportOptions,
    form: &InvoiceForm,
    output: &Path,
) -> Result<()> {
    let exporter = Exporter::with_options(capture, options);
    let pdf = exporter.export(form).await?;
    pdf.save_as(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "✓ Invoice exported to {} ({} page(s))",
        output.display(),
        pdf.page_count
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Paginate {
            width,
            height,
            legacy_trailing_page,
            landscape,
            json,
        } => {
            let orientation = if landscape {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            };
            let geometry = ExportOptions::default()
                .with_orientation(orientation)
                .page_geometry();
            let plan = paginate(width, height, geometry, trailing_policy(legacy_trailing_page))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!(
                    "Image: {:.2} x {:.2} mm on {} x {} mm pages",
                    plan.image_width_mm,
                    plan.image_height_mm,
                    plan.geometry.width_mm,
                    plan.geometry.height_mm
                );
                println!("Pages: {}", plan.page_count());
                for placement in &plan.placements {
                    println!(
                        "  page {}: x = {:.2} mm, y = {:.2} mm",
                        placement.page_index + 1,
                        placement.x_offset_mm,
                        placement.y_offset_mm
                    );
                }
            }
        }

        Commands::Render { form, output } => {
            let form = load_form(form.as_deref())?;
            let region = render_region(&form);

            if let Some(output_path) = output {
                std::fs::write(&output_path, &region.html)
                    .with_context(|| format!("Failed to write {}", output_path.display()))?;
                println!("✓ Form rendered to: {}", output_path.display());
            } else {
                print!("{}", region.html);
            }
        }

        Commands::Export {
            form,
            items,
            image,
            browser,
            output,
            scale,
            config,
            legacy_trailing_page,
        } => {
            let mut invoice = load_form(form.as_deref())?;
            if !items.is_empty() {
                if form.is_none() {
                    invoice.items = LineItemList::from_items(Vec::new());
                }
                for spec in &items {
                    invoice.items.push(parse_item_spec(spec)?);
                }
            }

            let mut options = load_options(config.as_deref())?;
            if let Some(scale) = scale {
                options.capture = options.capture.with_scale(scale);
            }
            if legacy_trailing_page {
                options.trailing_pages = TrailingPagePolicy::Legacy;
            }

            match (image, browser) {
                (Some(image), _) => {
                    export_with(SuppliedImage::from_path(image), options, &invoice, &output)
                        .await?
                }
                (None, Some(browser)) => {
                    export_with(
                        HeadlessBrowserCapture::new(browser),
                        options,
                        &invoice,
                        &output,
                    )
                    .await?
                }
                (None, None) => anyhow::bail!("Either --image or --browser is required"),
            }
        }

        Commands::Edit { form, config } => {
            let form = load_form(form.as_deref())?;
            let options = load_options(config.as_deref())?;

            println!("Editing invoice. Type 'help' for commands.");
            let mut session = Session::new(form, options);
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            session.run(stdin.lock(), &mut stdout).await?;
        }
    }

    Ok(())
}
