use anyhow::{Context, Result};
use invoice_pdf::{ExportOptions, HeadlessBrowserCapture};
use invoice_pdf_api::{app_with_state, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "invoice_pdf_api=debug,invoice_pdf=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = match std::env::var_os("INVOICE_PDF_OPTIONS") {
        Some(path) => ExportOptions::load(&path)?,
        None => ExportOptions::default(),
    };
    options.validate()?;

    let mut state = AppState::new(options);
    if let Ok(limit) = std::env::var("INVOICE_PDF_UPLOAD_LIMIT") {
        let bytes: usize = limit
            .trim()
            .parse()
            .with_context(|| format!("INVOICE_PDF_UPLOAD_LIMIT must be a byte count, got {limit:?}"))?;
        state = state.with_upload_limit(bytes);
    }
    info!(bytes = state.upload_limit(), "upload limit");
    if let Some(browser) = std::env::var_os("INVOICE_PDF_BROWSER") {
        info!(browser = ?browser, "server-side capture enabled");
        state = state.with_browser(HeadlessBrowserCapture::new(browser));
    }

    let addr = std::env::var("INVOICE_PDF_API_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("invoice-pdf API listening on http://{addr}");

    axum::serve(listener, app_with_state(state))
        .await
        .context("Server error")?;
    Ok(())
}
