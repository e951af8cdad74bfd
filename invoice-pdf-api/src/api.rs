use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Json, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use invoice_pdf::{
    format_amount, paginate, render_region, ErrorKind, ExportOptions, ExportedPdf, Exporter,
    HeaderField, HeadlessBrowserCapture, InvoiceError, InvoiceForm, ItemField, PaginationPlan,
    SuppliedImage, TrailingPagePolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// Default cap on request bodies. A scale-4 capture of a long invoice is a
/// few thousand pixels on each side, which axum's 2 MB default cannot hold.
pub const DEFAULT_UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

/// Shared state: the single in-memory form session and export settings.
#[derive(Clone)]
pub struct AppState {
    form: Arc<RwLock<InvoiceForm>>,
    options: Arc<ExportOptions>,
    browser: Option<HeadlessBrowserCapture>,
    upload_limit: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}

impl AppState {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            form: Arc::new(RwLock::new(InvoiceForm::new())),
            options: Arc::new(options),
            browser: None,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
        }
    }

    /// Largest accepted request body in bytes.
    pub fn with_upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }

    pub fn upload_limit(&self) -> usize {
        self.upload_limit
    }

    /// Capture server-side with a headless browser when no image is uploaded.
    pub fn with_browser(mut self, browser: HeadlessBrowserCapture) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn with_form(self, form: InvoiceForm) -> Self {
        Self {
            form: Arc::new(RwLock::new(form)),
            ..self
        }
    }
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

/// One line item as shown in the table, with its derived total
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ItemResponse {
    pub index: usize,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
    /// Total formatted with two decimals
    pub line_total_display: String,
}

/// Full form state
#[derive(Debug, Serialize, Deserialize)]
pub struct FormResponse {
    pub invoice_number: String,
    /// Read-only, locale formatted
    pub invoice_date: String,
    pub bill_to: String,
    pub ship_to: String,
    pub notes: String,
    pub items: Vec<ItemResponse>,
}

impl From<&InvoiceForm> for FormResponse {
    fn from(form: &InvoiceForm) -> Self {
        Self {
            invoice_number: form.invoice_number.clone(),
            invoice_date: form.display_date(),
            bill_to: form.bill_to.clone(),
            ship_to: form.ship_to.clone(),
            notes: form.notes.clone(),
            items: form
                .items
                .rows()
                .map(|row| ItemResponse {
                    index: row.index,
                    description: row.item.description.clone(),
                    quantity: row.item.quantity.value(),
                    unit_price: row.item.unit_price.value(),
                    line_total: row.total,
                    line_total_display: format_amount(row.total),
                })
                .collect(),
        }
    }
}

/// A field value as sent by a form input: text or a bare JSON number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Number(number) => number.to_string(),
        }
    }
}

/// Request payload for updating one field of a line item
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub field: ItemField,
    pub value: FieldValue,
}

/// Request payload for updating a header field
#[derive(Debug, Deserialize)]
pub struct UpdateHeaderRequest {
    pub field: HeaderField,
    pub value: String,
}

/// Request payload for the pagination preview
#[derive(Debug, Deserialize)]
pub struct PaginateRequest {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Overrides the configured trailing-page policy
    pub trailing_pages: Option<TrailingPagePolicy>,
}

/// Application-specific error types for the API
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Errors from the invoice library
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    /// Malformed requests (missing uploads)
    #[error("{0}")]
    BadRequest(String),
    /// Multipart body could not be read; keeps the status axum reports,
    /// e.g. 413 when the upload exceeds the body limit
    #[error("{message}")]
    Upload { status: StatusCode, message: String },
}

impl AppError {
    fn upload(context: &str, err: MultipartError) -> Self {
        AppError::Upload {
            status: err.status(),
            message: format!("{context}: {}", err.body_text()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Invoice(e) => match e.kind() {
                ErrorKind::Input => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Capture => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Assembly => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upload { status, .. } => *status,
        };
        debug!(%status, "request failed: {self}");

        let error_response = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Build the application router with a fresh session
pub fn app() -> Router {
    app_with_state(AppState::default())
}

/// Build the application router around `state`.
///
/// # Routes
///
/// ## Form session
/// - `GET /api/form` - Current form with derived line totals
/// - `PUT /api/form/header` - Update invoice number, bill-to, ship-to or notes
/// - `POST /api/items` - Append a blank line item
/// - `PATCH /api/items/{index}` - Update one field of a line item
/// - `DELETE /api/items/{index}` - Remove a line item
///
/// ## Output
/// - `GET /api/preview` - Printable form region as HTML
/// - `POST /api/paginate` - Page placements for a captured image size
/// - `POST /api/export` - Download the form as `invoice.pdf`
///
/// ## Service
/// - `GET /api/health` - Health check endpoint
pub fn app_with_state(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.upload_limit);
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/form", get(get_form))
        .route("/api/form/header", put(update_header))
        .route("/api/items", post(append_item))
        .route("/api/items/{index}", patch(update_item).delete(remove_item))
        .route("/api/preview", get(preview))
        .route("/api/paginate", post(paginate_image))
        .route("/api/export", post(export_pdf))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "invoice-pdf API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_form(State(state): State<AppState>) -> Json<FormResponse> {
    let form = state.form.read().await;
    Json(FormResponse::from(&*form))
}

pub async fn update_header(
    State(state): State<AppState>,
    Json(payload): Json<UpdateHeaderRequest>,
) -> Json<FormResponse> {
    let mut form = state.form.write().await;
    form.set_header(payload.field, payload.value);
    Json(FormResponse::from(&*form))
}

pub async fn append_item(State(state): State<AppState>) -> (StatusCode, Json<FormResponse>) {
    let mut form = state.form.write().await;
    form.items.append();
    debug!(items = form.items.len(), "line item appended");
    (StatusCode::CREATED, Json(FormResponse::from(&*form)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<FormResponse>, AppError> {
    let mut form = state.form.write().await;
    form.items
        .update_field(index, payload.field, &payload.value.into_text())?;
    Ok(Json(FormResponse::from(&*form)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<FormResponse>, AppError> {
    let mut form = state.form.write().await;
    form.items.remove_at(index)?;
    debug!(index, items = form.items.len(), "line item removed");
    Ok(Json(FormResponse::from(&*form)))
}

pub async fn preview(State(state): State<AppState>) -> Html<String> {
    let form = state.form.read().await;
    Html(render_region(&form).html)
}

pub async fn paginate_image(
    State(state): State<AppState>,
    Json(payload): Json<PaginateRequest>,
) -> Result<Json<PaginationPlan>, AppError> {
    let policy = payload
        .trailing_pages
        .unwrap_or(state.options.trailing_pages);
    let plan = paginate(
        payload.pixel_width,
        payload.pixel_height,
        state.options.page_geometry(),
        policy,
    )?;
    Ok(Json(plan))
}

/// Export the current form using the uploaded capture (multipart field `file`)
pub async fn export_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::upload("Failed to read upload", e))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::upload("Failed to read upload data", e))?;
            image = Some(data.to_vec());
            break;
        }
    }

    // Snapshot so edits made during the export do not reach this document
    let form = state.form.read().await.clone();
    let options = (*state.options).clone();

    let pdf = match (image, &state.browser) {
        (Some(data), _) => {
            Exporter::with_options(SuppliedImage::from_bytes(data), options)
                .export(&form)
                .await?
        }
        (None, Some(browser)) => {
            Exporter::with_options(browser.clone(), options)
                .export(&form)
                .await?
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "No captured image provided in upload".to_string(),
            ))
        }
    };

    info!(pages = pdf.page_count, bytes = pdf.bytes.len(), "invoice downloaded");
    Ok(pdf_response(pdf))
}

fn pdf_response(pdf: ExportedPdf) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", pdf.file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::HeaderName::from_static("x-page-count"), pdf.page_count.to_string()),
        ],
        pdf.bytes,
    )
        .into_response()
}
