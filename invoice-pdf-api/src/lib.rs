//! # invoice-pdf-api
//!
//! Local HTTP service for editing a single invoice form and downloading it
//! as a paginated PDF.

mod api;
pub use api::{
    app, app_with_state, append_item, export_pdf, get_form, health_check, paginate_image,
    preview, remove_item, update_header, update_item, AppError, AppState, ErrorResponse,
    FieldValue, FormResponse, ItemResponse, PaginateRequest, UpdateHeaderRequest,
    UpdateItemRequest, DEFAULT_UPLOAD_LIMIT,
};
