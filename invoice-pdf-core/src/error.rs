use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("PDF assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("Line item index {index} out of bounds (list has {len} items)")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`InvoiceError`], used by the CLI and the
/// HTTP service to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user supplied something unusable; fixing the input fixes it.
    Input,
    /// A line item position that does not exist.
    NotFound,
    /// The render-to-image step did not produce an image.
    Capture,
    /// Building or writing the document failed.
    Assembly,
}

impl InvoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvoiceError::InvalidInput(_)
            | InvoiceError::InvalidNumber { .. }
            | InvoiceError::UnknownField(_)
            | InvoiceError::Config(_) => ErrorKind::Input,
            InvoiceError::IndexOutOfBounds { .. } => ErrorKind::NotFound,
            InvoiceError::CaptureFailed(_) => ErrorKind::Capture,
            InvoiceError::AssemblyFailed(_) | InvoiceError::Io(_) => ErrorKind::Assembly,
        }
    }
}

impl From<oxidize_pdf::PdfError> for InvoiceError {
    fn from(err: oxidize_pdf::PdfError) -> Self {
        InvoiceError::AssemblyFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
