use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Config directory not found at {0}. Run 'dairy-reports init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Unknown report '{0}'. Run 'dairy-reports reports' to see available reports.")]
    UnknownReport(String),

    #[error("Report '{0}' has no client-side summary")]
    NoSummary(String),

    #[error("No auth token found in {0}. Add authToken, token or [user] token.")]
    MissingToken(PathBuf),

    #[error("You don't have permission to view the {0} report")]
    PermissionDenied(String),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Unexpected response from {url}: {reason}")]
    BadEnvelope { url: String, reason: String },

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: String, to: String },

    #[error("Invalid sort order '{0}'. Use 'asc' or 'desc'.")]
    InvalidSortOrder(String),

    #[error("Invalid row in {report} data: {source}")]
    InvalidRow {
        report: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
