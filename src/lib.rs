pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod report;

pub use api::{ApiClient, ReportPayload};
pub use config::{Config, ReportOverride, Session};
pub use error::{ReportError, Result};
pub use export::{export_to_excel, ExcelExportConfig, ExcelExporter, ExcelHeader};
pub use report::{aggregate, ReportFilter, ReportKind, ReportNodes};
