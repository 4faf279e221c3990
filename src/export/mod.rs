mod excel;
mod pdf;

pub use excel::{
    export_to_excel, Align, ExcelExportConfig, ExcelExporter, ExcelHeader, GroupingConfig,
    DEFAULT_COLUMN_WIDTH,
};
pub use pdf::{generate_report_pdf, PdfReport, PdfRow};
