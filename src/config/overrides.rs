use serde::{Deserialize, Serialize};

use crate::export::ExcelHeader;

/// Per-report export tweaks read from `reports.toml`, keyed by report slug.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ReportOverride {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub show_totals: Option<bool>,
    #[serde(default)]
    pub headers: Option<Vec<ExcelHeader>>,
}
