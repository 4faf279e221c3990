use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportSettings {
    pub output_dir: String,
    /// Column width in characters for headers that don't set one
    #[serde(default = "default_column_width")]
    pub default_column_width: f64,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

pub(crate) fn default_column_width() -> f64 {
    15.0
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}
