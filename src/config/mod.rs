mod overrides;
mod session;
mod settings;

pub use overrides::ReportOverride;
pub use session::{AgencyId, Session, SessionUser};
pub use settings::{ApiSettings, Config, ExportSettings};

use crate::error::{ReportError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.dairy-reports/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "dairy-reports") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.dairy-reports/
    let home = dirs_home().ok_or_else(|| {
        ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".dairy-reports"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the export output directory; relative paths are taken from the config dir.
pub fn resolve_output_dir(output_dir: &str, cfg_dir: &Path) -> PathBuf {
    let path = expand_path(output_dir);
    if path.is_absolute() {
        path
    } else {
        cfg_dir.join(path)
    }
}

fn load_toml<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| ReportError::ConfigParse { path, source: e })
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(ReportError::ConfigFileNotFound(path));
    }
    load_toml(path)
}

/// Load session.toml (empty session if missing)
pub fn load_session(config_dir: &Path) -> Result<Session> {
    let path = config_dir.join("session.toml");
    if !path.exists() {
        return Ok(Session::default());
    }
    load_toml(path)
}

/// Load reports.toml overrides (none if missing)
pub fn load_report_overrides(config_dir: &Path) -> Result<HashMap<String, ReportOverride>> {
    let path = config_dir.join("reports.toml");
    if !path.exists() {
        return Ok(HashMap::new());
    }
    load_toml(path)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://localhost:3000"
timeout_secs = 30
page_size = 100

[export]
output_dir = "output"           # relative to this directory, or absolute / ~/...
default_column_width = 15
currency_symbol = "₹"
"#;

/// Template content for session.toml
pub const SESSION_TEMPLATE: &str = r#"# Paste the credentials of an admin console session here.
# The first of authToken, token or [user].token that is set is sent as the
# bearer token.

# authToken = "eyJhbGciOi..."
# token = ""
# agencyId = 12                 # restricts agency-scoped reports

# [user]
# name = "Admin"
# role = "ADMIN"
# token = ""
"#;

/// Template content for reports.toml
pub const REPORTS_TEMPLATE: &str = r#"# Override export settings per report. The table name is the report id
# shown by 'dairy-reports reports'.
#
# [purchase]
# title = "Purchase Register"
# sheet_name = "Purchases"
# show_totals = true
#
# [[purchase.headers]]
# key = "vendor"
# label = "Vendor"
# width = 25
#
# [[purchase.headers]]
# key = "qty"
# label = "Qty"
# width = 10
# align = "right"
"#;
