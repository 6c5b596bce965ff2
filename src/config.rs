use crate::db;
use crate::domain::ChoiceStatus;
use rusqlite::Connection;
use serde_json::{json, Map, Value as JsonValue};
use std::path::PathBuf;

pub const SETUP_KEY: &str = "setup.courseSelection";
pub const DEFAULT_LOG_PAGE_SIZE: i64 = 50;
pub const MAX_LOG_PAGE_SIZE: i64 = 1000;

/// Process settings, taken from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: None,
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(v) = std::env::var("COURSESELD_WORKSPACE") {
        if !v.trim().is_empty() {
            settings.workspace = Some(PathBuf::from(v));
        }
    }

    if let Ok(v) = std::env::var("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Ok(v) = std::env::var("COURSESELD_LOG") {
        settings.log_filter = v;
    }

    settings
}

/// Per-workspace defaults stored in the settings table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSetup {
    pub log_page_size: i64,
    pub default_submit_status: ChoiceStatus,
}

impl Default for SelectionSetup {
    fn default() -> Self {
        Self {
            log_page_size: DEFAULT_LOG_PAGE_SIZE,
            default_submit_status: ChoiceStatus::Selected,
        }
    }
}

impl SelectionSetup {
    pub fn to_json(&self) -> JsonValue {
        json!({
            "logPageSize": self.log_page_size,
            "defaultSubmitStatus": self.default_submit_status.as_str(),
        })
    }
}

/// Missing or malformed values fall back to their defaults.
pub fn load_selection_setup(conn: &Connection) -> SelectionSetup {
    let obj = db::settings_get_json(conn, SETUP_KEY)
        .ok()
        .flatten()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    let defaults = SelectionSetup::default();
    let log_page_size = obj
        .get("logPageSize")
        .and_then(|v| v.as_i64())
        .filter(|v| *v > 0 && *v <= MAX_LOG_PAGE_SIZE)
        .unwrap_or(defaults.log_page_size);
    let default_submit_status = obj
        .get("defaultSubmitStatus")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<ChoiceStatus>().ok())
        .filter(|s| s.is_active())
        .unwrap_or(defaults.default_submit_status);
    SelectionSetup {
        log_page_size,
        default_submit_status,
    }
}

/// Validates a patch against the current values and persists the result.
pub fn update_selection_setup(
    conn: &Connection,
    patch: &Map<String, JsonValue>,
) -> Result<SelectionSetup, String> {
    let mut setup = load_selection_setup(conn);
    for (k, v) in patch {
        match k.as_str() {
            "logPageSize" => {
                let n = v
                    .as_i64()
                    .ok_or_else(|| "patch.logPageSize must be integer".to_string())?;
                if n <= 0 || n > MAX_LOG_PAGE_SIZE {
                    return Err(format!(
                        "patch.logPageSize must be between 1 and {}",
                        MAX_LOG_PAGE_SIZE
                    ));
                }
                setup.log_page_size = n;
            }
            "defaultSubmitStatus" => {
                let status = v
                    .as_str()
                    .ok_or_else(|| "patch.defaultSubmitStatus must be string".to_string())?
                    .parse::<ChoiceStatus>()?;
                if !status.is_active() {
                    return Err("patch.defaultSubmitStatus cannot be Removed".into());
                }
                setup.default_submit_status = status;
            }
            _ => return Err(format!("unknown patch field: {}", k)),
        }
    }
    db::settings_set_json(conn, SETUP_KEY, &setup.to_json()).map_err(|e| e.to_string())?;
    Ok(setup)
}
