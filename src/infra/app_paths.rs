//! Usage: Resolve per-user app data directory and related path helpers.

use std::path::PathBuf;

pub const APP_DOTDIR_NAME: &str = ".travel-companion";
const APP_DOTDIR_NAME_ENV: &str = "TRAVEL_COMPANION_DOTDIR_NAME";
const LOG_DIR_NAME: &str = "logs";

fn is_safe_dotdir_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if !name.starts_with('.') {
        return false;
    }
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

fn dotdir_name() -> String {
    std::env::var(APP_DOTDIR_NAME_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| is_safe_dotdir_name(v))
        .unwrap_or_else(|| APP_DOTDIR_NAME.to_string())
}

pub fn app_data_dir() -> Result<PathBuf, String> {
    let home_dir = dirs::home_dir().ok_or_else(|| "failed to resolve home dir".to_string())?;

    let dir = home_dir.join(dotdir_name());
    std::fs::create_dir_all(&dir).map_err(|e| format!("failed to create app dir: {e}"))?;

    Ok(dir)
}

pub fn log_dir(app_dir: &std::path::Path) -> PathBuf {
    app_dir.join(LOG_DIR_NAME)
}
