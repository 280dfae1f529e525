//! Usage: Persisted application settings (schema + read/write helpers).

use crate::shared::fs::{read_optional_string, write_file_atomic};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOCATION_MAXIMUM_AGE_MS: u64 = 60_000;
pub const DEFAULT_SYNTHETIC_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_SYNTHETIC_PROBABILITY: f64 = 0.1;
const DEFAULT_LOG_RETENTION_DAYS: u32 = 7;
const MAX_LOCATION_TIMEOUT_MS: u64 = 5 * 60 * 1_000;
const MAX_LOCATION_MAXIMUM_AGE_MS: u64 = 24 * 60 * 60 * 1_000;
const MIN_SYNTHETIC_INTERVAL_SECONDS: u64 = 1;
const MAX_SYNTHETIC_INTERVAL_SECONDS: u64 = 24 * 60 * 60;
const MAX_LOG_RETENTION_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
            maximum_age_ms: DEFAULT_LOCATION_MAXIMUM_AGE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticNotificationSettings {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub probability: f64,
}

impl Default for SyntheticNotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: DEFAULT_SYNTHETIC_INTERVAL_SECONDS,
            probability: DEFAULT_SYNTHETIC_PROBABILITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub schema_version: u32,
    pub location: LocationSettings,
    // Demo stand-in for a push feed (default enabled, 10% every 30s).
    pub synthetic_notifications: SyntheticNotificationSettings,
    pub seed_demo_notifications: bool,
    pub log_retention_days: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            location: LocationSettings::default(),
            synthetic_notifications: SyntheticNotificationSettings::default(),
            seed_demo_notifications: true,
            log_retention_days: DEFAULT_LOG_RETENTION_DAYS,
        }
    }
}

fn sanitize_location_settings(settings: &mut AppSettings) -> bool {
    let mut changed = false;

    if settings.location.timeout_ms == 0 {
        settings.location.timeout_ms = DEFAULT_LOCATION_TIMEOUT_MS;
        changed = true;
    }
    if settings.location.timeout_ms > MAX_LOCATION_TIMEOUT_MS {
        settings.location.timeout_ms = MAX_LOCATION_TIMEOUT_MS;
        changed = true;
    }
    if settings.location.maximum_age_ms > MAX_LOCATION_MAXIMUM_AGE_MS {
        settings.location.maximum_age_ms = MAX_LOCATION_MAXIMUM_AGE_MS;
        changed = true;
    }

    changed
}

fn sanitize_synthetic_settings(settings: &mut AppSettings) -> bool {
    let mut changed = false;
    let synthetic = &mut settings.synthetic_notifications;

    if !synthetic.probability.is_finite() {
        synthetic.probability = DEFAULT_SYNTHETIC_PROBABILITY;
        changed = true;
    }
    let clamped = synthetic.probability.clamp(0.0, 1.0);
    if clamped != synthetic.probability {
        synthetic.probability = clamped;
        changed = true;
    }

    let interval = synthetic
        .interval_seconds
        .clamp(MIN_SYNTHETIC_INTERVAL_SECONDS, MAX_SYNTHETIC_INTERVAL_SECONDS);
    if interval != synthetic.interval_seconds {
        synthetic.interval_seconds = interval;
        changed = true;
    }

    changed
}

fn sanitize_log_retention_days(settings: &mut AppSettings) -> bool {
    if settings.log_retention_days == 0 {
        settings.log_retention_days = DEFAULT_LOG_RETENTION_DAYS;
        return true;
    }
    if settings.log_retention_days > MAX_LOG_RETENTION_DAYS {
        settings.log_retention_days = MAX_LOG_RETENTION_DAYS;
        return true;
    }
    false
}

fn migrate_schema_version(settings: &mut AppSettings, schema_version_present: bool) -> bool {
    // If the schema version is missing, force a write so the file records what it was read as.
    if !schema_version_present || settings.schema_version != SCHEMA_VERSION {
        settings.schema_version = SCHEMA_VERSION;
        return true;
    }
    false
}

pub fn settings_path(app_dir: &Path) -> PathBuf {
    app_dir.join(SETTINGS_FILE_NAME)
}

fn parse_settings_json(content: &str) -> Result<(AppSettings, bool), String> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| format!("invalid settings.json: {e}"))?;
    let schema_version_present = value.get("schema_version").is_some();
    let settings: AppSettings =
        serde_json::from_value(value).map_err(|e| format!("invalid settings.json: {e}"))?;
    Ok((settings, schema_version_present))
}

/// Reads settings, creating the file with defaults when missing and persisting repaired values.
pub fn read(app_dir: &Path) -> Result<AppSettings, String> {
    let path = settings_path(app_dir);
    let Some(content) = read_optional_string(&path)? else {
        let settings = AppSettings::default();
        // Best-effort: create default settings.json on first read to make the config discoverable/editable.
        if let Err(err) = write(app_dir, &settings) {
            tracing::warn!("failed to create default settings: {}", err);
        }
        return Ok(settings);
    };

    let (mut settings, schema_version_present) = parse_settings_json(&content)?;

    let mut repaired = false;
    repaired |= migrate_schema_version(&mut settings, schema_version_present);
    repaired |= sanitize_location_settings(&mut settings);
    repaired |= sanitize_synthetic_settings(&mut settings);
    repaired |= sanitize_log_retention_days(&mut settings);
    if repaired {
        // Best-effort: persist repaired values while keeping read semantics.
        if let Err(err) = write(app_dir, &settings) {
            tracing::warn!("failed to persist repaired settings: {}", err);
        }
    }

    Ok(settings)
}

pub fn write(app_dir: &Path, settings: &AppSettings) -> Result<AppSettings, String> {
    if settings.location.timeout_ms == 0 {
        return Err("SEC_INVALID_INPUT: location.timeout_ms must be >= 1".to_string());
    }
    if settings.location.timeout_ms > MAX_LOCATION_TIMEOUT_MS {
        return Err(format!(
            "SEC_INVALID_INPUT: location.timeout_ms must be <= {MAX_LOCATION_TIMEOUT_MS}"
        ));
    }
    if settings.location.maximum_age_ms > MAX_LOCATION_MAXIMUM_AGE_MS {
        return Err(format!(
            "SEC_INVALID_INPUT: location.maximum_age_ms must be <= {MAX_LOCATION_MAXIMUM_AGE_MS}"
        ));
    }
    let probability = settings.synthetic_notifications.probability;
    if !(0.0..=1.0).contains(&probability) {
        return Err(
            "SEC_INVALID_INPUT: synthetic_notifications.probability must be within [0, 1]"
                .to_string(),
        );
    }
    let interval = settings.synthetic_notifications.interval_seconds;
    if !(MIN_SYNTHETIC_INTERVAL_SECONDS..=MAX_SYNTHETIC_INTERVAL_SECONDS).contains(&interval) {
        return Err(format!(
            "SEC_INVALID_INPUT: synthetic_notifications.interval_seconds must be within [{MIN_SYNTHETIC_INTERVAL_SECONDS}, {MAX_SYNTHETIC_INTERVAL_SECONDS}]"
        ));
    }
    if settings.log_retention_days == 0 || settings.log_retention_days > MAX_LOG_RETENTION_DAYS {
        return Err(format!(
            "SEC_INVALID_INPUT: log_retention_days must be within [1, {MAX_LOG_RETENTION_DAYS}]"
        ));
    }

    let content = serde_json::to_vec_pretty(settings)
        .map_err(|e| format!("failed to serialize settings: {e}"))?;
    write_file_atomic(&settings_path(app_dir), &content)?;

    Ok(settings.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fs::test_support::unique_tmp_dir;

    #[test]
    fn read_creates_defaults_when_missing() {
        let dir = unique_tmp_dir("settings");
        let settings = read(&dir).expect("read");
        assert_eq!(settings, AppSettings::default());
        assert!(settings_path(&dir).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_file_fills_defaults_and_records_schema_version() {
        let dir = unique_tmp_dir("settings");
        std::fs::write(
            settings_path(&dir),
            r#"{ "synthetic_notifications": { "enabled": false } }"#,
        )
        .expect("write");

        let settings = read(&dir).expect("read");
        assert!(!settings.synthetic_notifications.enabled);
        assert_eq!(
            settings.synthetic_notifications.interval_seconds,
            DEFAULT_SYNTHETIC_INTERVAL_SECONDS
        );
        assert_eq!(settings.location, LocationSettings::default());

        let persisted = std::fs::read_to_string(settings_path(&dir)).expect("read back");
        assert!(persisted.contains("\"schema_version\": 1"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_of_range_values_are_repaired_on_read() {
        let dir = unique_tmp_dir("settings");
        std::fs::write(
            settings_path(&dir),
            r#"{
  "schema_version": 1,
  "location": { "timeout_ms": 0, "maximum_age_ms": 999999999999 },
  "synthetic_notifications": { "interval_seconds": 0, "probability": 3.5 },
  "log_retention_days": 0
}"#,
        )
        .expect("write");

        let settings = read(&dir).expect("read");
        assert_eq!(settings.location.timeout_ms, DEFAULT_LOCATION_TIMEOUT_MS);
        assert_eq!(settings.location.maximum_age_ms, MAX_LOCATION_MAXIMUM_AGE_MS);
        assert_eq!(settings.synthetic_notifications.interval_seconds, 1);
        assert_eq!(settings.synthetic_notifications.probability, 1.0);
        assert_eq!(settings.log_retention_days, DEFAULT_LOG_RETENTION_DAYS);

        let reread = read(&dir).expect("reread");
        assert_eq!(reread, settings);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_json_is_an_error_and_file_is_left_alone() {
        let dir = unique_tmp_dir("settings");
        std::fs::write(settings_path(&dir), "{ not json").expect("write");
        let err = read(&dir).unwrap_err();
        assert!(err.starts_with("invalid settings.json"), "{err}");
        assert_eq!(
            std::fs::read_to_string(settings_path(&dir)).expect("read back"),
            "{ not json"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_rejects_out_of_range_probability() {
        let dir = unique_tmp_dir("settings");
        let mut settings = AppSettings::default();
        settings.synthetic_notifications.probability = -0.5;
        let err = write(&dir, &settings).unwrap_err();
        assert!(err.starts_with("SEC_INVALID_INPUT:"), "{err}");
        assert!(!settings_path(&dir).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
