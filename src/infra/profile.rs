//! Usage: Traveler profile record persisted under the `travelUser` storage key.

use super::local_storage::LocalStorage;
use serde::{Deserialize, Serialize};

pub const TRAVEL_USER_KEY: &str = "travelUser";
const DEFAULT_NAME: &str = "John Traveler";
const DEFAULT_PHONE: &str = "+1 (555) 123-4567";
const MAX_PHONE_DIGITS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelUser {
    pub name: String,
    pub phone: String,
}

impl Default for TravelUser {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            phone: DEFAULT_PHONE.to_string(),
        }
    }
}

/// Optional `+`, a leading 1-9, then at most 15 more digits (whitespace ignored).
fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    let mut chars = digits.chars();
    match chars.next() {
        Some('1'..='9') => {}
        _ => return false,
    }
    digits.len() <= MAX_PHONE_DIGITS && chars.all(|c| c.is_ascii_digit())
}

pub fn validate_profile(user: &TravelUser) -> Result<(), String> {
    if user.name.trim().is_empty() {
        return Err("SEC_INVALID_INPUT: name is required".to_string());
    }
    if user.phone.trim().is_empty() {
        return Err("SEC_INVALID_INPUT: phone is required".to_string());
    }
    if !is_valid_phone(&user.phone) {
        return Err(format!(
            "SEC_INVALID_INPUT: invalid phone number={}",
            user.phone
        ));
    }
    Ok(())
}

/// Missing or unreadable records fall back to the built-in traveler.
pub fn load_profile(storage: &dyn LocalStorage) -> TravelUser {
    let raw = match storage.get_item(TRAVEL_USER_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return TravelUser::default(),
        Err(err) => {
            tracing::warn!("failed to read traveler profile: {}", err);
            return TravelUser::default();
        }
    };
    match serde_json::from_str::<TravelUser>(&raw) {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!("stored traveler profile is malformed, using default: {}", err);
            TravelUser::default()
        }
    }
}

pub fn save_profile(storage: &dyn LocalStorage, user: &TravelUser) -> Result<(), String> {
    validate_profile(user)?;
    let user = TravelUser {
        name: user.name.trim().to_string(),
        phone: user.phone.trim().to_string(),
    };
    let raw = serde_json::to_string(&user)
        .map_err(|e| format!("failed to serialize traveler profile: {e}"))?;
    storage.set_item(TRAVEL_USER_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::local_storage::MemoryLocalStorage;

    fn user(name: &str, phone: &str) -> TravelUser {
        TravelUser {
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn load_defaults_when_missing_or_malformed() {
        let storage = MemoryLocalStorage::new();
        assert_eq!(load_profile(&storage), TravelUser::default());

        let storage = MemoryLocalStorage::with_item(TRAVEL_USER_KEY, "{\"name\":");
        assert_eq!(load_profile(&storage).name, "John Traveler");
    }

    #[test]
    fn save_then_load_trims_fields() {
        let storage = MemoryLocalStorage::new();
        save_profile(&storage, &user("  Ada  ", " +44 20 7946 0958 ")).expect("save");
        let loaded = load_profile(&storage);
        assert_eq!(loaded, user("Ada", "+44 20 7946 0958"));
    }

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("+15551234567"));
        assert!(is_valid_phone("1 555 123 4567"));
        assert!(is_valid_phone("+1234567890123456"));
        assert!(!is_valid_phone("+12345678901234567"));
        assert!(!is_valid_phone("0555123"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("++1555"));
        assert!(!is_valid_phone("555-1234"));
    }

    #[test]
    fn default_display_phone_is_not_a_valid_input() {
        // Punctuated display form is only a placeholder; saving requires digits.
        let err = validate_profile(&TravelUser::default()).unwrap_err();
        assert!(err.starts_with("SEC_INVALID_INPUT: invalid phone"), "{err}");
    }

    #[test]
    fn required_fields_are_rejected_without_writing() {
        let storage = MemoryLocalStorage::new();
        let err = save_profile(&storage, &user(" ", "+15551234567")).unwrap_err();
        assert_eq!(err, "SEC_INVALID_INPUT: name is required");
        let err = save_profile(&storage, &user("Ada", "")).unwrap_err();
        assert_eq!(err, "SEC_INVALID_INPUT: phone is required");
        assert_eq!(storage.get_item(TRAVEL_USER_KEY).expect("get"), None);
    }
}
