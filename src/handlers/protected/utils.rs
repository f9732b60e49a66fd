use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trimmed display name of 2 to 100 characters.
pub fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ApiError::field_error(
            "name",
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        ));
    }
    Ok(name.to_string())
}

/// Lowercased address with a local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(ApiError::field_error("email", "Invalid email address"));
    }
    Ok(email)
}

pub fn validate_password(new_password: &str, confirm_password: &str) -> Result<(), ApiError> {
    if new_password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ApiError::field_error(
            "new_password",
            format!("Password must be at least {} characters", PASSWORD_MIN_CHARS),
        ));
    }
    if new_password != confirm_password {
        return Err(ApiError::field_error("confirm_password", "Passwords do not match"));
    }
    Ok(())
}

/// School codes: 2 to 20 of `A-Z`, `0-9` and `-`. Input is uppercased first.
pub fn validate_school_code(code: &str) -> Result<String, ApiError> {
    let code = code.trim().to_ascii_uppercase();
    let valid = (2..=20).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(ApiError::field_error(
            "code",
            "Code must be 2-20 characters of A-Z, 0-9 or '-'",
        ));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        school_id: Option<Option<u32>>,
    }

    #[test]
    fn double_option_tells_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.school_id, None);
        let null: Patch = serde_json::from_str(r#"{"school_id":null}"#).unwrap();
        assert_eq!(null.school_id, Some(None));
        let set: Patch = serde_json::from_str(r#"{"school_id":7}"#).unwrap();
        assert_eq!(set.school_id, Some(Some(7)));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Ana  ").unwrap(), "Ana");
        assert!(validate_name("A").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert!(validate_name(&"ñ".repeat(100)).is_ok());
    }

    #[test]
    fn emails() {
        assert_eq!(validate_email(" Ana@Cemse.org ").unwrap(), "ana@cemse.org");
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@cemse.org").is_err());
        assert!(validate_email("ana@localhost").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("longenough", "longenough").is_ok());
        assert!(validate_password("short", "short").is_err());
        assert!(validate_password("longenough", "different1").is_err());
    }

    #[test]
    fn school_codes() {
        assert_eq!(validate_school_code("uen-01").unwrap(), "UEN-01");
        assert!(validate_school_code("A").is_err());
        assert!(validate_school_code("UE N").is_err());
        assert!(validate_school_code(&"A".repeat(21)).is_err());
    }
}
