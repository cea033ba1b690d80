use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field path -> message. Only the first error reported for a field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing was reported, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Codes such as `CITY_01`: at least 3 characters of letters, digits, `_` or `-`.
pub fn check_code(errors: &mut FieldErrors, field: &str, label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{} is required", label));
    } else if value.chars().count() < 3 {
        errors.add(field, format!("{} must be at least 3 characters", label));
    } else if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.add(
            field,
            format!(
                "{} can only contain letters, numbers, underscores, or hyphens",
                label
            ),
        );
    }
}

/// Display names: at least 3 characters, letters and spaces only.
pub fn check_name(errors: &mut FieldErrors, field: &str, label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{} is required", label));
    } else if value.chars().count() < 3 {
        errors.add(field, format!("{} must be at least 3 characters", label));
    } else if !value.chars().all(|c| c.is_alphabetic() || c == ' ') {
        errors.add(field, format!("{} can only contain letters and spaces", label));
    }
}

pub fn check_required(errors: &mut FieldErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} is required", label));
    }
}

pub fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if value.is_empty() {
        errors.add(field, "Email is required");
    } else if !valid {
        errors.add(field, "Invalid email address");
    }
}

/// Phone numbers: 10 to 15 digits.
pub fn check_mobile(errors: &mut FieldErrors, field: &str, value: &str) {
    let value = value.trim();
    let len = value.chars().count();
    if len < 10 {
        errors.add(field, "Mobile number must be at least 10 digits");
    } else if len > 15 {
        errors.add(field, "Mobile number is too long");
    } else if !value.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "Mobile number must contain only digits");
    }
}

pub fn check_password(errors: &mut FieldErrors, field: &str, value: &str) {
    let len = value.chars().count();
    if len < 8 {
        errors.add(field, "Password must be at least 8 characters");
    } else if len > 15 {
        errors.add(field, "Password must not be more than 15 characters");
    } else if !(value.chars().any(|c| c.is_lowercase())
        && value.chars().any(|c| c.is_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| !c.is_alphanumeric()))
    {
        errors.add(
            field,
            "Password must include uppercase, lowercase, number, and symbol",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("first"));
    }

    #[test]
    fn test_check_code() {
        let mut errors = FieldErrors::new();
        check_code(&mut errors, "a", "City ID", "BLR_01");
        check_code(&mut errors, "b", "City ID", "");
        check_code(&mut errors, "c", "City ID", "ab");
        check_code(&mut errors, "d", "City ID", "BLR 01");

        assert_eq!(errors.get("a"), None);
        assert_eq!(errors.get("b"), Some("City ID is required"));
        assert_eq!(errors.get("c"), Some("City ID must be at least 3 characters"));
        assert!(errors.get("d").unwrap().contains("letters, numbers"));
    }

    #[test]
    fn test_check_name() {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "ok", "City Name", "New Delhi");
        check_name(&mut errors, "digits", "City Name", "Sector 5");

        assert_eq!(errors.get("ok"), None);
        assert_eq!(
            errors.get("digits"),
            Some("City Name can only contain letters and spaces")
        );
    }

    #[test]
    fn test_check_email_and_mobile() {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "good", "ops@dispatch.in");
        check_email(&mut errors, "bad", "ops.dispatch.in");
        check_mobile(&mut errors, "phone", "98450");
        check_mobile(&mut errors, "phone_ok", "9845012345");

        assert_eq!(errors.get("good"), None);
        assert_eq!(errors.get("bad"), Some("Invalid email address"));
        assert_eq!(
            errors.get("phone"),
            Some("Mobile number must be at least 10 digits")
        );
        assert_eq!(errors.get("phone_ok"), None);
    }

    #[test]
    fn test_check_password() {
        let mut errors = FieldErrors::new();
        check_password(&mut errors, "weak", "password1");
        check_password(&mut errors, "strong", "Dispatch#24");

        assert!(errors.get("weak").is_some());
        assert_eq!(errors.get("strong"), None);
    }

    #[test]
    fn test_display_joins_fields() {
        let mut errors = FieldErrors::new();
        errors.add("b", "two");
        errors.add("a", "one");

        assert_eq!(errors.to_string(), "a: one; b: two");
        assert_eq!(errors.clone().into_result(()), Err(errors));
    }
}
