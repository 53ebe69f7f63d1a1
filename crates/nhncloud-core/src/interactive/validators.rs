//! Field validators for database instance parameters.
//!
//! All validators are pure and return a `ValidationError` naming the rule
//! that was violated.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::error::NhnError;

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ValidationError> for NhnError {
    fn from(e: ValidationError) -> Self {
        NhnError::Validation(e.0)
    }
}

pub type ValidationResult = std::result::Result<(), ValidationError>;

fn instance_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("instance name pattern is valid")
    })
}

/// 4-50 characters, starts with a letter, then letters, digits or hyphens.
pub fn validate_instance_name(name: &str) -> ValidationResult {
    let len = name.chars().count();
    if !(4..=50).contains(&len) {
        return Err(ValidationError::new(
            "instance name must be between 4 and 50 characters",
        ));
    }
    if !instance_name_pattern().is_match(name) {
        return Err(ValidationError::new(
            "instance name must start with a letter and contain only letters, digits and hyphens",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult {
    if password.chars().count() < 8 {
        return Err(ValidationError::new(
            "password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "password must contain an uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new(
            "password must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("password must contain a digit"));
    }
    Ok(())
}

pub fn validate_port(port: i64) -> ValidationResult {
    if !(1024..=65535).contains(&port) {
        return Err(ValidationError::new(
            "port must be between 1024 and 65535",
        ));
    }
    Ok(())
}

/// MySQL / MariaDB account name.
pub fn validate_username(username: &str) -> ValidationResult {
    let len = username.chars().count();
    if !(2..=32).contains(&len) {
        return Err(ValidationError::new(
            "username must be between 2 and 32 characters",
        ));
    }
    if username.eq_ignore_ascii_case("root") {
        return Err(ValidationError::new("username 'root' is reserved"));
    }
    Ok(())
}

/// Storage size in GB.
pub fn validate_storage_size(size: i64) -> ValidationResult {
    if !(20..=6000).contains(&size) {
        return Err(ValidationError::new(
            "storage size must be between 20 and 6000 GB",
        ));
    }
    if size % 10 != 0 {
        return Err(ValidationError::new(
            "storage size must be a multiple of 10 GB",
        ));
    }
    Ok(())
}

/// Backup retention period in days.
pub fn validate_backup_retention(days: i64) -> ValidationResult {
    if !(0..=35).contains(&days) {
        return Err(ValidationError::new(
            "backup retention must be between 0 and 35 days",
        ));
    }
    Ok(())
}

/// `HH:MM`, 24-hour clock.
pub fn validate_time_of_day(value: &str) -> ValidationResult {
    let invalid = || ValidationError::new("time must be in HH:MM format");

    let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
    if hour.len() != 2
        || minute.len() != 2
        || !hour.chars().chain(minute.chars()).all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    if hour > 23 {
        return Err(ValidationError::new("hour must be between 00 and 23"));
    }
    if minute > 59 {
        return Err(ValidationError::new("minute must be between 00 and 59"));
    }
    Ok(())
}

pub fn validate_postgres_username(username: &str) -> ValidationResult {
    let len = username.chars().count();
    if !(1..=63).contains(&len) {
        return Err(ValidationError::new(
            "username must be between 1 and 63 characters",
        ));
    }
    if username.to_ascii_lowercase().starts_with("pg_") {
        return Err(ValidationError::new(
            "username must not start with 'pg_'",
        ));
    }
    if ["root", "admin"]
        .iter()
        .any(|reserved| username.eq_ignore_ascii_case(reserved))
    {
        return Err(ValidationError::new(format!(
            "username '{}' is reserved",
            username
        )));
    }
    Ok(())
}

pub fn validate_database_name(name: &str) -> ValidationResult {
    let len = name.chars().count();
    if !(1..=63).contains(&len) {
        return Err(ValidationError::new(
            "database name must be between 1 and 63 characters",
        ));
    }
    if name.to_ascii_lowercase().starts_with("template") {
        return Err(ValidationError::new(
            "database name must not start with 'template'",
        ));
    }
    Ok(())
}
