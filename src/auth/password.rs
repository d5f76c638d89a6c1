/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password strength validation.

use bcrypt::{hash, verify, DEFAULT_COST};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Why a password could not be hashed or verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Every strength requirement the password failed, one reason each.
    Policy(Vec<String>),
    /// Bcrypt itself failed.
    Hash(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Policy(reasons) => write!(f, "{}", reasons.join(" ")),
            PasswordError::Hash(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Hash a password using bcrypt
///
/// # Arguments
/// * `password` - Plain text password to hash
///
/// # Errors
/// Returns error if:
/// - Password fails the strength policy (all violated requirements reported)
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| PasswordError::Hash(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Arguments
/// * `password` - Plain text password to verify
/// * `hash` - Bcrypt hash to verify against
///
/// # Errors
/// Returns error if verification fails
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    verify(password, hash)
        .map_err(|e| PasswordError::Hash(format!("Password verification failed: {}", e)))
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
/// - At least one non-alphanumeric character
///
/// Violations are collected rather than short-circuited so the caller sees
/// every unmet requirement at once.
fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let mut reasons = Vec::new();

    if password.len() < MIN_PASSWORD_LENGTH {
        reasons.push(format!(
            "Passwords must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    // bcrypt limitation and DoS prevention
    if password.len() > MAX_PASSWORD_LENGTH {
        reasons.push(format!(
            "Passwords must be at most {} characters.",
            MAX_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        reasons.push("Passwords must have at least one digit ('0'-'9').".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        reasons.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        reasons.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
    }

    if password.chars().all(|c| c.is_alphanumeric()) {
        reasons.push("Passwords must have at least one non alphanumeric character.".to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(PasswordError::Policy(reasons))
    }
}
