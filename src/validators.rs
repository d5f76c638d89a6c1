/// Input validators module - protects against malformed accounts and attacks
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Account Squatting Protection: Username charset restriction
/// 3. Phishing Protection: Email validation
/// 4. SQL Injection Prevention: Query validation

use lazy_static::lazy_static;
use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;   // Minimum valid email length
const MAX_USERNAME_LENGTH: usize = 31;
const MIN_USERNAME_LENGTH: usize = 1;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // Letters, digits and underscore only
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();

    // Regex to detect potentially malicious SQL patterns
    static ref SQL_INJECTION_PATTERNS: [Regex; 4] = [
        // Union-based SQL injection
        Regex::new(r"(?i)\s+UNION\s+").unwrap(),
        // Comment-based injection
        Regex::new(r"(--|;|/\*|\*/|xp_|sp_)").unwrap(),
        // Stacked queries
        Regex::new(r"(?i);\s*(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER)").unwrap(),
        // Boolean-based injection - quotes handled with character class
        Regex::new(r#"(?i)(\bOR\b|\bAND\b)\s*(['"][0-9]*['"]|[0-9]*)\s*=\s*(['"][0-9]*['"]|[0-9]*|True|False)"#).unwrap(),
    ];
}

/// Validates an email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Detects potential phishing patterns
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }

    // Check for suspicious patterns (phishing protection)
    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email"));
    }

    // Check for SQL injection patterns in email
    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_string())
}

/// Validates a username
/// - Letters, digits and underscore only
/// - Verifies length constraints
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }

    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username", MIN_USERNAME_LENGTH));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username", MAX_USERNAME_LENGTH));
    }

    // Charset restriction also rules out control characters and whitespace
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username"));
    }

    Ok(trimmed.to_string())
}

/// Detects suspicious patterns in email addresses that might indicate phishing
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Check for extremely long local part (before @) - phishing indicator
    if let Some(at_pos) = email.find('@') {
        let local_part = &email[..at_pos];
        if local_part.len() > 64 {
            return true;
        }
    }

    // Check for multiple @ symbols
    if email.matches('@').count() != 1 {
        return true;
    }

    // Check for null bytes
    if email.contains('\0') {
        return true;
    }

    false
}

/// Checks if input contains SQL injection patterns
fn contains_sql_injection_patterns(input: &str) -> bool {
    SQL_INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    SuspiciousContent(&'static str),
    PossibleSQLInjection,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => write!(f, "{} is too short (minimum {} characters)", field, min),
            ValidationError::TooLong(field, max) => write!(f, "{} is too long (maximum {} characters)", field, max),
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => write!(f, "{} contains suspicious content", field),
            ValidationError::PossibleSQLInjection => write!(f, "input contains potentially dangerous SQL patterns"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        assert!(is_valid_email("a@b").is_err()); // Too short
    }

    #[test]
    fn test_email_is_trimmed() {
        assert_eq!(
            is_valid_email("  user@example.com  ").unwrap(),
            "user@example.com"
        );
    }

    #[test]
    fn test_sql_injection_in_email() {
        assert!(is_valid_email("user' OR '1'='1@example.com").is_err());
        assert!(is_valid_email("user; DROP TABLE@example.com").is_err());
    }

    #[test]
    fn test_valid_username() {
        assert!(is_valid_username("alice").is_ok());
        assert!(is_valid_username("Alice_99").is_ok());
        assert!(is_valid_username("_underscore_").is_ok());
    }

    #[test]
    fn test_invalid_username_charset() {
        assert!(is_valid_username("alice smith").is_err());
        assert!(is_valid_username("alice!").is_err());
        assert!(is_valid_username("al-ice").is_err());
        assert!(is_valid_username("böb").is_err());
    }

    #[test]
    fn test_username_length_limits() {
        assert!(is_valid_username("").is_err());
        assert!(is_valid_username("   ").is_err());

        let too_long = "a".repeat(MAX_USERNAME_LENGTH + 1);
        assert!(is_valid_username(&too_long).is_err());

        let at_limit = "a".repeat(MAX_USERNAME_LENGTH);
        assert!(is_valid_username(&at_limit).is_ok());
    }

    #[test]
    fn test_username_rejects_control_characters() {
        assert!(is_valid_username("name\0null").is_err());
        assert!(is_valid_username("name\nnewline").is_err());
    }
}
