pub mod debug_ip;
pub mod health;
pub mod session_validate;
pub mod user_login;
pub mod user_me;

pub use self::debug_ip::debug_ip;
pub use self::health::health;
pub use self::session_validate::validate;
pub use self::user_login::login;
pub use self::user_me::me;

// common functions for the handlers
use chrono::{SecondsFormat, Utc};
use regex::Regex;

const MAX_FIELD_LENGTH: usize = 255;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Defense-in-depth heuristic blocklist for credential fields. The data
/// layer is parameterized anyway; this only rejects obvious probe payloads.
pub fn suspicious_input(value: &str) -> bool {
    let patterns = [
        r"(?i)('|(\\')|(;)|(--)|(/\*)|(\*/)|(\|)|(&)|(\^)|(\$)|(%))",
        r"(?i)\b(union|select|insert|update|delete|drop|create|alter|exec|execute)\b",
    ];

    patterns
        .iter()
        .any(|p| Regex::new(p).is_ok_and(|re| re.is_match(value)))
}

/// Validate the login request shape before touching the data layer.
pub fn validate_login(email: &str, password: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() {
        return Err("Email cannot be empty");
    }

    if password.is_empty() {
        return Err("Password cannot be empty");
    }

    if email.len() > MAX_FIELD_LENGTH {
        return Err("Email is too long (max 255 characters)");
    }

    if password.len() > MAX_FIELD_LENGTH {
        return Err("Password is too long (max 255 characters)");
    }

    if !valid_email(email.trim()) {
        return Err("Invalid email format");
    }

    if suspicious_input(email) || suspicious_input(password) {
        return Err("Invalid characters detected in input");
    }

    Ok(())
}

/// RFC 3339 timestamp for response envelopes.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_normal_addresses() {
        assert!(valid_email("ines@kadra.test"));
        assert!(valid_email("a.b+c@sub.domain.io"));
    }

    #[test]
    fn valid_email_rejects_malformed() {
        assert!(!valid_email("ines"));
        assert!(!valid_email("ines@kadra"));
        assert!(!valid_email("ines kadra@test.io"));
        assert!(!valid_email("@kadra.test"));
    }

    #[test]
    fn suspicious_input_catches_probe_payloads() {
        assert!(suspicious_input("' OR 1=1 --"));
        assert!(suspicious_input("admin'; DROP TABLE users"));
        assert!(suspicious_input("UNION SELECT password"));
        assert!(!suspicious_input("plain words only"));
    }

    #[test]
    fn validate_login_shape_errors() {
        assert_eq!(validate_login("", "pw"), Err("Email cannot be empty"));
        assert_eq!(
            validate_login("ines@kadra.test", ""),
            Err("Password cannot be empty")
        );
        assert_eq!(
            validate_login(&format!("{}@x.io", "a".repeat(300)), "pw"),
            Err("Email is too long (max 255 characters)")
        );
        assert_eq!(
            validate_login("ines@kadra.test", &"p".repeat(300)),
            Err("Password is too long (max 255 characters)")
        );
        assert_eq!(
            validate_login("not-an-email", "pw"),
            Err("Invalid email format")
        );
        assert!(validate_login("ines@kadra.test", "correct horse").is_ok());
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let ts = timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
    }
}
