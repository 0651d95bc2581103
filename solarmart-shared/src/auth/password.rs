/// Password hashing and password policy
///
/// Hashes are Argon2id in PHC string format (64 MB memory, 3 passes,
/// 4 lanes). The policy checks mirror what the marketplace has always
/// enforced on sign-up and password reset.
///
/// # Example
///
/// ```
/// use solarmart_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("sunny-rooftop-2024")?;
/// assert!(verify_password("sunny-rooftop-2024", &hash)?);
/// assert!(!verify_password("cloudy", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Attribute parts shorter than this are ignored by the similarity check
const MIN_SIMILARITY_PART: usize = 4;

/// Frequently used passwords that are always rejected
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "passw0rd", "12345", "123456", "12345678", "123456789",
    "1234567890", "qwerty", "qwerty123", "qwertyuiop", "abc123", "abcd1234", "111111",
    "000000", "iloveyou", "admin", "admin123", "administrator", "welcome", "welcome1",
    "letmein", "monkey", "dragon", "football", "baseball", "sunshine", "princess",
    "trustno1", "superman", "starwars", "master", "shadow", "whatever", "zaq12wsx",
    "1q2w3e4r", "1qaz2wsx", "asdfghjkl", "changeme", "secret", "solar123", "pakistan",
];

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id and a random 16-byte salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are rejected or
/// hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))
}

/// Verifies `password` against a stored PHC hash
///
/// Returns `Ok(false)` for a wrong password and an error only when the stored
/// hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// User attributes the password must not resemble
#[derive(Debug, Clone, Default)]
pub struct PasswordContext<'a> {
    pub email: Option<&'a str>,
    pub full_name: Option<&'a str>,
}

/// Checks a candidate password against the policy
///
/// Every failing rule contributes one message, so callers can report them
/// all at once.
///
/// # Example
///
/// ```
/// use solarmart_shared::auth::password::{validate_password, PasswordContext};
///
/// let ctx = PasswordContext { email: Some("ayesha@example.com"), full_name: Some("Ayesha Khan") };
/// assert!(validate_password("panel-install-77", &ctx).is_ok());
///
/// let errors = validate_password("12345", &ctx).unwrap_err();
/// assert_eq!(errors.len(), 3); // too short, numeric, common
/// ```
pub fn validate_password(password: &str, ctx: &PasswordContext<'_>) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.trim()) {
        errors.push("This password is too common.".to_string());
    }

    let email_local = ctx.email.and_then(|e| e.split('@').next());
    if is_too_similar(&lowered, email_local) {
        errors.push("The password is too similar to the email address.".to_string());
    }
    if is_too_similar(&lowered, ctx.full_name) {
        errors.push("The password is too similar to the full name.".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Case-insensitive containment in either direction against the attribute
/// and each of its alphanumeric parts
fn is_too_similar(lowered_password: &str, attribute: Option<&str>) -> bool {
    let Some(attribute) = attribute else {
        return false;
    };
    if lowered_password.is_empty() {
        return false;
    }

    let attribute = attribute.to_lowercase();
    std::iter::once(attribute.as_str())
        .chain(attribute.split(|c: char| !c.is_alphanumeric()))
        .filter(|part| part.chars().count() >= MIN_SIMILARITY_PART)
        .any(|part| lowered_password.contains(part) || part.contains(lowered_password))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PasswordContext<'static> {
        PasswordContext {
            email: Some("bilal.ahmed@example.com"),
            full_name: Some("Bilal Ahmed"),
        }
    }

    #[test]
    fn test_hash_password_parameters() {
        let hash = hash_password("rooftop-array").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "").is_err());

        // Parses as PHC but carries no hash, so nothing can match it
        assert!(!matches!(verify_password("password", "$argon2id$invalid"), Ok(true)));
    }

    #[test]
    fn test_policy_accepts_reasonable_password() {
        assert!(validate_password("inverter-grid-4521", &ctx()).is_ok());
        assert!(validate_password("inverter-grid-4521", &PasswordContext::default()).is_ok());
    }

    #[test]
    fn test_policy_too_short() {
        let errors = validate_password("Xy7!q", &PasswordContext::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("at least 8 characters"));
    }

    #[test]
    fn test_policy_entirely_numeric() {
        let errors = validate_password("90817263541", &PasswordContext::default()).unwrap_err();
        assert_eq!(errors, vec!["This password is entirely numeric.".to_string()]);
    }

    #[test]
    fn test_policy_reports_every_failing_rule() {
        let errors = validate_password("12345", &PasswordContext::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[2].contains("too common"));
    }

    #[test]
    fn test_policy_common_password_case_insensitive() {
        let errors = validate_password("PassWord123", &PasswordContext::default()).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("too common")));
    }

    #[test]
    fn test_policy_similar_to_email() {
        let errors = validate_password("bilal.ahmed", &PasswordContext {
            email: Some("bilal.ahmed@example.com"),
            full_name: None,
        })
        .unwrap_err();
        assert!(errors.iter().any(|e| e.contains("email address")));
    }

    #[test]
    fn test_policy_similar_to_full_name() {
        let errors = validate_password("ahmed2024!", &ctx()).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("full name")));
    }

    #[test]
    fn test_short_name_parts_are_ignored() {
        let ctx = PasswordContext {
            email: Some("al@example.com"),
            full_name: Some("Al Wu"),
        };
        assert!(validate_password("al-wu-solar-panels", &ctx).is_ok());
    }
}
