/// JWT issuing and validation
///
/// Tokens are HS256-signed and carry the user id, the profile role at the
/// time of issue, a unique `jti` (used by the refresh-token blacklist) and
/// the token type.
///
/// # Token Types
///
/// - **Access**: sent as `Authorization: Bearer`, default lifetime 20 hours
/// - **Refresh**: exchanged for a new access token, default lifetime 7 days
/// - **Reset**: embedded in password-reset links, lifetime 1 hour
///
/// # Example
///
/// ```
/// use solarmart_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use solarmart_shared::models::profile::UserRole;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(42, Some(UserRole::Seller), TokenType::Access);
/// let token = create_token(&claims, "your-secret-key-at-least-32-bytes")?;
///
/// let validated = validate_token(&token, "your-secret-key-at-least-32-bytes")?;
/// assert_eq!(validated.sub, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::UserRole;

/// Issuer written into and required from every token
pub const ISSUER: &str = "solarmart";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    /// Token is valid but of the wrong type for this use
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    /// Single-purpose token for the password-reset link
    Reset,
}

impl TokenType {
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(20),
            TokenType::Refresh => Duration::days(7),
            TokenType::Reset => Duration::hours(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::Reset => "reset",
        }
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`, `jti`) plus the
/// profile role and token type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: i64,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    /// Unique token id
    pub jti: Uuid,

    /// Profile role at issue time (None for users without a profile)
    pub role: Option<UserRole>,

    pub token_type: TokenType,

    /// Fingerprint of the password hash a reset token was issued against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
}

/// Short digest of a stored password hash
///
/// Reset tokens carry it so that any change of password invalidates them.
pub fn password_fingerprint(password_hash: &str) -> String {
    use sha2::{Digest, Sha256};

    hex::encode(&Sha256::digest(password_hash.as_bytes())[..12])
}

impl Claims {
    /// Creates claims with the default lifetime for `token_type`
    pub fn new(user_id: i64, role: Option<UserRole>, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, role, token_type, token_type.default_expiration())
    }

    /// Creates claims expiring `expires_in` from now
    ///
    /// # Example
    ///
    /// ```
    /// use solarmart_shared::auth::jwt::{Claims, TokenType};
    /// use chrono::Duration;
    ///
    /// let claims = Claims::with_expiration(7, None, TokenType::Reset, Duration::minutes(30));
    /// assert!(!claims.is_expired());
    /// ```
    pub fn with_expiration(
        user_id: i64,
        role: Option<UserRole>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            role,
            token_type,
            pwd: None,
        }
    }

    /// Reset-token claims bound to the user's current password hash
    pub fn for_password_reset(user_id: i64, password_hash: &str) -> Self {
        Self {
            pwd: Some(password_fingerprint(password_hash)),
            ..Self::new(user_id, None, TokenType::Reset)
        }
    }

    /// True when the token was issued against `password_hash`
    pub fn matches_password(&self, password_hash: &str) -> bool {
        self.pwd.as_deref() == Some(password_fingerprint(password_hash).as_str())
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Expiry as a timestamp, used when blacklisting the token
    pub fn expires_at(&self) -> chrono::DateTime<Utc> {
        chrono::DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Lifetimes applied when issuing a login token pair
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: TokenType::Access.default_expiration(),
            refresh: TokenType::Refresh.default_expiration(),
        }
    }
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs `claims` with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a fresh access/refresh pair for a user
pub fn issue_token_pair(
    user_id: i64,
    role: Option<UserRole>,
    secret: &str,
    lifetimes: TokenLifetimes,
) -> Result<TokenPair, JwtError> {
    let access = Claims::with_expiration(user_id, role, TokenType::Access, lifetimes.access);
    let refresh = Claims::with_expiration(user_id, role, TokenType::Refresh, lifetimes.refresh);

    Ok(TokenPair {
        access: create_token(&access, secret)?,
        refresh: create_token(&refresh, secret)?,
    })
}

/// Validates signature, expiry, `nbf` and issuer, returning the claims
///
/// Accepts any token type; use the typed wrappers below when the type matters.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

pub fn validate_reset_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Reset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(20));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(7));
        assert_eq!(TokenType::Reset.default_expiration(), Duration::hours(1));
    }

    #[test]
    fn test_reset_claims_bound_to_password() {
        let claims = Claims::for_password_reset(9, "$argon2id$v=19$old");
        let token = create_token(&claims, SECRET).unwrap();
        let validated = validate_reset_token(&token, SECRET).unwrap();

        assert!(validated.matches_password("$argon2id$v=19$old"));
        assert!(!validated.matches_password("$argon2id$v=19$new"));

        // Tokens issued without a fingerprint never match
        assert!(!Claims::new(9, None, TokenType::Reset).matches_password("$argon2id$v=19$old"));
    }

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(5, Some(UserRole::Buyer), TokenType::Access);

        assert_eq!(claims.sub, 5);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.role, Some(UserRole::Buyer));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_each_token_gets_unique_jti() {
        let a = Claims::new(1, None, TokenType::Refresh);
        let b = Claims::new(1, None, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = Claims::new(11, Some(UserRole::Admin), TokenType::Access);
        let token = create_token(&claims, SECRET).unwrap();

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.sub, 11);
        assert_eq!(validated.role, Some(UserRole::Admin));
        assert_eq!(validated.jti, claims.jti);
        assert_eq!(validated.token_type, TokenType::Access);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = Claims::new(1, None, TokenType::Access);
        let token = create_token(&claims, SECRET).unwrap();

        assert!(validate_token(&token, "another-secret-key-of-enough-length").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let claims =
            Claims::with_expiration(1, None, TokenType::Access, Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_typed_validation_rejects_other_types() {
        let refresh = create_token(&Claims::new(1, None, TokenType::Refresh), SECRET).unwrap();
        let access = create_token(&Claims::new(1, None, TokenType::Access), SECRET).unwrap();
        let reset = create_token(&Claims::new(1, None, TokenType::Reset), SECRET).unwrap();

        assert!(validate_refresh_token(&refresh, SECRET).is_ok());
        assert!(validate_access_token(&access, SECRET).is_ok());
        assert!(validate_reset_token(&reset, SECRET).is_ok());

        assert!(matches!(
            validate_access_token(&refresh, SECRET),
            Err(JwtError::WrongType { expected: "access", actual: "refresh" })
        ));
        assert!(validate_refresh_token(&access, SECRET).is_err());
        assert!(validate_reset_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_issue_token_pair() {
        let pair =
            issue_token_pair(3, Some(UserRole::Seller), SECRET, TokenLifetimes::default()).unwrap();

        let access = validate_access_token(&pair.access, SECRET).unwrap();
        let refresh = validate_refresh_token(&pair.refresh, SECRET).unwrap();
        assert_eq!(access.sub, 3);
        assert_eq!(refresh.sub, 3);
        assert_ne!(access.jti, refresh.jti);
        assert!(refresh.exp > access.exp);
    }
}
