/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the password policy
/// - [`jwt`]: access, refresh and reset tokens
/// - [`middleware`]: bearer-token authentication into an [`middleware::AuthContext`]
/// - [`authorization`]: role checks mirroring the marketplace permissions
///
/// # Example
///
/// ```no_run
/// use solarmart_shared::auth::password::{hash_password, verify_password};
/// use solarmart_shared::auth::jwt::{issue_token_pair, TokenLifetimes};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("grid-tied-inverter")?;
/// assert!(verify_password("grid-tied-inverter", &hash)?);
///
/// let tokens = issue_token_pair(1, None, "secret-key-of-at-least-32-bytes!!", TokenLifetimes::default())?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
