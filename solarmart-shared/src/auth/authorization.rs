/// Role-based permission checks
///
/// Staff users pass every check. Everyone else needs a profile whose role is
/// in the permission's allowed set.
///
/// | permission        | allowed roles   |
/// |-------------------|-----------------|
/// | `IsAdmin`         | admin           |
/// | `IsSeller`        | seller          |
/// | `IsBuyer`         | buyer           |
/// | `IsAdminOrSeller` | admin, seller   |
///
/// # Example
///
/// ```
/// use solarmart_shared::auth::authorization::{require, Permission};
/// use solarmart_shared::auth::middleware::AuthContext;
/// use solarmart_shared::models::profile::UserRole;
///
/// let seller = AuthContext {
///     user_id: 1,
///     profile_id: Some(2),
///     role: Some(UserRole::Seller),
///     is_staff: false,
///     email: "s@example.com".to_string(),
/// };
///
/// assert!(require(&seller, Permission::IsAdminOrSeller).is_ok());
/// assert!(require(&seller, Permission::IsAdmin).is_err());
/// ```

use super::middleware::AuthContext;
use crate::models::profile::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("You do not have permission to perform this action.")]
    InsufficientRole { required: Permission },

    /// The caller may use the endpoint but not touch this record
    #[error("You do not have permission to modify this resource.")]
    NotOwner,

    /// Endpoint needs a profile and the caller has none
    #[error("A user profile is required for this action.")]
    MissingProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    IsAdmin,
    IsSeller,
    IsBuyer,
    IsAdminOrSeller,
}

impl Permission {
    pub fn allowed_roles(&self) -> &'static [UserRole] {
        match self {
            Permission::IsAdmin => &[UserRole::Admin],
            Permission::IsSeller => &[UserRole::Seller],
            Permission::IsBuyer => &[UserRole::Buyer],
            Permission::IsAdminOrSeller => &[UserRole::Admin, UserRole::Seller],
        }
    }

    pub fn allows(&self, auth: &AuthContext) -> bool {
        auth.is_staff
            || auth
                .role
                .map_or(false, |role| self.allowed_roles().contains(&role))
    }
}

pub fn require(auth: &AuthContext, permission: Permission) -> Result<(), AuthzError> {
    if permission.allows(auth) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required: permission,
        })
    }
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require(auth, Permission::IsAdmin)
}

pub fn require_seller(auth: &AuthContext) -> Result<(), AuthzError> {
    require(auth, Permission::IsSeller)
}

pub fn require_admin_or_seller(auth: &AuthContext) -> Result<(), AuthzError> {
    require(auth, Permission::IsAdminOrSeller)
}

/// The caller's profile id, for endpoints that act on the caller's own records
pub fn require_profile(auth: &AuthContext) -> Result<i64, AuthzError> {
    auth.profile_id.ok_or(AuthzError::MissingProfile)
}

/// Allows staff, admins, and the owning profile
pub fn require_owner_or_admin(auth: &AuthContext, owner_profile_id: Option<i64>) -> Result<(), AuthzError> {
    if auth.sees_everything() {
        return Ok(());
    }

    match (auth.profile_id, owner_profile_id) {
        (Some(caller), Some(owner)) if caller == owner => Ok(()),
        _ => Err(AuthzError::NotOwner),
    }
}
