/// API route handlers, one module per functional area
///
/// - `health`: liveness and database probe
/// - `auth`: login, token refresh/verify, password reset
/// - `accounts`: profiles, current user, seller company
/// - `listings`: solar solutions, components, tags, media, seller report
/// - `operations`: approvals and buyer OTP verification
/// - `pricing`: subscription plans and passes
/// - `pricelist`: per-seller price-list items

pub mod accounts;
pub mod auth;
pub mod health;
pub mod listings;
pub mod operations;
pub mod pricelist;
pub mod pricing;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that distinguishes "absent" from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: absent stays
/// `None`, `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
