/// Database models for SolarMart
///
/// Each model owns its SQL. Functions take `&PgPool` or, where they must run
/// inside a caller's transaction, any `PgExecutor` / `&mut PgConnection`.
///
/// # Models
///
/// - `user`, `profile`, `company`: accounts and seller companies
/// - `solution`, `component`, `tag`, `service`, `media`: listings
/// - `interaction`: buyer interest captured after OTP verification
/// - `approval`: admin review of listings
/// - `subscription`: plans and seller passes
/// - `price_list`: per-seller catalog prices
/// - `token_blacklist`: revoked refresh tokens

pub mod approval;
pub mod company;
pub mod component;
pub mod interaction;
pub mod media;
pub mod price_list;
pub mod profile;
pub mod service;
pub mod solution;
pub mod subscription;
pub mod tag;
pub mod token_blacklist;
pub mod user;
