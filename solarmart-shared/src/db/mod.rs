//! PostgreSQL access
//!
//! [`pool`] builds the shared `PgPool`, [`migrations`] applies the embedded
//! schema from `migrations/` at startup. Row types and their queries live in
//! [`crate::models`].

pub mod migrations;
pub mod pool;
