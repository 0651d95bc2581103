/// First-run administrator
///
/// When `BOOTSTRAP_ADMIN_EMAIL` and `BOOTSTRAP_ADMIN_PASSWORD` are set and no
/// user with that e-mail exists, a staff superuser with an admin profile is
/// created. Existing accounts are never modified.

use solarmart_shared::{
    auth::password::hash_password,
    models::{
        profile::{Profile, UserRole},
        user::{CreateUser, User},
    },
};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::BootstrapConfig;

/// Returns true when an administrator was created
pub async fn ensure_admin(pool: &PgPool, config: &BootstrapConfig) -> anyhow::Result<bool> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        debug!("No bootstrap administrator configured");
        return Ok(false);
    };

    if User::find_by_email(pool, email).await?.is_some() {
        debug!(email = %email, "Bootstrap administrator already exists");
        return Ok(false);
    }

    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: email.clone(),
            full_name: config.admin_full_name.clone(),
            phone_number: config.admin_phone_number.clone(),
            username: None,
            password_hash,
            is_staff: true,
            is_superuser: true,
        },
    )
    .await?;

    Profile::create(&mut *tx, user.id, UserRole::Admin).await?;

    tx.commit().await?;

    info!(user_id = user.id, email = %user.email, "Created bootstrap administrator");
    Ok(true)
}
