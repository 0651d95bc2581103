/// User profiles and roles
///
/// Every marketplace participant has exactly one profile, which fixes their
/// role. Listings, companies, price lists and subscription passes all belong
/// to a profile rather than to the user row directly.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'seller', 'buyer');
///
/// CREATE TABLE user_profiles (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     role user_role NOT NULL,
///     created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use std::str::FromStr;

use super::company::Company;

/// Marketplace role attached to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Seller,
    Buyer,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Seller, UserRole::Buyer];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Seller => "seller",
            UserRole::Buyer => "buyer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role. Available roles: admin, seller, buyer")]
pub struct InvalidRole;

impl FromStr for UserRole {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "seller" => Ok(UserRole::Seller),
            "buyer" => Ok(UserRole::Buyer),
            _ => Err(InvalidRole),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub role: UserRole,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A profile joined with its user and (for sellers) company
///
/// This is the shape every profile-facing endpoint renders.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileDetail {
    pub id: i64,
    pub role: UserRole,
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub username: Option<String>,
    pub company_id: Option<i64>,
    pub company_name: Option<String>,
    pub company_phone_number: Option<String>,
    pub company_description: Option<String>,
    pub company_city: Option<String>,
    pub created: DateTime<Utc>,
}

impl ProfileDetail {
    /// Reassembles the joined company columns
    pub fn company(&self) -> Option<Company> {
        let id = self.company_id?;

        Some(Company {
            id,
            owner_id: self.id,
            name: self.company_name.clone().unwrap_or_default(),
            phone_number: self.company_phone_number.clone().unwrap_or_default(),
            description: self.company_description.clone().unwrap_or_default(),
            city: self.company_city.clone().unwrap_or_default(),
        })
    }
}

const DETAIL_SELECT: &str = r#"
    SELECT p.id, p.role, p.created,
           u.id AS user_id, u.email, u.full_name, u.phone_number, u.username,
           c.id AS company_id, c.name AS company_name, c.phone_number AS company_phone_number,
           c.description AS company_description, c.city AS company_city
    FROM user_profiles p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN companies c ON c.owner_id = p.id
"#;

impl Profile {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        user_id: i64,
        role: UserRole,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO user_profiles (user_id, role)
            VALUES ($1, $2)
            RETURNING id, user_id, role, created, updated
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, user_id, role, created, updated FROM user_profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_user_id(
        executor: impl PgExecutor<'_>,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, user_id, role, created, updated FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn update_role(
        executor: impl PgExecutor<'_>,
        id: i64,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE user_profiles SET role = $2, updated = NOW()
            WHERE id = $1
            RETURNING id, user_id, role, created, updated
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    /// Deletes the profile together with its user account
    pub async fn delete_with_user(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = (SELECT user_id FROM user_profiles WHERE id = $1)",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn detail(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<ProfileDetail>, sqlx::Error> {
        let query = format!("{} WHERE p.id = $1", DETAIL_SELECT);

        sqlx::query_as::<_, ProfileDetail>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Pages through profiles, newest first, optionally restricted to one role
    pub async fn list_details(
        pool: &PgPool,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProfileDetail>, sqlx::Error> {
        let query = format!(
            "{} WHERE ($1::user_role IS NULL OR p.role = $1) ORDER BY p.created DESC, p.id DESC LIMIT $2 OFFSET $3",
            DETAIL_SELECT
        );

        sqlx::query_as::<_, ProfileDetail>(&query)
            .bind(role)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, role: Option<UserRole>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_profiles WHERE ($1::user_role IS NULL OR role = $1)",
        )
        .bind(role)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(" Seller ".parse::<UserRole>(), Ok(UserRole::Seller));
        assert_eq!("BUYER".parse::<UserRole>(), Ok(UserRole::Buyer));
        assert_eq!("installer".parse::<UserRole>(), Err(InvalidRole));
        assert_eq!(
            InvalidRole.to_string(),
            "Invalid role. Available roles: admin, seller, buyer"
        );
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Seller).unwrap(), "\"seller\"");
        for role in UserRole::ALL {
            assert_eq!(role.to_string().parse::<UserRole>(), Ok(role));
        }
    }

    #[test]
    fn test_profile_detail_company() {
        let mut detail = ProfileDetail {
            id: 9,
            role: UserRole::Seller,
            user_id: 4,
            email: "s@example.com".to_string(),
            full_name: "S".to_string(),
            phone_number: "1".to_string(),
            username: None,
            company_id: None,
            company_name: None,
            company_phone_number: None,
            company_description: None,
            company_city: None,
            created: Utc::now(),
        };
        assert!(detail.company().is_none());

        detail.company_id = Some(3);
        detail.company_name = Some("Sunrise Energy".to_string());
        detail.company_city = Some("Lahore".to_string());

        let company = detail.company().unwrap();
        assert_eq!(company.id, 3);
        assert_eq!(company.owner_id, 9);
        assert_eq!(company.city, "Lahore");
    }
}
