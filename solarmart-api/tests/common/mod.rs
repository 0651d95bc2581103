//! Shared setup for API integration tests
//!
//! Tests run against the database named by `DATABASE_URL`, with the OTP
//! store kept in memory and the mailer and WhatsApp sender replaced by
//! recording implementations so their output can be inspected.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use solarmart_api::{
    app::{build_router, AppState},
    config::Config,
};
use solarmart_shared::{
    auth::{
        jwt::{create_token, Claims, TokenType},
        password::hash_password,
    },
    models::{
        company::{Company, CompanyData},
        profile::{Profile, UserRole},
        user::{CreateUser, User},
    },
    notify::{email::LogMailer, whatsapp::LogSender},
    otp::memory::InMemoryOtpStore,
};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const TEST_PASSWORD: &str = "Sunlit-Rooftop-42";

/// A user with a profile and an access token
#[derive(Debug, Clone)]
pub struct Account {
    pub user: User,
    pub profile_id: i64,
    pub role: UserRole,
    pub token: String,
}

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub mailer: Arc<LogMailer>,
    pub messenger: Arc<LogSender>,
    created_users: Mutex<Vec<i64>>,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost:5432/solarmart_test".to_string());

        let mut config = Config::new(url, TEST_JWT_SECRET);
        config.api.media_root = std::env::temp_dir().join(format!("solarmart-media-{}", Uuid::new_v4()));

        let db = PgPool::connect(&config.database.url).await?;

        // Path is relative to this crate's Cargo.toml
        sqlx::migrate!("../migrations").run(&db).await?;

        let mailer = Arc::new(LogMailer::new());
        let messenger = Arc::new(LogSender::new());

        let state = AppState::new(
            db.clone(),
            config.clone(),
            Arc::new(InMemoryOtpStore::new()),
            mailer.clone(),
            messenger.clone(),
        );

        Ok(Self {
            db,
            app: build_router(state),
            config,
            mailer,
            messenger,
            created_users: Mutex::new(Vec::new()),
        })
    }

    /// Creates an active account with [`TEST_PASSWORD`] and the given role
    pub async fn account(&self, role: UserRole) -> anyhow::Result<Account> {
        let suffix = Uuid::new_v4().simple().to_string();

        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("{}-{}@example.com", role, &suffix[..12]),
                full_name: format!("Test {}", role),
                phone_number: "03001234567".to_string(),
                username: None,
                password_hash: hash_password(TEST_PASSWORD)?,
                is_staff: false,
                is_superuser: false,
            },
        )
        .await?;
        self.created_users.lock().unwrap().push(user.id);

        let profile = Profile::create(&self.db, user.id, role).await?;

        let token = create_token(&Claims::new(user.id, Some(role), TokenType::Access), TEST_JWT_SECRET)?;

        Ok(Account {
            user,
            profile_id: profile.id,
            role,
            token,
        })
    }

    /// Seller account whose company is in `city`
    pub async fn seller_in(&self, city: &str) -> anyhow::Result<Account> {
        let seller = self.account(UserRole::Seller).await?;

        Company::upsert_for_owner(
            &self.db,
            seller.profile_id,
            CompanyData {
                name: format!("Company {}", Uuid::new_v4()),
                phone_number: "0421234567".to_string(),
                description: String::new(),
                city: city.to_string(),
            },
        )
        .await?;

        Ok(seller)
    }

    /// Sends a JSON request and returns the status with the parsed body
    ///
    /// Empty bodies parse as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Posts a `multipart/form-data` image upload
    ///
    /// The file goes in the `image` part under `file_name` with the given
    /// declared content type.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        is_display_image: bool,
    ) -> (StatusCode, Value) {
        let boundary = format!("solarmart-{}", Uuid::new_v4().simple());

        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"is_display_image\"\r\n\r\n{flag}\r\n\
                 --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{name}\"\r\n\
                 Content-Type: {ct}\r\n\r\n",
                b = boundary,
                flag = is_display_image,
                name = file_name,
                ct = content_type,
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Deletes every account created through this context
    ///
    /// Profiles, companies and listings cascade with their users.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        let ids: Vec<i64> = self.created_users.lock().unwrap().drain(..).collect();

        for id in ids {
            User::delete(&self.db, id).await?;
        }

        let _ = tokio::fs::remove_dir_all(&self.config.api.media_root).await;
        Ok(())
    }
}

/// Minimal listing body accepted by `POST /api/listings/solar-solutions`
pub fn solution_body(size: i32) -> Value {
    serde_json::json!({
        "size": size,
        "price": "850000.00",
        "solution_type": "Hybrid",
        "seller_note": "Includes installation",
    })
}
