/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use solarmart_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::from_config(pool, config).await?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use solarmart_shared::{
    auth::middleware::authenticate,
    notify::{
        email::{LogMailer, Mailer, SmtpConfig, SmtpMailer},
        whatsapp::{LogSender, MessageSender, TwilioConfig, TwilioWhatsApp},
    },
    otp::{memory::InMemoryOtpStore, redis::RedisOtpStore, OtpManager, OtpStore},
    redis::RedisClient,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor; everything
/// inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub otp: OtpManager,
    pub mailer: Arc<dyn Mailer>,
    pub messenger: Arc<dyn MessageSender>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        otp_store: Arc<dyn OtpStore>,
        mailer: Arc<dyn Mailer>,
        messenger: Arc<dyn MessageSender>,
    ) -> Self {
        let otp = OtpManager::new(
            otp_store,
            Duration::from_secs(config.otp.ttl_secs),
            Duration::from_secs(config.otp.cooldown_secs),
        );

        Self {
            db,
            config: Arc::new(config),
            otp,
            mailer,
            messenger,
        }
    }

    /// Wires the OTP store, mailer and WhatsApp sender from configuration
    ///
    /// Each integration falls back to its in-process or logging
    /// implementation when not configured.
    pub async fn from_config(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let otp_store: Arc<dyn OtpStore> = match &config.redis {
            Some(redis_config) => {
                let client = RedisClient::new(redis_config.clone()).await?;
                if !client.ping().await? {
                    anyhow::bail!("Redis did not answer PING");
                }
                info!("OTP codes stored in Redis");
                Arc::new(RedisOtpStore::new(client))
            }
            None => {
                warn!("REDIS_URL not set, OTP codes are kept in process memory");
                Arc::new(InMemoryOtpStore::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.email {
            Some(email) => Arc::new(SmtpMailer::new(SmtpConfig {
                host: email.host.clone(),
                port: email.port,
                username: email.username.clone(),
                password: email.password.clone(),
                security: email.security,
                from: email.from.clone(),
                timeout_secs: email.timeout_secs,
            })?),
            None => {
                warn!("SMTP not configured, e-mails will only be logged");
                Arc::new(LogMailer::new())
            }
        };

        let messenger: Arc<dyn MessageSender> = match &config.twilio {
            Some(twilio) => Arc::new(TwilioWhatsApp::new(TwilioConfig {
                account_sid: twilio.account_sid.clone(),
                auth_token: twilio.auth_token.clone(),
                from_number: twilio.whatsapp_number.clone(),
                timeout_secs: twilio.timeout_secs,
                api_base: twilio.api_base.clone(),
            })?),
            None => {
                warn!("Twilio not configured, WhatsApp messages will only be logged");
                Arc::new(LogSender::new())
            }
        };

        Ok(Self::new(db, config, otp_store, mailer, messenger))
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /health                                   public
/// /media/*                                  public, uploaded images
/// /api/auth/*                               public
/// /api/operations/{send,confirm}-otp        public
/// /api/accounts/*                           bearer token
/// /api/listings/*                           bearer token
/// /api/operations/approvals/*               bearer token
/// /api/pricing/*                            bearer token
/// /api/pricelist/:kind[/:id]                bearer token
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/refresh-token", post(routes::auth::refresh_token))
        .route("/verify-token", post(routes::auth::verify_token))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password/:token", post(routes::auth::reset_password));

    let otp_routes = Router::new()
        .route("/operations/send-otp", post(routes::operations::otp::send_otp))
        .route("/operations/confirm-otp", post(routes::operations::otp::confirm_otp));

    let account_routes = Router::new()
        .route(
            "/profiles",
            get(routes::accounts::list_profiles).post(routes::accounts::create_profile),
        )
        .route(
            "/profiles/:id",
            get(routes::accounts::get_profile)
                .patch(routes::accounts::update_profile)
                .put(routes::accounts::update_profile)
                .delete(routes::accounts::delete_profile),
        )
        .route("/me", get(routes::accounts::me))
        .route(
            "/company",
            get(routes::accounts::get_company).put(routes::accounts::put_company),
        )
        .route("/company-names", get(routes::accounts::company_names));

    let listing_routes = Router::new()
        .route(
            "/solar-solutions",
            get(routes::listings::solutions::list_solutions)
                .post(routes::listings::solutions::create_solution),
        )
        .route(
            "/solar-solutions/:id",
            get(routes::listings::solutions::get_solution)
                .patch(routes::listings::solutions::update_solution)
                .put(routes::listings::solutions::update_solution)
                .delete(routes::listings::solutions::delete_solution),
        )
        .route(
            "/solar-solutions/:id/media",
            post(routes::listings::media::upload_media)
                .layer(DefaultBodyLimit::max(state.config.api.max_upload_bytes)),
        )
        .route(
            "/solar-solutions/:id/media/:media_id",
            axum::routing::delete(routes::listings::media::delete_media),
        )
        .route(
            "/components",
            get(routes::listings::catalog::list_components)
                .post(routes::listings::catalog::create_component),
        )
        .route(
            "/tags",
            get(routes::listings::catalog::list_tags).post(routes::listings::catalog::create_tag),
        )
        .route("/seller-report", get(routes::listings::report::seller_report));

    let approval_routes = Router::new()
        .route("/approvals", get(routes::operations::approvals::list_approvals))
        .route(
            "/approvals/pending",
            get(routes::operations::approvals::pending_approvals),
        )
        .route(
            "/approvals/:id",
            get(routes::operations::approvals::get_approval)
                .patch(routes::operations::approvals::update_approval)
                .delete(routes::operations::approvals::delete_approval),
        )
        .route(
            "/approvals/:id/approve",
            post(routes::operations::approvals::approve),
        );

    let pricing_routes = Router::new()
        .route(
            "/subscription-plan",
            get(routes::pricing::list_plans).post(routes::pricing::create_plan),
        )
        .route(
            "/subscription-passes",
            get(routes::pricing::list_passes).post(routes::pricing::create_pass),
        )
        .route("/subscription-passes/:id", get(routes::pricing::get_pass));

    let pricelist_routes = Router::new()
        .route(
            "/:kind",
            get(routes::pricelist::list_items).post(routes::pricelist::create_item),
        )
        .route(
            "/:kind/:id",
            get(routes::pricelist::get_item)
                .put(routes::pricelist::replace_item)
                .patch(routes::pricelist::patch_item)
                .delete(routes::pricelist::delete_item),
        );

    // Everything below requires a bearer access token
    let protected_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/listings", listing_routes)
        .nest("/operations", approval_routes)
        .nest("/pricing", pricing_routes)
        .nest("/pricelist", pricelist_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(otp_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    let media = ServeDir::new(&state.config.api.media_root);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .nest_service("/media", media)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the bearer token, loads the caller and injects [`AuthContext`]
/// into request extensions.
///
/// [`AuthContext`]: solarmart_shared::auth::middleware::AuthContext
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let auth_context = authenticate(&state.db, state.jwt_secret(), header).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
