/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present) into a typed [`Config`].
///
/// # Environment Variables
///
/// | variable | default |
/// |----------|---------|
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | 10 |
/// | `API_HOST` / `API_PORT` | `0.0.0.0` / `8080` |
/// | `CORS_ORIGINS` | `*` (comma separated) |
/// | `PRODUCTION` | false (enables HSTS) |
/// | `PUBLIC_BASE_URL` | `http://localhost:3000` |
/// | `MEDIA_ROOT` | `media` |
/// | `MAX_UPLOAD_BYTES` | 10 MiB |
/// | `JWT_SECRET` | required, at least 32 characters |
/// | `JWT_ACCESS_TTL_MINUTES` / `JWT_REFRESH_TTL_DAYS` | 1200 / 7 |
/// | `JWT_ROTATE_REFRESH_TOKENS` / `JWT_BLACKLIST_AFTER_ROTATION` | true / true |
/// | `REDIS_URL` | unset (in-process OTP store) |
/// | `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_SECURITY`, `EMAIL_FROM` | unset (e-mails are logged) |
/// | `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_WHATSAPP_NUMBER` | unset (messages are logged) |
/// | `OTP_TTL_SECONDS` / `OTP_COOLDOWN_SECONDS` | 300 / 60 |
/// | `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD` | unset |
///
/// # Example
///
/// ```no_run
/// use solarmart_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use solarmart_shared::notify::email::SmtpSecurity;
use solarmart_shared::notify::whatsapp::TWILIO_API_BASE;
use solarmart_shared::redis::RedisConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// None runs the OTP store in process
    pub redis: Option<RedisConfig>,

    /// None logs e-mails instead of sending them
    pub email: Option<EmailConfig>,

    /// None logs WhatsApp messages instead of sending them
    pub twilio: Option<TwilioConfig>,

    pub otp: OtpConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Enables HSTS
    pub production: bool,

    /// Front-end origin used to build links in e-mails
    pub public_base_url: String,

    /// Directory uploaded images are written to and served from
    pub media_root: PathBuf,

    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing key
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,

    /// Issue a new refresh token on every refresh
    pub rotate_refresh_tokens: bool,

    /// Blacklist the consumed refresh token after rotating it
    pub blacklist_after_rotation: bool,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
    pub from: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub whatsapp_number: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub ttl_secs: u64,
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_full_name: String,
    pub admin_phone_number: String,
}

/// Reads a variable, treating an empty value as unset
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

fn bool_env(key: &str, default: bool) -> anyhow::Result<bool> {
    match optional_env(key) {
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| anyhow::anyhow!("{} must be a boolean, got {:?}", key, raw)),
        None => Ok(default),
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Defaults for everything except the two required settings
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
                public_base_url: "http://localhost:3000".to_string(),
                media_root: PathBuf::from("media"),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                access_ttl_minutes: 20 * 60,
                refresh_ttl_days: 7,
                rotate_refresh_tokens: true,
                blacklist_after_rotation: true,
            },
            redis: None,
            email: None,
            twilio: None,
            otp: OtpConfig {
                ttl_secs: 300,
                cooldown_secs: 60,
            },
            bootstrap: BootstrapConfig {
                admin_full_name: "Administrator".to_string(),
                admin_phone_number: String::new(),
                ..Default::default()
            },
        }
    }

    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` or `JWT_SECRET` is missing, the
    /// secret is shorter than 32 characters, or any variable has an
    /// unparseable value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = optional_env("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = optional_env("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let mut config = Self::new(database_url, jwt_secret);

        config.api.host = optional_env("API_HOST").unwrap_or(config.api.host);
        config.api.port = parse_env("API_PORT", config.api.port)?;
        if let Some(origins) = optional_env("CORS_ORIGINS") {
            config.api.cors_origins = parse_list(&origins);
        }
        config.api.production = bool_env("PRODUCTION", false)?;
        if let Some(url) = optional_env("PUBLIC_BASE_URL") {
            config.api.public_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(root) = optional_env("MEDIA_ROOT") {
            config.api.media_root = PathBuf::from(root);
        }
        config.api.max_upload_bytes = parse_env("MAX_UPLOAD_BYTES", config.api.max_upload_bytes)?;

        config.database.max_connections =
            parse_env("DATABASE_MAX_CONNECTIONS", config.database.max_connections)?;

        config.jwt.access_ttl_minutes = parse_env("JWT_ACCESS_TTL_MINUTES", config.jwt.access_ttl_minutes)?;
        config.jwt.refresh_ttl_days = parse_env("JWT_REFRESH_TTL_DAYS", config.jwt.refresh_ttl_days)?;
        config.jwt.rotate_refresh_tokens = bool_env("JWT_ROTATE_REFRESH_TOKENS", true)?;
        config.jwt.blacklist_after_rotation = bool_env("JWT_BLACKLIST_AFTER_ROTATION", true)?;

        config.redis = RedisConfig::from_env();

        if let Some(host) = optional_env("SMTP_HOST") {
            let security = match optional_env("SMTP_SECURITY") {
                Some(raw) => SmtpSecurity::parse(&raw).ok_or_else(|| {
                    anyhow::anyhow!("SMTP_SECURITY must be one of starttls, tls, none")
                })?,
                None => SmtpSecurity::StartTls,
            };
            let default_port = match security {
                SmtpSecurity::Tls => 465,
                SmtpSecurity::StartTls => 587,
                SmtpSecurity::None => 25,
            };

            config.email = Some(EmailConfig {
                host,
                port: parse_env("SMTP_PORT", default_port)?,
                username: optional_env("SMTP_USERNAME"),
                password: optional_env("SMTP_PASSWORD"),
                security,
                from: optional_env("EMAIL_FROM")
                    .ok_or_else(|| anyhow::anyhow!("EMAIL_FROM is required when SMTP_HOST is set"))?,
                timeout_secs: parse_env("SMTP_TIMEOUT_SECONDS", 10)?,
            });
        }

        if let (Some(account_sid), Some(auth_token), Some(whatsapp_number)) = (
            optional_env("TWILIO_ACCOUNT_SID"),
            optional_env("TWILIO_AUTH_TOKEN"),
            optional_env("TWILIO_WHATSAPP_NUMBER"),
        ) {
            config.twilio = Some(TwilioConfig {
                account_sid,
                auth_token,
                whatsapp_number,
                api_base: optional_env("TWILIO_API_BASE").unwrap_or_else(|| TWILIO_API_BASE.to_string()),
                timeout_secs: parse_env("TWILIO_TIMEOUT_SECONDS", 10)?,
            });
        }

        config.otp.ttl_secs = parse_env("OTP_TTL_SECONDS", config.otp.ttl_secs)?;
        config.otp.cooldown_secs = parse_env("OTP_COOLDOWN_SECONDS", config.otp.cooldown_secs)?;

        config.bootstrap.admin_email = optional_env("BOOTSTRAP_ADMIN_EMAIL");
        config.bootstrap.admin_password = optional_env("BOOTSTRAP_ADMIN_PASSWORD");
        if let Some(name) = optional_env("BOOTSTRAP_ADMIN_FULL_NAME") {
            config.bootstrap.admin_full_name = name;
        }
        if let Some(phone) = optional_env("BOOTSTRAP_ADMIN_PHONE") {
            config.bootstrap.admin_phone_number = phone;
        }

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn token_lifetimes(&self) -> solarmart_shared::auth::jwt::TokenLifetimes {
        solarmart_shared::auth::jwt::TokenLifetimes {
            access: chrono::Duration::minutes(self.jwt.access_ttl_minutes),
            refresh: chrono::Duration::days(self.jwt.refresh_ttl_days),
        }
    }
}
