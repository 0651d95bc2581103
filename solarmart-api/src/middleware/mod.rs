/// Middleware modules for the API server
///
/// Bearer-token authentication lives in `app::jwt_auth_layer` on top of
/// `solarmart_shared::auth::middleware`.

pub mod security;
