/// Operations endpoints
///
/// - `approvals`: admin review of listings (bearer token, admin only)
/// - `otp`: buyer phone verification over WhatsApp (public)

pub mod approvals;
pub mod otp;
