/// Buyer phone verification
///
/// `send-otp` delivers a six digit code over WhatsApp; `confirm-otp` checks
/// it and, when a listing is named, records the buyer's interest in it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solarmart_shared::{
    models::{interaction::BuyerInteraction, solution::SolarSolution},
    notify::otp_message,
};
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(length(min = 1, max = 15, message = "Ensure this field has 1 to 15 characters."))]
    pub phone_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmOtpRequest {
    #[validate(length(min = 1, max = 15, message = "Ensure this field has 1 to 15 characters."))]
    pub phone_number: String,

    #[validate(length(min = 1, max = 6, message = "Ensure this field has no more than 6 characters."))]
    pub otp_code: String,

    #[serde(default)]
    pub solar_solution_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmOtpResponse {
    pub verified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<i64>,
}

/// Digits with an optional leading `+`
fn is_phone_number(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn check_phone(value: &str) -> ApiResult<()> {
    if is_phone_number(value) {
        Ok(())
    } else {
        Err(ApiError::invalid(
            "phone_number",
            "Enter a valid phone number: digits with an optional leading +.",
        ))
    }
}

/// Sends a verification code to a WhatsApp number
///
/// # Errors
///
/// - `429`: a code was sent to this number within the cooldown window
/// - `502`: the messaging provider rejected the message
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;
    check_phone(&req.phone_number)?;

    let code = state.otp.issue(&req.phone_number).await?;
    let body = otp_message(&code, state.otp.ttl());

    if let Err(e) = state.messenger.send(&req.phone_number, &body).await {
        warn!(phone = %req.phone_number, error = %e, "Failed to deliver OTP");

        if let Err(e) = state.otp.discard(&req.phone_number).await {
            warn!(phone = %req.phone_number, error = %e, "Failed to discard undelivered OTP");
        }

        return Err(ApiError::BadGateway("Failed to send OTP".to_string()));
    }

    info!(phone = %req.phone_number, "OTP sent");

    Ok(Json(json!({ "message": "OTP sent successfully" })))
}

/// Verifies a code and optionally records interest in a listing
pub async fn confirm_otp(
    State(state): State<AppState>,
    Json(req): Json<ConfirmOtpRequest>,
) -> ApiResult<Json<ConfirmOtpResponse>> {
    req.validate()?;
    check_phone(&req.phone_number)?;

    if let Some(solution_id) = req.solar_solution_id {
        if !SolarSolution::exists(&state.db, solution_id).await? {
            return Err(ApiError::invalid(
                "solar_solution_id",
                format!("Invalid pk \"{}\" - object does not exist.", solution_id),
            ));
        }
    }

    if !state.otp.verify(&req.phone_number, &req.otp_code).await? {
        return Err(ApiError::BadRequest("Invalid or expired OTP".to_string()));
    }

    let interaction_id = match req.solar_solution_id {
        Some(solution_id) => {
            let interaction = BuyerInteraction::create(&state.db, solution_id, &req.phone_number).await?;
            info!(
                solution_id,
                interaction_id = interaction.id,
                "Buyer interaction recorded"
            );
            Some(interaction.id)
        }
        None => None,
    };

    info!(phone = %req.phone_number, "OTP verified");

    Ok(Json(ConfirmOtpResponse {
        verified: true,
        interaction_id,
    }))
}
