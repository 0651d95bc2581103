/// Outbound notifications
///
/// - [`email`]: transactional e-mail over SMTP (approval notices, password
///   reset links)
/// - [`whatsapp`]: WhatsApp messages through Twilio (OTP codes)
///
/// Both channels sit behind traits with a logging implementation, so a
/// development server runs without SMTP or Twilio credentials and tests can
/// capture what would have been sent.

pub mod email;
pub mod whatsapp;

use std::time::Duration;

use crate::models::approval::ApprovalRecipient;
use crate::models::solution::display_name;
use email::EmailMessage;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification configuration error: {0}")]
    Config(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The provider rejected the message or could not be reached
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

pub const APPROVAL_SUBJECT: &str = "Your Solar Solution Has Been Approved";

/// Notice sent to a seller once an admin verifies their listing
pub fn approval_email(recipient: &ApprovalRecipient) -> EmailMessage {
    EmailMessage {
        to: recipient.email.clone(),
        subject: APPROVAL_SUBJECT.to_string(),
        body: format!(
            "Hello {},\n\nCongratulations! Your solar solution \"{}\" has been approved and is now live on the platform.\n",
            recipient.full_name,
            display_name(recipient.size, recipient.solution_type),
        ),
    }
}

pub fn password_reset_email(to: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your SolarMart password".to_string(),
        body: format!(
            "We received a request to reset your password.\n\n\
             Open the link below within one hour to choose a new one:\n{}\n\n\
             If you did not ask for this, you can ignore this e-mail.\n",
            link
        ),
    }
}

pub fn otp_message(code: &str, ttl: Duration) -> String {
    let minutes = (ttl.as_secs() + 59) / 60;
    format!(
        "Your SolarMart verification code is {}. It expires in {} minute{}.",
        code,
        minutes,
        if minutes == 1 { "" } else { "s" }
    )
}
