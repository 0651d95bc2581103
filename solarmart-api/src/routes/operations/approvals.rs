/// Listing approvals
///
/// A listing is visible to buyers once its newest approval is verified.
/// Approving through `/approve` also e-mails the seller.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageParams},
    routes::nullable,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use solarmart_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::approval::{Approval, UpdateApproval},
    notify::approval_email,
};
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct ApprovalPatch {
    pub admin_verified: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub discrepancy: Option<Option<String>>,
    pub discrepancy_resolved: Option<bool>,
    pub email_notification_sent: Option<bool>,
}

impl From<ApprovalPatch> for UpdateApproval {
    fn from(patch: ApprovalPatch) -> Self {
        Self {
            admin_verified: patch.admin_verified,
            discrepancy: patch.discrepancy,
            discrepancy_resolved: patch.discrepancy_resolved,
            email_notification_sent: patch.email_notification_sent,
        }
    }
}

/// Reads the optional `/approve` body; an empty body means no extra fields
fn parse_patch(body: &[u8]) -> ApiResult<ApprovalPatch> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApprovalPatch::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Not found.".to_string())
}

pub async fn list_approvals(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Approval>>> {
    require_admin(&auth)?;

    let count = Approval::count(&state.db).await?;
    params.check(count)?;

    let approvals = Approval::list(&state.db, params.limit(), params.offset()).await?;

    Ok(Json(Page::new(&params, count, approvals)))
}

pub async fn pending_approvals(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Approval>>> {
    require_admin(&auth)?;
    Ok(Json(Approval::pending(&state.db).await?))
}

pub async fn get_approval(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Approval>> {
    require_admin(&auth)?;

    Approval::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_approval(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(patch): Json<ApprovalPatch>,
) -> ApiResult<Json<Approval>> {
    require_admin(&auth)?;

    let approval = Approval::update(&state.db, id, patch.into())
        .await?
        .ok_or_else(not_found)?;

    info!(approval_id = id, admin_verified = approval.admin_verified, "Approval updated");
    Ok(Json(approval))
}

pub async fn delete_approval(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if !Approval::delete(&state.db, id).await? {
        return Err(not_found());
    }

    info!(approval_id = id, "Approval deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Marks the approval verified and notifies the seller
///
/// The body may be empty or carry any other approval fields; a body that
/// does not parse is a 400 and leaves the approval untouched. The e-mail is
/// sent in the background and a delivery failure only gets logged.
pub async fn approve(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Approval>> {
    require_admin(&auth)?;

    let patch = parse_patch(&body)?;
    let update = UpdateApproval {
        admin_verified: Some(true),
        email_notification_sent: Some(true),
        ..patch.into()
    };

    let approval = Approval::update(&state.db, id, update)
        .await?
        .ok_or_else(not_found)?;

    info!(approval_id = id, solution_id = approval.solution_id, approved_by = auth.user_id, "Listing approved");

    match Approval::recipient(&state.db, id).await? {
        Some(recipient) => {
            let mailer = state.mailer.clone();
            let message = approval_email(&recipient);

            tokio::spawn(async move {
                match mailer.send(&message).await {
                    Ok(()) => info!(approval_id = id, to = %message.to, "Approval e-mail sent"),
                    Err(e) => warn!(approval_id = id, error = %e, "Failed to send approval e-mail"),
                }
            });
        }
        None => warn!(approval_id = id, "Approved listing has no seller to notify"),
    }

    Ok(Json(approval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_overrides_patch_flags() {
        let patch: ApprovalPatch = serde_json::from_str(
            r#"{"admin_verified": false, "discrepancy": "Price mismatch", "email_notification_sent": false}"#,
        )
        .unwrap();

        let update = UpdateApproval {
            admin_verified: Some(true),
            email_notification_sent: Some(true),
            ..patch.into()
        };

        assert_eq!(update.admin_verified, Some(true));
        assert_eq!(update.email_notification_sent, Some(true));
        assert_eq!(update.discrepancy, Some(Some("Price mismatch".to_string())));
        assert_eq!(update.discrepancy_resolved, None);
    }

    #[test]
    fn test_parse_patch() {
        assert!(parse_patch(b"").unwrap().admin_verified.is_none());
        assert!(parse_patch(b"  \n").unwrap().discrepancy.is_none());
        assert_eq!(parse_patch(br#"{"discrepancy_resolved": true}"#).unwrap().discrepancy_resolved, Some(true));

        assert!(matches!(
            parse_patch(br#"{"discrepancy_resolved": "not-a-bool"}"#),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(parse_patch(b"{not json"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_patch_can_clear_discrepancy() {
        let patch: ApprovalPatch = serde_json::from_str(r#"{"discrepancy": null}"#).unwrap();
        let update: UpdateApproval = patch.into();
        assert_eq!(update.discrepancy, Some(None));
        assert_eq!(update.admin_verified, None);
    }
}
