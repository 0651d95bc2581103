/// Listing image uploads
///
/// Images arrive as `multipart/form-data` with an `image` file part and an
/// optional `is_display_image` text part. Files are stored under
/// `{MEDIA_ROOT}/solution_images/` and served from `/media`.

use super::{solutions::load_owned, ImageView};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use image::ImageFormat;
use solarmart_shared::{auth::middleware::AuthContext, models::media::SolutionMedia};
use std::path::Path as FsPath;
use tracing::{info, warn};
use uuid::Uuid;

pub const IMAGE_DIR: &str = "solution_images";

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Stored extension for an upload, decided by its leading bytes
///
/// Only raster formats browsers render inertly are accepted; the client's
/// file name and declared content type play no part.
fn detected_extension(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

/// Removes a stored file, logging instead of failing
pub async fn remove_stored_file(media_root: &FsPath, relative: &str) {
    let path = media_root.join(relative);

    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove media file");
    }
}

/// Attaches an image to a listing
///
/// Only the owning seller or an admin may upload. Anything that is not a
/// JPEG, PNG, GIF or WebP image is rejected with 400.
pub async fn upload_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(solution_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ImageView>)> {
    load_owned(&state, &auth, solution_id).await?;

    let mut upload: Option<Bytes> = None;
    let mut is_display_image = false;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("image") => {
                upload = Some(field.bytes().await?);
            }
            Some("is_display_image") => {
                is_display_image = parse_flag(&field.text().await?);
            }
            _ => {}
        }
    }

    let data = upload.ok_or_else(|| ApiError::invalid("image", "No file was submitted."))?;

    if data.is_empty() {
        return Err(ApiError::invalid("image", "The submitted file is empty."));
    }
    let ext = detected_extension(&data).ok_or_else(|| ApiError::invalid("image", INVALID_IMAGE))?;

    let relative = format!("{}/{}.{}", IMAGE_DIR, Uuid::new_v4(), ext);
    let path = state.config.api.media_root.join(&relative);

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to create media directory: {}", e)))?;
    }
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to store upload: {}", e)))?;

    let media = match SolutionMedia::create(&state.db, solution_id, &relative, is_display_image).await {
        Ok(media) => media,
        Err(e) => {
            remove_stored_file(&state.config.api.media_root, &relative).await;
            return Err(e.into());
        }
    };

    info!(
        solution_id,
        media_id = media.id,
        bytes = data.len(),
        is_display_image,
        "Listing image uploaded"
    );

    Ok((StatusCode::CREATED, Json(media.into())))
}

pub async fn delete_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((solution_id, media_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    load_owned(&state, &auth, solution_id).await?;

    let media = SolutionMedia::find(&state.db, solution_id, media_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    SolutionMedia::delete(&state.db, media.id).await?;

    if let Some(image) = media.image.as_deref() {
        remove_stored_file(&state.config.api.media_root, image).await;
    }

    info!(solution_id, media_id, "Listing image deleted");
    Ok(StatusCode::NO_CONTENT)
}
