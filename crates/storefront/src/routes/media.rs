//! Media delivery handlers.
//!
//! Images are served whole. Videos honour a single `bytes=` range so
//! players can seek.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use emporium_core::MediaId;

use crate::db::StoredMedia;
use crate::error::AppError;
use crate::services::media::{ByteRange, MediaService, parse_range};
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=86400";

async fn fetch(state: &AppState, raw_id: &str, prefix: &str) -> Result<StoredMedia, AppError> {
    let not_found = || AppError::NotFound("media".to_string());
    let id: MediaId = raw_id.parse().map_err(|_| not_found())?;

    let media = MediaService::new(state.stores().media.as_ref())
        .fetch(id)
        .await?;
    if !media.content_type.starts_with(prefix) {
        return Err(not_found());
    }
    Ok(media)
}

fn content_type(media: &StoredMedia) -> HeaderValue {
    HeaderValue::from_str(&media.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// Serve a product image.
#[instrument(skip(state))]
pub async fn image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let media = fetch(&state, &id, "image/").await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&media)),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
        ],
        media.data,
    )
        .into_response())
}

/// Serve a product video, honouring `Range`.
#[instrument(skip(state, headers))]
pub async fn video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let media = fetch(&state, &id, "video/").await?;
    let size = media.data.len() as u64;
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let content_type = content_type(&media);
    let accept_ranges = (header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    match parse_range(range, size) {
        ByteRange::Full => Ok((
            [(header::CONTENT_TYPE, content_type), accept_ranges],
            media.data,
        )
            .into_response()),
        ByteRange::Partial { start, end } => {
            let slice = usize::try_from(start)
                .ok()
                .zip(usize::try_from(end).ok())
                .and_then(|(start, end)| media.data.get(start..=end))
                .ok_or_else(|| AppError::Internal(format!("range {start}-{end} out of bounds")))?;

            let content_range = HeaderValue::from_str(&format!("bytes {start}-{end}/{size}"))
                .map_err(|e| AppError::Internal(e.to_string()))?;

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type),
                    accept_ranges,
                    (header::CONTENT_RANGE, content_range),
                ],
                slice.to_vec(),
            )
                .into_response())
        }
        ByteRange::Unsatisfiable => {
            let content_range = HeaderValue::from_str(&format!("bytes */{size}"))
                .map_err(|e| AppError::Internal(e.to_string()))?;
            Ok((
                StatusCode::RANGE_NOT_SATISFIABLE,
                [accept_ranges, (header::CONTENT_RANGE, content_range)],
            )
                .into_response())
        }
    }
}
