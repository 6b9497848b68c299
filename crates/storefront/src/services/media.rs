//! Product media uploads and delivery.
//!
//! Content types are derived from the file extension, never from the
//! client-supplied `Content-Type`. Video delivery supports a single
//! `bytes=` range so browsers can seek.

use thiserror::Error;

use emporium_core::MediaId;

use crate::db::{MediaStore, NewMedia, RepositoryError, StoredMedia};
use crate::models::MediaRef;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("ogg", "video/ogg"),
];

/// What an upload is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    const fn allowed(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Image => IMAGE_TYPES,
            Self::Video => VIDEO_TYPES,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Image => "PNG, JPG, JPEG, GIF",
            Self::Video => "MP4, WEBM, OGG",
        }
    }
}

/// Errors that can occur handling media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Extension not in the allow-list for this kind.
    #[error("unsupported file {filename:?}; allowed types: {allowed}")]
    UnsupportedType {
        filename: String,
        allowed: &'static str,
    },

    /// Upload had no bytes.
    #[error("file {0:?} is empty")]
    Empty(String),

    /// No blob with that ID.
    #[error("media not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Content type for an allowed filename, matched on the extension
/// case-insensitively.
#[must_use]
pub fn content_type_for(kind: MediaKind, filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    kind.allowed()
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// Strip directories and anything outside `[A-Za-z0-9._-]` from a filename.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

/// How much of a blob to send for a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Send everything with `200 OK`.
    Full,
    /// Send `start..=end` with `206 Partial Content`.
    Partial { start: u64, end: u64 },
    /// Send `416 Range Not Satisfiable`.
    Unsatisfiable,
}

/// Interpret a `Range` header against a blob of `size` bytes.
///
/// Only a single `bytes=` range is honoured. Malformed or multi-range
/// headers fall back to the full body.
#[must_use]
pub fn parse_range(header: Option<&str>, size: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    if start.is_empty() {
        // Suffix range: the last `n` bytes
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= size {
        return ByteRange::Unsatisfiable;
    }

    ByteRange::Partial {
        start,
        end: end.map_or(size - 1, |end| end.min(size - 1)),
    }
}

/// Media service over a [`MediaStore`].
pub struct MediaService<'a> {
    media: &'a dyn MediaStore,
}

impl<'a> MediaService<'a> {
    /// Create a new media service.
    #[must_use]
    pub const fn new(media: &'a dyn MediaStore) -> Self {
        Self { media }
    }

    /// Validate and store an upload.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UnsupportedType` if the extension is not allowed
    /// for `kind`, or `MediaError::Empty` if there is no data.
    pub async fn store(
        &self,
        kind: MediaKind,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MediaRef, MediaError> {
        let filename = sanitize_filename(filename);
        let content_type =
            content_type_for(kind, &filename).ok_or_else(|| MediaError::UnsupportedType {
                filename: filename.clone(),
                allowed: kind.label(),
            })?;
        if data.is_empty() {
            return Err(MediaError::Empty(filename));
        }

        let media = self
            .media
            .put(NewMedia {
                filename,
                content_type: content_type.to_string(),
                data,
            })
            .await?;

        tracing::info!(media_id = %media.id, content_type, "Stored upload");
        Ok(media)
    }

    /// Fetch a stored blob.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::NotFound` if no blob has this ID.
    pub async fn fetch(&self, id: MediaId) -> Result<StoredMedia, MediaError> {
        self.media.get(id).await?.ok_or(MediaError::NotFound)
    }
}
