//! Media files: MIME guessing, media type classification and upload.
//!
//! A file is attached to a node with
//! `PUT /node/{id}/media/{media_type}/{media_use_tid}`, the raw bytes as body.

use reqwest::Method;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::drupal::{ApiRequest, DrupalApi};
use crate::error::MediaError;

/// Fallback when the extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extension → MIME type.
const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("jp2", "image/jp2"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/x-wav"),
    ("aac", "audio/aac"),
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("ogg", "video/ogg"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("csv", "text/csv"),
    ("zip", "application/zip"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

/// Media bundle a file is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    File,
    Image,
    Audio,
    Video,
}

impl MediaType {
    /// Classify a MIME type. Only web-displayable formats get a dedicated
    /// bundle; TIFF and JP2 are plain files.
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/png" | "image/gif" => MediaType::Image,
            "audio/mpeg" | "audio/mpeg3" | "audio/x-wav" | "audio/wav" | "audio/aac" => {
                MediaType::Audio
            }
            "video/mp4" | "video/quicktime" | "video/ogg" => MediaType::Video,
            _ => MediaType::File,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::File => "file",
            MediaType::Image => "image",
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess a MIME type from a file name's extension.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    extension
        .and_then(|ext| {
            MIME_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Whether `value` is a taxonomy term id rather than a URI.
pub fn is_term_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Term id to upload media under. Ids are used as they are; URIs such as
/// `http://pcdm.org/use#OriginalFile` are looked up on the site.
pub async fn resolve_media_use_tid<A: DrupalApi>(
    api: &A,
    media_use: &str,
) -> Result<String, MediaError> {
    if is_term_id(media_use) {
        return Ok(media_use.to_string());
    }
    let tid = api
        .term_id_from_uri(media_use)
        .await?
        .ok_or_else(|| MediaError::UnknownMediaUse(media_use.to_string()))?;
    debug!(media_use, tid = %tid, "media use term resolved");
    Ok(tid)
}

/// Upload `file` (relative to `input_dir`) as media of `node_id`.
///
/// `config.media_use_tid` must already be a term id, see
/// [`resolve_media_use_tid`]. Returns the media type used.
pub async fn upload_media<A: DrupalApi>(
    api: &A,
    config: &Config,
    node_id: &str,
    file: &str,
) -> Result<MediaType, MediaError> {
    let path = config.media_file_path(file);
    if !path.is_file() {
        return Err(MediaError::MissingFile(path));
    }

    let mime = guess_mime_type(file);
    let media_type = MediaType::from_mime(mime);
    let file_name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);

    // Read in one call so the handle is closed before the request is sent.
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| MediaError::Io {
            path: path.clone(),
            source,
        })?;

    debug!(node_id, file, mime, media_type = %media_type, bytes = bytes.len(), "uploading media");

    let request = ApiRequest::new(
        Method::PUT,
        [
            "node",
            node_id,
            "media",
            media_type.as_str(),
            config.media_use_tid.as_str(),
        ],
    )
    .header("Content-Type", mime)
    .header(
        "Content-Location",
        format!("{}{}", config.drupal_filesystem, file_name),
    )
    .bytes(bytes);

    let response = api.issue_request(request).await?;
    match response.status {
        201 | 204 => Ok(media_type),
        status => Err(MediaError::Rejected {
            file: file.to_string(),
            status,
        }),
    }
}
