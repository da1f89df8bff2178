//! File upload and media probing.

use std::path::Path;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use clipforge_av::probe::{self, MediaInfo};
use clipforge_core::Error;

use crate::server::error::AppError;
use crate::server::AppContext;

/// Response for a stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Where the file landed; feed this to a tool's `input` parameter.
    pub path: String,
    /// The name the client sent.
    pub filename: String,
}

/// POST /api/upload
///
/// Stores the `file` part under the upload directory with a unique name so
/// concurrent uploads of the same filename cannot clobber each other.
pub async fn upload(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload_dir = ctx.config.read().storage.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitize_filename)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Validation("no filename on file part".into()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("failed to read upload: {e}")))?;

        let unique = unique_name(&filename);
        let path = upload_dir.join(&unique);
        tokio::fs::write(&path, &data).await?;

        tracing::info!("stored upload {} ({} bytes)", path.display(), data.len());
        return Ok(Json(UploadResponse {
            path: path.to_string_lossy().into_owned(),
            filename,
        }));
    }

    Err(Error::Validation("no file part in request".into()).into())
}

/// Query for GET /api/probe.
#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    pub path: String,
}

/// GET /api/probe?path=...
pub async fn probe(
    State(ctx): State<AppContext>,
    Query(query): Query<ProbeQuery>,
) -> Result<Json<MediaInfo>, AppError> {
    let ffprobe = ctx.tools.read().require("ffprobe")?.clone();
    let info = probe::probe_file(&ffprobe, Path::new(&query.path)).await?;
    Ok(Json(info))
}

/// Strip any directory components a client might smuggle into the filename.
fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<stem>_<short-id><ext>` so repeated uploads never overwrite.
fn unique_name(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".into());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{stem}_{}{ext}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
    }

    #[test]
    fn unique_name_preserves_stem_and_extension() {
        let name = unique_name("holiday.mp4");
        assert!(name.starts_with("holiday_"));
        assert!(name.ends_with(".mp4"));
        assert_ne!(unique_name("holiday.mp4"), unique_name("holiday.mp4"));
    }

    #[test]
    fn unique_name_without_extension() {
        let name = unique_name("README");
        assert!(name.starts_with("README_"));
        assert!(!name.contains('.'));
    }
}
