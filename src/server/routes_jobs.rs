//! Job status, cancellation, and output download.

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use tokio_util::io::ReaderStream;

use clipforge_core::Error;

use crate::jobs::{CancelOutcome, Job, JobStatus};
use crate::server::error::AppError;
use crate::server::AppContext;

/// GET /api/jobs
pub async fn list_jobs(State(ctx): State<AppContext>) -> Json<Vec<Job>> {
    Json(ctx.registry.list())
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(ctx): State<AppContext>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Job>, AppError> {
    let job = ctx
        .registry
        .get(&id)
        .ok_or_else(|| Error::not_found("job", &id))?;
    Ok(Json(job))
}

/// POST /api/jobs/:id/cancel
///
/// Cancelling an already-terminal job is a no-op, not an error.
pub async fn cancel_job(
    State(ctx): State<AppContext>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Job>, AppError> {
    match ctx.registry.cancel(&id) {
        CancelOutcome::NotFound => Err(Error::not_found("job", &id).into()),
        CancelOutcome::Requested | CancelOutcome::AlreadyTerminal => {
            // Status is set by the runner once the child actually exits;
            // report the current snapshot.
            let job = ctx
                .registry
                .get(&id)
                .ok_or_else(|| Error::not_found("job", &id))?;
            Ok(Json(job))
        }
    }
}

/// GET /api/download/:id
///
/// Streams the output of a completed job. A populated `output_file` is not
/// proof of anything on its own: the status check comes first, and a file
/// deleted since completion is reported as not found.
pub async fn download(
    State(ctx): State<AppContext>,
    UrlPath(id): UrlPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = ctx
        .registry
        .get(&id)
        .ok_or_else(|| Error::not_found("job", &id))?;

    if job.status != JobStatus::Completed {
        return Err(Error::Validation(format!(
            "job {id} has no downloadable output (status: {:?})",
            job.status
        ))
        .into());
    }

    let output = job
        .output_file
        .ok_or_else(|| Error::not_found("file", &id))?;

    let file = tokio::fs::File::open(&output)
        .await
        .map_err(|_| Error::not_found("file", output.display()))?;

    let filename = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());

    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    Ok((headers, body))
}
