//! Tool listing and run submission.
//!
//! `POST /api/tools/:id/run` is the boundary where validation is resolved:
//! the command is built before any job exists, so a missing required
//! parameter means no process is spawned and no job is created. The only
//! defaulting that happens here is the derived output path; required inputs
//! are never substituted.

use std::path::Path;
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use clipforge_av::exec::GracefulStop;
use clipforge_av::toolbox::{self, BuildCtx, ToolDescriptor, ToolSpec};
use clipforge_av::{probe, ParamSet, ToolInfo};
use clipforge_core::Error;

use crate::jobs::runner;
use crate::server::error::AppError;
use crate::server::AppContext;

/// GET /api/tools
pub async fn list_tools() -> Json<Vec<ToolDescriptor>> {
    Json(toolbox::TOOLS.iter().map(ToolSpec::descriptor).collect())
}

/// GET /api/tools/:id
pub async fn get_tool(UrlPath(id): UrlPath<String>) -> Result<Json<ToolDescriptor>, AppError> {
    let spec = toolbox::find(&id).ok_or_else(|| Error::not_found("tool", &id))?;
    Ok(Json(spec.descriptor()))
}

/// GET /api/tools/check
pub async fn check_tools(State(ctx): State<AppContext>) -> Json<Vec<ToolInfo>> {
    Json(ctx.tools.read().check_all())
}

/// Response for a submitted run.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub job_id: String,
}

/// POST /api/tools/:id/run
pub async fn run_tool(
    State(ctx): State<AppContext>,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let spec = toolbox::find(&id).ok_or_else(|| Error::not_found("tool", &id))?;
    let mut params = ParamSet::from_value(body)?;

    let (encode, capture, storage) = {
        let config = ctx.config.read();
        (
            config.encode.clone(),
            config.capture.clone(),
            config.storage.clone(),
        )
    };

    let (ffmpeg, ffprobe) = {
        let tools = ctx.tools.read();
        (
            tools.require("ffmpeg")?.clone(),
            tools.require("ffprobe")?.clone(),
        )
    };

    // Derive a default destination when the caller did not pick one.
    if spec.needs_output && !params.has("output") {
        std::fs::create_dir_all(&storage.output_dir)?;
        let output = toolbox::default_output_path(spec, &params, &storage.output_dir);
        params.set("output", output.to_string_lossy().as_ref());
    }

    // The fade-out offset needs the total duration; probe it on the caller's
    // behalf when absent.
    if spec.id == "fade" && !params.has("duration") {
        if let Some(input) = params.str("input").map(String::from) {
            if let Some(d) = probe::media_duration(&ffprobe, Path::new(&input)).await {
                params.set("duration", d);
            }
        }
    }

    let build_ctx = BuildCtx {
        ffmpeg: &ffmpeg,
        ffprobe: &ffprobe,
        encode: &encode,
        capture: &capture,
    };
    let cmd = toolbox::build(spec, &build_ctx, &params)?;

    let input_file = params
        .str("input")
        .map(String::from)
        .or_else(|| params.require_list("inputs").ok().map(|v| v[0].clone()));

    let (job_id, token) = ctx.registry.create(spec.id, &cmd, input_file);
    tracing::info!(job_id = %job_id, tool = spec.id, "job submitted");

    let exec_cmd = if spec.reports_progress {
        cmd.with_progress_stream()
    } else {
        cmd
    };
    let graceful = spec
        .graceful_stop
        .then(|| GracefulStop::capture(Duration::from_secs(capture.stop_grace_secs)));

    tokio::spawn(runner::run_job(
        ctx.registry.clone(),
        Some(ffprobe),
        spec,
        job_id.clone(),
        exec_cmd,
        token,
        graceful,
    ));

    Ok((StatusCode::ACCEPTED, Json(RunResponse { job_id })))
}
