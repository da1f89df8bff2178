//! Configuration read/update endpoints.
//!
//! The configuration is the small preference record: preferred hardware
//! encoder, tool path overrides, storage locations. It is read at startup
//! and written back here when the user saves a change.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use clipforge_av::ToolRegistry;
use clipforge_core::config::Config;

use crate::server::error::AppError;
use crate::server::AppContext;

/// GET /api/config
pub async fn get_config(State(ctx): State<AppContext>) -> Json<Config> {
    Json(ctx.config.read().clone())
}

/// Response for a config update.
#[derive(Debug, Serialize)]
pub struct UpdateConfigResponse {
    /// Whether the new config was persisted to disk.
    pub saved: bool,
    /// Non-fatal validation warnings for the submitted config.
    pub warnings: Vec<String>,
}

/// PUT /api/config
///
/// Replaces the runtime configuration, re-discovers the external tools (a
/// changed path override takes effect immediately), and persists when a
/// config path was given at startup.
pub async fn update_config(
    State(ctx): State<AppContext>,
    Json(new_config): Json<Config>,
) -> Result<Json<UpdateConfigResponse>, AppError> {
    let warnings = new_config.validate();
    for warning in &warnings {
        tracing::warn!("config: {warning}");
    }

    *ctx.tools.write() = ToolRegistry::discover(&new_config.tools);

    let saved = match &ctx.config_path {
        Some(path) => {
            new_config.save(path)?;
            true
        }
        None => false,
    };

    *ctx.config.write() = new_config;
    tracing::info!("configuration updated (saved: {saved})");

    Ok(Json(UpdateConfigResponse { saved, warnings }))
}
