//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, external tool paths, encoding preferences,
//! screen capture, and storage directories. Every section defaults sensibly
//! so a completely empty `{}` file is valid.
//!
//! The file is read once at startup and written back whenever the user saves
//! a preference through the API.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Hardware acceleration methods recognized by the encode config.
pub const HW_ACCEL_METHODS: &[&str] = &["none", "videotoolbox", "nvenc", "vaapi", "qsv"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tools: ToolsConfig,
    pub encode: EncodeConfig,
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Persist the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("config serialize error: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if let Some(ref hw) = self.encode.hw_accel {
            if !HW_ACCEL_METHODS.contains(&hw.as_str()) {
                warnings.push(format!(
                    "encode.hw_accel '{}' is not a recognized method (valid: {})",
                    hw,
                    HW_ACCEL_METHODS.join(", ")
                ));
            }
        }

        if self.encode.video_crf > 51 {
            warnings.push(format!(
                "encode.video_crf {} is outside the usable range (0-51)",
                self.encode.video_crf
            ));
        }

        if self.capture.stop_grace_secs == 0 {
            warnings.push(
                "capture.stop_grace_secs is 0; a stop request will immediately force-kill".into(),
            );
        }

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!("{name} {} does not exist", p.display()));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
///
/// `CLIPFORGE_PORT` and `CLIPFORGE_DEBUG` environment variables override the
/// port and log verbosity at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// Paths to external CLI tools. When unset, the tools are looked up on
/// `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Encoding preferences consulted by command builders that re-encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Preferred hardware encoder (none, videotoolbox, nvenc, vaapi, qsv).
    /// When set to a supported value, re-encoding tools use the corresponding
    /// hardware encoder instead of libx264.
    pub hw_accel: Option<String>,
    pub video_crf: u32,
    pub video_preset: String,
    pub audio_bitrate: String,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            hw_accel: None,
            video_crf: 23,
            video_preset: "medium".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

/// Screen capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture framerate.
    pub framerate: u32,
    /// How long a graceful stop may take before the capture process is
    /// force-killed.
    pub stop_grace_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            framerate: 30,
            stop_grace_secs: 3,
        }
    }
}

/// Transient storage locations for the web variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where uploaded files are placed.
    pub upload_dir: PathBuf,
    /// Default directory for derived output paths.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/uploads"),
            output_dir: PathBuf::from("./data/outputs"),
        }
    }
}
