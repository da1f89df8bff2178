//! The tool table and generic command builder.
//!
//! Every tool is described declaratively: an id, a label, the required
//! parameter names, and a builder function mapping a [`ParamSet`] to a
//! [`Command`]. One generic [`build`] consumes the table; there is no
//! per-tool dispatch code anywhere else.
//!
//! Building is purely structural. Guarantees:
//!
//! - the first argv element is the resolved binary path and the declared
//!   output path is the final element (for tools that write one);
//! - `-y` (unconditional overwrite) precedes every input declaration;
//! - identical parameters always produce an identical argument list;
//! - a missing required parameter fails with a validation error before
//!   anything is spawned, and required paths are never defaulted.

use std::path::{Path, PathBuf};

use clipforge_core::config::{CaptureConfig, EncodeConfig};
use clipforge_core::{Error, Result};
use serde::Serialize;

use crate::command::Command;
use crate::params::ParamSet;

mod builders;

/// Everything a builder may consult besides the parameters: resolved binary
/// paths and the user's saved encoding/capture preferences.
pub struct BuildCtx<'a> {
    pub ffmpeg: &'a Path,
    pub ffprobe: &'a Path,
    pub encode: &'a EncodeConfig,
    pub capture: &'a CaptureConfig,
}

type BuildFn = fn(&BuildCtx, &ParamSet) -> Result<Command>;

/// Declarative description of one tool.
pub struct ToolSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub summary: &'static str,
    /// Parameter names that must be present and non-empty.
    pub required: &'static [&'static str],
    /// Whether the tool writes an output file.
    pub needs_output: bool,
    /// Whether the runner should request the machine-readable progress
    /// stream for this tool.
    pub reports_progress: bool,
    /// Whether cancellation should first try the graceful stdin stop.
    pub graceful_stop: bool,
    build: BuildFn,
}

/// Serializable descriptor for the tool listing endpoints.
#[derive(Debug, Serialize)]
pub struct ToolDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub summary: &'static str,
    pub required: &'static [&'static str],
    pub needs_output: bool,
}

impl ToolSpec {
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            id: self.id,
            label: self.label,
            summary: self.summary,
            required: self.required,
            needs_output: self.needs_output,
        }
    }
}

macro_rules! tool {
    ($id:literal, $label:literal, $summary:literal, $required:expr, $build:path) => {
        ToolSpec {
            id: $id,
            label: $label,
            summary: $summary,
            required: $required,
            needs_output: true,
            reports_progress: true,
            graceful_stop: false,
            build: $build,
        }
    };
}

/// The tool table.
pub const TOOLS: &[ToolSpec] = &[
    tool!(
        "convert",
        "Convert",
        "Convert container and codecs",
        &["input", "output"],
        builders::convert
    ),
    tool!(
        "compress",
        "Compress",
        "Reduce file size with CRF encoding",
        &["input", "output"],
        builders::compress
    ),
    tool!(
        "trim",
        "Trim",
        "Cut a segment by start and end time",
        &["input", "output"],
        builders::trim
    ),
    tool!(
        "speed",
        "Speed",
        "Change playback speed with pitch-corrected audio",
        &["input", "output"],
        builders::speed
    ),
    tool!(
        "gif",
        "GIF",
        "Convert a clip to an optimized GIF",
        &["input", "output"],
        builders::gif
    ),
    tool!(
        "grid",
        "Grid",
        "Composite multiple videos into a grid",
        &["inputs", "output"],
        builders::grid
    ),
    tool!(
        "lut",
        "LUT",
        "Apply a 3D LUT with adjustable intensity",
        &["input", "lut", "output"],
        builders::lut
    ),
    tool!(
        "resize",
        "Resize",
        "Change resolution",
        &["input", "output"],
        builders::resize
    ),
    tool!(
        "crop",
        "Crop",
        "Crop a region",
        &["input", "output"],
        builders::crop
    ),
    tool!(
        "rotate",
        "Rotate/Flip",
        "Rotate or mirror the video",
        &["input", "output"],
        builders::rotate
    ),
    tool!(
        "extract_audio",
        "Extract Audio",
        "Save the audio track on its own",
        &["input", "output"],
        builders::extract_audio
    ),
    tool!(
        "thumbnail",
        "Thumbnail",
        "Extract a single frame",
        &["input", "output"],
        builders::thumbnail
    ),
    tool!(
        "webopt",
        "Web Optimize",
        "Relocate the index for progressive playback",
        &["input", "output"],
        builders::webopt
    ),
    tool!(
        "metadata",
        "Metadata",
        "Rewrite container tags without re-encoding",
        &["input", "output"],
        builders::metadata
    ),
    tool!(
        "reverse",
        "Reverse",
        "Play the clip backwards",
        &["input", "output"],
        builders::reverse
    ),
    tool!(
        "loop",
        "Loop",
        "Repeat the clip",
        &["input", "output"],
        builders::loop_clip
    ),
    tool!(
        "fade",
        "Fade",
        "Add fade in and fade out",
        &["input", "output", "duration"],
        builders::fade
    ),
    ToolSpec {
        id: "info",
        label: "Info",
        summary: "Probe streams and container metadata",
        required: &["input"],
        needs_output: false,
        reports_progress: false,
        graceful_stop: false,
        build: builders::info,
    },
    ToolSpec {
        id: "capture",
        label: "Screen Capture",
        summary: "Record the desktop",
        required: &["output"],
        needs_output: true,
        reports_progress: true,
        graceful_stop: true,
        build: builders::capture,
    },
];

/// Look up a tool by id.
pub fn find(id: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.id == id)
}

/// Build the command for a tool, validating required parameters first.
pub fn build(spec: &ToolSpec, ctx: &BuildCtx, params: &ParamSet) -> Result<Command> {
    for &name in spec.required {
        if !params.has(name) {
            return Err(Error::Validation(format!(
                "'{name}' is required for tool '{}'",
                spec.id
            )));
        }
    }

    let cmd = (spec.build)(ctx, params)?;

    if spec.needs_output && cmd.output().is_none() {
        return Err(Error::Internal(format!(
            "builder for '{}' produced no output path",
            spec.id
        )));
    }

    Ok(cmd)
}

/// Look up a tool by id and build its command.
pub fn build_by_id(id: &str, ctx: &BuildCtx, params: &ParamSet) -> Result<Command> {
    let spec = find(id).ok_or_else(|| Error::not_found("tool", id))?;
    build(spec, ctx, params)
}

/// Derive a default output path for a tool under `out_dir`, named after the
/// input stem and the tool id. The format parameter drives the extension for
/// the tools that change containers.
pub fn default_output_path(spec: &ToolSpec, params: &ParamSet, out_dir: &Path) -> PathBuf {
    let input = params
        .str("input")
        .map(String::from)
        .or_else(|| params.require_list("inputs").ok().map(|v| v[0].clone()));

    let stem = input
        .as_deref()
        .map(Path::new)
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| spec.id.to_string());

    let ext = default_output_ext(spec, params, input.as_deref());
    out_dir.join(format!("{stem}_{}.{ext}", spec.id))
}

fn default_output_ext(spec: &ToolSpec, params: &ParamSet, input: Option<&str>) -> String {
    match spec.id {
        "gif" => "gif".into(),
        "thumbnail" => params.str_or("format", "jpg").into(),
        "extract_audio" => params.str_or("format", "mp3").into(),
        "convert" => params.str_or("format", "mp4").into(),
        "capture" | "grid" | "speed" => "mp4".into(),
        _ => input
            .map(Path::new)
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_core::config::{CaptureConfig, EncodeConfig};
    use serde_json::json;

    fn with_ctx<T>(f: impl FnOnce(&BuildCtx) -> T) -> T {
        let encode = EncodeConfig::default();
        let capture = CaptureConfig::default();
        let ctx = BuildCtx {
            ffmpeg: Path::new("/usr/bin/ffmpeg"),
            ffprobe: Path::new("/usr/bin/ffprobe"),
            encode: &encode,
            capture: &capture,
        };
        f(&ctx)
    }

    fn params(v: serde_json::Value) -> ParamSet {
        ParamSet::from_value(v).unwrap()
    }

    /// Representative full parameter sets, one per tool that writes output.
    fn full_params(id: &str) -> ParamSet {
        match id {
            "grid" => params(json!({"inputs": ["a.mp4", "b.mp4"], "output": "out.mp4"})),
            "lut" => params(json!({"input": "a.mp4", "lut": "g.cube", "output": "out.mp4"})),
            "fade" => params(json!({"input": "a.mp4", "output": "out.mp4", "duration": 30})),
            "capture" => params(json!({"output": "out.mp4"})),
            _ => params(json!({"input": "a.mp4", "output": "out.mp4"})),
        }
    }

    #[test]
    fn every_tool_builds_with_full_params() {
        with_ctx(|ctx| {
            for spec in TOOLS {
                let p = full_params(spec.id);
                let cmd = build(spec, ctx, &p)
                    .unwrap_or_else(|e| panic!("tool '{}' failed to build: {e}", spec.id));

                let argv = cmd.argv();
                assert_eq!(
                    argv[0],
                    if spec.id == "info" {
                        "/usr/bin/ffprobe"
                    } else {
                        "/usr/bin/ffmpeg"
                    },
                    "tool '{}' program",
                    spec.id
                );

                if spec.needs_output {
                    assert_eq!(
                        argv.last().unwrap(),
                        "out.mp4",
                        "tool '{}' output placement",
                        spec.id
                    );
                }
            }
        });
    }

    #[test]
    fn overwrite_flag_precedes_every_input() {
        with_ctx(|ctx| {
            for spec in TOOLS {
                let p = full_params(spec.id);
                let cmd = build(spec, ctx, &p).unwrap();
                let argv = cmd.argv();

                let y = argv.iter().position(|a| a == "-y");
                let first_i = argv.iter().position(|a| a == "-i");
                if let Some(first_i) = first_i {
                    let y = y.unwrap_or_else(|| {
                        panic!("tool '{}' declares inputs without -y", spec.id)
                    });
                    assert!(y < first_i, "tool '{}': -y after -i", spec.id);
                }
            }
        });
    }

    #[test]
    fn building_is_deterministic() {
        with_ctx(|ctx| {
            for spec in TOOLS {
                let p = full_params(spec.id);
                let a = build(spec, ctx, &p).unwrap().argv();
                let b = build(spec, ctx, &p).unwrap().argv();
                assert_eq!(a, b, "tool '{}' is not deterministic", spec.id);
            }
        });
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        with_ctx(|ctx| {
            for spec in TOOLS {
                let err = build(spec, ctx, &ParamSet::new()).unwrap_err();
                assert!(
                    matches!(err, Error::Validation(_)),
                    "tool '{}' did not reject empty params",
                    spec.id
                );
            }
        });
    }

    #[test]
    fn empty_input_string_is_rejected() {
        with_ctx(|ctx| {
            let p = params(json!({"input": "", "output": "out.mp4"}));
            let err = build_by_id("trim", ctx, &p).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        });
    }

    #[test]
    fn unknown_tool_is_not_found() {
        with_ctx(|ctx| {
            let err = build_by_id("teleport", ctx, &ParamSet::new()).unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
        });
    }

    #[test]
    fn default_output_path_uses_stem_and_tool_ext() {
        let dir = Path::new("/outputs");
        let spec = find("gif").unwrap();
        let p = params(json!({"input": "/media/holiday.mp4"}));
        assert_eq!(
            default_output_path(spec, &p, dir),
            PathBuf::from("/outputs/holiday_gif.gif")
        );

        let spec = find("trim").unwrap();
        let p = params(json!({"input": "/media/clip.mkv"}));
        assert_eq!(
            default_output_path(spec, &p, dir),
            PathBuf::from("/outputs/clip_trim.mkv")
        );

        let spec = find("convert").unwrap();
        let p = params(json!({"input": "clip.avi", "format": "webm"}));
        assert_eq!(
            default_output_path(spec, &p, dir),
            PathBuf::from("/outputs/clip_convert.webm")
        );

        let spec = find("grid").unwrap();
        let p = params(json!({"inputs": ["left.mp4", "right.mp4"]}));
        assert_eq!(
            default_output_path(spec, &p, dir),
            PathBuf::from("/outputs/left_grid.mp4")
        );

        let spec = find("capture").unwrap();
        assert_eq!(
            default_output_path(spec, &ParamSet::new(), dir),
            PathBuf::from("/outputs/capture_capture.mp4")
        );
    }

    #[test]
    fn capture_is_the_only_graceful_tool() {
        for spec in TOOLS {
            assert_eq!(spec.graceful_stop, spec.id == "capture");
        }
    }
}
