//! Per-tool argument builders.
//!
//! Each builder maps a validated [`ParamSet`] to the tool's argv. Shared
//! policy lives here once: every ffmpeg command starts with `-y`, inputs are
//! declared with `-i`, and the output path is appended last via
//! [`Command::output_arg`].

use clipforge_core::{Error, Result};

use crate::capture::grab_input;
use crate::command::Command;
use crate::filters::{self, GridAudio};
use crate::params::ParamSet;

use super::BuildCtx;

/// Start an ffmpeg command with the fixed overwrite flag.
fn ffmpeg(ctx: &BuildCtx) -> Command {
    let mut cmd = Command::new(ctx.ffmpeg);
    cmd.arg("-y");
    cmd
}

/// Render a float the shortest way (10.0 becomes "10").
fn fmt_f64(v: f64) -> String {
    format!("{v}")
}

fn parse_time_param(params: &ParamSet, name: &str, default: f64) -> Result<f64> {
    match params.str(name) {
        Some(s) => filters::parse_time(s)
            .ok_or_else(|| Error::Validation(format!("invalid time '{s}' for '{name}'"))),
        None => Ok(default),
    }
}

/// Resolve the preferred hardware acceleration method to the flags that must
/// appear before `-i`, the encoder name, and whether the encoder supports
/// CRF-based quality control.
fn resolve_hw_encoder(hw_accel: Option<&str>) -> (&'static [&'static str], &'static str, bool) {
    match hw_accel {
        Some("videotoolbox") => (&["-hwaccel", "videotoolbox"], "h264_videotoolbox", false),
        Some("nvenc") => (&["-hwaccel", "cuda"], "h264_nvenc", false),
        Some("vaapi") => (
            &["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"],
            "h264_vaapi",
            false,
        ),
        Some("qsv") => (&["-hwaccel", "qsv"], "h264_qsv", false),
        _ => (&[], "libx264", true),
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub(super) fn convert(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);

    let vcodec = p.str_or("vcodec", "auto");
    if vcodec != "auto" {
        cmd.args(["-c:v", vcodec]);
    }
    let acodec = p.str_or("acodec", "auto");
    if acodec != "auto" {
        cmd.args(["-c:a", acodec]);
    }

    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn compress(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let crf = p.u32_or("crf", ctx.encode.video_crf);
    let preset = p.str_or("preset", &ctx.encode.video_preset);
    let (hw_args, encoder, use_crf) = resolve_hw_encoder(ctx.encode.hw_accel.as_deref());

    let mut cmd = ffmpeg(ctx);
    // Hardware acceleration flags must appear before -i.
    cmd.args(hw_args.iter().copied());
    cmd.args(["-i", input]);
    cmd.args(["-c:v", encoder]);
    if use_crf {
        cmd.args(["-crf", &crf.to_string(), "-preset", preset]);
    } else {
        // Hardware encoders don't support CRF; use bitrate targeting.
        cmd.args(["-b:v", "5M", "-maxrate", "8M", "-bufsize", "16M"]);
    }
    cmd.args(["-c:a", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn trim(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let start = parse_time_param(p, "start", 0.0)?;
    let end = match p.str("end") {
        Some(s) => Some(
            filters::parse_time(s)
                .ok_or_else(|| Error::Validation(format!("invalid time '{s}' for 'end'")))?,
        ),
        None => None,
    };
    let duration = end.map(|e| e - start).filter(|d| *d > 0.0);

    // In copy mode the seek goes before the input: fast but snapped to
    // keyframes. The accurate variant seeks after the input and re-encodes.
    // A user toggle, never inferred.
    let copy = p.bool_or("copy", true);

    let mut cmd = ffmpeg(ctx);
    if copy {
        if start > 0.0 {
            cmd.args(["-ss", &fmt_f64(start)]);
        }
        cmd.args(["-i", input]);
    } else {
        cmd.args(["-i", input]);
        if start > 0.0 {
            cmd.args(["-ss", &fmt_f64(start)]);
        }
    }
    if let Some(d) = duration {
        cmd.args(["-t", &fmt_f64(d)]);
    }
    if copy {
        cmd.args(["-c", "copy"]);
    } else {
        cmd.args(["-c:v", "libx264", "-crf", "23", "-c:a", "aac"]);
    }
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn speed(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let factor = p.f64_or("factor", 2.0);
    if !(factor.is_finite() && factor > 0.0) {
        return Err(Error::Validation(format!(
            "speed factor must be positive, got {factor}"
        )));
    }

    let include_audio = p.bool_or("audio", true);
    let keep_pitch = p.bool_or("keep_pitch", true);

    // Presentation timestamps are scaled by 1/factor; audio tempo must be
    // scaled by the complementary chained filter.
    let vf = format!("setpts={}*PTS", fmt_f64(1.0 / factor));

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);

    if include_audio {
        let af = if keep_pitch {
            filters::atempo_filter(factor)?
        } else {
            format!("asetrate=44100*{},aresample=44100", fmt_f64(factor))
        };
        cmd.args(["-filter_complex", &format!("[0:v]{vf}[v];[0:a]{af}[a]")]);
        cmd.args(["-map", "[v]", "-map", "[a]"]);
        cmd.args(["-c:v", "libx264", "-crf", "23", "-c:a", "aac"]);
    } else {
        cmd.args(["-vf", &vf, "-an"]);
        cmd.args(["-c:v", "libx264", "-crf", "23"]);
    }

    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn gif(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let start = parse_time_param(p, "start", 0.0)?;
    let duration = p.f64_or("duration", 5.0);
    let width = p.u32_or("width", 480);
    let fps = p.u32_or("fps", 15);
    let palette = p.bool_or("palette", true);
    let dither = p.str_or("dither", "sierra2_4a");

    let mut cmd = ffmpeg(ctx);
    if start > 0.0 {
        cmd.args(["-ss", &fmt_f64(start)]);
    }
    cmd.args(["-i", input]);
    if duration > 0.0 {
        cmd.args(["-t", &fmt_f64(duration)]);
    }
    cmd.args(["-vf", &filters::gif_filter(fps, width, palette, dither)]);
    cmd.args(["-loop", "0"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn grid(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let inputs = p.require_list("inputs")?;
    let output = p.require_str("output")?;

    if inputs.len() < 2 {
        return Err(Error::Validation(
            "grid needs at least two input videos".into(),
        ));
    }

    let cols = p.u32_or("cols", 2).max(1) as usize;
    let cell_w = p.u32_or("cell_width", 640);
    let cell_h = p.u32_or("cell_height", 360);
    let audio = GridAudio::parse(p.str_or("audio", "first"))?;

    let mut cmd = ffmpeg(ctx);
    for input in &inputs {
        cmd.args(["-i", input]);
    }
    cmd.args([
        "-filter_complex",
        &filters::grid_filter(inputs.len(), cols, cell_w, cell_h, audio),
    ]);
    cmd.args(["-map", "[vout]"]);
    match audio {
        GridAudio::None => {}
        GridAudio::First => {
            cmd.args(["-map", "0:a"]);
        }
        GridAudio::Mix => {
            cmd.args(["-map", "[aout]"]);
        }
    }
    cmd.args(["-c:v", "libx264", "-crf", "23", "-preset", "medium"]);
    if audio != GridAudio::None {
        cmd.args(["-c:a", "aac", "-b:a", "128k"]);
    }
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn lut(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let lut_file = p.require_str("lut")?;
    let output = p.require_str("output")?;

    let intensity = p.f64_or("intensity", 1.0);
    if !(0.0..=1.0).contains(&intensity) {
        return Err(Error::Validation(format!(
            "intensity must be within 0..=1, got {intensity}"
        )));
    }
    let interp = p.str_or("interp", "tetrahedral");

    let (filter, complex) = filters::lut_filter(lut_file, interp, intensity);

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    if complex {
        cmd.args(["-filter_complex", &filter]);
    } else {
        cmd.args(["-vf", &filter]);
    }
    cmd.args(["-c:v", "libx264", "-crf", "18", "-preset", "medium"]);
    cmd.args(["-c:a", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn resize(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let width = p.i64_or("width", 1280);
    let height = p.i64_or("height", -1);

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args(["-vf", &format!("scale={width}:{height}")]);
    cmd.args(["-c:a", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn crop(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let w = p.i64_or("w", 640);
    let h = p.i64_or("h", 480);
    let x = p.i64_or("x", 0);
    let y = p.i64_or("y", 0);

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args(["-vf", &format!("crop={w}:{h}:{x}:{y}")]);
    cmd.args(["-c:a", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn rotate(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let filter = match p.str_or("action", "90cw") {
        "90cw" => "transpose=1",
        "90ccw" => "transpose=2",
        "180" => "transpose=2,transpose=2",
        "hflip" => "hflip",
        "vflip" => "vflip",
        other => {
            return Err(Error::Validation(format!(
                "unknown rotate action '{other}'"
            )))
        }
    };

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args(["-vf", filter]);
    cmd.args(["-c:a", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn extract_audio(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let bitrate = p.str_or("bitrate", &ctx.encode.audio_bitrate);

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args(["-vn", "-b:a", bitrate]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn thumbnail(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let time = parse_time_param(p, "time", 5.0)?;

    let mut cmd = ffmpeg(ctx);
    if time > 0.0 {
        cmd.args(["-ss", &fmt_f64(time)]);
    }
    cmd.args(["-i", input]);
    cmd.args(["-frames:v", "1", "-q:v", "2"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn webopt(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args(["-c", "copy", "-movflags", "+faststart"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn metadata(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    for key in ["title", "artist", "album", "comment"] {
        if let Some(value) = p.str(key) {
            cmd.args(["-metadata", &format!("{key}={value}")]);
        }
    }
    cmd.args(["-c", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn reverse(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args(["-vf", "reverse"]);
    if p.bool_or("audio", true) {
        cmd.args(["-af", "areverse"]);
    } else {
        cmd.arg("-an");
    }
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn loop_clip(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    let count = p.u32_or("count", 3);

    let mut cmd = ffmpeg(ctx);
    // -stream_loop must precede the input it applies to.
    cmd.args(["-stream_loop", &count.to_string()]);
    cmd.args(["-i", input]);
    cmd.args(["-c", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn fade(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;
    let output = p.require_str("output")?;

    // The fade-out offset needs the media duration; the boundary probes it
    // when the caller does not supply one.
    let duration = p
        .f64("duration")
        .ok_or_else(|| Error::Validation("'duration' is required".into()))?;
    let fade_in = p.f64_or("fade_in", 1.0);
    let fade_out = p.f64_or("fade_out", 1.0);
    let out_start = (duration - fade_out).max(0.0);

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-i", input]);
    cmd.args([
        "-vf",
        &format!(
            "fade=t=in:st=0:d={},fade=t=out:st={}:d={}",
            fmt_f64(fade_in),
            fmt_f64(out_start),
            fmt_f64(fade_out)
        ),
    ]);
    cmd.args(["-c:a", "copy"]);
    cmd.output_arg(output);
    Ok(cmd)
}

pub(super) fn info(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let input = p.require_str("input")?;

    let mut cmd = Command::new(ctx.ffprobe);
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]);
    cmd.arg(input);
    Ok(cmd)
}

pub(super) fn capture(ctx: &BuildCtx, p: &ParamSet) -> Result<Command> {
    let output = p.require_str("output")?;

    let (device, input_spec) = grab_input();
    let fps = p.u32_or("fps", ctx.capture.framerate);
    let duration = p.f64_or("duration", 0.0);

    let mut cmd = ffmpeg(ctx);
    cmd.args(["-f", device, "-framerate", &fps.to_string()]);
    cmd.args(["-i", input_spec]);
    if duration > 0.0 {
        cmd.args(["-t", &fmt_f64(duration)]);
    }
    cmd.args(["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"]);
    cmd.output_arg(output);
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolbox::{build_by_id, BuildCtx};
    use clipforge_core::config::{CaptureConfig, EncodeConfig};
    use serde_json::json;
    use std::path::Path;

    fn build(id: &str, v: serde_json::Value) -> Result<Command> {
        build_with_encode(id, v, EncodeConfig::default())
    }

    fn build_with_encode(id: &str, v: serde_json::Value, encode: EncodeConfig) -> Result<Command> {
        let capture = CaptureConfig::default();
        let ctx = BuildCtx {
            ffmpeg: Path::new("/usr/bin/ffmpeg"),
            ffprobe: Path::new("/usr/bin/ffprobe"),
            encode: &encode,
            capture: &capture,
        };
        build_by_id(id, &ctx, &ParamSet::from_value(v).unwrap())
    }

    fn argv(id: &str, v: serde_json::Value) -> Vec<String> {
        build(id, v).unwrap().argv()
    }

    fn index_of(argv: &[String], value: &str) -> usize {
        argv.iter()
            .position(|a| a == value)
            .unwrap_or_else(|| panic!("'{value}' not in {argv:?}"))
    }

    fn window(argv: &[String], flag: &str) -> String {
        let i = index_of(argv, flag);
        argv[i + 1].clone()
    }

    #[test]
    fn trim_copy_mode_seeks_before_input() {
        let argv = argv(
            "trim",
            json!({
                "input": "clip.mp4",
                "start": "00:00:10",
                "end": "00:00:20",
                "copy": true,
                "output": "clip_trim.mp4"
            }),
        );

        let ss = index_of(&argv, "-ss");
        let i = index_of(&argv, "-i");
        assert!(ss < i, "seek flag must precede the input in copy mode");
        assert_eq!(argv[ss + 1], "10");
        assert_eq!(argv[i + 1], "clip.mp4");
        assert_eq!(window(&argv, "-t"), "10");
        let c = index_of(&argv, "-c");
        assert_eq!(argv[c + 1], "copy");
        assert_eq!(argv.last().unwrap(), "clip_trim.mp4");
    }

    #[test]
    fn trim_accurate_mode_seeks_after_input() {
        let argv = argv(
            "trim",
            json!({
                "input": "clip.mp4",
                "start": "00:00:10",
                "copy": false,
                "output": "out.mp4"
            }),
        );
        let ss = index_of(&argv, "-ss");
        let i = index_of(&argv, "-i");
        assert!(i < ss, "accurate mode seeks after the input");
        assert!(argv.contains(&"libx264".to_string()));
    }

    #[test]
    fn trim_rejects_bad_time() {
        let err = build(
            "trim",
            json!({"input": "a.mp4", "start": "abc", "output": "o.mp4"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn speed_chains_atempo_for_large_factors() {
        let argv = argv(
            "speed",
            json!({"input": "a.mp4", "factor": 4.0, "output": "o.mp4"}),
        );
        let graph = window(&argv, "-filter_complex");
        assert!(graph.contains("[0:v]setpts=0.25*PTS[v]"));
        assert!(graph.contains("[0:a]atempo=2,atempo=2[a]"));
        assert!(argv.contains(&"[v]".to_string()));
        assert!(argv.contains(&"[a]".to_string()));
    }

    #[test]
    fn speed_without_audio_drops_track() {
        let argv = argv(
            "speed",
            json!({"input": "a.mp4", "factor": 2.0, "audio": false, "output": "o.mp4"}),
        );
        assert!(argv.contains(&"-an".to_string()));
        assert_eq!(window(&argv, "-vf"), "setpts=0.5*PTS");
    }

    #[test]
    fn speed_rejects_nonpositive_factor() {
        let err = build(
            "speed",
            json!({"input": "a.mp4", "factor": 0, "output": "o.mp4"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn gif_palette_filter_chain() {
        let argv = argv(
            "gif",
            json!({"input": "a.mp4", "width": 480, "fps": 15, "output": "a.gif"}),
        );
        let filter = window(&argv, "-vf");
        assert!(filter.contains("fps=15"));
        assert!(filter.contains("scale=480:-1"));
        assert!(filter.contains("split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse"));
        assert_eq!(argv.last().unwrap(), "a.gif");
    }

    #[test]
    fn gif_without_palette_is_single_stage() {
        let argv = argv(
            "gif",
            json!({"input": "a.mp4", "palette": false, "output": "a.gif"}),
        );
        assert!(!window(&argv, "-vf").contains("palettegen"));
    }

    #[test]
    fn grid_maps_vout_and_mixed_audio() {
        let argv = argv(
            "grid",
            json!({
                "inputs": ["a.mp4", "b.mp4", "c.mp4", "d.mp4"],
                "cols": 2,
                "audio": "mix",
                "output": "grid.mp4"
            }),
        );
        assert_eq!(argv.iter().filter(|a| *a == "-i").count(), 4);
        let graph = window(&argv, "-filter_complex");
        assert!(graph.contains("xstack=inputs=4:layout=0_0|w0_0|0_h0|w0_h0[vout]"));
        assert!(graph.contains("amix=inputs=4"));
        assert!(argv.contains(&"[vout]".to_string()));
        assert!(argv.contains(&"[aout]".to_string()));
    }

    #[test]
    fn grid_rejects_single_input() {
        let err = build(
            "grid",
            json!({"inputs": ["only.mp4"], "output": "o.mp4"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn lut_full_intensity_uses_simple_graph() {
        let argv = argv(
            "lut",
            json!({"input": "a.mp4", "lut": "g.cube", "intensity": 1.0, "output": "o.mp4"}),
        );
        assert!(argv.contains(&"-vf".to_string()));
        assert!(!argv.contains(&"-filter_complex".to_string()));
    }

    #[test]
    fn lut_partial_intensity_splits_and_blends() {
        let argv = argv(
            "lut",
            json!({"input": "a.mp4", "lut": "g.cube", "intensity": 0.5, "output": "o.mp4"}),
        );
        let graph = window(&argv, "-filter_complex");
        assert!(graph.starts_with("split[a][b];"));
        assert!(graph.contains("blend="));
    }

    #[test]
    fn lut_rejects_out_of_range_intensity() {
        let err = build(
            "lut",
            json!({"input": "a.mp4", "lut": "g.cube", "intensity": 1.5, "output": "o.mp4"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn compress_uses_hw_encoder_when_preferred() {
        let encode = EncodeConfig {
            hw_accel: Some("nvenc".into()),
            ..EncodeConfig::default()
        };
        let argv = build_with_encode(
            "compress",
            json!({"input": "a.mp4", "output": "o.mp4"}),
            encode,
        )
        .unwrap()
        .argv();

        let hw = index_of(&argv, "-hwaccel");
        let i = index_of(&argv, "-i");
        assert!(hw < i, "hwaccel flags must precede the input");
        assert!(argv.contains(&"h264_nvenc".to_string()));
        // Hardware path uses bitrate targeting, not CRF.
        assert!(!argv.contains(&"-crf".to_string()));
    }

    #[test]
    fn compress_defaults_to_crf() {
        let argv = argv("compress", json!({"input": "a.mp4", "output": "o.mp4"}));
        assert!(argv.contains(&"libx264".to_string()));
        assert_eq!(window(&argv, "-crf"), "23");
        assert_eq!(window(&argv, "-preset"), "medium");
    }

    #[test]
    fn rotate_action_table() {
        let argv = argv(
            "rotate",
            json!({"input": "a.mp4", "action": "90ccw", "output": "o.mp4"}),
        );
        assert_eq!(window(&argv, "-vf"), "transpose=2");

        let err = build(
            "rotate",
            json!({"input": "a.mp4", "action": "45deg", "output": "o.mp4"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn fade_out_offset_from_duration() {
        let argv = argv(
            "fade",
            json!({"input": "a.mp4", "duration": 30, "fade_out": 2, "output": "o.mp4"}),
        );
        assert_eq!(
            window(&argv, "-vf"),
            "fade=t=in:st=0:d=1,fade=t=out:st=28:d=2"
        );
    }

    #[test]
    fn metadata_sets_only_present_tags() {
        let argv = argv(
            "metadata",
            json!({"input": "a.mp4", "title": "My Film", "output": "o.mp4"}),
        );
        assert!(argv.contains(&"title=My Film".to_string()));
        assert!(!argv.iter().any(|a| a.starts_with("artist=")));
    }

    #[test]
    fn webopt_is_copy_with_faststart() {
        let argv = argv("webopt", json!({"input": "a.mp4", "output": "o.mp4"}));
        assert!(argv.contains(&"+faststart".to_string()));
        let c = index_of(&argv, "-c");
        assert_eq!(argv[c + 1], "copy");
    }

    #[test]
    fn loop_precedes_input() {
        let argv = argv(
            "loop",
            json!({"input": "a.mp4", "count": 2, "output": "o.mp4"}),
        );
        let sl = index_of(&argv, "-stream_loop");
        let i = index_of(&argv, "-i");
        assert!(sl < i);
        assert_eq!(argv[sl + 1], "2");
    }

    #[test]
    fn info_probes_with_ffprobe() {
        let argv = argv("info", json!({"input": "a.mp4"}));
        assert_eq!(argv[0], "/usr/bin/ffprobe");
        assert!(argv.contains(&"-show_streams".to_string()));
        assert_eq!(argv.last().unwrap(), "a.mp4");
    }

    #[test]
    fn capture_records_with_duration_limit() {
        let argv = argv("capture", json!({"duration": 10, "output": "cap.mp4"}));
        assert!(argv.contains(&"-framerate".to_string()));
        assert_eq!(window(&argv, "-t"), "10");
        assert_eq!(argv.last().unwrap(), "cap.mp4");
    }
}
