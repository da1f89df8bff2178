//! Filter graph construction helpers.
//!
//! A filter graph is the textual mini-language ffmpeg accepts as a single
//! argument: semicolon-joined labeled stages, with streams split, combined,
//! and relabeled along the way. These helpers build the graphs the toolbox
//! needs and centralize the tricky invariants: the atempo stage range, the
//! xstack layout arithmetic, and filter-path escaping.

use clipforge_core::{Error, Result};

/// atempo accepts a single-stage factor only within this range; anything
/// outside must be achieved by chaining stages.
pub const ATEMPO_MIN: f64 = 0.5;
pub const ATEMPO_MAX: f64 = 2.0;

/// Decompose a speed factor into a chain of atempo stage factors, each within
/// [0.5, 2.0], whose product equals the requested factor.
///
/// For example 4.0 becomes [2.0, 2.0] and 0.2 becomes [0.5, 0.4].
pub fn atempo_chain(factor: f64) -> Result<Vec<f64>> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(Error::Validation(format!(
            "speed factor must be positive, got {factor}"
        )));
    }

    let mut stages = Vec::new();
    let mut remaining = factor;
    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);
    Ok(stages)
}

/// Render an atempo chain as a comma-joined audio filter string.
pub fn atempo_filter(factor: f64) -> Result<String> {
    let stages = atempo_chain(factor)?;
    Ok(stages
        .iter()
        .map(|s| format!("atempo={s}"))
        .collect::<Vec<_>>()
        .join(","))
}

/// xstack layout string for `count` cells in a grid `cols` wide.
///
/// Offsets are expressed as sums of the first cell's dimensions (`w0`, `h0`),
/// so every cell must already be scaled to a uniform size. Cell i sits at
/// column `i % cols`, row `i / cols`.
pub fn xstack_layout(count: usize, cols: usize) -> String {
    let mut layout = String::new();
    for i in 0..count {
        let c = i % cols;
        let r = i / cols;

        let x = if c == 0 {
            "0".to_string()
        } else {
            vec!["w0"; c].join("+")
        };
        let y = if r == 0 {
            "0".to_string()
        } else {
            vec!["h0"; r].join("+")
        };

        if i > 0 {
            layout.push('|');
        }
        layout.push_str(&format!("{x}_{y}"));
    }
    layout
}

/// Audio handling for the grid composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAudio {
    None,
    /// Keep the first input's audio track.
    First,
    /// Mix all inputs' audio tracks.
    Mix,
}

impl GridAudio {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(GridAudio::None),
            "first" => Ok(GridAudio::First),
            "mix" => Ok(GridAudio::Mix),
            other => Err(Error::Validation(format!(
                "unknown grid audio mode '{other}' (expected none, first, mix)"
            ))),
        }
    }
}

/// Complete filter graph for the grid/mosaic composition: scale and pad each
/// source to a uniform cell, composite via xstack into `[vout]`, and mix
/// audio into `[aout]` when requested.
pub fn grid_filter(count: usize, cols: usize, cell_w: u32, cell_h: u32, audio: GridAudio) -> String {
    let mut parts = Vec::with_capacity(count + 2);

    for i in 0..count {
        parts.push(format!(
            "[{i}:v]scale={cell_w}:{cell_h}:force_original_aspect_ratio=decrease,\
             pad={cell_w}:{cell_h}:(ow-iw)/2:(oh-ih)/2[v{i}]"
        ));
    }

    let refs: String = (0..count).map(|i| format!("[v{i}]")).collect();
    parts.push(format!(
        "{refs}xstack=inputs={count}:layout={}[vout]",
        xstack_layout(count, cols)
    ));

    if audio == GridAudio::Mix {
        parts.push(format!("amix=inputs={count}:duration=shortest[aout]"));
    }

    parts.join(";")
}

/// GIF conversion filter: fps and width scaling, optionally followed by the
/// single-pass palette pair (split into palettegen and paletteuse).
pub fn gif_filter(fps: u32, width: u32, palette: bool, dither: &str) -> String {
    let mut filter = format!("fps={fps},scale={width}:-1:flags=lanczos");
    if palette {
        filter.push_str(&format!(
            ",split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse=dither={dither}"
        ));
    }
    filter
}

/// Escape a path for use inside a filter argument. Backslashes become
/// forward slashes and colons are escaped (Windows drive letters would
/// otherwise terminate the option value).
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "/").replace(':', "\\:")
}

/// LUT application filter and whether it needs `-filter_complex`.
///
/// Full intensity takes the simple single-filter path. Partial intensity
/// splits the stream, applies the LUT to one branch, and blends the branches
/// linearly by the intensity factor. At the boundary (intensity == 1.0) the
/// simpler graph is preferred.
pub fn lut_filter(lut_path: &str, interp: &str, intensity: f64) -> (String, bool) {
    let escaped = escape_filter_path(lut_path);
    if intensity >= 1.0 {
        (format!("lut3d='{escaped}':interp={interp}"), false)
    } else {
        (
            format!(
                "split[a][b];[a]lut3d='{escaped}':interp={interp}[lut];\
                 [b][lut]blend=all_expr='A*(1-{intensity})+B*{intensity}'"
            ),
            true,
        )
    }
}

/// Parse a time string ("HH:MM:SS", "MM:SS", "SS", fractional seconds
/// allowed) into seconds.
pub fn parse_time(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut secs = 0.0;
    for part in &parts {
        let v: f64 = part.trim().parse().ok()?;
        if v < 0.0 {
            return None;
        }
        secs = secs * 60.0 + v;
    }
    Some(secs)
}
