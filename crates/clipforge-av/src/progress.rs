//! Progress stream parsing.
//!
//! When invoked with `-progress pipe:2 -nostats`, ffmpeg emits a sequence of
//! `key=value` lines, terminated per update block by a `progress=` line. The
//! parser tracks the elapsed media time keys and converts them into a
//! completion percentage against a known total duration.
//!
//! Rules:
//!
//! - a block with a known total maps to 0..=99; only `progress=end` yields
//!   100, so an estimate never masquerades as completion;
//! - with an unknown total the percentage stays unreported rather than
//!   guessed;
//! - percentages are monotonically non-decreasing across a run.

/// One parsed progress block.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Completion percentage, when a total duration is known.
    pub percent: Option<u8>,
    /// Elapsed media time in seconds, when reported.
    pub out_time_secs: Option<f64>,
    /// Encoder speed string (e.g. "2.5x"), when reported.
    pub speed: Option<String>,
    /// True for the final `progress=end` block.
    pub finished: bool,
}

/// Incremental parser over the `key=value` progress stream.
#[derive(Debug)]
pub struct ProgressParser {
    total_secs: Option<f64>,
    out_time_us: Option<i64>,
    speed: Option<String>,
    last_percent: u8,
}

impl ProgressParser {
    /// Create a parser. `total_secs` is the source media duration; `None`
    /// disables percentage reporting.
    pub fn new(total_secs: Option<f64>) -> Self {
        Self {
            total_secs: total_secs.filter(|d| *d > 0.0),
            out_time_us: None,
            speed: None,
            last_percent: 0,
        }
    }

    /// Feed one line from the stream. Returns an update at each block
    /// boundary (`progress=` line), `None` otherwise.
    pub fn feed(&mut self, line: &str) -> Option<ProgressUpdate> {
        let line = line.trim();

        // Both keys carry microseconds; out_time_ms predates out_time_us and
        // kept its historical unit.
        if let Some(val) = line.strip_prefix("out_time_us=") {
            self.out_time_us = val.trim().parse().ok();
            return None;
        }
        if let Some(val) = line.strip_prefix("out_time_ms=") {
            let parsed = val.trim().parse().ok();
            if self.out_time_us.is_none() {
                self.out_time_us = parsed;
            }
            return None;
        }
        if let Some(val) = line.strip_prefix("speed=") {
            let v = val.trim();
            if v != "N/A" {
                self.speed = Some(v.to_string());
            }
            return None;
        }

        let Some(state) = line.strip_prefix("progress=") else {
            return None;
        };

        let finished = state == "end";
        let out_time_secs = self.out_time_us.map(|us| us as f64 / 1_000_000.0);

        let percent = if finished {
            self.last_percent = 100;
            Some(100)
        } else if let (Some(elapsed), Some(total)) = (out_time_secs, self.total_secs) {
            let pct = ((elapsed / total) * 100.0).floor().clamp(0.0, 99.0) as u8;
            self.last_percent = self.last_percent.max(pct);
            Some(self.last_percent)
        } else {
            None
        };

        Some(ProgressUpdate {
            percent,
            out_time_secs,
            speed: self.speed.clone(),
            finished,
        })
    }
}
