//! # clipforge-av
//!
//! Everything that touches the external media binaries:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Parameter sets** ([`ParamSet`]) -- user-supplied tool options with
//!   presence-only validation.
//! - **Command building** ([`toolbox`]) -- one declarative tool table mapped
//!   through a single generic builder to an ffmpeg argv. Building is pure:
//!   no execution, no filesystem side effects.
//! - **Process execution** ([`exec`]) -- async runner with output capture,
//!   cancellation, and graceful-stop escalation for captures.
//! - **Progress parsing** ([`progress`]) -- the `-progress` key=value stream
//!   mapped to a monotonic completion percentage.
//! - **Probing** ([`probe`]) -- ffprobe JSON mapped into [`MediaInfo`].

pub mod capture;
pub mod command;
pub mod exec;
pub mod filters;
pub mod params;
pub mod probe;
pub mod progress;
pub mod toolbox;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::Command;
pub use exec::{GracefulStop, Outcome, ToolOutput};
pub use params::ParamSet;
pub use probe::{probe_file, MediaInfo};
pub use progress::{ProgressParser, ProgressUpdate};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
