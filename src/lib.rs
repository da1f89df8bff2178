//! # clipforge
//!
//! A web service and CLI that shell out to an external ffmpeg/ffprobe binary
//! to perform media processing: build an argv from user parameters, run the
//! child process, and surface outcome and progress. No media processing
//! happens here; ffmpeg is an opaque collaborator reached via argv and
//! observed via its streams and exit status.
//!
//! - [`jobs`] -- the in-memory job registry and the per-job async runner.
//! - [`server`] -- the Axum HTTP surface: tool listing, run submission, job
//!   polling, cancellation, upload and download, probing, configuration.
//!
//! Command construction, process execution, progress parsing, and tool
//! discovery live in the `clipforge-av` crate; errors and configuration in
//! `clipforge-core`.

pub mod jobs;
pub mod server;
