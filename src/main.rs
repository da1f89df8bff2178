mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use clipforge::jobs::runner::is_progress_key_line;
use clipforge::server;
use clipforge_av::exec::{self, GracefulStop, Outcome};
use clipforge_av::toolbox::{self, BuildCtx};
use clipforge_av::{probe, ParamSet, ProgressParser, ToolRegistry};
use clipforge_core::config::Config;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let debug_env = std::env::var("CLIPFORGE_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    // and CLIPFORGE_DEBUG.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose || debug_env {
            "clipforge=debug,clipforge_av=debug,tower_http=debug".to_string()
        } else {
            "clipforge=info,clipforge_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config_path = cli.config.clone();
    let config = Config::load_or_default(config_path.as_deref());

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Ok(port) = std::env::var("CLIPFORGE_PORT") {
                match port.parse() {
                    Ok(port) => config.server.port = port,
                    Err(_) => tracing::warn!("ignoring unparseable CLIPFORGE_PORT '{port}'"),
                }
            }
            for warning in config.validate() {
                tracing::warn!("config: {warning}");
            }
            server::start_server(config, config_path).await
        }

        Commands::Run { tool, params } => run_tool(&config, &tool, &params).await,

        Commands::Tools => {
            for spec in toolbox::TOOLS {
                println!("{:<14} {}", spec.id, spec.summary);
            }
            Ok(())
        }

        Commands::Probe { file, json } => {
            let tools = ToolRegistry::discover(&config.tools);
            let ffprobe = tools.require("ffprobe")?;
            let info = probe::probe_file(ffprobe, &file).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("format:   {}", info.format_name);
                match info.duration_secs {
                    Some(d) => println!("duration: {d:.2}s"),
                    None => println!("duration: unknown"),
                }
                println!("size:     {} bytes", info.size_bytes);
                for v in &info.video {
                    println!("video:    {} {}x{}", v.codec, v.width, v.height);
                }
                for a in &info.audio {
                    println!("audio:    {} {}ch", a.codec, a.channels);
                }
            }
            Ok(())
        }

        Commands::CheckTools => {
            let tools = ToolRegistry::discover(&config.tools);
            let mut all_found = true;
            for info in tools.check_all() {
                if info.available {
                    println!(
                        "✓ {:<8} {} ({})",
                        info.name,
                        info.path.unwrap().display(),
                        info.version.as_deref().unwrap_or("unknown version")
                    );
                } else {
                    println!("✗ {:<8} not found", info.name);
                    all_found = false;
                }
            }
            if !all_found {
                bail!("some required tools are missing");
            }
            Ok(())
        }

        Commands::Validate { config: path } => {
            let path = path.or(config_path);
            let config = Config::load_or_default(path.as_deref());
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("configuration OK");
            } else {
                for warning in &warnings {
                    println!("warning: {warning}");
                }
            }
            Ok(())
        }
    }
}

/// Synchronous single-run mode: build the command, print the preview, block
/// until the child exits, and reflect the outcome in the exit code. Ctrl+C
/// cancels the run (gracefully for captures).
async fn run_tool(config: &Config, tool: &str, pairs: &[String]) -> Result<()> {
    let Some(spec) = toolbox::find(tool) else {
        bail!("tool not found: {tool}");
    };
    let mut params = ParamSet::from_pairs(pairs)?;

    let tools = ToolRegistry::discover(&config.tools);
    let ffmpeg = tools.require("ffmpeg")?.clone();
    let ffprobe = tools.require("ffprobe")?.clone();

    if spec.needs_output && !params.has("output") {
        std::fs::create_dir_all(&config.storage.output_dir)?;
        let output = toolbox::default_output_path(spec, &params, &config.storage.output_dir);
        params.set("output", output.to_string_lossy().as_ref());
    }
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
        encode: &config.encode,
        capture: &config.capture,
    };
    let cmd = toolbox::build(spec, &build_ctx, &params)?;
    println!("{}", cmd.display());

    if !spec.reports_progress {
        let output = exec::execute(&cmd, Duration::from_secs(30)).await?;
        print!("{}", output.stdout);
        return Ok(());
    }

    let total_secs = match params.str("input") {
        Some(input) => probe::media_duration(&ffprobe, Path::new(input)).await,
        None => None,
    };

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            eprintln!("cancelling...");
            token.cancel();
        });
    }
    let graceful = spec
        .graceful_stop
        .then(|| GracefulStop::capture(Duration::from_secs(config.capture.stop_grace_secs)));

    let mut parser = ProgressParser::new(total_secs);
    let mut last_reported = 0;
    let outcome = exec::execute_streaming(&cmd.with_progress_stream(), token, graceful, |line| {
        if let Some(update) = parser.feed(line) {
            if let Some(percent) = update.percent {
                if percent != last_reported {
                    eprintln!("progress: {percent}%");
                    last_reported = percent;
                }
            }
        } else if !is_progress_key_line(line) {
            eprintln!("{line}");
        }
    })
    .await?;

    match outcome {
        Outcome::Completed => {
            if let Some(output) = cmd.output() {
                println!("done: {}", output.display());
            }
            Ok(())
        }
        Outcome::Cancelled { forced } => {
            bail!("cancelled{}", if forced { " (force-stopped)" } else { "" })
        }
    }
}
