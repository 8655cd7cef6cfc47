//! Ardysa - modspack installation doctor for Dota 2

use anyhow::{Context, Result};
use ardysa::games::GameLayout;
use ardysa::settings::Settings;
use ardysa::status::{self, PatchTrigger};
use ardysa::verify::{self, RunOptions, RunOutcome, StepEvent, VerificationSummary};
use ardysa::version::{self, PatchState, ReconcileError};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ardysa")]
#[command(version)]
#[command(about = "Checks that the Ardysa modspack is installed and patched for the current Dota 2 build")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Dota 2 folder (the one containing `game/`). Defaults to the saved setting
    #[arg(long, global = true, env = "ARDYSA_GAME_DIR")]
    game: Option<PathBuf>,

    /// Command that re-applies the patch. Defaults to the saved setting
    #[arg(long, global = true)]
    patch_command: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all installation checks
    Verify {
        /// Skip the pause between checks
        #[arg(long)]
        no_delay: bool,

        /// Run the patch command if any check fails
        #[arg(long)]
        repatch: bool,
    },

    /// Show the overall mod status and diagnostics
    Status,

    /// Compare the game version with the last patched version
    Version,

    /// Save the game folder and patch command as defaults
    Configure,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(if cli.verbose { "ardysa=debug".parse()? } else { "ardysa=warn".parse()? }),
            )
            .init();
    }

    let mut settings = Settings::load();
    if let Some(cmd) = &cli.patch_command {
        settings.patch_command = cmd.clone();
    }

    if let Commands::Configure = cli.command {
        if let Some(game) = &cli.game {
            settings.game_dir = game.to_string_lossy().to_string();
        }
        settings.save()?;
        println!("Saved settings to {}", Settings::settings_path()?.display());
        return Ok(());
    }

    let game_dir = cli
        .game
        .clone()
        .or_else(|| settings.game_dir())
        .context("No game folder given. Pass --game or run `ardysa configure --game <DIR>`")?;
    let layout = GameLayout::new(game_dir);
    let patch_trigger = settings.patch_command().map(shell_patch_trigger);

    match cli.command {
        Commands::Verify { no_delay, repatch } => {
            let delay = if no_delay || cli.json {
                Duration::ZERO
            } else {
                settings.step_delay()
            };
            let summary = run_verify(&cli, &layout, &settings, delay).await?;
            let outcome = RunOutcome::from_summary(summary.as_ref());

            if outcome.should_repatch(repatch) {
                match &patch_trigger {
                    Some(trigger) => {
                        println!("\nRe-applying patch...");
                        trigger()?;
                    }
                    None => println!("\nNo patch command configured. Pass --patch-command."),
                }
            }

            if outcome != RunOutcome::Passed {
                std::process::exit(outcome.exit_code());
            }
        }

        Commands::Status => {
            let report = status::evaluate_status(&layout, &settings.markers()).await;
            let diagnostics = report
                .version
                .as_ref()
                .map(|v| status::derive_diagnostics(&report.info, v, patch_trigger.is_some()));

            if cli.json {
                let out = serde_json::json!({
                    "status": report.info,
                    "version": report.version,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("=== Mod Status ===");
                println!("Status:          {}", report.info.status_text);
                println!("                 {}", report.info.description);
                if let Some(err) = &report.info.error_message {
                    println!("Error:           {}", err);
                }
                if let (Some(v), Some(d)) = (&report.version, &diagnostics) {
                    println!();
                    println!("=== Diagnostics ===");
                    println!("Game version:    {} (build {})", v.current_version, v.current_build);
                    println!("Patched version: {}", d.patched_version);
                    println!("Patched at:      {}", d.patch_date);
                    println!("Signatures:      {}", flag(d.digest_ok));
                    println!("Gameinfo:        {}", flag(d.game_info_ok));
                    if d.version_mismatch {
                        println!("\nGame version differs from the patched version.");
                    }
                    if d.show_patch_button {
                        println!("\nRun `ardysa verify --repatch` to patch again.");
                    }
                }
            }
        }

        Commands::Version => {
            let rec = match version::reconcile(&layout, &settings.markers()).await {
                Ok(rec) => rec,
                Err(e) => could_not_verify(&layout, e),
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rec.info)?);
            } else {
                println!("Game version:    {}", rec.current);
                println!(
                    "Patched version: {}",
                    rec.info.last_patched_version.as_deref().unwrap_or(version::UNKNOWN)
                );
                let verdict = match &rec.state {
                    PatchState::Current => "up to date".to_string(),
                    PatchState::CurrentByHeuristic => {
                        "patch active (no version record, build not compared)".to_string()
                    }
                    PatchState::Drifted { patched_version, patched_build } => {
                        format!("outdated, patched for {} (build {})", patched_version, patched_build)
                    }
                    PatchState::NotPatched => "not patched".to_string(),
                };
                println!("State:           {}", verdict);
            }
        }

        Commands::Configure => unreachable!("handled above"),
    }

    Ok(())
}

/// Runs the checks and renders progress. Returns the summary, or `None` if cancelled.
async fn run_verify(
    cli: &Cli,
    layout: &GameLayout,
    settings: &Settings,
    delay: Duration,
) -> Result<Option<VerificationSummary>> {
    let options = RunOptions {
        step_delay: delay,
        ..Default::default()
    };

    // Ctrl+C stops the run between checks
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let events = match verify::run_verification(layout, &settings.markers(), options).await {
        Ok(events) => events,
        Err(e) => could_not_verify(layout, e),
    };
    let mut events = Box::pin(events);

    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap();
    let mut spinner: Option<ProgressBar> = None;
    let mut finished: Option<VerificationSummary> = None;

    while let Some(event) = events.next().await {
        if cli.json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            StepEvent::Started { name, .. } if !cli.json => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(style.clone());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb.set_message(format!("{}...", name));
                spinner = Some(pb);
            }
            StepEvent::Completed { name, result, .. } if !cli.json => {
                let mark = if result.passed { "OK  " } else { "FAIL" };
                let line = format!("[{}] {:<16} {}", mark, name, result.detail);
                match spinner.take() {
                    Some(pb) => pb.finish_with_message(line),
                    None => println!("{}", line),
                }
            }
            StepEvent::Finished(summary) => {
                info!("{}/{} checks passed", summary.passed_count, summary.total_count);
                if !cli.json {
                    println!(
                        "\n{}/{} checks passed",
                        summary.passed_count, summary.total_count
                    );
                }
                finished = Some(summary);
            }
            _ => {}
        }
    }

    if let Some(pb) = spinner {
        pb.abandon_with_message("Cancelled");
    }

    Ok(finished)
}

fn could_not_verify(layout: &GameLayout, e: ReconcileError) -> ! {
    eprintln!("Could not verify the installation at {}.", layout.root().display());
    eprintln!("{}", e);
    eprintln!("Check the game folder, or run setup again.");
    std::process::exit(2);
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "OK",
        Some(false) => "Problem",
        None => "Unknown",
    }
}

/// Builds a trigger that runs `command` through the platform shell.
fn shell_patch_trigger(command: &str) -> PatchTrigger {
    let command = command.to_string();
    Arc::new(move || {
        let status = if cfg!(windows) {
            std::process::Command::new("cmd").args(["/C", &command]).status()
        } else {
            std::process::Command::new("sh").args(["-c", &command]).status()
        }
        .with_context(|| format!("Failed to start patch command: {}", command))?;

        if !status.success() {
            anyhow::bail!("Patch command exited with {}", status);
        }
        Ok(())
    })
}
