use clap::{Parser, Subcommand};
use sq_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, project_service, query,
    run_service,
};
use sq_reduce::{Observable, ReduceOptions};
use sq_results::RunStatus;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sq-cli")]
#[command(about = "SEAQT CLI - electron/phonon relaxation across a chain of blocks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// List run definitions in a project
    RunsList {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Integrate a run definition and store the result
    Run {
        /// Path to the project file
        project_path: PathBuf,
        /// Run definition ID
        run_id: String,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List stored runs of a run definition
    Runs {
        /// Path to the project file
        project_path: PathBuf,
        /// Run definition ID
        run_id: String,
    },
    /// Show details of a stored run
    ShowRun {
        /// Path to the project file
        project_path: PathBuf,
        /// Run hash or a unique prefix of it
        hash: String,
    },
    /// Export one observable of a stored run as CSV
    ExportSeries {
        /// Path to the project file
        project_path: PathBuf,
        /// Run hash or a unique prefix of it
        hash: String,
        /// Observable name (e.g. phonon_temperature, total_entropy, zt)
        observable: String,
        /// Block index for per-block observables
        #[arg(long)]
        block: Option<usize>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::RunsList { project_path } => cmd_runs_list(&project_path),
        Commands::Run {
            project_path,
            run_id,
            no_cache,
        } => cmd_run(&project_path, &run_id, !no_cache),
        Commands::Runs {
            project_path,
            run_id,
        } => cmd_runs(&project_path, &run_id),
        Commands::ShowRun { project_path, hash } => cmd_show_run(&project_path, &hash),
        Commands::ExportSeries {
            project_path,
            hash,
            observable,
            block,
            output,
        } => cmd_export_series(&project_path, &hash, &observable, block, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    println!("✓ Project is valid ({} runs)", project.runs.len());
    Ok(())
}

fn cmd_runs_list(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let runs = project_service::list_run_defs(&project);

    if runs.is_empty() {
        println!("No runs defined in project");
    } else {
        println!("Runs in project '{}':", project.name);
        for run in runs {
            println!(
                "  {} - {} ({:?}, {} blocks, coupling {})",
                run.id,
                run.name,
                run.run_type,
                run.block_count,
                if run.coupling { "on" } else { "off" }
            );
        }
    }
    Ok(())
}

fn cmd_run(project_path: &Path, run_def_id: &str, use_cache: bool) -> AppResult<()> {
    println!("Running: {}", run_def_id);

    let request = RunRequest {
        project_path,
        run_def_id,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let fraction = event
                .transient
                .as_ref()
                .map(|t| t.fraction_complete)
                .unwrap_or(-1.0);
            let emit_now = last_stage != Some(event.stage)
                || (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    );
    clear_progress_line();
    let response = response?;

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Run completed: {}", response.run_id);
    }

    print_timing_summary(&response.timing);
    response.timing.perf_stats().print_summary();

    let loaded = run_service::load_run(project_path, &response.run_id)?;
    let summary = query::get_run_summary(&loaded)?;
    println!("  Samples: {}", summary.sample_count);
    println!("  Blocks:  {}", summary.block_count);
    println!("  Modes:   {}", summary.mode_count);

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(140));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, &event.transient) {
        (RunStage::Integrating, Some(t)) => {
            let width = 28usize;
            let filled = ((t.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.3e}/{:.3e}s  step={}  rejected={}  cutbacks={}  elapsed={:.1}s",
                bar,
                t.fraction_complete * 100.0,
                t.sim_time_s,
                t.t_end_s,
                t.step,
                t.rejected_steps,
                t.cutback_retries,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &sq_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |s: f64| 100.0 * s / total;

    println!("\nTiming summary:");
    println!(
        "  Build:     {:.3}s ({:.1}%)",
        timing.compile_time_s,
        pct(timing.compile_time_s)
    );
    println!(
        "  Integrate: {:.3}s ({:.1}%)",
        timing.solve_time_s,
        pct(timing.solve_time_s)
    );
    println!(
        "  Reduce:    {:.3}s ({:.1}%)",
        timing.reduce_time_s,
        pct(timing.reduce_time_s)
    );
    println!(
        "  Save:      {:.3}s ({:.1}%)",
        timing.save_time_s,
        pct(timing.save_time_s)
    );
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    }
    println!("  Total:     {:.3}s", timing.total_time_s);
    println!("  Accepted steps:  {}", timing.steps);
    println!("  Rejected steps:  {}", timing.rejected_steps);
    println!("  Cutback retries: {}", timing.cutback_retries);
    if timing.rhs_calls > 0 {
        println!("  Derivative calls: {}", timing.rhs_calls);
    }
}

fn status_label(status: &RunStatus) -> String {
    match status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Failed { message } => format!("failed: {}", message),
        RunStatus::Cancelled => "cancelled".to_string(),
    }
}

fn cmd_runs(project_path: &Path, run_def_id: &str) -> AppResult<()> {
    let runs = run_service::list_runs(project_path, Some(run_def_id))?;

    if runs.is_empty() {
        println!("No stored runs for: {}", run_def_id);
    } else {
        println!("Stored runs for '{}':", run_def_id);
        for manifest in runs {
            println!(
                "  {} ({}) {}",
                manifest.run_id,
                manifest.timestamp,
                status_label(&manifest.status)
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, hash: &str) -> AppResult<()> {
    println!("Loading run: {}", hash);

    let loaded = run_service::load_run(project_path, hash)?;
    let manifest = &loaded.manifest;
    let summary = query::get_run_summary(&loaded)?;

    println!("\nRun Summary:");
    println!("  Run:     {} ({})", manifest.run_name, manifest.run_def_id);
    println!("  Hash:    {}", manifest.run_id);
    println!("  Status:  {}", status_label(&summary.status));
    println!("  Type:    {:?}", manifest.run_type);
    println!("  Stored:  {}", manifest.timestamp);
    println!("  Solver:  {}", manifest.solver_version);
    println!(
        "  Time range: {:.3e} - {:.3e} s (target {:.3e} s)",
        summary.time_range.0, summary.time_range.1, manifest.t_end_s
    );
    println!("  Samples: {}", summary.sample_count);
    match summary.reduced_samples {
        Some(n) => println!("  Reduced samples: {}", n),
        None => println!("  Reduced samples: none stored"),
    }
    println!("  Blocks:  {}", summary.block_count);
    println!("  Modes:   {}", summary.mode_count);
    println!(
        "  Steps:   {} accepted, {} rejected, {} cutbacks",
        manifest.steps, manifest.rejected_steps, manifest.cutback_retries
    );

    println!("\nObservables:");
    for observable in Observable::ALL {
        let scope = if observable.is_chain_level() {
            "chain"
        } else {
            "block"
        };
        println!("  {} ({})", observable, scope);
    }

    Ok(())
}

fn cmd_export_series(
    project_path: &Path,
    hash: &str,
    observable: &str,
    block: Option<usize>,
    output: Option<&Path>,
) -> AppResult<()> {
    let loaded = run_service::load_run(project_path, hash)?;
    let series = query::observables(&loaded, &ReduceOptions::default())?;
    let points = query::extract_series(&series, observable, block)?;
    let csv = query::series_to_csv(&points);
    tracing::debug!(run_id = %loaded.manifest.run_id, observable, points = points.len(), "exporting series");

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            points.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
