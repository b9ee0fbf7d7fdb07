//! Ascent CLI
//!
//! Main entry point for serving the Ascent coach API.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ascent_engine::Attempt;
use ascent_orchestrator::{
    create_router, AppState, Catalog, CoachService, Config, SkillEntry, UserProgress,
};
use ascent_report::{
    json::JsonGenerator, AttemptInput, MarkdownGenerator, ReportGenerator, ReportInput, SkillInput,
};

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 4077;

/// Ascent - Coding Interview Coach
///
/// Serves the attempt-progression API: thinking gates, gated code
/// submissions, metered hints, mastery tracking, and next-problem
/// progression. Progress reports are written on shutdown.
#[derive(Parser, Debug)]
#[command(name = "ascent")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ascent.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output directory for progress reports
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Port for the HTTP API server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing subscriber with appropriate filter
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Ascent coach starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the coach server.
///
/// 1. Load and validate config
/// 2. Load the problem catalog
/// 3. Build the service and HTTP router
/// 4. Serve until Ctrl+C
/// 5. Write progress reports for every learner seen
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref output_dir) = args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    config.validate()?;

    print_config(&config);

    let catalog = load_catalog(&config)?;
    println!();
    println!("Catalog loaded: {} problems", catalog.problems.len());

    let service = Arc::new(CoachService::new(
        config.clone(),
        Arc::new(ascent_orchestrator::InMemoryAttemptRepo::new()),
        Arc::new(ascent_orchestrator::InMemorySkillRepo::new()),
        Arc::new(ascent_orchestrator::StubExecutor),
        Arc::new(ascent_orchestrator::NullEvidenceProvider),
        Arc::new(catalog),
    ));

    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    println!();
    println!("Starting HTTP API server on {addr}...");

    let router = create_router(AppState::new(Arc::clone(&service)));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("Ascent API running on http://{addr}");
    println!("Press Ctrl+C to stop");
    println!();

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!();
    println!("Shutting down...");

    generate_reports(&service, Path::new(&config.output_dir))?;
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Loads the problem catalog named by the config, or the built-in one.
fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    match &config.catalog_file {
        Some(path) => {
            Catalog::from_file(Path::new(path)).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Ok(Catalog::builtin().clone()),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Tenant: {}", config.tenant);
    println!("  Default language: {}", config.default_language);
    println!("  LLM evidence: {}", config.evidence_enabled);
    println!("  Execution timeout: {}s", config.execution_timeout_seconds);
    println!("  Output directory: {}", config.output_dir);
}

/// Writes Markdown and JSON progress reports for every learner seen.
fn generate_reports(service: &CoachService, output_dir: &Path) -> anyhow::Result<()> {
    let users = service.user_ids().map_err(|e| anyhow::anyhow!("{e}"))?;
    if users.is_empty() {
        println!("No learner activity; skipping reports");
        return Ok(());
    }

    println!("Generating progress reports...");
    std::fs::create_dir_all(output_dir)?;

    for user in users {
        let progress = service
            .progress_of(&user)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let input = create_report_input(&progress, &service.config().tenant);

        let report = ReportGenerator::new(input).generate();

        let md_path = output_dir.join(format!("ascent-report-{user}.md"));
        let markdown = MarkdownGenerator::new(&report).generate();
        std::fs::write(&md_path, markdown)?;
        println!("  Markdown report: {}", md_path.display());

        let json_path = output_dir.join(format!("ascent-report-{user}.json"));
        JsonGenerator::new(&report)
            .write_to_file(&json_path, true)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("  JSON report: {}", json_path.display());
    }

    Ok(())
}

/// Creates a `ReportInput` from a learner's progress.
fn create_report_input(progress: &UserProgress, tenant: &str) -> ReportInput {
    ReportInput {
        user: progress.user.clone(),
        tenant: tenant.to_string(),
        generated_at: chrono::Utc::now(),
        attempts: progress.attempts.iter().map(convert_attempt).collect(),
        skills: progress.skills.iter().map(convert_skill).collect(),
    }
}

/// Converts an `Attempt` to an `AttemptInput`.
fn convert_attempt(attempt: &Attempt) -> AttemptInput {
    AttemptInput {
        attempt_id: attempt.id.clone(),
        problem_id: attempt.problem_id.clone(),
        pattern: attempt.pattern,
        rung: attempt.rung,
        state: attempt.state,
        score: attempt.score.map(|s| s.total),
        hints_used: attempt.hints_used.clone(),
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
    }
}

/// Converts a `SkillEntry` to a `SkillInput`.
fn convert_skill(entry: &SkillEntry) -> SkillInput {
    SkillInput {
        pattern: entry.key.pattern,
        rung: entry.key.rung,
        score: entry.state.score,
        attempts_count: entry.state.attempts_count,
    }
}
