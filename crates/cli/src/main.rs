mod config;
mod inputs;
mod logging;
mod summary;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use events::EventBus;
use host::HttpWorkloadHost;
use orchestrator::{FileResultLog, Orchestrator, RunContext, SqlControlPlane};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

use config::AppConfig;
use inputs::{InputArgs, ProcessInputs};
use summary::RunSummary;

/// Status reports shown per agent by `status`.
const HISTORY_LINES: usize = 5;

#[derive(Parser)]
#[command(name = "loadrig")]
#[command(about = "Drive timed, phase-driven load against a workload host", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file; searched for when omitted
    #[arg(long, global = true, env = "LOADRIG_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    inputs: InputArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load test (default)
    Run,
    /// Create the control-plane database and apply migrations
    InitDb,
    /// Show a test's parameters and every agent's last status
    Status,
    /// Mark a test aborted; running agents stop at their next checkpoint
    Abort,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.inputs, cli.config.as_deref()).await,
        Commands::InitDb => init_db(cli.config.as_deref()).await,
        Commands::Status => status(&cli.inputs, cli.config.as_deref()).await,
        Commands::Abort => abort(&cli.inputs, cli.config.as_deref()).await,
    }
}

async fn run(args: &InputArgs, config_path: Option<&Path>) -> Result<()> {
    let inputs = ProcessInputs::from_args(args)?;
    let (config, loaded_from) = AppConfig::load(config_path)?;

    let log_file = logging::diagnostic_log_path(&config.logging.log_directory, &inputs.test_id);
    logging::init_tracing(&config.logging.log_level, Some(&log_file))?;

    info!(
        config = %loaded_from.display(),
        test_id = %inputs.test_id,
        role = %inputs.role,
        identity = %inputs.identity,
        program = %inputs.program,
        "Starting load test"
    );

    let pool = db::connect(&config.database.url)
        .await
        .with_context(|| format!("Cannot reach control-plane store {}", config.database.url))?;
    let control = Arc::new(SqlControlPlane::new(pool));

    let host = HttpWorkloadHost::with_connect_timeout(
        config.host.base_url.clone(),
        Duration::from_secs(config.host.connect_timeout_sec),
    )
    .context("Failed to build workload host client")?;

    let result_path = config.logging.log_directory.join(FileResultLog::file_name(
        &inputs.test_id,
        &inputs.identity,
        Local::now(),
    ));
    let sink = FileResultLog::create(&result_path, config.execution.result_log_policy)
        .await
        .with_context(|| format!("Failed to create result log {}", result_path.display()))?;
    info!(path = %sink.path().display(), policy = %sink.policy(), "Writing results");

    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let collector = tokio::spawn(async move {
        let mut summary = RunSummary::default();
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    summary.observe(&envelope.event);
                    if envelope.event.is_terminal() {
                        tracing::debug!(run_id = %envelope.event.run_id(), "Summary collected");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Summary fell behind, some events were dropped")
                }
                Err(RecvError::Closed) => break,
            }
        }
        summary
    });

    let orchestrator = Orchestrator::new(
        control,
        Arc::new(host),
        Arc::new(sink),
        config.orchestrator_config(),
    )
    .with_event_bus(bus);

    let ctx = RunContext {
        test_id: inputs.test_id.clone(),
        role: inputs.role.clone(),
        identity: inputs.identity.clone(),
        target: inputs.program.clone(),
    };
    let outcome = orchestrator.run(&ctx).await;
    drop(orchestrator);

    let summary = collector.await.context("Summary task failed")?;

    match outcome {
        Ok(report) => {
            println!();
            println!("Test {} finished: {}", inputs.test_id, report.stage.as_str());
            println!(
                "  iterations: {}  second-cadence firings: {}  calls: {}  failed: {}",
                report.iterations, report.second_firings, report.total_calls, report.failed_calls
            );
            println!();
            print!("{}", summary.render());
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!(error = %e, "Load test could not start");
            Err(e).context("Load test could not start")
        }
        Err(e) => {
            error!(error = %e, "Load test failed");
            Err(e).context("Load test failed")
        }
    }
}

async fn init_db(config_path: Option<&Path>) -> Result<()> {
    let (config, _) = AppConfig::load(config_path)?;
    logging::init_tracing(&config.logging.log_level, None)?;

    db::connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to initialize {}", config.database.url))?;

    println!("Control-plane store ready at {}", config.database.url);
    Ok(())
}

async fn status(args: &InputArgs, config_path: Option<&Path>) -> Result<()> {
    let test_id = inputs::require_test_id(args)?;
    let (config, _) = AppConfig::load(config_path)?;
    logging::init_tracing(&config.logging.log_level, None)?;

    let pool = db::connect(&config.database.url).await?;
    let Some(test) = db::TestControlRepository::new(pool.clone()).find(&test_id).await? else {
        println!("Test {} not found.", test_id);
        return Ok(());
    };

    println!();
    println!("Test:   {}", test.test_id);
    println!("Status: {}", test.status);
    if let Some(end) = test.end_time() {
        println!("Ends:   {}", end.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S"));
    }
    let params = test.clone().into_params();
    println!(
        "Window: {} min x {} iterations, second cadence {} min x {}, wait {}s",
        params.main_duration_minutes,
        params.main_iterations,
        params.second_duration_minutes,
        params.second_iterations,
        params.wait_before_start_seconds
    );
    println!();

    let statuses = db::JobStatusRepository::new(pool);
    let agents = statuses.find_by_test(&test_id).await?;
    if agents.is_empty() {
        println!("No agents have reported yet.");
    } else {
        println!("Agents ({}):", agents.len());
        let now = Utc::now();
        for agent in &agents {
            let age = (now - agent.updated_at()).num_seconds().max(0);
            println!(
                "  {:<16} {:<10} {:<24} {}s ago",
                agent.identity, agent.status, agent.details, age
            );
        }

        println!();
        println!("Recent reports:");
        for agent in &agents {
            let history: Vec<_> = statuses
                .history(&agent.identity)
                .await?
                .into_iter()
                .filter(|entry| entry.test_id == test_id)
                .collect();
            for entry in history.iter().skip(history.len().saturating_sub(HISTORY_LINES)) {
                println!(
                    "  {}  {:<16} {:<10} {}",
                    entry.recorded_at().with_timezone(&Local).format("%Y/%m/%d %H:%M:%S"),
                    entry.identity,
                    entry.status,
                    entry.details
                );
            }
        }
    }
    println!();

    Ok(())
}

async fn abort(args: &InputArgs, config_path: Option<&Path>) -> Result<()> {
    let test_id = inputs::require_test_id(args)?;
    let (config, _) = AppConfig::load(config_path)?;
    logging::init_tracing(&config.logging.log_level, None)?;

    let pool = db::connect(&config.database.url).await?;
    let tests = db::TestControlRepository::new(pool);
    tests
        .set_status(&test_id, loadrig_core::JobStatus::Aborted.as_str())
        .await
        .with_context(|| format!("Failed to abort test {}", test_id))?;
    tests.set_end_time(&test_id, Some(Utc::now())).await?;

    info!(test_id = %test_id, "Test marked aborted");
    println!("Test {} marked Aborted. Agents stop at their next status report.", test_id);
    Ok(())
}
