//! `tdd` — the operator CLI that drives the agent fleet through one or more
//! PLAN/RED/GREEN/REFACTOR cycles (§10.4).

mod agents;
mod cli;
mod config;
mod detect;
mod error;
mod orchestrator;
mod phase_executor;
mod planner;
mod prompts;
mod test_list;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use rig::client::CompletionClient;
use rig::providers::openai;
use tracing_subscriber::EnvFilter;

use tdd_core::{GitRepo, NotesManager, Phase, WorkflowResult};

use cli::{Cli, Commands};
use config::Config;
use error::OrchestratorError;
use orchestrator::Orchestrator;
use phase_executor::PhaseExecutor;

fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("TDD_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    let project_root = cli
        .project
        .clone()
        .or_else(|| std::env::var("TDD_PROJECT_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(err) = run(cli, project_root).await {
        eprintln!("{}", err.render().red());
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli, project_root: PathBuf) -> Result<(), OrchestratorError> {
    let git = GitRepo::new(&project_root);
    let notes = NotesManager::new(&project_root);
    let command = cli.command;

    let (feature_request, resuming) = match command {
        Commands::Status => return print_status(&git, &notes),
        Commands::History { limit } => return print_history(&notes, limit),
        Commands::Rollback { commit, force } => return run_rollback(&git, &commit, force),
        Commands::Run { feature_request } => (feature_request, false),
        Commands::Resume => (String::new(), true),
    };

    let config = Config::load(&project_root)?;
    let dispatcher = tdd_core::ToolDispatcher::new(&project_root).with_bash_timeout(config.bash_timeout);

    let mut builder = openai::CompletionsClient::builder().api_key(&config.api_key);
    if let Some(base_url) = &config.api_base_url {
        builder = builder.base_url(base_url);
    }
    let client = builder
        .build()
        .map_err(|e| OrchestratorError::Agent(tdd_core::agent::AgentError::Completion(e.to_string())))?;
    let model = client.completion_model(&config.model);

    let executor = PhaseExecutor::new(
        model,
        config.model.clone(),
        &dispatcher,
        &git,
        &notes,
        config.test_command.clone(),
        config.max_retries,
        config.max_iterations,
    );
    let orchestrator = Orchestrator::new(executor, &git, &notes, project_root.clone());

    let started_at = chrono::Utc::now().to_rfc3339();
    let now = || chrono::Utc::now().to_rfc3339();

    let result = if resuming {
        println!("resuming from latest handoff state");
        orchestrator.resume("(resumed workflow)", started_at, now).await?
    } else {
        println!("starting workflow: {feature_request}");
        orchestrator
            .run(&feature_request, &project_root, started_at, now)
            .await?
    };

    print_result(&result);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_result(result: &WorkflowResult) {
    for cycle in &result.cycles {
        let label = if cycle.success { "done".green() } else { "failed".red() };
        println!(
            "cycle {}: {} [{}] ({} commits)",
            cycle.cycle_number, cycle.test_description, label, cycle.commit_ids.len()
        );
    }
    if result.success {
        println!(
            "{} — {} test(s) completed",
            "workflow complete".green().bold(),
            result.total_tests
        );
    } else {
        let reason = result.final_state.error.clone().unwrap_or_default();
        println!("{}: {reason}", "workflow aborted".red().bold());
    }
}

fn print_status(git: &GitRepo, notes: &NotesManager) -> Result<(), OrchestratorError> {
    let head = git.head()?.ok_or(OrchestratorError::NoHandoffState)?;
    let (commit, state) = notes
        .find_latest(&head)?
        .ok_or(OrchestratorError::NoHandoffState)?;
    println!("commit:  {commit}");
    println!("phase:   {}", colorize_phase(state.phase));
    println!("cycle:   {}", state.cycle_number);
    println!("retries: {}", state.retry_count);
    if let Some(test) = &state.current_test {
        println!("current: {}", test.description);
    }
    println!("pending: {}", state.pending_tests.len());
    println!("done:    {}", state.completed_tests.len());
    Ok(())
}

fn print_history(notes: &NotesManager, limit: usize) -> Result<(), OrchestratorError> {
    let entries = notes.list_all()?;
    for (commit, state) in entries.into_iter().take(limit) {
        println!(
            "{}  {}  cycle {}  retries {}",
            &commit[..commit.len().min(10)],
            colorize_phase(state.phase),
            state.cycle_number,
            state.retry_count
        );
    }
    Ok(())
}

fn run_rollback(git: &GitRepo, commit: &str, force: bool) -> Result<(), OrchestratorError> {
    const ROLLBACK_HISTORY_SCAN_LIMIT: usize = 1_000_000;
    let current = git.log(ROLLBACK_HISTORY_SCAN_LIMIT)?;
    let position = current.iter().position(|c| c == commit);
    let discarded: Vec<&String> = match position {
        Some(idx) => current[..idx].iter().collect(),
        None => current.iter().collect(),
    };

    if !force {
        println!("would discard {} commit(s):", discarded.len());
        for c in &discarded {
            println!("  {c}");
        }
        println!("re-run with --force to apply");
        return Ok(());
    }

    git.reset_hard(commit)?;
    println!("reset to {commit}, discarding {} commit(s)", discarded.len());
    Ok(())
}

fn colorize_phase(phase: Phase) -> colored::ColoredString {
    match phase {
        Phase::Complete => phase.to_string().green(),
        Phase::Plan => phase.to_string().normal(),
        Phase::Red | Phase::Green | Phase::Refactor => phase.to_string().yellow(),
    }
}

