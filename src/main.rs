use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use weft_config::WorkflowDef;
use weft_engine::{Trigger, WorkflowRunner};
use weft_runtime::{RuntimeConfig, WorkflowRuntime};
use weft_store::{SqliteStore, Store};
use weft_task::{RetryPolicy, determine_handler_type};
use weft_workflow::ExecutionPlanner;

/// Weft - a workflow automation engine
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.weft)
  #[arg(long, global = true, env = "WEFT_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// Execution history database (default: sqlite in the data directory)
  #[arg(long, global = true, env = "WEFT_DATABASE_URL")]
  database_url: Option<String>,

  /// Attempts per step, including the first
  #[arg(long, global = true, default_value_t = 3)]
  max_attempts: u32,

  #[arg(long, global = true, default_value_t = 1000)]
  initial_delay_ms: u64,

  #[arg(long, global = true, default_value_t = 30000)]
  max_delay_ms: u64,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow with a JSON payload read from stdin
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// User the run is attributed to
    #[arg(long)]
    user_id: Option<String>,

    /// Run variable as key=json (plain strings are accepted too)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
  },

  /// Check a workflow and report every problem
  Validate { workflow_file: PathBuf },

  /// Print the execution order of a workflow
  Plan { workflow_file: PathBuf },

  /// List past executions of a workflow
  History { workflow_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weft=info,warn")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let Some(command) = cli.command else {
    println!("weft - use --help to see available commands");
    return Ok(());
  };

  match command {
    Commands::Run {
      workflow_file,
      user_id,
      vars,
    } => {
      let retry_policy = RetryPolicy {
        max_attempts: cli.max_attempts,
        initial_delay_ms: cli.initial_delay_ms,
        max_delay_ms: cli.max_delay_ms,
        ..RetryPolicy::default()
      };
      let store = open_store(cli.data_dir, cli.database_url).await?;
      run_workflow(&workflow_file, user_id, vars, retry_policy, store).await
    }
    Commands::Validate { workflow_file } => validate_workflow(&workflow_file).await,
    Commands::Plan { workflow_file } => plan_workflow(&workflow_file).await,
    Commands::History { workflow_id } => {
      let store = open_store(cli.data_dir, cli.database_url).await?;
      show_history(&workflow_id, store.as_ref()).await
    }
  }
}

async fn open_store(
  data_dir: Option<PathBuf>,
  database_url: Option<String>,
) -> Result<Arc<dyn Store>> {
  let url = match database_url {
    Some(url) => url,
    None => {
      let data_dir = match data_dir {
        Some(dir) => dir,
        None => dirs::home_dir()
          .context("could not determine home directory")?
          .join(".weft"),
      };
      tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
      format!("sqlite://{}", data_dir.join("weft.db").display())
    }
  };

  let store = SqliteStore::connect(&url)
    .await
    .with_context(|| format!("failed to open execution store: {url}"))?;
  Ok(Arc::new(store))
}

async fn load_workflow(workflow_file: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))
}

async fn run_workflow(
  workflow_file: &Path,
  user_id: Option<String>,
  vars: Vec<String>,
  retry_policy: RetryPolicy,
  store: Arc<dyn Store>,
) -> Result<()> {
  let workflow = load_workflow(workflow_file).await?;
  eprintln!("Loaded workflow: {}", workflow.name);

  let mut trigger = Trigger::new(read_payload_from_stdin()?);
  trigger.user_id = user_id;
  for var in &vars {
    let (name, value) = parse_var(var)?;
    trigger = trigger.with_variable(name, value);
  }

  let config = RuntimeConfig {
    retry_policy,
    ..RuntimeConfig::default()
  };
  let runtime = WorkflowRuntime::new(weft_handlers::default_registry(), store, config);
  let runner = WorkflowRunner::new(Arc::new(runtime), workflow);

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrl_c.cancel();
    }
  });

  let result = runner
    .execute_once(trigger, cancel)
    .await
    .context("workflow execution failed")?;

  eprintln!("Execution completed: {}", result.execution_id);
  eprintln!(
    "Steps: {} ({} skipped) in {}ms",
    result.context.result_count(),
    result.skipped.len(),
    result.duration_ms
  );

  let output: serde_json::Map<String, Value> = result
    .context
    .results()
    .map(|(id, r)| (id.to_string(), r.output.clone()))
    .collect();

  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

async fn validate_workflow(workflow_file: &Path) -> Result<()> {
  let workflow = load_workflow(workflow_file).await?;

  match ExecutionPlanner::validate(&workflow) {
    Ok(()) => {
      println!("{}: ok", workflow.name);
      Ok(())
    }
    Err(errors) => {
      for err in errors.errors() {
        println!("- {err}");
      }
      bail!("{} has {} problem(s)", workflow.name, errors.len())
    }
  }
}

async fn plan_workflow(workflow_file: &Path) -> Result<()> {
  let workflow = load_workflow(workflow_file).await?;
  let plan = ExecutionPlanner::plan(&workflow).context("failed to plan workflow")?;

  for step in plan.iter() {
    let deps = if step.dependencies.is_empty() {
      "-".to_string()
    } else {
      step.dependencies.join(", ")
    };
    println!(
      "{:>3}. {} [{}] handler={} after={}",
      step.step_order,
      step.node.label,
      step.node_id,
      determine_handler_type(&step.node),
      deps
    );
  }

  Ok(())
}

async fn show_history(workflow_id: &str, store: &dyn Store) -> Result<()> {
  let executions = store
    .list_executions(workflow_id)
    .await
    .context("failed to list executions")?;

  if executions.is_empty() {
    println!("no executions for {workflow_id}");
    return Ok(());
  }

  for execution in executions {
    println!(
      "{} {} started={} duration={}",
      execution.execution_id,
      execution.status.as_str(),
      execution.started_at.to_rfc3339(),
      execution
        .duration_ms
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "-".to_string()),
    );
    if let Some(error) = &execution.error {
      println!("    error: {error}");
    }

    let steps = store
      .list_steps(&execution.execution_id)
      .await
      .context("failed to list steps")?;
    for step in steps {
      println!(
        "    {:>3}. {} ({}) {}",
        step.step_order,
        step.name,
        step.node_id,
        step.status.as_str()
      );
      if let Some(error) = &step.error {
        println!("         error: {error}");
      }
    }
  }

  Ok(())
}

/// `key=json`, falling back to the raw text when it is not valid JSON.
fn parse_var(raw: &str) -> Result<(String, Value)> {
  let Some((name, value)) = raw.split_once('=') else {
    bail!("invalid --var '{raw}', expected KEY=VALUE");
  };
  let name = name.trim();
  if name.is_empty() {
    bail!("invalid --var '{raw}', name is empty");
  }
  let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
  Ok((name.to_string(), value))
}

fn read_payload_from_stdin() -> Result<Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
