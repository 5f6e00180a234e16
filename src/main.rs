//! Taskflow CLI - task dependencies, subtasks and status workflow.

use std::process;

use clap::Parser;
use taskflow::cli::{Cli, Commands, ConfigCommands, DepsCommands, TaskCommands};
use taskflow::commands::{self, CommandResult, UpdateArgs};
use taskflow::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use taskflow::storage::{
    BackendType, MemoryBackend, SqliteBackend, StorageBackend, TASK_COLLECTION, TaskStore,
};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TF_LOG";

fn main() {
    let cli = Cli::parse();
    let mut human = cli.human_readable;

    let result = build_overrides(&cli)
        .and_then(|overrides| resolve_config(&overrides))
        .and_then(|config| {
            init_tracing(config.log_level());
            human = config.output_format() == OutputFormat::Human;
            run_command(cli.command, &config, human)
        });

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn build_overrides(cli: &Cli) -> taskflow::Result<ConfigOverrides> {
    let mut overrides = ConfigOverrides::new();
    if let Some(path) = &cli.config {
        overrides = overrides.with_config_path(path);
    }
    if let Some(dir) = &cli.data_dir {
        overrides = overrides.with_data_dir(dir);
    }
    if let Some(name) = &cli.backend {
        let backend = BackendType::parse(name).ok_or_else(|| {
            taskflow::Error::InvalidInput(format!("Unknown backend: {}", name))
        })?;
        overrides = overrides.with_backend(backend);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    Ok(overrides)
}

/// Install the stderr subscriber. `TF_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("taskflow={}", default_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn open_store(config: &ResolvedConfig) -> taskflow::Result<TaskStore> {
    let backend: Box<dyn StorageBackend> = match config.backend() {
        BackendType::Sqlite => Box::new(SqliteBackend::open(&config.database_path())?),
        BackendType::Memory => match config.seed_file() {
            Some(path) => Box::new(MemoryBackend::load_fixture(TASK_COLLECTION, path)?),
            None => Box::new(MemoryBackend::new()),
        },
    };
    tracing::debug!(backend = %backend.backend_type(), location = %backend.location(), "opening store");
    TaskStore::open(backend)
}

fn run_command(
    command: Commands,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), taskflow::Error> {
    if let Commands::Config {
        command: ConfigCommands::Show,
    } = command
    {
        output(&commands::config_show(config), human);
        return Ok(());
    }

    let mut store = open_store(config)?;

    match command {
        Commands::Task { command } => match command {
            TaskCommands::Create {
                title,
                project,
                description,
                priority,
                due,
                status,
                blocked_by,
                parent,
            } => {
                let result = commands::task_create(
                    &mut store,
                    title,
                    project,
                    description,
                    priority,
                    due,
                    status,
                    blocked_by,
                    parent,
                )?;
                output(&result, human);
            }
            TaskCommands::Subtask {
                parent,
                title,
                description,
                priority,
                due,
                blocked_by,
            } => {
                let result = commands::task_subtask(
                    &mut store,
                    parent,
                    title,
                    description,
                    priority,
                    due,
                    blocked_by,
                )?;
                output(&result, human);
            }
            TaskCommands::Show { id } => {
                output(&commands::task_show(&store, id)?, human);
            }
            TaskCommands::List {
                project,
                status,
                parent,
                main,
            } => {
                output(
                    &commands::task_list(&store, project, status, parent, main)?,
                    human,
                );
            }
            TaskCommands::Update {
                id,
                title,
                description,
                priority,
                project,
                due,
                clear_due,
                status,
                completed,
                blocked_by,
                clear_blocked_by,
                parent,
                clear_parent,
            } => {
                let args = UpdateArgs {
                    title,
                    description,
                    priority,
                    project,
                    due,
                    clear_due,
                    status,
                    completed,
                    blocked_by,
                    clear_blocked_by,
                    parent,
                    clear_parent,
                };
                output(&commands::task_update(&mut store, id, args)?, human);
            }
            TaskCommands::Status { id, status } => {
                output(&commands::task_status(&mut store, id, &status)?, human);
            }
            TaskCommands::Advance { id } => {
                output(&commands::task_advance(&mut store, id)?, human);
            }
            TaskCommands::Toggle { id } => {
                output(&commands::task_toggle(&mut store, id)?, human);
            }
            TaskCommands::Delete { id } => {
                output(&commands::task_delete(&mut store, id)?, human);
            }
            TaskCommands::Depth { id } => {
                output(&commands::task_depth(&store, id)?, human);
            }
            TaskCommands::Candidates { id } => {
                output(&commands::task_candidates(&store, id)?, human);
            }
        },
        Commands::Board { project } => {
            output(&commands::board(&store, project)?, human);
        }
        Commands::Progress { parent } => {
            output(&commands::progress(&store, parent)?, human);
        }
        Commands::Blocked { unsatisfied } => {
            output(&commands::blocked(&store, unsatisfied)?, human);
        }
        Commands::Deps { command } => match command {
            DepsCommands::Check { id, blocked_by } => {
                output(&commands::deps_check(&store, id, blocked_by)?, human);
            }
        },
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
