mod shell;
mod tasks;

pub use tasks::{resolve_subtask, resolve_task, run_task_command};

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::App;
use crate::auth::IdentityProvider;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError, ConfigOverrides};
use crate::io::repository::TaskRepository;
use crate::io::session;
use crate::io::sqlite::SqliteRepository;
use crate::model::config::Config;
use crate::store::{StoreOptions, TaskStore};

/// Errors reported by command handlers
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("not signed in (run `tf login <email>` first)")]
    NotSignedIn,
    #[error("task storage is unavailable at {0}")]
    StorageUnavailable(PathBuf),
    #[error("could not save changes")]
    SaveFailed,
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(String),
    #[error("ambiguous ID '{prefix}' matches {count} items; type more characters")]
    AmbiguousId { prefix: String, count: usize },
    #[error("invalid {what}: '{value}'")]
    InvalidValue { what: &'static str, value: String },
    #[error("nothing to change")]
    EmptyEdit,
}

/// Resolved settings shared by every command
#[derive(Debug, Clone)]
pub struct Env {
    pub data_dir: PathBuf,
    pub config: Config,
    pub json: bool,
}

impl Env {
    /// Resolve the data directory and layered config for this invocation
    pub fn from_cli(cli: &Cli) -> Result<Env, ConfigError> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => config_io::default_data_dir()?,
        };
        let overrides = ConfigOverrides {
            log_level: cli.log_level.clone(),
        };
        let config = config_io::load_config(&data_dir, cli.config.as_deref(), &overrides)?;
        Ok(Env {
            data_dir,
            config,
            json: cli.json,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.config.storage.db_file)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(command: Commands, env: &Env) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login(args) => cmd_login(args, env).await,
        Commands::Logout => cmd_logout(env).await,
        Commands::Whoami => cmd_whoami(env),
        Commands::Task(cmd) => {
            let app = open_session(env).await?;
            let result = run_task_command(app.store(), cmd, env.json);
            finish(&app).await?;
            result
        }
        Commands::Shell => shell::cmd_shell(env).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_app(env: &Env) -> App<SqliteRepository> {
    let repo = Arc::new(SqliteRepository::new(env.db_path()));
    let store = TaskStore::new(repo, StoreOptions::from(&env.config));
    App::new(IdentityProvider::from_config(&env.config), store)
}

/// Open storage and load the signed-in user's tasks. Refuses to run without
/// a session, and without storage: saving over a collection that failed to
/// load would delete the stored tasks.
async fn open_session(env: &Env) -> Result<App<SqliteRepository>, CliError> {
    let user = session::read_session(&env.data_dir).ok_or(CliError::NotSignedIn)?;
    let mut app = open_app(env);
    if !app.store().repository().initialize().await {
        return Err(CliError::StorageUnavailable(env.db_path()));
    }
    app.resume(user).await;
    Ok(app)
}

/// Write out anything still pending
async fn finish<R: TaskRepository>(app: &App<R>) -> Result<(), CliError> {
    if app.store().flush().await {
        Ok(())
    } else {
        Err(CliError::SaveFailed)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Session commands
// ---------------------------------------------------------------------------

async fn cmd_login(args: LoginArgs, env: &Env) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = open_app(env);
    if !app.store().repository().initialize().await {
        return Err(CliError::StorageUnavailable(env.db_path()).into());
    }
    if let Some(previous) = session::read_session(&env.data_dir) {
        app.resume(previous).await;
    }
    let user = app.login(&args.email).await?;
    session::write_session(&env.data_dir, &user)?;
    finish(&app).await?;

    if env.json {
        print_json(&user_to_json(&user))
    } else {
        println!(
            "Signed in as {} ({} tasks)",
            user.email,
            app.store().tasks().len()
        );
        Ok(())
    }
}

async fn cmd_logout(env: &Env) -> Result<(), Box<dyn std::error::Error>> {
    let Some(user) = session::read_session(&env.data_dir) else {
        println!("Not signed in.");
        return Ok(());
    };
    // Every command flushes before it exits, so there is nothing to save
    // and storage is left alone.
    IdentityProvider::from_config(&env.config).logout(&user).await;
    session::clear_session(&env.data_dir)?;
    println!("Signed out {}", user.email);
    Ok(())
}

fn cmd_whoami(env: &Env) -> Result<(), Box<dyn std::error::Error>> {
    let user = session::read_session(&env.data_dir).ok_or(CliError::NotSignedIn)?;
    if env.json {
        print_json(&user_to_json(&user))
    } else {
        println!("{} ({})", user.email, user.id);
        Ok(())
    }
}
