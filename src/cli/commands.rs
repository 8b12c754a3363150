use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tf", about = concat!("taskflow v", env!("CARGO_PKG_VERSION"), " - tasks with undo, kept locally"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Where the database and session live (default: platform data dir)
    #[arg(long = "data-dir", env = "TASKFLOW_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (default: taskflow.toml in the data dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "taskflow=trace"
    #[arg(long = "log-level", env = "TASKFLOW_LOG", global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with an email address
    Login(LoginArgs),
    /// Sign out, saving pending changes
    Logout,
    /// Show the signed-in user
    Whoami,
    #[command(flatten)]
    Task(TaskCommand),
    /// Read commands from stdin, one per line, with undo/redo
    Shell,
}

/// Commands that operate on the signed-in user's tasks
#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task. Trailing #words in the title become tags
    Add(AddArgs),
    /// List tasks through filters and a sort
    List(ListArgs),
    /// Show task details
    Show(IdArgs),
    /// Change task fields
    Edit(EditArgs),
    /// Toggle a task between done and not done
    Done(IdArgs),
    /// Delete a task
    Rm(IdArgs),
    /// Move a task into another task's position
    Mv(MvArgs),
    /// Manage subtasks
    Sub(SubCmd),
    /// List every tag in use
    Tags,
}

/// One line of `tf shell` input
#[derive(Parser)]
#[command(name = "tf", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand)]
pub enum ShellCommand {
    #[command(flatten)]
    Task(TaskCommand),
    /// Undo the last change
    Undo,
    /// Redo the last undone change
    Redo,
    /// Show undo/redo depth
    History,
    /// Save and leave the shell
    #[command(alias = "exit")]
    Quit,
}

// ---------------------------------------------------------------------------
// Session args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LoginArgs {
    pub email: String,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArgs {
    /// Task ID or a unique prefix of one
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title (words are joined)
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,
    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<String>,
    /// YYYY-MM-DD, today, tomorrow, +Nd or +Nw
    #[arg(long)]
    pub due: Option<String>,
    /// Tag (repeatable, or comma-separated)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Case-insensitive text in title or description
    #[arg(short, long)]
    pub search: Option<String>,
    /// all, active or completed
    #[arg(long)]
    pub status: Option<String>,
    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Only tasks with this tag
    #[arg(short, long)]
    pub tag: Option<String>,
    /// overdue, today, week, later or none
    #[arg(long)]
    pub due: Option<String>,
    /// created, due or priority (default: created)
    #[arg(long)]
    pub sort: Option<String>,
    /// Ascending instead of descending
    #[arg(long)]
    pub asc: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID or a unique prefix of one
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<String>,
    /// New due date, or "none" to clear it
    #[arg(long)]
    pub due: Option<String>,
    /// Add a tag (repeatable)
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,
    /// Remove a tag (repeatable)
    #[arg(long = "rm-tag")]
    pub rm_tags: Vec<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub id: String,
    /// Task whose position it takes
    pub target: String,
}

// ---------------------------------------------------------------------------
// Subtask args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SubCmd {
    #[command(subcommand)]
    pub action: SubAction,
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Add a subtask
    Add {
        /// Parent task ID or prefix
        task: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Toggle a subtask's completion
    Done {
        task: String,
        /// Subtask ID or prefix
        sub: String,
    },
    /// Delete a subtask
    Rm { task: String, sub: String },
    /// Move a subtask into another subtask's position
    Mv {
        task: String,
        sub: String,
        target: String,
    },
}
