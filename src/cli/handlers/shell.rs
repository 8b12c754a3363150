use std::io::{IsTerminal, Write};

use clap::Parser;
use clap::error::ErrorKind;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::tasks::run_task_command;
use super::{Env, finish, open_session, print_json};
use crate::cli::commands::{ShellCommand, ShellLine};
use crate::cli::output::HistoryJson;
use crate::io::repository::TaskRepository;
use crate::parse::split_line;
use crate::store::TaskStore;

enum Flow {
    Continue,
    Quit,
}

/// Read commands from stdin until EOF or `quit`. Changes are saved on the
/// usual debounce while the shell waits for input, and flushed on exit.
pub async fn cmd_shell(env: &Env) -> Result<(), Box<dyn std::error::Error>> {
    let app = open_session(env).await?;
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("tf> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if let Flow::Quit = run_line(app.store(), &line, env.json) {
            break;
        }
    }

    finish(&app).await?;
    Ok(())
}

/// Parse and run one line. Errors are reported and the shell carries on.
fn run_line<R: TaskRepository>(store: &TaskStore<R>, line: &str, json: bool) -> Flow {
    let args = match split_line(line) {
        Ok(args) if args.is_empty() => return Flow::Continue,
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            return Flow::Continue;
        }
    };
    let parsed = match ShellLine::try_parse_from(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    print!("{}", e)
                }
                _ => eprint!("{}", e),
            }
            return Flow::Continue;
        }
    };

    match parsed.command {
        ShellCommand::Task(cmd) => {
            if let Err(e) = run_task_command(store, cmd, json) {
                eprintln!("error: {}", e);
            }
        }
        ShellCommand::Undo => {
            if store.undo() {
                println!("Undone.");
            } else {
                println!("Nothing to undo.");
            }
        }
        ShellCommand::Redo => {
            if store.redo() {
                println!("Redone.");
            } else {
                println!("Nothing to redo.");
            }
        }
        ShellCommand::History => {
            let (undo, redo) = store.history_depth();
            if json {
                if let Err(e) = print_json(&HistoryJson { undo, redo }) {
                    eprintln!("error: {}", e);
                }
            } else {
                println!("undo: {}  redo: {}", undo, redo);
            }
        }
        ShellCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::repository::MemoryRepository;
    use crate::store::StoreOptions;
    use std::sync::Arc;

    fn store() -> TaskStore<MemoryRepository> {
        TaskStore::new(Arc::new(MemoryRepository::new()), StoreOptions::default())
    }

    #[test]
    fn test_lines_drive_the_store() {
        let store = store();
        run_line(&store, r#"add "Buy milk" #errand -p high"#, false);
        run_line(&store, "add Walk the dog", false);
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.tasks()[0].tags, vec!["errand"]);

        run_line(&store, "undo", false);
        assert_eq!(store.tasks().len(), 1);
        run_line(&store, "redo", false);
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.history_depth(), (2, 0));
    }

    #[test]
    fn test_bad_lines_are_survivable() {
        let store = store();
        assert!(matches!(run_line(&store, "frobnicate", false), Flow::Continue));
        assert!(matches!(run_line(&store, r#"add "unclosed"#, false), Flow::Continue));
        assert!(matches!(run_line(&store, "done nope", false), Flow::Continue));
        assert!(matches!(run_line(&store, "", false), Flow::Continue));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn test_quit_and_exit() {
        let store = store();
        assert!(matches!(run_line(&store, "quit", false), Flow::Quit));
        assert!(matches!(run_line(&store, "exit", false), Flow::Quit));
    }
}
