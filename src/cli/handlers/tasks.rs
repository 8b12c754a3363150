use chrono::{DateTime, Local, Utc};

use super::{CliError, print_json};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::repository::TaskRepository;
use crate::model::task::{Priority, Task, TaskDraft, TaskPatch};
use crate::ops::view::{self, DueBucket, DueWindow, SortKey, SortOrder, StatusFilter, ViewOptions};
use crate::parse::{merge_tags, normalize_tag, parse_due, parse_title_and_tags};
use crate::store::TaskStore;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Run one task command against the store. Shared by one-shot commands and
/// the shell.
pub fn run_task_command<R: TaskRepository>(
    store: &TaskStore<R>,
    cmd: TaskCommand,
    json: bool,
) -> CmdResult {
    let now = Utc::now();
    match cmd {
        TaskCommand::Add(args) => cmd_add(store, args, json, now),
        TaskCommand::List(args) => cmd_list(store, args, json, now),
        TaskCommand::Show(args) => cmd_show(store, args, json, now),
        TaskCommand::Edit(args) => cmd_edit(store, args, json, now),
        TaskCommand::Done(args) => cmd_done(store, args, json, now),
        TaskCommand::Rm(args) => cmd_rm(store, args),
        TaskCommand::Mv(args) => cmd_mv(store, args),
        TaskCommand::Sub(args) => cmd_sub(store, args.action),
        TaskCommand::Tags => cmd_tags(store, json),
    }
}

// ---------------------------------------------------------------------------
// ID resolution
// ---------------------------------------------------------------------------

enum PrefixMatch<'a> {
    One(&'a str),
    Missing,
    Ambiguous(usize),
}

/// An exact ID wins; otherwise the prefix must match exactly one ID
fn match_prefix<'a>(ids: impl IntoIterator<Item = &'a str>, prefix: &str) -> PrefixMatch<'a> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return PrefixMatch::Missing;
    }
    let mut found = Vec::new();
    for id in ids {
        if id == prefix {
            return PrefixMatch::One(id);
        }
        if id.starts_with(prefix) {
            found.push(id);
        }
    }
    match found.as_slice() {
        [] => PrefixMatch::Missing,
        [id] => PrefixMatch::One(*id),
        many => PrefixMatch::Ambiguous(many.len()),
    }
}

pub fn resolve_task(tasks: &[Task], prefix: &str) -> Result<String, CliError> {
    match match_prefix(tasks.iter().map(|t| t.id.as_str()), prefix) {
        PrefixMatch::One(id) => Ok(id.to_string()),
        PrefixMatch::Missing => Err(CliError::TaskNotFound(prefix.to_string())),
        PrefixMatch::Ambiguous(count) => Err(CliError::AmbiguousId {
            prefix: prefix.to_string(),
            count,
        }),
    }
}

pub fn resolve_subtask(task: &Task, prefix: &str) -> Result<String, CliError> {
    match match_prefix(task.subtasks.iter().map(|s| s.id.as_str()), prefix) {
        PrefixMatch::One(id) => Ok(id.to_string()),
        PrefixMatch::Missing => Err(CliError::SubtaskNotFound(prefix.to_string())),
        PrefixMatch::Ambiguous(count) => Err(CliError::AmbiguousId {
            prefix: prefix.to_string(),
            count,
        }),
    }
}

fn lookup<R: TaskRepository>(store: &TaskStore<R>, prefix: &str) -> Result<Task, CliError> {
    let tasks = store.tasks();
    let id = resolve_task(&tasks, prefix)?;
    store.task(&id).ok_or(CliError::TaskNotFound(id))
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

fn invalid(what: &'static str, value: &str) -> CliError {
    CliError::InvalidValue {
        what,
        value: value.to_string(),
    }
}

fn parse_priority(s: &str) -> Result<Priority, CliError> {
    Priority::parse(s).ok_or_else(|| invalid("priority", s))
}

fn parse_due_arg(s: &str) -> Result<Option<DateTime<Utc>>, Box<dyn std::error::Error>> {
    Ok(parse_due(s, Local::now())?)
}

fn list_options(args: ListArgs) -> Result<ViewOptions, CliError> {
    let mut opts = ViewOptions::default();
    if let Some(search) = args.search {
        opts.filter.search = search;
    }
    if let Some(status) = args.status {
        opts.filter.status = StatusFilter::parse(&status).ok_or_else(|| invalid("status", &status))?;
    }
    if let Some(priority) = args.priority {
        opts.filter.priority = Some(parse_priority(&priority)?);
    }
    if let Some(tag) = args.tag {
        opts.filter.tag = Some(normalize_tag(&tag).ok_or_else(|| invalid("tag", &tag))?);
    }
    if let Some(due) = args.due {
        let bucket = DueBucket::parse(&due).ok_or_else(|| invalid("due filter", &due))?;
        opts.filter.set_due(bucket, DueWindow::local_now());
    }
    if let Some(sort) = args.sort {
        opts.sort = SortKey::parse(&sort).ok_or_else(|| invalid("sort", &sort))?;
    }
    if args.asc {
        opts.order = SortOrder::Asc;
    }
    Ok(opts)
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add<R: TaskRepository>(
    store: &TaskStore<R>,
    args: AddArgs,
    json: bool,
    now: DateTime<Utc>,
) -> CmdResult {
    let raw = args.title.join(" ");
    let (title, inline_tags) = parse_title_and_tags(&raw);
    if title.is_empty() {
        return Err(invalid("title", &raw).into());
    }
    let priority = match args.priority {
        Some(p) => parse_priority(&p)?,
        None => Priority::default(),
    };
    let due = match args.due {
        Some(d) => parse_due_arg(&d)?,
        None => None,
    };
    let tags = merge_tags(
        inline_tags
            .iter()
            .chain(args.tags.iter())
            .map(String::as_str),
    );

    let id = store.add_task(TaskDraft {
        title,
        description: args.description.unwrap_or_default(),
        priority,
        tags,
        due,
        ..Default::default()
    });

    if json {
        let task = store.task(&id).ok_or(CliError::TaskNotFound(id))?;
        print_json(&task_to_json(&task, now, false))
    } else {
        println!("{}", id);
        Ok(())
    }
}

fn cmd_list<R: TaskRepository>(
    store: &TaskStore<R>,
    args: ListArgs,
    json: bool,
    now: DateTime<Utc>,
) -> CmdResult {
    let opts = list_options(args)?;
    let tasks = store.tasks();
    let view = view::project(&tasks, &opts);
    if json {
        print_json(&view_to_json(&view, now))
    } else {
        for line in format_list(&view, now) {
            println!("{}", line);
        }
        Ok(())
    }
}

fn cmd_show<R: TaskRepository>(
    store: &TaskStore<R>,
    args: IdArgs,
    json: bool,
    now: DateTime<Utc>,
) -> CmdResult {
    let task = lookup(store, &args.id)?;
    if json {
        print_json(&task_to_json(&task, now, true))
    } else {
        for line in format_task_detail(&task, now) {
            println!("{}", line);
        }
        Ok(())
    }
}

fn cmd_edit<R: TaskRepository>(
    store: &TaskStore<R>,
    args: EditArgs,
    json: bool,
    now: DateTime<Utc>,
) -> CmdResult {
    let task = lookup(store, &args.id)?;

    let mut patch = TaskPatch::default();
    if let Some(title) = args.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(invalid("title", &title).into());
        }
        patch.title = Some(title);
    }
    patch.description = args.description;
    if let Some(p) = args.priority {
        patch.priority = Some(parse_priority(&p)?);
    }
    if let Some(d) = args.due {
        patch.due = Some(parse_due_arg(&d)?);
    }
    if !args.add_tags.is_empty() || !args.rm_tags.is_empty() {
        let removed = merge_tags(args.rm_tags.iter().map(String::as_str));
        let mut tags = merge_tags(
            task.tags
                .iter()
                .chain(args.add_tags.iter())
                .map(String::as_str),
        );
        tags.retain(|t| !removed.contains(t));
        patch.tags = Some(tags);
    }
    if patch.is_empty() {
        return Err(CliError::EmptyEdit.into());
    }

    store.update_task(&task.id, patch);
    if json {
        let task = store.task(&task.id).ok_or(CliError::TaskNotFound(task.id))?;
        print_json(&task_to_json(&task, now, false))
    } else {
        println!("Updated {}", short_id(&task.id));
        Ok(())
    }
}

fn cmd_done<R: TaskRepository>(
    store: &TaskStore<R>,
    args: IdArgs,
    json: bool,
    now: DateTime<Utc>,
) -> CmdResult {
    let task = lookup(store, &args.id)?;
    store.toggle_complete(&task.id);
    let task = store.task(&task.id).ok_or(CliError::TaskNotFound(task.id))?;
    if json {
        print_json(&task_to_json(&task, now, false))
    } else {
        let state = if task.completed { "done" } else { "not done" };
        println!("{} is {}", short_id(&task.id), state);
        Ok(())
    }
}

fn cmd_rm<R: TaskRepository>(store: &TaskStore<R>, args: IdArgs) -> CmdResult {
    let task = lookup(store, &args.id)?;
    store.delete_task(&task.id);
    println!("Deleted {}  {}", short_id(&task.id), task.title);
    Ok(())
}

fn cmd_mv<R: TaskRepository>(store: &TaskStore<R>, args: MvArgs) -> CmdResult {
    let tasks = store.tasks();
    let moved = resolve_task(&tasks, &args.id)?;
    let target = resolve_task(&tasks, &args.target)?;
    if store.reorder_tasks(&moved, &target) {
        println!("Moved {} to position of {}", short_id(&moved), short_id(&target));
    } else {
        println!("Nothing to move.");
    }
    Ok(())
}

fn cmd_sub<R: TaskRepository>(store: &TaskStore<R>, action: SubAction) -> CmdResult {
    match action {
        SubAction::Add { task, title } => {
            let task = lookup(store, &task)?;
            let title = title.join(" ").trim().to_string();
            if title.is_empty() {
                return Err(invalid("subtask title", &title).into());
            }
            let sub_id = store
                .add_subtask(&task.id, &title)
                .ok_or(CliError::TaskNotFound(task.id))?;
            println!("{}", sub_id);
        }
        SubAction::Done { task, sub } => {
            let task = lookup(store, &task)?;
            let sub_id = resolve_subtask(&task, &sub)?;
            store.toggle_subtask(&task.id, &sub_id);
            let done = store
                .task(&task.id)
                .and_then(|t| t.subtask(&sub_id).map(|s| s.completed))
                .unwrap_or(false);
            let state = if done { "done" } else { "not done" };
            println!("{} is {}", short_id(&sub_id), state);
        }
        SubAction::Rm { task, sub } => {
            let task = lookup(store, &task)?;
            let sub_id = resolve_subtask(&task, &sub)?;
            store.delete_subtask(&task.id, &sub_id);
            println!("Deleted subtask {}", short_id(&sub_id));
        }
        SubAction::Mv { task, sub, target } => {
            let task = lookup(store, &task)?;
            let moved = resolve_subtask(&task, &sub)?;
            let target = resolve_subtask(&task, &target)?;
            if store.reorder_subtasks(&task.id, &moved, &target) {
                println!("Moved subtask {} to position of {}", short_id(&moved), short_id(&target));
            } else {
                println!("Nothing to move.");
            }
        }
    }
    Ok(())
}

fn cmd_tags<R: TaskRepository>(store: &TaskStore<R>, json: bool) -> CmdResult {
    let tags = view::all_tags(&store.tasks());
    if json {
        return print_json(&tags);
    }
    for tag in tags {
        println!("#{}", tag);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::repository::MemoryRepository;
    use crate::model::task::Subtask;
    use crate::store::StoreOptions;
    use std::sync::Arc;

    fn task_with_id(id: &str) -> Task {
        let mut task = Task::from_draft(TaskDraft::new(id));
        task.id = id.to_string();
        task
    }

    fn store() -> TaskStore<MemoryRepository> {
        TaskStore::new(Arc::new(MemoryRepository::new()), StoreOptions::default())
    }

    #[test]
    fn test_resolve_unique_prefix() {
        let tasks = vec![task_with_id("abc123"), task_with_id("abd456")];
        assert_eq!(resolve_task(&tasks, "abc").unwrap(), "abc123");
        assert_eq!(resolve_task(&tasks, "abd456").unwrap(), "abd456");
    }

    #[test]
    fn test_resolve_ambiguous_and_missing() {
        let tasks = vec![task_with_id("abc123"), task_with_id("abd456")];
        assert!(matches!(
            resolve_task(&tasks, "ab"),
            Err(CliError::AmbiguousId { count: 2, .. })
        ));
        assert!(matches!(resolve_task(&tasks, "zz"), Err(CliError::TaskNotFound(_))));
        assert!(matches!(resolve_task(&tasks, " "), Err(CliError::TaskNotFound(_))));
    }

    #[test]
    fn test_exact_id_beats_longer_match() {
        let tasks = vec![task_with_id("ab"), task_with_id("abc")];
        assert_eq!(resolve_task(&tasks, "ab").unwrap(), "ab");
    }

    #[test]
    fn test_resolve_subtask() {
        let mut task = task_with_id("t1");
        let mut sub = Subtask::new("step");
        sub.id = "s-1".into();
        task.subtasks.push(sub);
        assert_eq!(resolve_subtask(&task, "s-").unwrap(), "s-1");
        assert!(matches!(
            resolve_subtask(&task, "x"),
            Err(CliError::SubtaskNotFound(_))
        ));
    }

    #[test]
    fn test_add_extracts_inline_tags() {
        let store = store();
        let args = AddArgs {
            title: vec!["Buy".into(), "milk".into(), "#Errand".into()],
            description: None,
            priority: Some("high".into()),
            due: None,
            tags: vec!["home,errand".into()],
        };
        cmd_add(&store, args, false, Utc::now()).unwrap();
        let task = store.tasks()[0].clone();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.tags, vec!["errand", "home"]);
    }

    #[test]
    fn test_add_rejects_tag_only_title() {
        let store = store();
        let args = AddArgs {
            title: vec!["#errand".into()],
            description: None,
            priority: None,
            due: None,
            tags: vec![],
        };
        assert!(cmd_add(&store, args, false, Utc::now()).is_err());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn test_edit_tags_and_empty_edit() {
        let store = store();
        let id = store.add_task(TaskDraft {
            title: "t".into(),
            tags: vec!["a".into(), "b".into()],
            ..Default::default()
        });
        let args = EditArgs {
            id: id.clone(),
            title: None,
            description: None,
            priority: None,
            due: None,
            add_tags: vec!["c".into()],
            rm_tags: vec!["#A".into()],
        };
        cmd_edit(&store, args, false, Utc::now()).unwrap();
        assert_eq!(store.task(&id).unwrap().tags, vec!["b", "c"]);

        let empty = EditArgs {
            id,
            title: None,
            description: None,
            priority: None,
            due: None,
            add_tags: vec![],
            rm_tags: vec![],
        };
        let err = cmd_edit(&store, empty, false, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "nothing to change");
    }

    #[test]
    fn test_list_options_reject_unknown_values() {
        let args = ListArgs {
            search: None,
            status: Some("sleeping".into()),
            priority: None,
            tag: None,
            due: None,
            sort: None,
            asc: false,
        };
        assert!(matches!(
            list_options(args),
            Err(CliError::InvalidValue { what: "status", .. })
        ));
    }

    #[test]
    fn test_list_options_disable_reorder_when_filtered() {
        let args = ListArgs {
            search: None,
            status: None,
            priority: None,
            tag: Some("#Work".into()),
            due: None,
            sort: None,
            asc: false,
        };
        let opts = list_options(args).unwrap();
        assert_eq!(opts.filter.tag.as_deref(), Some("work"));
        assert!(!opts.can_reorder());
    }
}
