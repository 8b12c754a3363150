use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::model::task::{Priority, Task};
use crate::parse::due;

/// Completion filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<StatusFilter> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(StatusFilter::All),
            "active" | "open" => Some(StatusFilter::Active),
            "completed" | "done" => Some(StatusFilter::Completed),
            _ => None,
        }
    }
}

/// Due-date bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueBucket {
    #[default]
    All,
    /// due < now
    Overdue,
    /// Within the local calendar day containing now
    Today,
    /// now <= due <= now + 7 days
    ThisWeek,
    /// due > now + 7 days
    Later,
    /// No due date
    NoDate,
}

impl DueBucket {
    pub fn parse(s: &str) -> Option<DueBucket> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(DueBucket::All),
            "overdue" => Some(DueBucket::Overdue),
            "today" => Some(DueBucket::Today),
            "week" | "this-week" => Some(DueBucket::ThisWeek),
            "later" => Some(DueBucket::Later),
            "none" | "no-date" => Some(DueBucket::NoDate),
            _ => None,
        }
    }
}

/// Sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Created,
    Due,
    Priority,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<SortKey> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" | "created-at" => Some(SortKey::Created),
            "due" | "due-date" => Some(SortKey::Due),
            "priority" => Some(SortKey::Priority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Reference instants for due-bucket filtering. Captured once when a bucket
/// is selected so the buckets do not drift while the same view is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
    pub now: DateTime<Utc>,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
}

impl DueWindow {
    /// Window for `now`, with day boundaries taken in `now`'s time zone
    pub fn at<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let tz = now.timezone();
        DueWindow {
            now: now.with_timezone(&Utc),
            day_start: due::start_of_day(today, &tz),
            day_end: due::end_of_day(today, &tz),
        }
    }

    pub fn local_now() -> Self {
        DueWindow::at(Local::now())
    }

    pub fn contains(&self, bucket: DueBucket, due: Option<DateTime<Utc>>) -> bool {
        let week_end = self.now + Duration::days(7);
        match (bucket, due) {
            (DueBucket::All, _) => true,
            (DueBucket::NoDate, due) => due.is_none(),
            (_, None) => false,
            (DueBucket::Overdue, Some(due)) => due < self.now,
            (DueBucket::Today, Some(due)) => self.day_start <= due && due <= self.day_end,
            (DueBucket::ThisWeek, Some(due)) => self.now <= due && due <= week_end,
            (DueBucket::Later, Some(due)) => due > week_end,
        }
    }
}

/// The combined filter predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFilter {
    /// Case-insensitive substring matched against title or description
    pub search: String,
    pub status: StatusFilter,
    /// `None` = any priority
    pub priority: Option<Priority>,
    /// `None` = any tag
    pub tag: Option<String>,
    due: DueBucket,
    window: DueWindow,
}

impl Default for ViewFilter {
    fn default() -> Self {
        ViewFilter {
            search: String::new(),
            status: StatusFilter::All,
            priority: None,
            tag: None,
            due: DueBucket::All,
            window: DueWindow::local_now(),
        }
    }
}

impl ViewFilter {
    /// Select a due bucket, capturing the reference window at this moment
    pub fn set_due(&mut self, bucket: DueBucket, window: DueWindow) {
        self.due = bucket;
        self.window = window;
    }

    pub fn due(&self) -> DueBucket {
        self.due
    }

    pub fn window(&self) -> DueWindow {
        self.window
    }

    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || self.status != StatusFilter::All
            || self.priority.is_some()
            || self.tag.is_some()
            || self.due != DueBucket::All
    }

    /// Reset every constraint
    pub fn clear(&mut self) {
        self.search.clear();
        self.status = StatusFilter::All;
        self.priority = None;
        self.tag = None;
        self.due = DueBucket::All;
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.search.is_empty() {
            let query = self.search.to_lowercase();
            if !task.title.to_lowercase().contains(&query)
                && !task.description.to_lowercase().contains(&query)
            {
                return false;
            }
        }
        match self.status {
            StatusFilter::Active if task.completed => return false,
            StatusFilter::Completed if !task.completed => return false,
            _ => {}
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !task.tags.contains(tag)
        {
            return false;
        }
        self.window.contains(self.due, task.due)
    }
}

/// Filter plus sort
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter: ViewFilter,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ViewOptions {
    /// Drag reordering only maps onto storage order in the unfiltered
    /// "newest first" view.
    pub fn can_reorder(&self) -> bool {
        !self.filter.is_active() && self.sort == SortKey::Created && self.order == SortOrder::Desc
    }
}

/// A computed projection of the collection
#[derive(Debug, Clone)]
pub struct View<'a> {
    pub tasks: Vec<&'a Task>,
    pub total: usize,
    pub can_reorder: bool,
}

/// Filter and sort `tasks`. The sort is stable.
pub fn project<'a>(tasks: &'a [Task], opts: &ViewOptions) -> View<'a> {
    let mut shown: Vec<&Task> = tasks.iter().filter(|t| opts.filter.matches(t)).collect();
    shown.sort_by(|a, b| {
        let ord = compare(a, b, opts.sort);
        match opts.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    View {
        tasks: shown,
        total: tasks.len(),
        can_reorder: opts.can_reorder(),
    }
}

fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Created => a.created_at.cmp(&b.created_at),
        SortKey::Priority => a.priority.cmp(&b.priority),
        // Missing due dates sort as +infinity
        SortKey::Due => match (a.due, b.due) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Every tag used in the collection, sorted and deduplicated
pub fn all_tags(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|t| t.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
