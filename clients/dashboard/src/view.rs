//! View-state derivation and two-phase optimistic mutations.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use taskmaster_atoms::tasks::{Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// A local mutation that has been applied but not yet confirmed by the
/// server. Hand it back to [`TaskView::confirm`] or [`TaskView::rollback`].
#[derive(Debug, Clone, PartialEq)]
#[must_use = "an optimistic change must be confirmed or rolled back"]
pub enum PendingChange {
    Status { task_id: String, previous: TaskStatus },
    Removal { index: usize, task: Task },
}

#[derive(Debug, Clone)]
pub struct TaskView {
    tasks: Vec<Task>,
    filters: BTreeSet<TaskStatus>,
    sort: SortDirection,
}

impl Default for TaskView {
    fn default() -> Self {
        TaskView {
            tasks: Vec::new(),
            filters: TaskStatus::ALL.into_iter().collect(),
            sort: SortDirection::default(),
        }
    }
}

impl TaskView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the local copy with a fresh fetch. Filters and sort survive.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn filters(&self) -> &BTreeSet<TaskStatus> {
        &self.filters
    }

    pub fn set_filter(&mut self, status: TaskStatus, active: bool) {
        if active {
            self.filters.insert(status);
        } else {
            self.filters.remove(&status);
        }
    }

    /// Shows exactly the given statuses; an empty slice shows all of them.
    pub fn show_only(&mut self, statuses: &[TaskStatus]) {
        self.filters = if statuses.is_empty() {
            TaskStatus::ALL.into_iter().collect()
        } else {
            statuses.iter().copied().collect()
        };
    }

    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortDirection) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.reversed();
    }

    /// Tasks whose status is an active filter, ordered by due date. Dateless
    /// tasks come last in either direction; ties keep fetch order.
    pub fn derived(&self) -> Vec<&Task> {
        let mut view: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| self.filters.contains(&t.status))
            .collect();
        view.sort_by(|a, b| compare_due(a, b, self.sort));
        view
    }

    pub fn apply_status(&mut self, task_id: &str, status: TaskStatus) -> Option<PendingChange> {
        let task = self.tasks.iter_mut().find(|t| t.id == task_id)?;
        let previous = task.status;
        task.status = status;
        Some(PendingChange::Status {
            task_id: task_id.to_string(),
            previous,
        })
    }

    pub fn apply_removal(&mut self, task_id: &str) -> Option<PendingChange> {
        let index = self.tasks.iter().position(|t| t.id == task_id)?;
        let task = self.tasks.remove(index);
        Some(PendingChange::Removal { index, task })
    }

    /// The server accepted the change. Local state already reflects it, so
    /// this only consumes the pending change and closes the two-phase update.
    pub fn confirm(&self, change: PendingChange) {
        drop(change);
    }

    /// The server rejected the change; restore the pre-change value.
    pub fn rollback(&mut self, change: PendingChange) {
        match change {
            PendingChange::Status { task_id, previous } => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
                    task.status = previous;
                }
            }
            PendingChange::Removal { index, task } => {
                let index = index.min(self.tasks.len());
                self.tasks.insert(index, task);
            }
        }
    }
}

fn compare_due(a: &Task, b: &Task, sort: SortDirection) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(a_due), Some(b_due)) => match sort {
            SortDirection::Ascending => a_due.cmp(&b_due),
            SortDirection::Descending => b_due.cmp(&a_due),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn task(id: &str, status: TaskStatus, due_day: Option<u32>) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status,
            due_date: due_day.map(|d| Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap()),
            owner_id: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ids(view: &[&Task]) -> Vec<String> {
        view.iter().map(|t| t.id.clone()).collect()
    }

    fn sample_view() -> TaskView {
        let mut view = TaskView::new();
        view.replace(vec![
            task("none", TaskStatus::ToDo, None),
            task("late", TaskStatus::InProgress, Some(20)),
            task("early", TaskStatus::Completed, Some(3)),
            task("mid", TaskStatus::ToDo, Some(10)),
        ]);
        view
    }

    #[test]
    fn sorts_by_due_date_with_dateless_last() {
        let mut view = sample_view();
        assert_eq!(ids(&view.derived()), ["early", "mid", "late", "none"]);
        view.toggle_sort();
        assert_eq!(ids(&view.derived()), ["late", "mid", "early", "none"]);
    }

    #[test]
    fn filters_by_active_statuses() {
        let mut view = sample_view();
        view.set_filter(TaskStatus::ToDo, false);
        assert_eq!(ids(&view.derived()), ["early", "late"]);

        view.show_only(&[TaskStatus::ToDo]);
        assert_eq!(ids(&view.derived()), ["mid", "none"]);

        view.show_only(&[]);
        assert_eq!(view.derived().len(), 4);
    }

    #[test]
    fn status_change_rolls_back_to_previous_value() {
        let mut view = sample_view();
        let pending = view.apply_status("mid", TaskStatus::Completed).unwrap();
        assert_eq!(view.task("mid").unwrap().status, TaskStatus::Completed);
        view.rollback(pending);
        assert_eq!(view.task("mid").unwrap().status, TaskStatus::ToDo);

        let pending = view.apply_status("mid", TaskStatus::InProgress).unwrap();
        view.confirm(pending);
        assert_eq!(view.task("mid").unwrap().status, TaskStatus::InProgress);

        assert!(view.apply_status("ghost", TaskStatus::Completed).is_none());
    }

    #[test]
    fn removal_rolls_back_into_original_slot() {
        let mut view = sample_view();
        let pending = view.apply_removal("late").unwrap();
        assert!(view.task("late").is_none());
        view.rollback(pending);
        let order: Vec<&str> = view.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, ["none", "late", "early", "mid"]);
    }

    fn arb_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::ToDo),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Completed),
        ]
    }

    proptest! {
        #[test]
        fn derived_view_respects_filters_and_direction(
            specs in prop::collection::vec((arb_status(), prop::option::of(1u32..=28)), 0..24),
            active in prop::collection::btree_set(arb_status(), 0..=3),
        ) {
            let tasks: Vec<Task> = specs
                .iter()
                .enumerate()
                .map(|(i, (status, due))| task(&i.to_string(), *status, *due))
                .collect();

            let mut view = TaskView::new();
            view.replace(tasks);
            for status in TaskStatus::ALL {
                view.set_filter(status, active.contains(&status));
            }

            let ascending: Vec<Task> = view.derived().into_iter().cloned().collect();
            prop_assert!(ascending.iter().all(|t| active.contains(&t.status)));

            view.toggle_sort();
            let descending: Vec<Task> = view.derived().into_iter().cloned().collect();

            for list in [&ascending, &descending] {
                let first_dateless = list.iter().position(|t| t.due_date.is_none()).unwrap_or(list.len());
                prop_assert!(list[first_dateless..].iter().all(|t| t.due_date.is_none()));
            }

            let dated = |list: &[Task]| -> Vec<_> {
                list.iter().filter_map(|t| t.due_date).collect()
            };
            let mut reversed = dated(&descending);
            reversed.reverse();
            prop_assert_eq!(dated(&ascending), reversed);
        }
    }
}
