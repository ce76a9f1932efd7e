use serde::{Deserialize, Serialize};

use super::status::LoadStatus;

/// Key of a running task in the task registry.
///
/// Records hold task ids, not tasks; the registry decides whether a task
/// is still alive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Task id for one instance of a service.
    ///
    /// Globbed services can run several instances, so the instance index is
    /// part of the id.
    #[must_use]
    pub fn new(label: &str, instance: usize) -> Self {
        Self(format!("{label}#{instance}"))
    }

    /// The raw id string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A task reported by the service controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Registry key
    pub id: TaskId,
    /// Service label the task belongs to
    pub label: String,
    /// Process id, if running
    pub pid: Option<i32>,
    /// Last exit status, if the task has exited
    pub last_exit: Option<i32>,
}

impl TaskHandle {
    /// Build a handle for instance `instance` of `label`
    #[must_use]
    pub fn new(label: &str, instance: usize, pid: Option<i32>) -> Self {
        Self {
            id: TaskId::new(label, instance),
            label: label.to_string(),
            pid,
            last_exit: None,
        }
    }

    /// Does this task have a live process?
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.pid.is_some()
    }
}

/// What the service controller knows about a label right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    /// Status the controller reports
    pub status: LoadStatus,
    /// Tasks currently associated with the label
    pub tasks: Vec<TaskHandle>,
}

impl ServiceState {
    /// Not loaded, no tasks
    #[must_use]
    pub const fn not_loaded() -> Self {
        Self {
            status: LoadStatus::NotLoaded,
            tasks: Vec::new(),
        }
    }

    /// Loaded with the given tasks; running if any task has a pid
    #[must_use]
    pub fn loaded(tasks: Vec<TaskHandle>) -> Self {
        let status = if tasks.iter().any(TaskHandle::is_running) {
            LoadStatus::Running
        } else {
            LoadStatus::Loaded
        };
        Self { status, tasks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_include_instance() {
        assert_eq!(TaskId::new("com.example.agent", 2).as_str(), "com.example.agent#2");
    }

    #[test]
    fn loaded_state_reflects_pids() {
        let idle = ServiceState::loaded(vec![TaskHandle::new("a", 0, None)]);
        assert_eq!(idle.status, LoadStatus::Loaded);

        let busy = ServiceState::loaded(vec![
            TaskHandle::new("a", 0, None),
            TaskHandle::new("a", 1, Some(412)),
        ]);
        assert_eq!(busy.status, LoadStatus::Running);
    }
}
