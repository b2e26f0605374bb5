use jiff::civil::Date;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        store::Store,
        task::{Priority, Task, TaskStatus},
    },
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum AddTaskError {
    #[error("Invalid due date '{0}': {1}")]
    InvalidDueDate(String, String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct AddTaskParameters {
    pub title: String,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    pub due_date: Option<String>,
}

pub fn add_task(
    store: &mut Store,
    storage: &impl Storage,
    parameters: AddTaskParameters,
) -> Result<Task, AddTaskError> {
    // 1. Parse the due date if provided
    let due_date = if let Some(due_str) = parameters.due_date {
        Some(
            due_str
                .parse::<Date>()
                .map_err(|e| AddTaskError::InvalidDueDate(due_str.clone(), e.to_string()))?,
        )
    } else {
        None
    };

    // 2. Create the task (task_number will be assigned by store.add_task)
    let task = Task {
        id: Uuid::new_v4(),
        task_number: 0,
        title: parameters.title,
        notes: parameters.notes,
        status: TaskStatus::Pending,
        priority: parameters.priority,
        category: parameters.category,
        due_date,
        completed_at: None,
        deleted_at: None,
        created_at: jiff::Timestamp::now(),
    };

    let task_id = task.id;

    // 3. Add to store (assigns task_number) and persist
    store.add_task(task);
    storage.save(store)?;

    // 4. Return the created task (with the assigned task_number)
    Ok(store
        .get_task(task_id)
        .cloned()
        .unwrap_or_else(Task::default))
}

/// Outcome of resolving a user-supplied `<number-or-name>` argument.
enum Lookup {
    Found(Task),
    NotFound,
    Ambiguous(Vec<String>),
}

/// Resolves a task by number first, falling back to case-insensitive fuzzy
/// matching against active task titles.
fn resolve_task(store: &Store, number_or_fuzzy_name: &str) -> Lookup {
    if let Ok(task_number) = number_or_fuzzy_name.parse::<u64>() {
        return match store.get_task_by_number(task_number) {
            Some(task) => Lookup::Found(task.clone()),
            None => Lookup::NotFound,
        };
    }

    let needle = number_or_fuzzy_name.to_lowercase();
    let matching: Vec<&Task> = store
        .get_active_tasks()
        .filter(|t| t.title.to_lowercase().contains(&needle))
        .collect();

    match matching.len() {
        0 => Lookup::NotFound,
        1 => Lookup::Found(matching[0].clone()),
        _ => Lookup::Ambiguous(matching.iter().map(|t| t.title.clone()).collect()),
    }
}

#[derive(Debug, Error)]
pub enum StartTaskError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task name is ambiguous. Multiple tasks found: {}", .0.join(", "))]
    AmbiguousTaskName(Vec<String>),

    #[error("Task '{0}' is already completed")]
    TaskAlreadyCompleted(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct StartTaskParameters {
    pub task_number_or_fuzzy_name: String,
}

pub fn start_task(
    store: &mut Store,
    storage: &impl Storage,
    parameters: StartTaskParameters,
) -> Result<Task, StartTaskError> {
    let task = match resolve_task(store, &parameters.task_number_or_fuzzy_name) {
        Lookup::Found(task) => task,
        Lookup::NotFound => {
            return Err(StartTaskError::TaskNotFound(
                parameters.task_number_or_fuzzy_name,
            ));
        }
        Lookup::Ambiguous(titles) => return Err(StartTaskError::AmbiguousTaskName(titles)),
    };

    if task.status == TaskStatus::Completed {
        return Err(StartTaskError::TaskAlreadyCompleted(task.title));
    }

    let mut updated_task = task;
    updated_task.status = TaskStatus::InProgress;

    store.update_task(updated_task.clone());
    storage.save(store)?;

    Ok(updated_task)
}

#[derive(Debug, Error)]
pub enum CompleteTaskError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task name is ambiguous. Multiple tasks found: {}", .0.join(", "))]
    AmbiguousTaskName(Vec<String>),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct CompleteTaskParameters {
    pub task_number_or_fuzzy_name: String,
}

pub fn complete_task(
    store: &mut Store,
    storage: &impl Storage,
    parameters: CompleteTaskParameters,
) -> Result<Task, CompleteTaskError> {
    let task = match resolve_task(store, &parameters.task_number_or_fuzzy_name) {
        Lookup::Found(task) => task,
        Lookup::NotFound => {
            return Err(CompleteTaskError::TaskNotFound(
                parameters.task_number_or_fuzzy_name,
            ));
        }
        Lookup::Ambiguous(titles) => return Err(CompleteTaskError::AmbiguousTaskName(titles)),
    };

    let mut updated_task = task;
    updated_task.status = TaskStatus::Completed;
    updated_task.completed_at = Some(jiff::Timestamp::now());

    store.update_task(updated_task.clone());
    storage.save(store)?;

    Ok(updated_task)
}

#[derive(Debug, Error)]
pub enum DeleteTaskError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task '{0}' is already deleted")]
    TaskAlreadyDeleted(String),

    #[error("Task name is ambiguous. Multiple tasks found: {}", .0.join(", "))]
    AmbiguousTaskName(Vec<String>),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct DeleteTaskParameters {
    pub task_number_or_fuzzy_name: String,
}

pub fn delete_task(
    store: &mut Store,
    storage: &impl Storage,
    parameters: DeleteTaskParameters,
) -> Result<Task, DeleteTaskError> {
    let task = match resolve_task(store, &parameters.task_number_or_fuzzy_name) {
        Lookup::Found(task) => task,
        Lookup::NotFound => {
            return Err(DeleteTaskError::TaskNotFound(
                parameters.task_number_or_fuzzy_name,
            ));
        }
        Lookup::Ambiguous(titles) => return Err(DeleteTaskError::AmbiguousTaskName(titles)),
    };

    if task.deleted_at.is_some() {
        return Err(DeleteTaskError::TaskAlreadyDeleted(task.title));
    }

    let mut updated_task = task;
    updated_task.deleted_at = Some(jiff::Timestamp::now());

    store.update_task(updated_task.clone());
    storage.save(store)?;

    Ok(updated_task)
}

#[derive(Debug, Error)]
pub enum RestoreTaskError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task '{0}' is not deleted")]
    TaskNotDeleted(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct RestoreTaskParameters {
    pub task_number: u64,
}

pub fn restore_task(
    store: &mut Store,
    storage: &impl Storage,
    parameters: RestoreTaskParameters,
) -> Result<Task, RestoreTaskError> {
    let task = store
        .get_task_by_number(parameters.task_number)
        .cloned()
        .ok_or_else(|| RestoreTaskError::TaskNotFound(parameters.task_number.to_string()))?;

    if task.deleted_at.is_none() {
        return Err(RestoreTaskError::TaskNotDeleted(task.title));
    }

    let mut restored_task = task;
    restored_task.deleted_at = None;

    store.update_task(restored_task.clone());
    storage.save(store)?;

    Ok(restored_task)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Storage stub so service tests never touch the filesystem.
    struct NullStorage;

    impl Storage for NullStorage {
        fn load(&self) -> Result<Store, StorageError> {
            Ok(Store::default())
        }

        fn save(&self, _store: &Store) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn add(store: &mut Store, title: &str) -> Task {
        add_task(
            store,
            &NullStorage,
            AddTaskParameters {
                title: String::from(title),
                notes: None,
                category: None,
                priority: Priority::Medium,
                due_date: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_add_assigns_sequential_numbers() {
        let mut store = Store::default();
        let first = add(&mut store, "First");
        let second = add(&mut store, "Second");

        assert_eq!(first.task_number, 1);
        assert_eq!(second.task_number, 2);
        assert_eq!(first.status, TaskStatus::Pending);
    }

    #[test]
    fn test_add_rejects_bad_due_date() {
        let mut store = Store::default();
        let result = add_task(
            &mut store,
            &NullStorage,
            AddTaskParameters {
                title: String::from("Dated"),
                notes: None,
                category: None,
                priority: Priority::Low,
                due_date: Some(String::from("not-a-date")),
            },
        );

        assert!(matches!(result, Err(AddTaskError::InvalidDueDate(..))));
        assert!(store.tasks.is_empty());
    }

    #[test]
    fn test_complete_by_number_sets_status_and_timestamp() {
        let mut store = Store::default();
        let task = add(&mut store, "Finish me");

        let completed = complete_task(
            &mut store,
            &NullStorage,
            CompleteTaskParameters {
                task_number_or_fuzzy_name: task.task_number.to_string(),
            },
        )
        .unwrap();

        assert_eq!(completed.status, TaskStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(
            store.get_task(task.id).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn test_fuzzy_match_is_case_insensitive() {
        let mut store = Store::default();
        add(&mut store, "Review the quarterly report");

        let started = start_task(
            &mut store,
            &NullStorage,
            StartTaskParameters {
                task_number_or_fuzzy_name: String::from("QUARTERLY"),
            },
        )
        .unwrap();

        assert_eq!(started.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_fuzzy_match_reports_ambiguity() {
        let mut store = Store::default();
        add(&mut store, "Write report");
        add(&mut store, "Review report");

        let result = complete_task(
            &mut store,
            &NullStorage,
            CompleteTaskParameters {
                task_number_or_fuzzy_name: String::from("report"),
            },
        );

        match result {
            Err(CompleteTaskError::AmbiguousTaskName(titles)) => assert_eq!(titles.len(), 2),
            _ => panic!("Expected AmbiguousTaskName error"),
        }
    }

    #[test]
    fn test_start_completed_task_is_rejected() {
        let mut store = Store::default();
        let task = add(&mut store, "Done already");
        complete_task(
            &mut store,
            &NullStorage,
            CompleteTaskParameters {
                task_number_or_fuzzy_name: task.task_number.to_string(),
            },
        )
        .unwrap();

        let result = start_task(
            &mut store,
            &NullStorage,
            StartTaskParameters {
                task_number_or_fuzzy_name: task.task_number.to_string(),
            },
        );

        assert!(matches!(result, Err(StartTaskError::TaskAlreadyCompleted(_))));
    }

    #[test]
    fn test_delete_and_restore_round_trip() {
        let mut store = Store::default();
        let task = add(&mut store, "Ephemeral");

        let deleted = delete_task(
            &mut store,
            &NullStorage,
            DeleteTaskParameters {
                task_number_or_fuzzy_name: task.task_number.to_string(),
            },
        )
        .unwrap();
        assert!(deleted.deleted_at.is_some());
        assert_eq!(store.get_active_tasks().count(), 0);

        let restored = restore_task(
            &mut store,
            &NullStorage,
            RestoreTaskParameters {
                task_number: task.task_number,
            },
        )
        .unwrap();
        assert!(restored.deleted_at.is_none());
        assert_eq!(store.get_active_tasks().count(), 1);
    }

    #[test]
    fn test_delete_twice_is_rejected() {
        let mut store = Store::default();
        let task = add(&mut store, "Once only");
        let number = task.task_number.to_string();

        delete_task(
            &mut store,
            &NullStorage,
            DeleteTaskParameters {
                task_number_or_fuzzy_name: number.clone(),
            },
        )
        .unwrap();

        let result = delete_task(
            &mut store,
            &NullStorage,
            DeleteTaskParameters {
                task_number_or_fuzzy_name: number,
            },
        );
        assert!(matches!(result, Err(DeleteTaskError::TaskAlreadyDeleted(_))));
    }
}
