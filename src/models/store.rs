use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::Task;

/// Current schema version
pub const CURRENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct Store {
    pub version: u32,
    pub tasks: Vec<Task>,
    /// Next user-facing task number to hand out
    pub next_task_number: u64,
    /// Present once field encryption has been enabled for this store
    pub vault: Option<VaultConfig>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            tasks: vec![],
            next_task_number: 1,
            vault: None,
        }
    }
}

impl Store {
    /// Adds a task, assigning it the next task number.
    pub fn add_task(&mut self, mut task: Task) {
        task.task_number = self.next_task_number;
        self.next_task_number += 1;
        self.tasks.push(task);
    }

    pub fn get_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_task_by_number(&self, task_number: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_number == task_number)
    }

    /// Replaces a task in place, matched by id.
    pub fn update_task(&mut self, task: Task) {
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task;
        }
    }

    /// Tasks that have not been soft-deleted.
    pub fn get_active_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.deleted_at.is_none())
    }

    pub fn get_deleted_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.deleted_at.is_some())
    }
}

/// Parameters for the store's field encryption, written once by `vault init`.
#[derive(Serialize, Deserialize, Clone)]
pub struct VaultConfig {
    /// Base64 PBKDF2 salt
    pub salt: String,
    /// Base64 PBKDF2 digest of the passphrase, used to reject wrong passphrases early
    pub verifier: String,
    /// PBKDF2 iteration count the salt and verifier were produced with
    pub iterations: u32,
}
