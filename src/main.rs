use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use clap::{Parser, Subcommand};
use colored::*;

use crate::{
    models::{
        analytics::{AnalyticsFilter, TimeRange},
        store::{Store, VaultConfig},
        task::{Priority, Task, TaskStatus},
    },
    services::{
        analytics::compute_analytics,
        tasks::{
            AddTaskError, AddTaskParameters, CompleteTaskError, CompleteTaskParameters,
            DeleteTaskError, DeleteTaskParameters, RestoreTaskError, RestoreTaskParameters,
            StartTaskError, StartTaskParameters, add_task, complete_task, delete_task,
            restore_task, start_task,
        },
    },
    storage::{Storage, StorageError, json::JsonFileStorage},
};

mod crypto;
mod models;
mod services;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "tempo",
    about = "A terminal productivity tracker with analytics and an encrypted store"
)]
struct Cli {
    /// Passphrase for an encrypted store (falls back to TEMPO_PASSPHRASE)
    #[arg(long, global = true)]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Add notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Assign a category
        #[arg(short, long)]
        category: Option<String>,

        /// Set a priority
        #[arg(short, long, value_enum, default_value = "medium")]
        priority: Priority,

        /// Set a due date (YYYY-MM-DD)
        #[arg(short, long)]
        due: Option<String>,
    },

    /// List active tasks
    List {
        /// Only show tasks with this status
        #[arg(short, long, value_enum)]
        status: Option<TaskStatus>,

        /// Only show tasks in this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Mark a task as in progress
    Start { task_number_or_fuzzy_name: String },

    /// Complete a task
    Done { task_number_or_fuzzy_name: String },

    /// Delete a task (kept in trash, restorable)
    Delete { task_number_or_fuzzy_name: String },

    /// Restore a deleted task
    Restore { task_number: u64 },

    /// Show deleted tasks
    Trash,

    /// Show the analytics snapshot
    Stats {
        /// Time window anchored at today
        #[arg(short, long, value_enum, default_value = "30d")]
        range: TimeRange,

        /// Restrict to one category
        #[arg(short, long)]
        category: Option<String>,

        /// Restrict to one status
        #[arg(short, long, value_enum)]
        status: Option<TaskStatus>,

        /// Print the snapshot as JSON instead of rendering it
        #[arg(long)]
        json: bool,
    },

    /// Manage field encryption for the store
    #[command(subcommand)]
    Vault(VaultCommands),
}

#[derive(Debug, Subcommand)]
enum VaultCommands {
    /// Enable field encryption (titles and notes are encrypted at rest)
    Init,
    /// Show whether field encryption is enabled
    Status,
}

fn main() {
    let cli = Cli::parse();

    let passphrase = cli
        .passphrase
        .clone()
        .or_else(|| std::env::var("TEMPO_PASSPHRASE").ok());

    // Initialize storage
    let storage_path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tempo")
        .join("store.json");

    // Create parent directory if it doesn't exist
    if let Some(parent) = storage_path.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            eprintln!("Error: Failed to create data directory: {}", e);
            std::process::exit(1);
        });
    }

    let storage = JsonFileStorage::new(storage_path, passphrase.clone());

    let mut store = match storage.load() {
        Ok(store) => store,
        Err(StorageError::VaultLocked)
            if matches!(cli.command, Some(Commands::Vault(VaultCommands::Status))) =>
        {
            println!(
                "Field encryption: {} (locked, no passphrase provided)",
                "enabled".green()
            );
            return;
        }
        Err(e) => {
            eprintln!("Error: Failed to load store: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Add {
            title,
            notes,
            category,
            priority,
            due,
        }) => {
            let params = AddTaskParameters {
                title,
                notes,
                category,
                priority,
                due_date: due,
            };

            match add_task(&mut store, &storage, params) {
                Ok(task) => {
                    println!("✓ Task added: {}", task.title);
                    println!("  #{}", task.task_number);
                    if let Some(category) = &task.category {
                        println!("  Category: {}", category);
                    }
                    if let Some(due) = task.due_date {
                        println!("  Due: {}", due);
                    }
                }
                Err(AddTaskError::InvalidDueDate(date_str, error)) => {
                    eprintln!("Error: Invalid due date '{}': {}", date_str, error);
                    eprintln!("\nExpected format: YYYY-MM-DD (e.g., 2026-09-01)");
                    std::process::exit(1);
                }
                Err(AddTaskError::Storage(e)) => {
                    eprintln!("Error: Failed to save task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::List { status, category }) => {
            render_list(&store, status, category);
        }
        Some(Commands::Start {
            task_number_or_fuzzy_name,
        }) => {
            let params = StartTaskParameters {
                task_number_or_fuzzy_name,
            };

            match start_task(&mut store, &storage, params) {
                Ok(task) => {
                    println!("◐ Task started: {}", task.title);
                    println!("  #{}", task.task_number);
                }
                Err(StartTaskError::TaskNotFound(identifier)) => {
                    eprintln!("Error: Task '{}' not found", identifier);
                    std::process::exit(1);
                }
                Err(StartTaskError::AmbiguousTaskName(titles)) => {
                    eprintln!("Error: Task name is ambiguous. Multiple tasks found:");
                    for title in titles {
                        eprintln!("  - {}", title);
                    }
                    eprintln!("\nPlease be more specific or use the task number.");
                    std::process::exit(1);
                }
                Err(StartTaskError::TaskAlreadyCompleted(title)) => {
                    eprintln!("Error: Task '{}' is already completed", title);
                    std::process::exit(1);
                }
                Err(StartTaskError::Storage(e)) => {
                    eprintln!("Error: Failed to save task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Done {
            task_number_or_fuzzy_name,
        }) => {
            let params = CompleteTaskParameters {
                task_number_or_fuzzy_name,
            };

            match complete_task(&mut store, &storage, params) {
                Ok(task) => {
                    println!("✓ Task completed: {}", task.title);
                    println!("  #{}", task.task_number);
                }
                Err(CompleteTaskError::TaskNotFound(identifier)) => {
                    eprintln!("Error: Task '{}' not found", identifier);
                    std::process::exit(1);
                }
                Err(CompleteTaskError::AmbiguousTaskName(titles)) => {
                    eprintln!("Error: Task name is ambiguous. Multiple tasks found:");
                    for title in titles {
                        eprintln!("  - {}", title);
                    }
                    eprintln!("\nPlease be more specific or use the task number.");
                    std::process::exit(1);
                }
                Err(CompleteTaskError::Storage(e)) => {
                    eprintln!("Error: Failed to save task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Delete {
            task_number_or_fuzzy_name,
        }) => {
            let params = DeleteTaskParameters {
                task_number_or_fuzzy_name,
            };

            match delete_task(&mut store, &storage, params) {
                Ok(task) => {
                    println!("✓ Task deleted: {}", task.title);
                    println!("  Restore with: tempo restore {}", task.task_number);
                }
                Err(DeleteTaskError::TaskNotFound(identifier)) => {
                    eprintln!("Error: Task '{}' not found", identifier);
                    std::process::exit(1);
                }
                Err(DeleteTaskError::TaskAlreadyDeleted(title)) => {
                    eprintln!("Error: Task '{}' is already deleted", title);
                    std::process::exit(1);
                }
                Err(DeleteTaskError::AmbiguousTaskName(titles)) => {
                    eprintln!("Error: Task name is ambiguous. Multiple tasks found:");
                    for title in titles {
                        eprintln!("  - {}", title);
                    }
                    eprintln!("\nPlease be more specific or use the task number.");
                    std::process::exit(1);
                }
                Err(DeleteTaskError::Storage(e)) => {
                    eprintln!("Error: Failed to delete task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Restore { task_number }) => {
            let params = RestoreTaskParameters { task_number };

            match restore_task(&mut store, &storage, params) {
                Ok(task) => {
                    println!("✓ Task restored: {}", task.title);
                    println!("  #{}", task.task_number);
                }
                Err(RestoreTaskError::TaskNotFound(identifier)) => {
                    eprintln!("Error: Task '{}' not found", identifier);
                    std::process::exit(1);
                }
                Err(RestoreTaskError::TaskNotDeleted(title)) => {
                    eprintln!("Error: Task '{}' is not deleted", title);
                    std::process::exit(1);
                }
                Err(RestoreTaskError::Storage(e)) => {
                    eprintln!("Error: Failed to restore task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Trash) => {
            let mut deleted_tasks: Vec<_> = store.get_deleted_tasks().collect();

            if deleted_tasks.is_empty() {
                println!("Trash is empty");
            } else {
                deleted_tasks.sort_by_key(|t| t.task_number);
                ui::render_view_header("Trash", deleted_tasks.len());
                for task in deleted_tasks {
                    ui::render_task_line(task, false);
                }
            }
        }
        Some(Commands::Stats {
            range,
            category,
            status,
            json,
        }) => {
            let filter = AnalyticsFilter {
                time_range: range,
                category,
                status,
            };
            let data = compute_analytics(&store.tasks, &filter, &jiff::Zoned::now());

            if json {
                match serde_json::to_string_pretty(&data) {
                    Ok(output) => println!("{}", output),
                    Err(e) => {
                        eprintln!("Error: Failed to serialize analytics: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                ui::render_stats(&data, range);
            }
        }
        Some(Commands::Vault(VaultCommands::Init)) => {
            if store.vault.is_some() {
                eprintln!("Error: Field encryption is already enabled for this store");
                std::process::exit(1);
            }

            let Some(passphrase) = passphrase else {
                eprintln!("Error: A passphrase is required to enable field encryption");
                eprintln!("\nPass --passphrase or set TEMPO_PASSPHRASE.");
                std::process::exit(1);
            };

            let salt = crypto::generate_salt();
            store.vault = Some(VaultConfig {
                salt: B64.encode(salt),
                verifier: crypto::hash_password(
                    &passphrase,
                    &salt,
                    crypto::DEFAULT_PBKDF2_ITERATIONS,
                ),
                iterations: crypto::DEFAULT_PBKDF2_ITERATIONS,
            });

            match storage.save(&store) {
                Ok(()) => {
                    println!("✓ Field encryption enabled");
                    println!("  Task titles and notes are now encrypted at rest.");
                    println!("  Keep the passphrase safe: it cannot be recovered.");
                }
                Err(e) => {
                    eprintln!("Error: Failed to enable field encryption: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Vault(VaultCommands::Status)) => match &store.vault {
            Some(config) => {
                println!(
                    "Field encryption: {} (unlocked, PBKDF2 iterations: {})",
                    "enabled".green(),
                    config.iterations
                );
            }
            None => {
                println!("Field encryption: {}", "disabled".dimmed());
                println!("\nEnable it with: tempo vault init --passphrase <passphrase>");
            }
        },
        None => {
            // Default: show the active task list (same as `tempo list`)
            render_list(&store, None, None);
        }
    }
}

/// Render active tasks, grouped by status unless a status filter is given.
fn render_list(store: &Store, status: Option<TaskStatus>, category: Option<String>) {
    let tasks: Vec<&Task> = store
        .get_active_tasks()
        .filter(|t| match &category {
            Some(category) => t.category_name() == category.as_str(),
            None => true,
        })
        .filter(|t| match status {
            Some(status) => t.status == status,
            // Grouped view only shows open work
            None => t.status != TaskStatus::Completed,
        })
        .collect();

    if tasks.is_empty() {
        println!("No tasks found");
        return;
    }

    if let Some(status) = status {
        let mut tasks = tasks;
        tasks.sort_by_key(|t| t.task_number);

        ui::render_view_header(status.label(), tasks.len());
        for task in tasks {
            ui::render_task_line(task, ui::is_overdue(task));
        }
        return;
    }

    let mut overdue_tasks: Vec<&Task> = tasks
        .iter()
        .copied()
        .filter(|t| ui::is_overdue(t))
        .collect();
    let mut in_progress: Vec<&Task> = tasks
        .iter()
        .copied()
        .filter(|t| !ui::is_overdue(t) && t.status == TaskStatus::InProgress)
        .collect();
    let mut pending: Vec<&Task> = tasks
        .iter()
        .copied()
        .filter(|t| !ui::is_overdue(t) && t.status == TaskStatus::Pending)
        .collect();

    overdue_tasks.sort_by_key(|t| t.task_number);
    in_progress.sort_by_key(|t| t.task_number);
    pending.sort_by_key(|t| t.task_number);

    ui::render_view_header("Tasks", tasks.len());

    if !overdue_tasks.is_empty() {
        ui::render_section_header("Overdue");
        for task in overdue_tasks {
            ui::render_task_line(task, true);
        }
    }

    if !in_progress.is_empty() {
        ui::render_section_header("In Progress");
        for task in in_progress {
            ui::render_task_line(task, false);
        }
    }

    if !pending.is_empty() {
        for task in pending {
            ui::render_task_line(task, false);
        }
    }
}
