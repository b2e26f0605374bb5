use std::{
    fs::{self, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use fs2::FileExt;
use serde_json::{Value, to_string_pretty};
use uuid::Uuid;

use crate::{
    crypto::{self, CryptoSession},
    models::store::{Store, VaultConfig},
    storage::{Storage, StorageError},
};

pub struct JsonFileStorage {
    path: PathBuf,
    /// Passphrase for stores with field encryption enabled; plaintext stores
    /// ignore it.
    passphrase: Option<String>,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf, passphrase: Option<String>) -> Self {
        Self { path, passphrase }
    }

    fn create_backup_dir(&self) -> Result<(), StorageError> {
        let backups_dir = self.get_backup_dir();
        fs::create_dir(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;
        Ok(())
    }

    fn create_backup(&self) -> Result<u64, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        let backup_path = self.get_backup_path();
        let copy_result = fs::copy(&self.path, &backup_path);
        match copy_result {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.create_backup_dir()?;
                self.create_backup()
            }
            Err(e) => Err(StorageError::BackupFailed {
                path: backup_path,
                source: e,
            }),
            Ok(bytes) => Ok(bytes),
        }
    }

    fn cleanup_old_backups(&self) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = match file_entries.len() {
            x if x > 5 => x - 5,
            _ => 0,
        };

        if number_of_files_to_delete == 0 {
            return Ok(());
        }

        for file_path in &file_entries[0..number_of_files_to_delete] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        let parent_store_path = self.path.parent().unwrap_or(Path::new("."));
        parent_store_path.join("backups")
    }

    fn get_backup_path(&self) -> PathBuf {
        let backups_dir = self.get_backup_dir();

        let timestamp = jiff::Timestamp::now().to_string();
        let filename = format!("{:?}-{}", self.path.file_name(), timestamp);

        backups_dir.join(filename)
    }

    /// Builds a crypto session for a store whose `vault` field is set.
    /// Requires the passphrase and checks it against the stored verifier.
    fn build_session(&self, vault: &Value) -> Result<CryptoSession, StorageError> {
        let config: VaultConfig =
            serde_json::from_value(vault.clone()).map_err(|_| StorageError::VaultCorrupt {
                path: self.path.clone(),
            })?;

        let passphrase = self
            .passphrase
            .as_deref()
            .ok_or(StorageError::VaultLocked)?;

        let salt = B64
            .decode(&config.salt)
            .map_err(|_| StorageError::VaultCorrupt {
                path: self.path.clone(),
            })?;

        if !crypto::verify_password(passphrase, &salt, config.iterations, &config.verifier) {
            return Err(StorageError::WrongPassphrase);
        }

        Ok(CryptoSession::derive(passphrase, &salt, config.iterations))
    }

    /// Decrypts every task record's protected fields in place. A field that
    /// cannot be decrypted degrades to a placeholder, never an error.
    fn decrypt_tasks(&self, data: &mut Value) -> Result<(), StorageError> {
        let Some(vault) = data.get("vault").filter(|v| !v.is_null()).cloned() else {
            return Ok(());
        };
        let session = self.build_session(&vault)?;

        if let Some(tasks) = data.get_mut("tasks").and_then(Value::as_array_mut) {
            for task in tasks {
                crypto::decrypt_record(&session, "task", task);
            }
        }
        Ok(())
    }

    /// Encrypts every task record's protected fields in place.
    fn encrypt_tasks(&self, data: &mut Value) -> Result<(), StorageError> {
        let Some(vault) = data.get("vault").filter(|v| !v.is_null()).cloned() else {
            return Ok(());
        };
        let session = self.build_session(&vault)?;

        if let Some(tasks) = data.get_mut("tasks").and_then(Value::as_array_mut) {
            for task in tasks {
                crypto::encrypt_record(&session, "task", task)?;
            }
        }
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Store, StorageError> {
        use crate::models::store::CURRENT_VERSION;
        use crate::storage::migrations::{apply_migrations, detect_version};

        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let mut data: Value =
                    serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;

                let file_version = detect_version(&data)?;

                if file_version > CURRENT_VERSION {
                    return Err(StorageError::FutureVersion(file_version));
                }

                if file_version < CURRENT_VERSION {
                    data = apply_migrations(data, file_version, CURRENT_VERSION)?;
                }

                if let Some(obj) = data.as_object_mut() {
                    obj.insert("version".to_string(), serde_json::json!(CURRENT_VERSION));
                }

                self.decrypt_tasks(&mut data)?;

                let store: Store =
                    serde_json::from_value(data).map_err(|e| StorageError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Store::default()),
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        let mut data =
            serde_json::to_value(store).map_err(|e| StorageError::SerializeFailed { source: e })?;
        self.encrypt_tasks(&mut data)?;

        let json =
            to_string_pretty(&data).map_err(|e| StorageError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        self.create_backup()?;
        self.cleanup_old_backups()?;

        rename(&temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::{
        store::Store,
        task::{Task, TaskStatus},
    };

    const TEST_ITERATIONS: u32 = 1_000;

    fn test_vault(passphrase: &str) -> VaultConfig {
        let salt = crypto::generate_salt();
        VaultConfig {
            salt: B64.encode(salt),
            verifier: crypto::hash_password(passphrase, &salt, TEST_ITERATIONS),
            iterations: TEST_ITERATIONS,
        }
    }

    fn store_with_task(title: &str, notes: Option<&str>) -> Store {
        let mut store = Store::default();
        store.add_task(Task {
            title: String::from(title),
            notes: notes.map(String::from),
            status: TaskStatus::Pending,
            ..Task::default()
        });
        store
    }

    #[test]
    fn test_save_and_load() {
        let store = store_with_task("Some Task", None);
        let storage = JsonFileStorage::new(PathBuf::from("/tmp/tempo_test_store.json"), None);

        if let Err(_) = storage.save(&store) {
            panic!("Should correctly save the store");
        }
        match storage.load() {
            Ok(loaded_store) => {
                assert_eq!(loaded_store.tasks[0].id, store.tasks[0].id);
                assert_eq!(loaded_store.tasks[0].title, "Some Task");
                assert_eq!(loaded_store.next_task_number, 2);
            }
            Err(_) => panic!("Should correctly load the saved store"),
        }
    }

    #[test]
    fn test_load_invalid_json() {
        let path = PathBuf::from("/tmp/tempo_invalid_store.json");

        std::fs::write(&path, "{ this is not valid json }").unwrap();

        let storage = JsonFileStorage::new(path, None);
        let result = storage.load();

        match result {
            Err(StorageError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
    }

    #[test]
    fn test_load_v1_without_version_field() {
        let path = PathBuf::from("/tmp/tempo_v1_store.json");
        let old_json = r#"{
            "tasks": [],
            "next_task_number": 1,
            "vault": null
        }"#;

        std::fs::write(&path, old_json).unwrap();

        let storage = JsonFileStorage::new(path, None);
        let result = storage.load();

        match result {
            Ok(store) => {
                assert_eq!(store.version, crate::models::store::CURRENT_VERSION);
            }
            Err(e) => panic!("Expected successful load, got error: {:?}", e),
        }
    }

    #[test]
    fn test_load_future_version() {
        let path = PathBuf::from("/tmp/tempo_future_store.json");
        let future_json = r#"{
            "version": 999,
            "tasks": [],
            "next_task_number": 1,
            "vault": null
        }"#;

        std::fs::write(&path, future_json).unwrap();

        let storage = JsonFileStorage::new(path, None);
        let result = storage.load();

        match result {
            Err(StorageError::FutureVersion(999)) => {
                // Expected: should fail with FutureVersion error
            }
            _ => panic!("Expected FutureVersion(999) error"),
        }
    }

    #[test]
    fn test_encrypted_store_round_trip() {
        let test_dir = PathBuf::from("/tmp/tempo_vault_roundtrip_test");
        let _ = fs::remove_dir_all(&test_dir);
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("store.json");

        let mut store = store_with_task("Call the bank", Some("account ending 4421"));
        store.vault = Some(test_vault("hunter2"));

        let storage = JsonFileStorage::new(path.clone(), Some(String::from("hunter2")));
        storage.save(&store).unwrap();

        // Protected fields are unreadable on disk, the rest is plain
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("Call the bank"));
        assert!(!raw.contains("account ending 4421"));
        assert!(raw.contains("enc:v1:"));
        assert!(raw.contains("pending"));

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.tasks[0].title, "Call the bank");
        assert_eq!(loaded.tasks[0].notes.as_deref(), Some("account ending 4421"));

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_encrypted_store_without_passphrase_is_locked() {
        let test_dir = PathBuf::from("/tmp/tempo_vault_locked_test");
        let _ = fs::remove_dir_all(&test_dir);
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("store.json");

        let mut store = store_with_task("Secret", None);
        store.vault = Some(test_vault("hunter2"));

        JsonFileStorage::new(path.clone(), Some(String::from("hunter2")))
            .save(&store)
            .unwrap();

        let locked = JsonFileStorage::new(path.clone(), None);
        assert!(matches!(locked.load(), Err(StorageError::VaultLocked)));
        assert!(matches!(
            locked.save(&store),
            Err(StorageError::VaultLocked)
        ));

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_encrypted_store_rejects_wrong_passphrase() {
        let test_dir = PathBuf::from("/tmp/tempo_vault_wrongpass_test");
        let _ = fs::remove_dir_all(&test_dir);
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("store.json");

        let mut store = store_with_task("Secret", None);
        store.vault = Some(test_vault("hunter2"));

        JsonFileStorage::new(path.clone(), Some(String::from("hunter2")))
            .save(&store)
            .unwrap();

        let wrong = JsonFileStorage::new(path, Some(String::from("hunter3")));
        assert!(matches!(wrong.load(), Err(StorageError::WrongPassphrase)));

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_backup_creation_and_cleanup() {
        let test_dir = PathBuf::from("/tmp/tempo_backup_test");
        let _ = fs::remove_dir_all(&test_dir);
        fs::create_dir_all(&test_dir).unwrap();

        let store_path = test_dir.join("store.json");
        let storage = JsonFileStorage::new(store_path.clone(), None);

        for i in 1..=7 {
            let mut store = Store::default();
            store.next_task_number = i;

            storage.save(&store).unwrap();

            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let backups_dir = test_dir.join("backups");
        let backup_count = fs::read_dir(&backups_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count();

        assert_eq!(backup_count, 5, "Should keep exactly 5 backups");

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_backup_directory_created_on_second_save() {
        let test_dir = PathBuf::from("/tmp/tempo_backup_dir_test");
        let _ = fs::remove_dir_all(&test_dir);
        fs::create_dir_all(&test_dir).unwrap();

        let store_path = test_dir.join("store.json");
        let storage = JsonFileStorage::new(store_path.clone(), None);

        let backups_dir = test_dir.join("backups");
        assert!(!backups_dir.exists(), "Backups dir should not exist yet");

        let store = Store::default();
        storage.save(&store).unwrap();

        assert!(
            !backups_dir.exists(),
            "Backups dir should not exist after first save"
        );

        let mut store2 = Store::default();
        store2.next_task_number = 2;
        storage.save(&store2).unwrap();

        assert!(
            backups_dir.exists(),
            "Backups dir should be created on second save"
        );
        assert!(backups_dir.is_dir(), "Backups path should be a directory");

        fs::remove_dir_all(&test_dir).unwrap();
    }
}
