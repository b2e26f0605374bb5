use std::path::PathBuf;

use serde_json::Value;

use crate::storage::StorageError;

type MigrationFn = fn(Value) -> Result<Value, StorageError>;

fn get_migrations() -> Vec<MigrationFn> {
    vec![
        // Future migrations will be added here
    ]
}

/// Schema version of an already-parsed store file. A missing version field
/// means v1, our first versioned schema; a non-numeric one is a parse error.
pub fn detect_version(data: &Value) -> Result<u32, StorageError> {
    match data.get("version") {
        Some(v) => v.as_u64().map(|n| n as u32).ok_or_else(|| {
            // serde_json::Error has no simple constructor, so manufacture one
            let dummy_err = serde_json::from_str::<Value>("invalid").unwrap_err();
            StorageError::ParseFailed {
                path: PathBuf::from("<unknown>"),
                source: dummy_err,
            }
        }),
        None => Ok(1),
    }
}

/// Migrations are applied sequentially: v1→v2→v3→...→target
pub fn apply_migrations(
    mut data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    if from_version == to_version {
        return Ok(data);
    }

    if from_version > to_version {
        return Err(StorageError::FutureVersion(from_version));
    }

    let migrations = get_migrations();

    for version in from_version..to_version {
        // v1→v2 lives at index 0
        let migration_idx = (version - 1) as usize;

        if migration_idx >= migrations.len() {
            return Err(StorageError::UnsupportedVersion(version));
        }

        data = migrations[migration_idx](data)?;
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_version_with_version_field() {
        let data = json!({"version": 2, "tasks": [], "next_task_number": 1, "vault": null});
        assert_eq!(detect_version(&data).unwrap(), 2);
    }

    #[test]
    fn test_detect_version_without_version_field() {
        let data = json!({"tasks": [], "next_task_number": 1, "vault": null});
        assert_eq!(detect_version(&data).unwrap(), 1);
    }

    #[test]
    fn test_detect_version_rejects_non_numeric() {
        let data = json!({"version": "one"});
        assert!(matches!(
            detect_version(&data),
            Err(StorageError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_apply_migrations_same_version() {
        let data = json!({"version": 1});
        let result = apply_migrations(data.clone(), 1, 1).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_apply_migrations_future_version() {
        let data = json!({"version": 5});
        let result = apply_migrations(data, 5, 1);
        assert!(matches!(result, Err(StorageError::FutureVersion(5))));
    }
}
