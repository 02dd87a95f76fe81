//! Cache gate and atomic artifact writes
//!
//! An artifact counts as generated as soon as its file exists. Files are
//! therefore only ever created by renaming a fully written temporary file
//! into place, so a crash never leaves a partial file at the final path.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

/// True when the artifact at `path` still has to be produced
pub fn should_generate(path: &Path) -> bool {
    !path.exists()
}

/// Write `bytes` to `path` through a sibling temp file and an atomic rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Serialize `value` as JSON with sorted keys and write it atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), crate::GenError> {
    let value = sort_keys(serde_json::to_value(value)?);
    let bytes = serde_json::to_vec(&value)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Rebuild every object with its keys in ascending order
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_gate_tracks_presence_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("overview.png");
        assert!(should_generate(&path));

        std::fs::write(&path, b"").unwrap();
        // Even an empty file counts as cached
        assert!(!should_generate(&path));
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("trial-0001.png");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_json_sorts_keys() {
        #[derive(Serialize)]
        struct Doc {
            zeta: u32,
            alpha: u32,
            nested: serde_json::Value,
        }

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        let doc = Doc {
            zeta: 1,
            alpha: 2,
            nested: json!({"b": 1, "a": 2}),
        };
        write_json(&path, &doc).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"alpha":2,"nested":{"a":2,"b":1},"zeta":1}"#);
    }

    #[test]
    fn test_sort_keys_reorders_nested_objects() {
        let mut inner = serde_json::Map::new();
        inner.insert("y".to_string(), json!(1));
        inner.insert("x".to_string(), json!(2));
        let mut outer = serde_json::Map::new();
        outer.insert("zeta".to_string(), json!([Value::Object(inner)]));
        outer.insert("alpha".to_string(), json!(null));

        let sorted = sort_keys(Value::Object(outer));
        let keys: Vec<&String> = sorted.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["alpha", "zeta"]);
        let inner_keys: Vec<&String> = sorted["zeta"][0].as_object().unwrap().keys().collect();
        assert_eq!(inner_keys, ["x", "y"]);
    }
}
