//! Usage: Small filesystem helpers shared across infra adapters (atomic writes, optional reads).

use std::path::Path;

pub(crate) fn read_optional_file(path: &Path) -> Result<Option<Vec<u8>>, String> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read(path)
        .map(Some)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))
}

pub(crate) fn read_optional_string(path: &Path) -> Result<Option<String>, String> {
    let Some(bytes) = read_optional_file(path)? else {
        return Ok(None);
    };
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| format!("failed to decode {} as utf-8: {e}", path.display()))
}

pub(crate) fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create dir {}: {e}", parent.display()))?;
    }

    let file_name = path.file_name().and_then(|v| v.to_str()).unwrap_or("file");
    let tmp_path = path.with_file_name(format!("{file_name}.tc-tmp"));

    std::fs::write(&tmp_path, bytes)
        .map_err(|e| format!("failed to write temp file {}: {e}", tmp_path.display()))?;

    // Windows rename requires target not to exist.
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("failed to finalize file {}: {e}", path.display()))?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TMP_DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    pub(crate) fn unique_tmp_dir(tag: &str) -> std::path::PathBuf {
        let seq = TMP_DIR_SEQ.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "travel_companion_{tag}_test_{nanos}_{}_{}",
            std::process::id(),
            seq
        ));
        std::fs::create_dir_all(&dir).expect("create tmp dir");
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::unique_tmp_dir;
    use super::*;

    #[test]
    fn unique_tmp_dir_is_unique_across_calls() {
        let a = unique_tmp_dir("fs");
        let b = unique_tmp_dir("fs");
        assert_ne!(a, b);
        let _ = std::fs::remove_dir_all(&a);
        let _ = std::fs::remove_dir_all(&b);
    }

    #[test]
    fn read_optional_file_missing_is_none() {
        let dir = unique_tmp_dir("fs");
        let path = dir.join("missing.txt");
        let out = read_optional_file(&path).expect("read_optional_file");
        assert!(out.is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_file_atomic_creates_parent_and_writes_bytes() {
        let dir = unique_tmp_dir("fs");
        let path = dir.join("a").join("b").join("file.txt");
        write_file_atomic(&path, b"hello").expect("write_file_atomic");
        let got = read_optional_file(&path)
            .expect("read_optional_file")
            .expect("file exists");
        assert_eq!(got, b"hello");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_file_atomic_replaces_existing_content() {
        let dir = unique_tmp_dir("fs");
        let path = dir.join("file.txt");
        write_file_atomic(&path, b"v1").expect("write v1");
        write_file_atomic(&path, b"v2").expect("write v2");
        assert_eq!(
            read_optional_string(&path).expect("read").as_deref(),
            Some("v2")
        );
        assert!(!dir.join("file.txt.tc-tmp").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_optional_string_rejects_invalid_utf8() {
        let dir = unique_tmp_dir("fs");
        let path = dir.join("bin.dat");
        std::fs::write(&path, [0xff, 0xfe, 0xfd]).expect("write");
        let err = read_optional_string(&path).unwrap_err();
        assert!(err.contains("utf-8"), "{err}");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
