//! Small shared helpers.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::Result;

/// Open a file for appending, creating parent directories as needed.
pub fn open_file_for_append<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod utils_test {
    use super::*;

    #[test]
    fn test_open_file_for_append_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.log");

        let file = open_file_for_append(&path).expect("open failed");
        drop(file);

        assert!(path.exists());
    }
}
