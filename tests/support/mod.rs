use std::fs;
use std::path::{Path, PathBuf};

/// Writes `files` (relative path, content) under `root`, creating parent directories
#[allow(dead_code)]
pub fn write_project(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
    }
}

#[allow(dead_code)]
pub fn buildmeta_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_buildmeta"))
}
