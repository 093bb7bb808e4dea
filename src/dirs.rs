use std::fs;
use std::path::Path;

use anyhow::Result;

/// Creates `path` and any missing parents. An existing directory is left
/// untouched.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
