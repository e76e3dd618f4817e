//! Finds the script files to load at startup (`spec.md` §6 "scripts dir").
//!
//! There is no manifest or dependency graph: every `.lua` file directly
//! under the scripts directory is loaded, in filename order, so load order
//! is predictable from the directory listing alone.

use std::path::{Path, PathBuf};

pub fn discover_scripts(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();

    if !dir.exists() {
        return Ok(scripts);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("lua") {
            scripts.push(path);
        }
    }

    scripts.sort();
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_yields_empty_list() {
        let scripts = discover_scripts(Path::new("/nonexistent/path/for/tests")).unwrap();
        assert!(scripts.is_empty());
    }
}
