//! Finding the `tsc` binary.
//!
//! The project-local install under `node_modules/.bin` always wins. Only
//! when it is missing do we walk the search path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::CompilerError;

/// Binary name looked up in both locations.
pub const TSC_BINARY: &str = "tsc";

/// Resolves the `tsc` executable for a project root.
#[derive(Debug, Clone)]
pub struct TscLocator {
    root: PathBuf,
    search_path: Option<OsString>,
}

impl TscLocator {
    /// Locator that falls back to the process `$PATH`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            search_path: None,
        }
    }

    /// Use `search_path` (same syntax as `$PATH`) instead of the environment.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// `<root>/node_modules/.bin/tsc`, with `.cmd` on Windows.
    pub fn local_path(&self) -> PathBuf {
        let name = if cfg!(windows) {
            format!("{}.cmd", TSC_BINARY)
        } else {
            TSC_BINARY.to_string()
        };
        self.root.join("node_modules").join(".bin").join(name)
    }

    pub fn locate(&self) -> Result<PathBuf, CompilerError> {
        let local = self.local_path();
        if local.is_file() {
            debug!(path = %local.display(), "using project-local tsc");
            return Ok(local);
        }

        if let Some(found) = self.search() {
            info!(path = %found.display(), "using tsc from search path");
            return Ok(found);
        }

        Err(CompilerError::NotFound { expected: local })
    }

    fn search(&self) -> Option<PathBuf> {
        let paths = match &self.search_path {
            Some(p) => p.clone(),
            None => std::env::var_os("PATH")?,
        };
        std::env::split_paths(&paths)
            .filter(|dir| !dir.as_os_str().is_empty())
            .flat_map(|dir| candidate_names().map(move |name| dir.join(name)))
            .find(|candidate| is_executable_file(candidate))
    }
}

fn candidate_names() -> impl Iterator<Item = String> {
    let suffixes: &[&str] = if cfg!(windows) {
        &[".cmd", ".exe", ""]
    } else {
        &[""]
    };
    suffixes
        .iter()
        .map(|suffix| format!("{}{}", TSC_BINARY, suffix))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_binary(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn test_local_binary_wins() {
        let root = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let locator = TscLocator::new(root.path())
            .with_search_path(Some(bin_dir.path().as_os_str().to_owned()));
        write_binary(&locator.local_path());
        write_binary(&bin_dir.path().join("tsc"));

        assert_eq!(locator.locate().unwrap(), locator.local_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_falls_back_to_search_path() {
        let root = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        write_binary(&bin_dir.path().join("tsc"));

        let search = std::env::join_paths([empty.path(), bin_dir.path()]).unwrap();
        let locator = TscLocator::new(root.path()).with_search_path(Some(search));
        assert_eq!(locator.locate().unwrap(), bin_dir.path().join("tsc"));
    }

    #[test]
    fn test_not_found_names_local_path() {
        let root = tempfile::tempdir().unwrap();
        let locator = TscLocator::new(root.path()).with_search_path(Some(OsString::new()));

        match locator.locate() {
            Err(CompilerError::NotFound { expected }) => {
                assert_eq!(expected, root.path().join("node_modules").join(".bin").join(
                    if cfg!(windows) { "tsc.cmd" } else { "tsc" }
                ));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_search_skips_non_executable() {
        let root = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        std::fs::write(bin_dir.path().join("tsc"), "not a program").unwrap();

        let locator = TscLocator::new(root.path())
            .with_search_path(Some(bin_dir.path().as_os_str().to_owned()));
        assert!(locator.locate().is_err());
    }
}
