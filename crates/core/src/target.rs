//! The TypeScript build target.
//!
//! [`build`] runs one build:
//!
//! 1. Remove the previous output tree.
//! 2. Warn about tsconfig options that fight with the output directory.
//! 3. Locate `tsc` and run `tsc --build <tsconfig>`.
//! 4. Mirror non-source files from the source tree into the output tree.
//!
//! Every failure is written to the report sink before it is returned.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::compiler::{TscClient, TscLocator};
use crate::errors::BuildError;
use crate::mirror::{mirror_tree, MirrorOptions, MirrorReport};
use crate::paths::display_relative;
use crate::report::Report;
use crate::tsconfig::{check_conflicts, render_conflicts, resolve_tsconfig_path, TSCONFIG_FILE};

/// Inputs of one build. All directory paths are absolute.
#[derive(Debug, Clone)]
pub struct BuildInput {
    /// Project root; tsconfig and `node_modules` resolve against it.
    pub root: PathBuf,
    /// Directory holding the sources.
    pub source: PathBuf,
    /// Directory that receives declarations and copied assets.
    pub output: PathBuf,
    /// Explicit tsconfig; `None` means `<root>/tsconfig.json`.
    pub tsconfig: Option<PathBuf>,
    /// Replacement for `$PATH` when looking up `tsc`; `None` uses the
    /// process environment.
    pub search_path: Option<OsString>,
    /// Filters for the source tree mirror.
    pub mirror: MirrorOptions,
}

impl BuildInput {
    pub fn new(
        root: impl Into<PathBuf>,
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            source: source.into(),
            output: output.into(),
            tsconfig: None,
            search_path: None,
            mirror: MirrorOptions::default(),
        }
    }

    pub fn with_tsconfig(mut self, tsconfig: impl Into<PathBuf>) -> Self {
        self.tsconfig = Some(tsconfig.into());
        self
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// The tsconfig this build reads and passes to `tsc`.
    pub fn tsconfig_path(&self) -> PathBuf {
        resolve_tsconfig_path(&self.root, self.tsconfig.as_deref())
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Conflict warnings that were reported.
    pub conflicts: Vec<String>,
    /// The `tsc` binary that ran.
    pub compiler: PathBuf,
    /// Mirror counters.
    pub mirror: MirrorReport,
}

/// Run the TypeScript target.
///
/// On failure the detailed error (compiler stdout when there is any) has
/// already gone through `report.error` when this returns.
#[instrument(skip_all, fields(root = %input.root.display()))]
pub async fn build(input: &BuildInput, report: &dyn Report) -> Result<BuildSummary, BuildError> {
    match run(input, report).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            report.error(&e.report_detail());
            Err(e)
        }
    }
}

async fn run(input: &BuildInput, report: &dyn Report) -> Result<BuildSummary, BuildError> {
    let output_rel = display_relative(&input.root, &input.output);

    report.info(&format!("Cleaning up previous build at {}", output_rel));
    clean(&input.output).await?;

    report.info("Generating type definitions with tsc");

    let tsconfig = input.tsconfig_path();
    let conflicts = check_conflicts(&tsconfig, &input.root, &input.output).await?;
    if !conflicts.is_empty() {
        let file_name = tsconfig
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| TSCONFIG_FILE.to_string());
        report.warn(&render_conflicts(&file_name, &conflicts));
    }

    let compiler = TscLocator::new(&input.root)
        .with_search_path(input.search_path.clone())
        .locate()?;
    let stdout = TscClient::new(&compiler, &input.root).build(&tsconfig).await?;
    if !stdout.trim().is_empty() {
        debug!(stdout = stdout.trim(), "tsc output");
    }
    report.success(&format!("Wrote definition files to {}", output_rel));

    let mirror = mirror_tree(&input.source, &input.output, &input.mirror).await?;
    if mirror.copied > 0 {
        report.info(&format!(
            "Copied {} file{} to {}",
            mirror.copied,
            if mirror.copied == 1 { "" } else { "s" },
            output_rel
        ));
    }

    info!(compiler = %compiler.display(), %mirror, "typescript target built");
    Ok(BuildSummary {
        conflicts,
        compiler,
        mirror,
    })
}

/// Remove `output` and everything under it. A missing directory is fine.
async fn clean(output: &Path) -> Result<(), BuildError> {
    match tokio::fs::remove_dir_all(output).await {
        Ok(()) => {
            debug!(path = %output.display(), "removed previous output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::Clean {
            path: output.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BuildErrorKind;
    use crate::report::{MemoryReport, ReportLevel};

    #[test]
    fn test_tsconfig_path_defaults_to_root() {
        let input = BuildInput::new("/proj", "/proj/src", "/proj/lib/typescript");
        assert_eq!(input.tsconfig_path(), PathBuf::from("/proj/tsconfig.json"));

        let input = input.with_tsconfig("/proj/tsconfig.build.json");
        assert_eq!(input.tsconfig_path(), PathBuf::from("/proj/tsconfig.build.json"));
    }

    #[tokio::test]
    async fn test_clean_missing_output_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        clean(&dir.path().join("missing")).await.unwrap();
    }

    #[tokio::test]
    async fn test_clean_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("lib");
        std::fs::create_dir_all(out.join("nested")).unwrap();
        std::fs::write(out.join("nested/stale.d.ts"), "x").unwrap();

        clean(&out).await.unwrap();
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_missing_compiler_fails_before_mirroring() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/asset.txt"), "x").unwrap();

        let input = BuildInput::new(root, root.join("src"), root.join("lib/typescript"))
            .with_search_path("");
        let report = MemoryReport::new();

        let err = build(&input, &report).await.unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::Configuration);
        assert!(!root.join("lib/typescript/asset.txt").exists());

        let errors = report.messages(ReportLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("node_modules"));
        assert!(report.messages(ReportLevel::Success).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_tsconfig_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("tsconfig.json"), "{ nope").unwrap();

        let input = BuildInput::new(root, root.join("src"), root.join("lib"))
            .with_search_path("");
        let report = MemoryReport::new();

        let err = build(&input, &report).await.unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::Parse);
        assert_eq!(report.messages(ReportLevel::Error), vec![err.to_string()]);
    }
}
