//! Mirroring the source tree into the output tree.
//!
//! Every file under the source root gets its parent directories created
//! under the output root. Files with a recognized source extension stop
//! there, since `tsc` emits their output. Everything else is copied
//! byte-for-byte, one spawned task per file, joined once at the end.
//!
//! # Decision model
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | Hidden entry (leading `.`) and `include_hidden` off | `Ignored` |
//! | Directory named in `ignore_dirs` | not descended |
//! | Relative path matches an `ignore_patterns` glob | `Ignored` |
//! | Name ends in `.<source extension>` | `Source` |
//! | None of the above | `Copy` |

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::errors::MirrorError;
use crate::paths::to_slash;

/// Directories never descended into by default.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &["__tests__", "__fixtures__"];

/// Extensions the compiler is responsible for.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx"];

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Filters applied while walking the source tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MirrorOptions {
    /// Directory names whose subtrees are skipped entirely.
    pub ignore_dirs: Vec<String>,

    /// Glob patterns matched against the '/'-separated relative file path.
    pub ignore_patterns: Vec<String>,

    /// Walk into entries starting with `.`.
    pub include_hidden: bool,

    /// Extensions (without the dot) left to the compiler.
    pub source_extensions: Vec<String>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: Vec::new(),
            include_hidden: false,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// What happens to one discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorDecision {
    /// Copy to the mirrored path.
    Copy,
    /// Recognized source file, left to the compiler.
    Source,
    /// Filtered out.
    Ignored { reason: String },
}

impl MirrorOptions {
    /// True if `name` carries one of the recognized source extensions.
    pub fn is_source_file(&self, name: &str) -> bool {
        self.source_extensions
            .iter()
            .any(|ext| name.ends_with(&format!(".{}", ext)))
    }

    fn is_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }

    fn skips_dir(&self, name: &str) -> bool {
        self.is_hidden(name) || self.ignore_dirs.iter().any(|d| d == name)
    }

    /// Classify a file by its path relative to the source root.
    pub fn classify(&self, rel_path: &Path) -> MirrorDecision {
        let name = rel_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if self.is_hidden(&name) {
            return MirrorDecision::Ignored {
                reason: "hidden".into(),
            };
        }

        let slash = to_slash(rel_path);
        if let Some(pattern) = self
            .ignore_patterns
            .iter()
            .find(|p| glob_match::glob_match(p, &slash))
        {
            return MirrorDecision::Ignored {
                reason: format!("pattern {}", pattern),
            };
        }

        if self.is_source_file(&name) {
            MirrorDecision::Source
        } else {
            MirrorDecision::Copy
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Counters for one mirror run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    /// Files copied to the output tree.
    pub copied: u64,
    /// Source files left to the compiler.
    pub skipped_sources: u64,
    /// Files and directories filtered out.
    pub ignored: u64,
    /// Distinct destination directories ensured.
    pub directories_created: u64,
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "copied={} sources={} ignored={} directories_created={}",
            self.copied, self.skipped_sources, self.ignored, self.directories_created
        )
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

struct Walk {
    files: Vec<PathBuf>,
    ignored: u64,
}

/// Collect every candidate file under `source`, sorted per directory.
async fn walk(source: &Path, options: &MirrorOptions) -> Result<Walk, MirrorError> {
    let mut walk = Walk {
        files: Vec::new(),
        ignored: 0,
    };
    let mut pending = vec![source.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && dir == source => {
                warn!(source = %source.display(), "source directory does not exist");
                return Ok(walk);
            }
            Err(err) => {
                return Err(MirrorError::ReadDir {
                    path: dir,
                    source: err,
                })
            }
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    return Err(MirrorError::ReadDir {
                        path: dir.clone(),
                        source: err,
                    })
                }
            };
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type().await.map_err(|err| MirrorError::ReadDir {
                path: path.clone(),
                source: err,
            })?;

            if file_type.is_dir() {
                if options.skips_dir(&name) {
                    debug!(path = %path.display(), "skipping directory");
                    walk.ignored += 1;
                } else {
                    dirs.push(path);
                }
            } else if file_type.is_file() {
                files.push(path);
            } else if file_type.is_symlink() {
                // Symlinked files are copied through; symlinked directories
                // are not followed.
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => files.push(path),
                    _ => {
                        debug!(path = %path.display(), "skipping symlink");
                        walk.ignored += 1;
                    }
                }
            } else {
                debug!(path = %path.display(), "skipping special file");
                walk.ignored += 1;
            }
        }

        files.sort();
        walk.files.extend(files);

        // Reverse so the stack pops directories in name order.
        dirs.sort();
        pending.extend(dirs.into_iter().rev());
    }

    Ok(walk)
}

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// Mirror `source` into `output`.
///
/// Copies run concurrently. A failing copy does not cancel the others; once
/// every copy has finished, the first failure (in walk order) is returned.
#[instrument(skip_all, fields(source = %source.display(), output = %output.display()))]
pub async fn mirror_tree(
    source: &Path,
    output: &Path,
    options: &MirrorOptions,
) -> Result<MirrorReport, MirrorError> {
    let walk = walk(source, options).await?;
    let mut report = MirrorReport {
        ignored: walk.ignored,
        ..MirrorReport::default()
    };

    let mut ensured: HashSet<PathBuf> = HashSet::new();
    let mut copies: Vec<(PathBuf, JoinHandle<Result<(), MirrorError>>)> = Vec::new();

    for file in walk.files {
        let rel = file.strip_prefix(source).unwrap_or(&file).to_path_buf();
        let decision = options.classify(&rel);
        if let MirrorDecision::Ignored { reason } = &decision {
            debug!(path = %rel.display(), reason = reason.as_str(), "file ignored");
            report.ignored += 1;
            continue;
        }

        let dest = output.join(&rel);
        if let Some(parent) = dest.parent() {
            if ensured.insert(parent.to_path_buf()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| MirrorError::CreateDir {
                        path: parent.to_path_buf(),
                        source: err,
                    })?;
                report.directories_created += 1;
            }
        }

        match decision {
            MirrorDecision::Source => report.skipped_sources += 1,
            MirrorDecision::Copy => {
                let from = file.clone();
                let handle = tokio::spawn(async move {
                    tokio::fs::copy(&from, &dest)
                        .await
                        .map(|_| ())
                        .map_err(|err| MirrorError::Copy {
                            from,
                            to: dest,
                            source: err,
                        })
                });
                copies.push((file, handle));
            }
            MirrorDecision::Ignored { .. } => {}
        }
    }

    let mut first_error = None;
    for (file, handle) in copies {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(MirrorError::Task {
                path: file,
                detail: e.to_string(),
            }),
        };
        match result {
            Ok(()) => report.copied += 1,
            Err(e) => {
                warn!(error = %e, "copy failed");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    info!(%report, "mirrored source tree");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_classify_sources_and_assets() {
        let opts = MirrorOptions::default();
        assert_eq!(opts.classify(Path::new("a.ts")), MirrorDecision::Source);
        assert_eq!(opts.classify(Path::new("sub/c.tsx")), MirrorDecision::Source);
        assert_eq!(opts.classify(Path::new("types/index.d.ts")), MirrorDecision::Source);
        assert_eq!(opts.classify(Path::new("b.txt")), MirrorDecision::Copy);
        assert_eq!(opts.classify(Path::new("index.js")), MirrorDecision::Copy);
        assert_eq!(opts.classify(Path::new("font.ttf")), MirrorDecision::Copy);
    }

    #[test]
    fn test_classify_hidden_and_patterns() {
        let mut opts = MirrorOptions {
            ignore_patterns: vec!["**/*.snap".into(), "docs/**".into()],
            ..MirrorOptions::default()
        };
        assert!(matches!(
            opts.classify(Path::new(".eslintrc")),
            MirrorDecision::Ignored { .. }
        ));
        assert!(matches!(
            opts.classify(Path::new("sub/view.snap")),
            MirrorDecision::Ignored { .. }
        ));
        assert!(matches!(
            opts.classify(Path::new("docs/intro.md")),
            MirrorDecision::Ignored { .. }
        ));

        opts.include_hidden = true;
        assert_eq!(opts.classify(Path::new(".eslintrc")), MirrorDecision::Copy);
    }

    #[tokio::test]
    async fn test_copies_assets_and_skips_sources() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        write(&src.join("a.ts"), "export const a = 1;");
        write(&src.join("b.txt"), "bee");
        write(&src.join("sub/c.tsx"), "export const C = () => null;");

        let report = mirror_tree(&src, &out, &MirrorOptions::default()).await.unwrap();

        assert_eq!(std::fs::read_to_string(out.join("b.txt")).unwrap(), "bee");
        assert!(!out.join("a.ts").exists());
        assert!(!out.join("sub/c.tsx").exists());
        assert!(out.join("sub").is_dir());
        assert_eq!(report.copied, 1);
        assert_eq!(report.skipped_sources, 2);
    }

    #[tokio::test]
    async fn test_skips_test_and_fixture_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        write(&src.join("__tests__/data.json"), "{}");
        write(&src.join("nested/__fixtures__/sample.png"), "png");
        write(&src.join("nested/keep.json"), "{}");

        let report = mirror_tree(&src, &out, &MirrorOptions::default()).await.unwrap();

        assert!(out.join("nested/keep.json").exists());
        assert!(!out.join("__tests__").exists());
        assert!(!out.join("nested/__fixtures__").exists());
        assert_eq!(report.copied, 1);
        assert_eq!(report.ignored, 2);
    }

    #[tokio::test]
    async fn test_hidden_dirs_are_not_walked() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        write(&src.join(".cache/x.json"), "{}");
        write(&src.join("keep.json"), "{}");

        let report = mirror_tree(&src, &out, &MirrorOptions::default()).await.unwrap();
        assert!(out.join("keep.json").exists());
        assert!(!out.join(".cache").exists());
        assert_eq!(report.copied, 1);
        assert_eq!(report.ignored, 1);

        let opts = MirrorOptions {
            include_hidden: true,
            ..MirrorOptions::default()
        };
        let out = dir.path().join("out-hidden");
        let report = mirror_tree(&src, &out, &opts).await.unwrap();
        assert_eq!(std::fs::read_to_string(out.join(".cache/x.json")).unwrap(), "{}");
        assert_eq!(report.copied, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        let elsewhere = dir.path().join("elsewhere");
        write(&elsewhere.join("inner.txt"), "inner");
        write(&elsewhere.join("target.txt"), "linked");
        std::fs::create_dir_all(&src).unwrap();
        symlink(&elsewhere, src.join("linked-dir")).unwrap();
        symlink(elsewhere.join("target.txt"), src.join("linked.txt")).unwrap();

        let report = mirror_tree(&src, &out, &MirrorOptions::default()).await.unwrap();

        assert!(!out.join("linked-dir").exists());
        assert_eq!(std::fs::read_to_string(out.join("linked.txt")).unwrap(), "linked");
        assert!(!std::fs::symlink_metadata(out.join("linked.txt"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(report.copied, 1);
        assert_eq!(report.ignored, 1);
    }

    #[tokio::test]
    async fn test_existing_output_dirs_are_fine() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        write(&src.join("deep/er/x.css"), "x");
        std::fs::create_dir_all(out.join("deep/er")).unwrap();

        let report = mirror_tree(&src, &out, &MirrorOptions::default()).await.unwrap();
        assert_eq!(report.copied, 1);
        assert!(out.join("deep/er/x.css").exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let report = mirror_tree(
            &dir.path().join("missing"),
            &dir.path().join("out"),
            &MirrorOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(report, MirrorReport::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        write(&src.join("bin/run.sh"), "#!/bin/sh\n");
        std::fs::set_permissions(
            src.join("bin/run.sh"),
            std::fs::Permissions::from_mode(0o750),
        )
        .unwrap();

        mirror_tree(&src, &out, &MirrorOptions::default()).await.unwrap();
        let mode = std::fs::metadata(out.join("bin/run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_copy_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        write(&src.join("a.txt"), "a");
        write(&src.join("b/c.txt"), "c");
        write(&src.join("z.txt"), "z");
        // A directory where the copy of a.txt should land.
        std::fs::create_dir_all(out.join("a.txt")).unwrap();

        let err = mirror_tree(&src, &out, &MirrorOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::Copy { .. }));
        assert!(out.join("b/c.txt").exists());
        assert!(out.join("z.txt").exists());
    }
}
