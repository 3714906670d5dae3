//! Typed view of `tsconfig.json` and the conflict checker.
//!
//! Only the options that can fight with the build target are modelled;
//! everything else in the file is ignored. `noEmit` keeps the difference
//! between "absent" and "explicitly set" (even to `false` or `null`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::errors::TsConfigError;
use crate::paths::resolve_lexically;

/// Default file name looked up under the project root.
pub const TSCONFIG_FILE: &str = "tsconfig.json";

const NO_EMIT_CONFLICT: &str = "compilerOptions.noEmit cannot set";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// The parts of a tsconfig file the target cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub compiler_options: Option<CompilerOptions>,
}

/// `compilerOptions` keys inspected for conflicts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Any explicit value, including `null`, is `Some`.
    #[serde(default, deserialize_with = "present")]
    pub no_emit: Option<serde_json::Value>,

    #[serde(default)]
    pub out_dir: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl TsConfig {
    pub fn parse(path: &Path, contents: &str) -> Result<Self, TsConfigError> {
        serde_json::from_str(contents).map_err(|source| TsConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse `path`. Returns `Ok(None)` when the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>, TsConfigError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no tsconfig file");
                return Ok(None);
            }
            Err(source) => {
                return Err(TsConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(path, &contents).map(Some)
    }

    /// Conflicts between this config and the required `output` directory.
    ///
    /// The order of the returned messages is fixed (`noEmit`, then `outDir`)
    /// and does not follow key order in the file.
    pub fn conflicts(&self, root: &Path, output: &Path) -> Vec<String> {
        let Some(options) = &self.compiler_options else {
            return Vec::new();
        };

        let mut conflicts = Vec::new();

        if options.no_emit.is_some() {
            conflicts.push(NO_EMIT_CONFLICT.to_string());
        }

        let out_dir_ok = match options.out_dir.as_deref() {
            Some(dir) if !dir.is_empty() => resolve_lexically(root, Path::new(dir)) == output,
            _ => false,
        };
        if !out_dir_ok {
            conflicts.push(format!("compilerOptions.outDir must set {}", output.display()));
        }

        conflicts
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Path of the tsconfig a build uses: the explicit one, else
/// `<root>/tsconfig.json`.
pub fn resolve_tsconfig_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => resolve_lexically(root, p),
        None => root.join(TSCONFIG_FILE),
    }
}

/// Check `tsconfig` for options conflicting with `output`.
///
/// A missing file has no conflicts. A malformed file is an error.
pub async fn check_conflicts(
    tsconfig: &Path,
    root: &Path,
    output: &Path,
) -> Result<Vec<String>, TsConfigError> {
    let Some(config) = TsConfig::load(tsconfig).await? else {
        return Ok(Vec::new());
    };
    let conflicts = config.conflicts(root, output);
    info!(
        path = %tsconfig.display(),
        count = conflicts.len(),
        "checked tsconfig for conflicting options"
    );
    Ok(conflicts)
}

/// Render conflicts as one multi-line warning.
pub fn render_conflicts(file_name: &str, conflicts: &[String]) -> String {
    conflicts.iter().fold(
        format!(
            "Found following options in the config file which can conflict with the CLI options. \
             Please modify them from {}:",
            file_name
        ),
        |acc, conflict| format!("{}\n- {}", acc, conflict),
    )
}
