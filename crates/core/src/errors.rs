//! Error types for the tsdecl core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`BuildError`] enum unifies them for the build target. Callers
//! branch on [`BuildError::kind`] instead of matching message text.

use std::path::PathBuf;

use thiserror::Error;

/// The uniform failure line printed by front-ends after the detailed error
/// has already gone through the report sink.
pub const BUILD_FAILED: &str = "Failed to build definition files.";

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for one build of the TypeScript target.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    TsConfig(#[from] TsConfigError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// The previous output tree could not be removed.
    #[error("failed to clean output directory '{}': {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Category of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// The compiler binary is not installed anywhere we look.
    Configuration,
    /// The compiler ran (or failed to start) and did not succeed.
    CompilerInvocation,
    /// The tsconfig file is malformed.
    Parse,
    /// Reading, deleting, creating or copying files failed.
    FileSystem,
}

impl BuildError {
    pub fn kind(&self) -> BuildErrorKind {
        match self {
            Self::Compiler(CompilerError::NotFound { .. }) => BuildErrorKind::Configuration,
            Self::Compiler(_) => BuildErrorKind::CompilerInvocation,
            Self::TsConfig(TsConfigError::Parse { .. }) => BuildErrorKind::Parse,
            Self::TsConfig(TsConfigError::Read { .. }) => BuildErrorKind::FileSystem,
            Self::Mirror(_) | Self::Clean { .. } => BuildErrorKind::FileSystem,
        }
    }

    /// Text handed to the report sink when the build fails.
    ///
    /// A failed compiler run with captured stdout reports that output
    /// verbatim; everything else reports its own message.
    pub fn report_detail(&self) -> String {
        match self {
            Self::Compiler(CompilerError::Failed { stdout, .. }) if !stdout.is_empty() => {
                format!("Errors found when building definition files:\n{}", stdout)
            }
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compiler errors
// ---------------------------------------------------------------------------

/// Errors from locating and running `tsc`.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Neither the project-local binary nor one on the search path exists.
    #[error(
        "The tsc binary doesn't seem to be installed under node_modules ({}) or present in $PATH. \
         Make sure you have added typescript to your devDependencies.",
        expected.display()
    )]
    NotFound { expected: PathBuf },

    /// `tsc` exited with a non-zero status.
    #[error("{} exited with {}: {}", program.display(), describe_exit(*exit_code), stderr.trim())]
    Failed {
        program: PathBuf,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process could not be started at all.
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".into(),
    }
}

// ---------------------------------------------------------------------------
// tsconfig errors
// ---------------------------------------------------------------------------

/// Errors from reading the project's `tsconfig.json`.
#[derive(Debug, Error)]
pub enum TsConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, or a known option with the wrong type.
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Mirror errors
// ---------------------------------------------------------------------------

/// Errors from mirroring the source tree into the output tree.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("failed to read directory '{}': {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {} -> {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A copy task panicked or was aborted by the runtime.
    #[error("copy task for '{}' did not complete: {detail}", path.display())]
    Task { path: PathBuf, detail: String },
}

// ---------------------------------------------------------------------------
// Tool configuration errors
// ---------------------------------------------------------------------------

/// Errors from loading and validating `tsdecl.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parse error: {0}")]
    ParseError(String),

    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
