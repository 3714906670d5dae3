//! Asynchronous `tsc --build` invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::errors::CompilerError;

/// Runs a resolved `tsc` binary in project build mode.
#[derive(Debug, Clone)]
pub struct TscClient {
    program: PathBuf,
    working_dir: PathBuf,
}

impl TscClient {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        let client = Self {
            program: program.into(),
            working_dir: working_dir.into(),
        };
        debug!(program = %client.program.display(), "created TscClient");
        client
    }

    /// Run `tsc --build <tsconfig>` and wait for it to exit.
    ///
    /// Returns captured stdout on success. Output files are placed wherever
    /// the compiler and the tsconfig decide.
    #[instrument(skip(self), fields(program = %self.program.display()))]
    pub async fn build(&self, tsconfig: &Path) -> Result<String, CompilerError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--build")
            .arg(tsconfig)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(tsconfig = %tsconfig.display(), "running tsc --build");
        let output = cmd.output().await.map_err(|source| CompilerError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code();
            warn!(?exit_code, "tsc --build failed");
            return Err(CompilerError::Failed {
                program: self.program.clone(),
                exit_code,
                stdout,
                stderr,
            });
        }

        info!("tsc --build completed");
        Ok(stdout)
    }
}
