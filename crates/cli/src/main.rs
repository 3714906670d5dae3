//! tsdecl command-line tool.
//!
//! Builds the TypeScript declaration target of a package, checks its
//! `tsconfig.json` for conflicting options, and writes a starter
//! configuration file.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tsdecl_core::config::CONFIG_FILE;
use tsdecl_core::tsconfig::{check_conflicts, render_conflicts};
use tsdecl_core::{build, Report, ToolConfig, TracingReport, BUILD_FAILED};

use crate::style::ConsoleReport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Build TypeScript declarations with tsc and mirror package assets.
#[derive(Parser, Debug)]
#[command(name = "tsdecl", version, about = "Build the TypeScript target of a package")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Send build messages through the log instead of styled console lines.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run tsc --build and copy non-source files into the output directory.
    Build(TargetArgs),

    /// Check tsconfig.json for options that conflict with the output directory.
    Check(TargetArgs),

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Overrides for the `[target]` section.
#[derive(clap::Args, Debug, Default)]
struct TargetArgs {
    /// Project root.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Source directory, relative to the root.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output directory, relative to the root.
    #[arg(long)]
    output: Option<PathBuf>,

    /// tsconfig file, relative to the root.
    #[arg(long)]
    tsconfig: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init { output, force } => {
            init_logging(cli.verbose, "warn");
            cmd_init(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Build(args) => {
            let config = load_config(&cli.config, cli.verbose)?;
            cmd_build(&cli.config, config, args, cli.plain).await
        }
        Commands::Check(args) => {
            let config = load_config(&cli.config, cli.verbose)?;
            cmd_check(&cli.config, config, args).await
        }
    }
}

/// Load the config file (or defaults) and start logging at its level.
fn load_config(path: &Path, verbose: bool) -> Result<ToolConfig> {
    let config = ToolConfig::load_or_default(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    init_logging(verbose, &config.logging.log_level);
    Ok(config)
}

fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { level })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Apply flag overrides and validate.
fn apply_overrides(mut config: ToolConfig, args: TargetArgs) -> Result<ToolConfig> {
    if let Some(root) = args.root {
        config.target.root = root;
    }
    if let Some(source) = args.source {
        config.target.source = source;
    }
    if let Some(output) = args.output {
        config.target.output = output;
    }
    if args.tsconfig.is_some() {
        config.target.tsconfig = args.tsconfig;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Directory relative `[target]` paths resolve against: the config file's
/// directory when it exists, otherwise the current directory.
fn base_dir(config_path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    if config_path.exists() {
        let parent = config_path.parent().unwrap_or_else(|| Path::new(""));
        return Ok(cwd.join(parent));
    }
    Ok(cwd)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_build(
    config_path: &Path,
    config: ToolConfig,
    args: TargetArgs,
    plain: bool,
) -> Result<ExitCode> {
    let config = apply_overrides(config, args)?;
    let input = config.build_input(&base_dir(config_path)?, None);

    let report: Box<dyn Report> = if plain {
        Box::new(TracingReport)
    } else {
        Box::new(ConsoleReport::new("typescript"))
    };
    match build(&input, report.as_ref()).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "build failed");
            eprintln!("{}", style::error(BUILD_FAILED));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_check(config_path: &Path, config: ToolConfig, args: TargetArgs) -> Result<ExitCode> {
    let config = apply_overrides(config, args)?;
    let input = config.build_input(&base_dir(config_path)?, None);
    let tsconfig = input.tsconfig_path();

    let conflicts = check_conflicts(&tsconfig, &input.root, &input.output)
        .await
        .with_context(|| format!("failed to check {}", tsconfig.display()))?;

    if conflicts.is_empty() {
        println!("{}", style::success(&format!("{} has no conflicting options", tsconfig.display())));
        return Ok(ExitCode::SUCCESS);
    }

    let file_name = tsconfig
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    println!("{}", style::warn(&render_conflicts(&file_name, &conflicts)));
    Ok(ExitCode::FAILURE)
}

fn cmd_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    let contents = ToolConfig::default_toml().context("failed to render default configuration")?;
    std::fs::write(output, contents)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{}", style::success(&format!("Wrote {}", output.display())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_build_overrides() {
        let cli = Cli::try_parse_from([
            "tsdecl",
            "build",
            "--output",
            "dist/types",
            "--tsconfig",
            "tsconfig.build.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.output, Some(PathBuf::from("dist/types")));
                assert_eq!(args.tsconfig, Some(PathBuf::from("tsconfig.build.json")));
                assert!(args.root.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = TargetArgs {
            source: Some(PathBuf::from("lib-src")),
            ..TargetArgs::default()
        };
        let config = apply_overrides(ToolConfig::default(), args).unwrap();
        assert_eq!(config.target.source, PathBuf::from("lib-src"));
        assert_eq!(config.target.output, PathBuf::from("lib/typescript"));
    }

    #[test]
    fn test_overrides_are_validated() {
        let args = TargetArgs {
            output: Some(PathBuf::from(".")),
            ..TargetArgs::default()
        };
        assert!(apply_overrides(ToolConfig::default(), args).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        cmd_init(&path, false).unwrap();
        assert!(ToolConfig::load_from_file(&path).is_ok());
        assert!(cmd_init(&path, false).is_err());
        cmd_init(&path, true).unwrap();
    }
}
