//! tsdecl core library.
//!
//! This crate implements the TypeScript build target of a multi-target
//! package builder: checking `tsconfig.json` for conflicting options,
//! locating and running `tsc --build`, and mirroring non-source assets
//! from the source tree into the output tree.

pub mod compiler;
pub mod config;
pub mod errors;
pub mod mirror;
pub mod paths;
pub mod report;
pub mod target;
pub mod tsconfig;

// Re-exports for convenience.
pub use config::ToolConfig;
pub use errors::{BuildError, BuildErrorKind, BUILD_FAILED};
pub use mirror::{mirror_tree, MirrorOptions, MirrorReport};
pub use report::{MemoryReport, Report, ReportLevel, TracingReport};
pub use target::{build, BuildInput, BuildSummary};
