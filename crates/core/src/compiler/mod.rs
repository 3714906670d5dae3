//! `tsc` wrapper for the TypeScript target.

pub mod client;
pub mod locator;

pub use client::TscClient;
pub use locator::TscLocator;
