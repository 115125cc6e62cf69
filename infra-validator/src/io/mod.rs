//! Side-effecting operations: child processes, configuration, and evidence files.

pub mod config;
pub mod executor;
pub mod process;
pub mod recorder;
pub mod run_dir;
