//! Subcommand implementations for the `efc` binary.
pub mod fit;
pub mod predict;
