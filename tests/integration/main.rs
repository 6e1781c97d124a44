//! Integration tests for bytespool adapters and CLI.
//!
//! Run with: `cargo test --test integration`

mod cli_commands;
mod stringfs_scenarios;
mod tee_scenarios;
