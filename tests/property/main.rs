//! Property-based tests for the byte adapters.
//!
//! Run with: `cargo test --test property`

mod reverse_matches_forward;
mod stringfs_roundtrip;
mod tee_roundtrip;
