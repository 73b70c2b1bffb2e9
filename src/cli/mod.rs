//! CLI command implementations.

pub mod preseed;
