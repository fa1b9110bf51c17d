//! Test doubles and fixture data.
//!
//! Public rather than `#[cfg(test)]` so benches and downstream crates
//! can exercise the pipeline without touching the network or the
//! filesystem.

pub mod fixtures;
pub mod mocks;
