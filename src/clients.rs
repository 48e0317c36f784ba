//! Integration layers for the external systems that `bit` drives:
//!
//! - [`git`]: the git CLI, run as a subprocess
//! - [`github`]: the GitHub REST API (repositories, pull requests, issues)
//! - [`vault`]: API tokens in the OS-native keychain
//!
//! Each submodule provides a trait with a real implementation and, in tests,
//! a mockall mock.

pub mod git;
pub mod github;
pub mod vault;
