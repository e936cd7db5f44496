//! Testing infrastructure.
//!
//! - **Mocks**: test doubles for profile sources, concerned-file providers
//!   and comment posters, with controllable failures
//! - **Fixtures**: scratch git repositories (test-only)
//!
//! # Example
//!
//! ```rust,ignore
//! use covdelta::testing::{MockCommentPoster, MockConcernedFiles, MockProfileSource};
//!
//! let base = MockProfileSource::new("base").with_text("a.go:1.1,2.2 1 1\n");
//! let provider = MockConcernedFiles::new().with_files(&["a.go"]);
//! let poster = MockCommentPoster::new();
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
