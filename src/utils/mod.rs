//! Shared utilities.

pub mod path;

pub use path::{normalize_path, to_posix};
