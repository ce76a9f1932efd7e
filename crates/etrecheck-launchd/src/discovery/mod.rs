//! Filesystem discovery: descriptor files and the files they reference.

pub mod descriptors;
pub mod executables;

pub use descriptors::{default_search_paths, discover_launchd_paths, is_launchd_path};
pub use executables::{other_files_accessible, resolve_executable};
