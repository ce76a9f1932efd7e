//! Core types and error taxonomy for the EtreCheck launchd tracker.
//!
//! This crate provides the vocabulary shared by the collection pass and the
//! command-line front end:
//!
//! - **Types**: launchd contexts, signature classes, load status, typed
//!   descriptor values and task handles, each with the exact lowercase
//!   tokens used in reports
//! - **Errors**: the per-record failure taxonomy in [`LaunchdError`]
//!
//! # Example
//!
//! ```rust
//! use etrecheck_core::{LaunchdContext, LoadStatus};
//!
//! assert_eq!(LaunchdContext::Apple.as_str(), "apple");
//! assert_eq!(LoadStatus::NotLoaded.to_string(), "notloaded");
//! ```

mod error;
pub mod types;

pub use error::{LaunchdError, Result};
pub use types::*;
