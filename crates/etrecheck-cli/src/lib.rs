//! # etrecheck-cli
//!
//! Command-line interface over `etrecheck-launchd`.
//!
//! ## Commands
//!
//! - **scan**: collect every launchd file under the standard directories
//! - **inspect**: full detail for one descriptor
//! - **load** / **unload**: drive a service through launchd and report back
//! - **config**: show the resolved configuration or its path

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
