//! # etrecheck-launchd
//!
//! Launchd file lifecycle tracking for EtreCheck.
//!
//! Each launchd descriptor becomes a [`LaunchdFile`] record that knows where
//! it lives, what it runs, how that executable is signed, whether launchd
//! has it loaded, and how safe it looks. Records tolerate unreadable or
//! malformed descriptors: the only error that stops construction is a path
//! that is not a descriptor at all.
//!
//! ## Data Flow
//!
//! ```text
//! discover_launchd_paths()
//!   -> LaunchdFile::create()        descriptor, context, identifier
//!   -> check_signature()            executable, checksum, codesign
//!   -> AdwareMatcher::is_adware()
//!   -> requery() / load() / unload()
//!   -> LaunchdReport
//! ```
//!
//! Everything outside the process goes through the traits in [`services`],
//! bundled into a [`Services`] value and passed to each operation. Every
//! call is bounded by [`Services::timeout`].

pub mod adware;
pub mod codesign;
pub mod collector;
pub mod config;
pub mod discovery;
pub mod file;
pub mod hash;
pub mod identifier;
pub mod launchctl;
pub mod registry;
pub mod report;
pub mod scoring;
pub mod services;
pub mod store;

#[cfg(test)]
mod testing;

pub use adware::{AdwareMatcher, AdwareSignatures};
pub use collector::LaunchdCollector;
pub use config::{AdwareConfig, CheckConfig, ReportOptions};
pub use discovery::is_launchd_path;
pub use file::{FailureReason, LaunchdFile, PreparedFile, ServiceFailure, ServiceOp};
pub use identifier::sanitize_identifier;
pub use registry::{IdentifierRegistry, TaskRegistry};
pub use report::{LaunchdReport, LaunchdSummary, SkippedPath};
pub use scoring::{score, SafetyInputs, ScoreWeights};
pub use services::{
    ChecksumService, DescriptorStore, ServiceController, ServiceRequest, Services,
    SignatureVerifier,
};
