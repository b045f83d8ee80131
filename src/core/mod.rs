//! core
//!
//! Domain types, configuration, and path routing for strata.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, BranchName, RefName, Fingerprint
//! - [`model`] - Snapshot building blocks: commits, changes, refs, remotes
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Plumbing file names and strata storage locations
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod model;
pub mod paths;
pub mod types;
