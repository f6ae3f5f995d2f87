//! morpheus: workspace intelligence for Morpheus `.scr` scripts
//!
//! This crate turns a directory of game scripts into queryable state for
//! editors and command-line checks.
//!
//! # Architecture
//!
//! Data flows leaves first:
//!
//! - [`scanner`]: single-pass lexical scanner producing a total lexeme stream
//! - [`workspace`]: per-file document models, the workspace symbol index and
//!   the include/exec dependency graph (petgraph-based)
//! - [`diagnostics`]: stateless rule engine over the index and graph
//! - [`tokens`]: semantic token classification and delta encoding
//!
//! [`gotodef`], [`references`] and [`symbol`] adapt queries to editor-protocol
//! types; [`cli`] wires the `morpheus` binary.
//!
//! ```ignore
//! use morpheus::config::Settings;
//! use morpheus::workspace::Workspace;
//!
//! let settings = Settings::default();
//! let workspace = Workspace::construct_workspace(&settings, &root)?;
//! let helper = workspace.find_definition("helper");
//! ```

// Core
pub mod language;
pub mod scanner;
pub mod workspace;

// Analysis and editor features
pub mod diagnostics;
pub mod gotodef;
pub mod references;
pub mod symbol;
pub mod tokens;

// Configuration and errors
pub mod config;
pub mod error;

pub mod cli;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
