//! Terminal client for murmur
//!
//! A line-oriented presentation layer over [`murmur_client::ClientHandle`].
//! Lines typed on stdin become name submissions or chat messages; timeline
//! entries, connection changes, and notices are written to stdout as they
//! arrive. Logs go to stderr.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod render;
pub mod shell;

pub use commands::Command;
pub use shell::{CliError, Shell};
