//! # kubegraph
//!
//! Library side of the kubegraph binary: CLI definitions, command
//! implementations and configuration. Exposed so the commands can be
//! exercised from integration tests.

pub mod cli;
pub mod config;
