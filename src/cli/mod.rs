//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands, plus the
//! hidden worker mode the sub-process spawner re-invokes us in.

pub mod networks;
pub mod run;
pub mod worker;
