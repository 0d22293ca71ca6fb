//! Command implementations behind the `skillctl` binary.
//!
//! Each command writes payloads and listings to the writer it is given (stdout in the
//! binary) and diagnostics to stderr through tracing or the run report sink.

pub mod skill;
