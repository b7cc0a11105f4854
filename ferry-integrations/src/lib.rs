//! Integration glue for ferry
//!
//! Everything that bridges nodes to the world outside the storage
//! abstraction: local staging paths, external process invocation, and
//! the framework-neutral HTTP serving contract.

pub mod exec;
pub mod serve;
pub mod stage;

pub use exec::{check_tool, invoke, CommandArg};
pub use serve::{content_type_for, serve, ServeOptions, ServeResponse};
pub use stage::{stage, StageMode, StagedPath};
