//! External process invocation over staged nodes
//!
//! Lets a command line mix literal arguments with nodes: each node is
//! staged to a local path, the path is substituted into the argv, and
//! write-mode stages are uploaded only after the process exits
//! successfully.

use ferry_core::{FerryError, FerryResult, Node};
use std::process::Output;
use tokio::process::Command;

use crate::stage::{stage, StageMode, StagedPath};

/// One argument of an external command line
pub enum CommandArg {
    Literal(String),
    /// Staged node; the local path takes this argument's position
    Node(Node, StageMode),
}

impl CommandArg {
    pub fn literal(value: impl Into<String>) -> Self {
        CommandArg::Literal(value.into())
    }

    pub fn node(node: Node, mode: StageMode) -> Self {
        CommandArg::Node(node, mode)
    }
}

/// Run `program` with node arguments staged to local paths.
///
/// A non-zero exit becomes `External` carrying the captured stderr, and
/// no write-mode stage is committed; the remote objects stay as they
/// were. On success every write-mode stage is uploaded before the
/// output is returned.
pub async fn invoke(program: &str, args: Vec<CommandArg>) -> FerryResult<Output> {
    let mut staged: Vec<StagedPath> = Vec::new();
    let mut argv: Vec<String> = Vec::new();
    for arg in args {
        match arg {
            CommandArg::Literal(value) => argv.push(value),
            CommandArg::Node(node, mode) => {
                let handle = stage(&node, mode).await?;
                argv.push(handle.path().to_string_lossy().into_owned());
                staged.push(handle);
            }
        }
    }

    tracing::debug!(program, args = ?argv, "running external command");
    let output = Command::new(program)
        .args(&argv)
        .output()
        .await
        .map_err(|e| FerryError::External {
            command: program.to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(FerryError::External {
            command: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    for handle in staged {
        handle.commit().await?;
    }
    Ok(output)
}

/// Check whether an external tool is on the PATH.
pub async fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}
