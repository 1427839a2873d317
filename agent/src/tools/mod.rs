//! Sandboxed tools the model can call.
//!
//! Every tool resolves its path through [`SandboxRoot`] first and reports its
//! outcome as text. Internal failures are `anyhow` errors that get rendered
//! as `Error: ...` at the tool boundary, so nothing but a string ever reaches
//! the agent loop.

pub mod list_directory;
pub mod read_file;
pub mod registry;
pub mod run_script;
pub mod write_file;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use crate::core::types::ToolArgs;
use crate::io::config::{AgentConfig, ScriptConfig};
use crate::io::sandbox::{SandboxError, SandboxRoot};

pub use list_directory::list_directory;
pub use read_file::read_file;
pub use registry::ToolRegistry;
pub use run_script::run_script;
pub use write_file::write_file;

/// Immutable settings threaded into every tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub root: SandboxRoot,
    /// Character budget for file reads.
    pub max_chars: usize,
    pub script: ScriptConfig,
}

impl ToolContext {
    pub fn from_config(cfg: &AgentConfig) -> Result<Self> {
        Ok(Self {
            root: SandboxRoot::new(&cfg.working_dir)?,
            max_chars: cfg.max_chars,
            script: cfg.script.clone(),
        })
    }

    /// Resolve `path` for an operation described by `verb` ("read", "list", ...).
    fn resolve(&self, path: &str, verb: &str) -> Result<PathBuf> {
        self.root.resolve(path).map_err(|err| match err {
            SandboxError::Outside { .. } => anyhow!(
                "Cannot {verb} \"{path}\" as it is outside the permitted working directory"
            ),
            other => anyhow::Error::new(other),
        })
    }
}

/// Render a tool outcome as the text handed back to the model.
pub(crate) fn render(result: Result<String>) -> String {
    result.unwrap_or_else(|err| format!("Error: {err:#}"))
}

fn str_arg<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(|value| value.as_str())
        .with_context(|| format!("missing string argument \"{name}\""))
}

fn opt_str_arg<'a>(args: &'a ToolArgs, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .with_context(|| format!("argument \"{name}\" must be a string")),
    }
}

fn string_list_arg(args: &ToolArgs, name: &str) -> Result<Vec<String>> {
    let Some(value) = args.get(name) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .with_context(|| format!("argument \"{name}\" must be an array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .with_context(|| format!("argument \"{name}\" must be an array of strings"))
        })
        .collect()
}
