//! Tool registry: descriptors exposed to the model plus their handlers.
//!
//! Arguments are validated against each descriptor's JSON Schema before a
//! handler runs. Unknown tools, invalid arguments and handler failures all
//! come back as `Error: ...` text so the loop can keep going.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use jsonschema::{Validator, validator_for};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::conversation::ToolResult;
use crate::core::types::{ToolArgs, ToolCall, ToolDescriptor};
use crate::tools::{ToolContext, list_directory, read_file, render, run_script, write_file};

/// Handler invoked with validated arguments.
pub type ToolHandler = fn(&ToolContext, &ToolArgs) -> Result<String>;

struct RegisteredTool {
    validator: Validator,
    handler: ToolHandler,
}

/// Name-indexed table of tools.
#[derive(Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four sandbox tools.
    pub fn standard() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(list_directory::descriptor(), list_directory::handle)?;
        registry.register(read_file::descriptor(), read_file::handle)?;
        registry.register(run_script::descriptor(), run_script::handle)?;
        registry.register(write_file::descriptor(), write_file::handle)?;
        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: ToolHandler) -> Result<()> {
        if self.tools.contains_key(&descriptor.name) {
            bail!("tool {} registered twice", descriptor.name);
        }
        let validator = validator_for(&descriptor.parameters_schema())
            .map_err(|err| anyhow!("invalid schema for tool {}: {}", descriptor.name, err))?;
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool { validator, handler },
        );
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Run `call` and wrap its outcome for the conversation. Never fails.
    #[instrument(skip_all, fields(tool = %call.name))]
    pub fn dispatch(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!("unknown tool requested");
            return ToolResult::new(&call.name, format!("Error: Unknown function: {}", call.name));
        };

        let args = Value::Object(call.args.clone());
        let problems = tool
            .validator
            .iter_errors(&args)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        if !problems.is_empty() {
            warn!(?problems, "tool arguments failed validation");
            return ToolResult::new(
                &call.name,
                format!(
                    "Error: Invalid arguments for {}: {}",
                    call.name,
                    problems.join("; ")
                ),
            );
        }

        let result = render((tool.handler)(ctx, &call.args));
        debug!(result_chars = result.chars().count(), "tool finished");
        ToolResult::new(&call.name, result)
    }
}
