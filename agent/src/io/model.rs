//! Model client abstraction.
//!
//! The [`ModelClient`] trait decouples the agent loop from the generative
//! backend (currently the Gemini API). Tests use scripted clients that return
//! predetermined responses without touching the network.

use anyhow::Result;

use crate::core::conversation::Turn;
use crate::core::types::{ToolCall, ToolDescriptor, Usage};

/// Everything the model sees for one step.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Fixed instruction sent with every request.
    pub system_instruction: &'a str,
    /// Full ordered history, oldest first.
    pub conversation: &'a [Turn],
    /// Tools the model may call.
    pub tools: &'a [ToolDescriptor],
}

/// Model reply for one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Candidate turns, appended to the conversation verbatim.
    pub candidates: Vec<Turn>,
    /// Token counters, used only for diagnostics.
    pub usage: Option<Usage>,
}

impl ModelResponse {
    /// All tool calls across candidates, in the order received.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.candidates
            .iter()
            .flat_map(|turn| turn.tool_calls().cloned())
            .collect()
    }

    /// Text of the first candidate, or `None` when it carries none.
    pub fn text(&self) -> Option<String> {
        self.candidates.first().and_then(Turn::text)
    }
}

/// Abstraction over generative model backends.
pub trait ModelClient {
    /// Ask the model for its next action. Errors are transport or service
    /// faults and end the run.
    fn generate(&self, request: &ModelRequest<'_>) -> Result<ModelResponse>;
}
