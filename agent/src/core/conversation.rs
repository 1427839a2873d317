//! Append-only conversation history passed in full to the model each step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::ToolCall;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

/// Outcome of one tool invocation, in the shape the model expects:
/// `{name, response: {result}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub response: ToolResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub result: String,
}

impl ToolResult {
    pub fn new(name: &str, result: String) -> Self {
        Self {
            name: name.to_string(),
            response: ToolResponse { result },
        }
    }
}

/// One element of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// One entry of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
    /// Provider payload this turn was decoded from, resent unchanged so fields
    /// the crate does not model (thought signatures, say) survive the round trip.
    pub raw: Option<Value>,
}

impl Turn {
    pub fn user_text(text: &str) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.to_string())],
            raw: None,
        }
    }

    pub fn model_text(text: &str) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.to_string())],
            raw: None,
        }
    }

    pub fn model_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Model,
            parts: calls.into_iter().map(Part::ToolCall).collect(),
            raw: None,
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::ToolResult(result)],
            raw: None,
        }
    }

    /// Tool calls carried by this turn, in part order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    /// Concatenated text parts, or `None` when the turn carries no text.
    pub fn text(&self) -> Option<String> {
        let text = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<String>();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Ordered turn log. Turns can be appended but never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Start a conversation with the user's prompt.
    pub fn new(prompt: &str) -> Self {
        Self {
            turns: vec![Turn::user_text(prompt)],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
