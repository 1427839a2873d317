//! The agent loop: ask the model for its next action, run the requested
//! tools, append everything to the conversation, repeat.
//!
//! Each step is one model invocation plus the tool calls it requested, run
//! one after another in the order received. The loop ends when the model
//! answers without calling tools, answers with nothing at all, or the step
//! budget runs out. Tool failures are fed back to the model as text; only a
//! model failure ends the run with an error.

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::conversation::{Conversation, ToolResult, Turn};
use crate::core::types::{ToolCall, Usage};
use crate::io::model::{ModelClient, ModelRequest};
use crate::tools::{ToolContext, ToolRegistry};

/// Fallback answer when the model gives none.
pub const NO_ANSWER: &str = "I don't know";

/// The model could not be reached or returned a service error.
///
/// Not retried: the run stops at the step where it happened.
#[derive(Debug, Error)]
#[error("Agent error on step {step}: {cause:#}")]
pub struct ModelFailure {
    pub step: u32,
    pub cause: anyhow::Error,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStop {
    /// The model replied with text and no tool calls.
    Answered(String),
    /// The model replied with neither text nor tool calls.
    NoAnswer,
    /// Every step requested tools; the budget ran out.
    Exhausted { max_steps: u32 },
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub steps_executed: u32,
    pub stop: AgentStop,
    pub conversation: Conversation,
}

impl AgentOutcome {
    /// The answer to show the user, or [`NO_ANSWER`].
    pub fn final_text(&self) -> &str {
        match &self.stop {
            AgentStop::Answered(text) => text,
            AgentStop::NoAnswer | AgentStop::Exhausted { .. } => NO_ANSWER,
        }
    }
}

/// Progress notifications for callers that want to report on the run.
#[derive(Debug, Clone, Copy)]
pub enum AgentEvent<'a> {
    StepStarted { step: u32, max_steps: u32 },
    ToolCalled { step: u32, call: &'a ToolCall },
    ToolFinished { step: u32, result: &'a ToolResult },
    UsageReported { step: u32, usage: Usage },
}

/// Conversation plus step accounting for one run.
#[derive(Debug, Clone)]
pub struct AgentSession {
    conversation: Conversation,
    step: u32,
    max_steps: u32,
}

impl AgentSession {
    pub fn new(prompt: &str, max_steps: u32) -> Self {
        Self {
            conversation: Conversation::new(prompt),
            step: 0,
            max_steps,
        }
    }

    fn finish(self, stop: AgentStop) -> AgentOutcome {
        AgentOutcome {
            steps_executed: self.step,
            stop,
            conversation: self.conversation,
        }
    }
}

/// Static inputs shared by every step of a run.
pub struct AgentEnv<'a, M> {
    pub model: &'a M,
    pub registry: &'a ToolRegistry,
    pub tools: &'a ToolContext,
    pub system_instruction: &'a str,
}

/// Drive `session` until the model answers or the step budget is spent.
///
/// Returns an error only for a [`ModelFailure`]; callers can recover it with
/// `downcast_ref`.
#[instrument(skip_all, fields(max_steps = session.max_steps))]
pub fn run_agent<M: ModelClient, F: FnMut(&AgentEvent<'_>)>(
    env: AgentEnv<'_, M>,
    mut session: AgentSession,
    mut on_event: F,
) -> Result<AgentOutcome> {
    while session.step < session.max_steps {
        session.step += 1;
        let step = session.step;
        on_event(&AgentEvent::StepStarted {
            step,
            max_steps: session.max_steps,
        });

        let request = ModelRequest {
            system_instruction: env.system_instruction,
            conversation: session.conversation.turns(),
            tools: env.registry.descriptors(),
        };
        let response = match env.model.generate(&request) {
            Ok(response) => response,
            Err(cause) => {
                warn!(step, err = %format!("{cause:#}"), "model request failed");
                return Err(ModelFailure { step, cause }.into());
            }
        };
        if let Some(usage) = response.usage {
            on_event(&AgentEvent::UsageReported { step, usage });
        }

        let calls = response.tool_calls();
        let text = response.text();
        for turn in response.candidates {
            session.conversation.push(turn);
        }
        debug!(
            step,
            tool_calls = calls.len(),
            history = session.conversation.len(),
            "model responded"
        );

        if calls.is_empty() {
            let stop = match text {
                Some(text) => AgentStop::Answered(text),
                None => {
                    warn!(step, "model returned neither text nor tool calls");
                    AgentStop::NoAnswer
                }
            };
            info!(step, ?stop, "agent finished");
            return Ok(session.finish(stop));
        }

        for call in &calls {
            on_event(&AgentEvent::ToolCalled { step, call });
            let result = env.registry.dispatch(env.tools, call);
            on_event(&AgentEvent::ToolFinished {
                step,
                result: &result,
            });
            session.conversation.push(Turn::tool_result(result));
        }
    }

    let max_steps = session.max_steps;
    info!(max_steps, "step budget exhausted");
    Ok(session.finish(AgentStop::Exhausted { max_steps }))
}
