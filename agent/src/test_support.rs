//! Test-only helpers: a scripted model client and a temp-dir sandbox.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::conversation::Turn;
use crate::core::types::{ToolCall, Usage};
use crate::io::config::ScriptConfig;
use crate::io::model::{ModelClient, ModelRequest, ModelResponse};
use crate::io::sandbox::SandboxRoot;
use crate::tools::ToolContext;

/// Response whose only candidate requests `calls`.
pub fn calls_response(calls: Vec<ToolCall>) -> ModelResponse {
    ModelResponse {
        candidates: vec![Turn::model_calls(calls)],
        usage: Some(Usage {
            prompt_tokens: 10,
            response_tokens: 2,
        }),
    }
}

/// Response whose only candidate is final text.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        candidates: vec![Turn::model_text(text)],
        usage: Some(Usage {
            prompt_tokens: 10,
            response_tokens: 2,
        }),
    }
}

/// What the scripted model was asked, captured per request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_instruction: String,
    pub conversation: Vec<Turn>,
    pub tool_names: Vec<String>,
}

/// Model client that replays queued responses in order.
///
/// Once the queue is empty it either repeats a fixed response or fails.
pub struct ScriptedModel {
    queue: RefCell<VecDeque<Result<ModelResponse>>>,
    repeat: Option<ModelResponse>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Queue that may include transport failures.
    pub fn with_results(results: Vec<Result<ModelResponse>>) -> Self {
        Self {
            queue: RefCell::new(results.into()),
            repeat: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Model that answers every request with `response`.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            repeat: Some(response),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ModelClient for ScriptedModel {
    fn generate(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        self.requests.borrow_mut().push(RecordedRequest {
            system_instruction: request.system_instruction.to_string(),
            conversation: request.conversation.to_vec(),
            tool_names: request.tools.iter().map(|tool| tool.name.clone()).collect(),
        });
        if let Some(next) = self.queue.borrow_mut().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| anyhow!("scripted model has no more responses"))
    }
}

/// Sandbox in a temp directory. Scripts run with `sh` and need a `.sh` extension.
pub struct TestSandbox {
    _temp: Option<TempDir>,
    pub ctx: ToolContext,
}

impl TestSandbox {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut sandbox = Self::at(temp.path());
        sandbox._temp = Some(temp);
        sandbox
    }

    /// Sandbox rooted at an existing directory owned by the caller.
    pub fn at(dir: &Path) -> Self {
        let root = SandboxRoot::new(dir).expect("sandbox root");
        Self {
            _temp: None,
            ctx: ToolContext {
                root,
                max_chars: 10_000,
                script: ScriptConfig {
                    interpreter: "sh".to_string(),
                    extension: "sh".to_string(),
                    timeout_secs: 5,
                    output_limit_bytes: 100_000,
                },
            },
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.ctx.max_chars = max_chars;
        self
    }

    pub fn with_script_timeout_secs(mut self, secs: u64) -> Self {
        self.ctx.script.timeout_secs = secs;
        self
    }

    pub fn path(&self) -> &Path {
        self.ctx.root.path()
    }

    /// Write `content` to `relative`, creating parents.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative)).expect("read fixture")
    }
}

impl Default for TestSandbox {
    fn default() -> Self {
        Self::new()
    }
}
