//! Agent configuration stored in a TOML file (default `agent.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;


pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI coding agent working on a small codebase in your working directory.

Agent policy:
- Prefer using the available tools to gather evidence before asking the user questions.
- When the user asks about behavior or implementation, proactively inspect the repository.
- Stop and ask for clarification only after you have attempted reasonable inspections.

Allowed operations:
- List files and directories
- Read file contents
- Execute scripts with optional arguments
- Write or overwrite files

Safety rules:
- All paths are relative to the working directory. Do not escape this directory.
- Do not invent filenames, directories, or arguments you don't have.
- If no operation applies, respond briefly in natural language.
";

/// Agent configuration (TOML).
///
/// Missing fields default to the values the agent ships with.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Model name passed to the generative API.
    pub model: String,

    /// Directory that becomes the sandbox root.
    pub working_dir: PathBuf,

    /// Maximum number of model invocations per run.
    pub max_steps: u32,

    /// Character budget for `read_file` results.
    pub max_chars: usize,

    /// Fixed instruction sent with every model request.
    pub system_prompt: String,

    pub script: ScriptConfig,

    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Program used to run scripts (receives the script path as first argument).
    pub interpreter: String,

    /// File extension (without the dot) a script must carry.
    pub extension: String,

    /// Wall-clock limit before the script is killed.
    pub timeout_secs: u64,

    /// Per-stream cap on captured stdout/stderr bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the generative language API.
    pub base_url: String,

    pub request_timeout_secs: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            timeout_secs: 30,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-001".to_string(),
            working_dir: PathBuf::from("./calculator"),
            max_steps: 20,
            max_chars: 10_000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            script: ScriptConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl ScriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be > 0"));
        }
        if self.max_chars == 0 {
            return Err(anyhow!("max_chars must be > 0"));
        }
        if self.script.interpreter.trim().is_empty() {
            return Err(anyhow!("script.interpreter must be non-empty"));
        }
        if self.script.extension.trim().is_empty() || self.script.extension.starts_with('.') {
            return Err(anyhow!(
                "script.extension must be non-empty and given without a leading dot"
            ));
        }
        if self.script.timeout_secs == 0 {
            return Err(anyhow!("script.timeout_secs must be > 0"));
        }
        if self.script.output_limit_bytes == 0 {
            return Err(anyhow!("script.output_limit_bytes must be > 0"));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url must be non-empty"));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(anyhow!("api.request_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn full_file_overrides_every_section() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(
            &path,
            "model = \"gemini-2.5-flash\"\nworking_dir = \"proj\"\nmax_steps = 5\n\n\
             [script]\ntimeout_secs = 7\n\n[api]\nbase_url = \"http://localhost:9\"\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model, "gemini-2.5-flash");
        assert_eq!(cfg.working_dir, PathBuf::from("proj"));
        assert_eq!(cfg.max_steps, 5);
        assert_eq!(cfg.script.timeout_secs, 7);
        assert_eq!(cfg.script.interpreter, "python3");
        assert_eq!(cfg.api.base_url, "http://localhost:9");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(&path, "max_steps = 3\n\n[script]\ninterpreter = \"sh\"\nextension = \"sh\"\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_steps, 3);
        assert_eq!(cfg.script.interpreter, "sh");
        assert_eq!(cfg.script.timeout_secs, 30);
        assert_eq!(cfg.max_chars, 10_000);
    }

    #[test]
    fn zero_step_budget_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(&path, "max_steps = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_steps must be > 0"));
    }

    #[test]
    fn dotted_extension_is_rejected() {
        let cfg = AgentConfig {
            script: ScriptConfig {
                extension: ".py".to_string(),
                ..ScriptConfig::default()
            },
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
