//! `agent` CLI: run one prompt through the sandboxed agent loop.

use std::path::PathBuf;

use agent::exit_codes;
use agent::io::config::{AgentConfig, load_config};
use agent::io::credentials::load_api_key;
use agent::io::gemini::GeminiClient;
use agent::logging;
use agent::looping::{AgentEnv, AgentEvent, AgentOutcome, AgentSession, ModelFailure, run_agent};
use agent::tools::{ToolContext, ToolRegistry};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};

#[derive(Debug, Parser)]
#[command(
    name = "agent",
    version,
    about = "Coding agent that works inside a single sandbox directory"
)]
struct Cli {
    /// Print step, tool-call and token-usage diagnostics.
    #[arg(long)]
    verbose: bool,

    /// Path to TOML config file.
    #[arg(long, env = "AGENT_CONFIG", default_value = "agent.toml")]
    config: PathBuf,

    /// Override the sandbox directory.
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Override the maximum number of model steps.
    #[arg(long)]
    max_steps: Option<u32>,

    /// Override the model name.
    #[arg(long)]
    model: Option<String>,

    /// Prompt for the agent; words are joined with spaces.
    prompt: Vec<String>,
}

fn main() {
    logging::init();
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            return code;
        }
    };

    let prompt = cli.prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Error: You must provide a prompt as a command line argument");
        return exit_codes::INVALID;
    }
    if cli.verbose {
        println!("User prompt: {prompt}");
    }

    match run_prompt(&cli, &prompt) {
        Ok(outcome) => {
            println!("Final response:");
            println!("{}", outcome.final_text());
            exit_codes::OK
        }
        Err(err) => {
            if let Some(failure) = err.downcast_ref::<ModelFailure>() {
                eprintln!("{failure}");
                return exit_codes::MODEL_FAILURE;
            }
            eprintln!("Error: {err:#}");
            exit_codes::INVALID
        }
    }
}

fn run_prompt(cli: &Cli, prompt: &str) -> Result<AgentOutcome> {
    let cfg = effective_config(cli)?;
    let api_key = load_api_key()?;
    let tools = ToolContext::from_config(&cfg)?;
    let registry = ToolRegistry::standard()?;
    let model = GeminiClient::new(&cfg.api, &cfg.model, api_key)?;

    let verbose = cli.verbose;
    run_agent(
        AgentEnv {
            model: &model,
            registry: &registry,
            tools: &tools,
            system_instruction: &cfg.system_prompt,
        },
        AgentSession::new(prompt, cfg.max_steps),
        |event| report(event, verbose),
    )
}

fn effective_config(cli: &Cli) -> Result<AgentConfig> {
    let mut cfg = load_config(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    if let Some(dir) = &cli.working_dir {
        cfg.working_dir = dir.clone();
    }
    if let Some(max_steps) = cli.max_steps {
        cfg.max_steps = max_steps;
    }
    if let Some(model) = &cli.model {
        cfg.model = model.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn report(event: &AgentEvent<'_>, verbose: bool) {
    match event {
        AgentEvent::StepStarted { step, max_steps } => {
            if verbose {
                println!("Step {step}/{max_steps}");
            }
        }
        AgentEvent::ToolCalled { call, .. } => {
            if verbose {
                println!(
                    "Calling function: {}({})",
                    call.name,
                    Value::Object(call.args.clone())
                );
            } else {
                println!(" - Calling function: {}", call.name);
            }
        }
        AgentEvent::ToolFinished { result, .. } => {
            if verbose {
                println!("-> {}", json!({ "result": result.response.result }));
            }
        }
        AgentEvent::UsageReported { usage, .. } => {
            if verbose {
                println!("Prompt tokens: {}", usage.prompt_tokens);
                println!("Response tokens: {}", usage.response_tokens);
            }
        }
    }
}
