//! `run_script`: execute a sandbox script with the configured interpreter.

use std::ffi::OsStr;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use crate::core::types::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
use crate::io::process::{CommandOutput, run_command_with_timeout};
use crate::tools::{ToolContext, render, str_arg, string_list_arg};

pub const NAME: &str = "run_script";

/// Returned when the script exits 0 without printing anything.
pub const NO_OUTPUT: &str = "No output produced.";

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Execute a script file with optional command-line arguments, relative to the working directory.",
        vec![
            ParamSpec::required(
                "file_path",
                ParamType::String,
                "Relative path to the script to execute (e.g., 'main.py').",
            ),
            ParamSpec::optional(
                "args",
                ParamType::Array(Box::new(ParamType::String)),
                "Optional list of command-line arguments to pass to the script.",
            ),
        ],
    )
}

/// Run `path` with `args`, from the sandbox root, under the configured timeout.
///
/// The result lists captured stdout and stderr (when non-empty) and notes a
/// non-zero exit code. A timeout kills the script and is reported as an error.
pub fn run_script(ctx: &ToolContext, path: &str, args: &[String]) -> String {
    render(try_run_script(ctx, path, args))
}

pub(crate) fn handle(ctx: &ToolContext, args: &ToolArgs) -> Result<String> {
    let path = str_arg(args, "file_path")?;
    let script_args = string_list_arg(args, "args")?;
    try_run_script(ctx, path, &script_args)
}

#[instrument(skip(ctx))]
fn try_run_script(ctx: &ToolContext, path: &str, args: &[String]) -> Result<String> {
    let target = ctx.resolve(path, "execute")?;
    if !target.exists() {
        bail!("File \"{path}\" not found.");
    }
    let extension = ctx.script.extension.as_str();
    if target.extension() != Some(OsStr::new(extension)) || !target.is_file() {
        bail!("\"{path}\" is not a .{extension} script.");
    }

    let mut cmd = Command::new(&ctx.script.interpreter);
    cmd.arg(&target).args(args).current_dir(ctx.root.path());
    let output = run_command_with_timeout(
        cmd,
        ctx.script.timeout(),
        ctx.script.output_limit_bytes,
    )
    .with_context(|| format!("executing script \"{path}\""))?;

    let mut chunks = output_sections(&output);
    if output.timed_out {
        info!(timeout_secs = ctx.script.timeout_secs, "script timed out");
        chunks.insert(
            0,
            format!(
                "executing script \"{path}\": timed out after {} seconds",
                ctx.script.timeout_secs
            ),
        );
        bail!(chunks.join("\n"));
    }

    if !output.status.success() {
        match output.status.code() {
            Some(code) => chunks.push(format!("Process exited with code {code}")),
            None => chunks.push("Process was terminated by a signal".to_string()),
        }
    }
    if chunks.is_empty() {
        return Ok(NO_OUTPUT.to_string());
    }
    Ok(chunks.join("\n"))
}

fn output_sections(output: &CommandOutput) -> Vec<String> {
    let mut chunks = Vec::new();
    let stdout = output.stdout_text();
    if !stdout.is_empty() {
        chunks.push(format!("STDOUT:\n{stdout}"));
    }
    let stderr = output.stderr_text();
    if !stderr.is_empty() {
        chunks.push(format!("STDERR:\n{stderr}"));
    }
    chunks
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::TestSandbox;

    #[test]
    fn stdout_only_success_has_no_exit_note() {
        let sandbox = TestSandbox::new();
        sandbox.write("hi.sh", "echo hi\n");
        assert_eq!(run_script(&sandbox.ctx, "hi.sh", &[]), "STDOUT:\nhi");
    }

    #[test]
    fn args_are_passed_and_cwd_is_root() {
        let sandbox = TestSandbox::new();
        sandbox.write("bin/args.sh", "echo \"$1-$2\"\npwd\n");
        let out = run_script(
            &sandbox.ctx,
            "bin/args.sh",
            &["3".to_string(), "5".to_string()],
        );
        assert_eq!(
            out,
            format!("STDOUT:\n3-5\n{}", sandbox.ctx.root.path().display())
        );
    }

    #[test]
    fn stderr_and_exit_code_are_reported() {
        let sandbox = TestSandbox::new();
        sandbox.write("fail.sh", "echo partial\necho boom 1>&2\nexit 4\n");
        assert_eq!(
            run_script(&sandbox.ctx, "fail.sh", &[]),
            "STDOUT:\npartial\nSTDERR:\nboom\nProcess exited with code 4"
        );
    }

    #[test]
    fn silent_success_reports_no_output() {
        let sandbox = TestSandbox::new();
        sandbox.write("quiet.sh", "true\n");
        assert_eq!(run_script(&sandbox.ctx, "quiet.sh", &[]), NO_OUTPUT);
    }

    #[test]
    fn missing_and_wrong_extension_are_refused() {
        let sandbox = TestSandbox::new();
        sandbox.write("notes.txt", "echo nope\n");
        assert_eq!(
            run_script(&sandbox.ctx, "missing.sh", &[]),
            "Error: File \"missing.sh\" not found."
        );
        assert_eq!(
            run_script(&sandbox.ctx, "notes.txt", &[]),
            "Error: \"notes.txt\" is not a .sh script."
        );
    }

    #[test]
    fn escaping_script_is_refused() {
        let sandbox = TestSandbox::new();
        assert_eq!(
            run_script(&sandbox.ctx, "../evil.sh", &[]),
            "Error: Cannot execute \"../evil.sh\" as it is outside the permitted working directory"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_and_reaps_the_script() {
        let sandbox = TestSandbox::new().with_script_timeout_secs(1);
        sandbox.write("slow.sh", "echo $$ > pid.txt\necho started\nexec sleep 30\n");
        let out = run_script(&sandbox.ctx, "slow.sh", &[]);
        assert!(
            out.starts_with("Error: executing script \"slow.sh\": timed out after 1 seconds"),
            "{out}"
        );
        assert!(out.contains("STDOUT:\nstarted"), "{out}");

        let pid = sandbox.read("pid.txt").trim().to_string();
        assert!(
            !std::path::Path::new("/proc").join(&pid).exists(),
            "script process {pid} still running"
        );
    }

    #[cfg(target_os = "linux")]
    fn is_gone(pid: &str) -> bool {
        let stat = std::path::Path::new("/proc").join(pid).join("stat");
        match std::fs::read_to_string(stat) {
            Ok(stat) => stat.rsplit_once(") ").is_some_and(|(_, rest)| rest.starts_with('Z')),
            Err(_) => true,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_processes_the_script_started() {
        let sandbox = TestSandbox::new().with_script_timeout_secs(1);
        sandbox.write(
            "slow.sh",
            "sleep 30 &\necho $! > pid.txt\necho started\nsleep 6\necho after\n",
        );
        let start = std::time::Instant::now();
        let out = run_script(&sandbox.ctx, "slow.sh", &[]);
        assert!(
            start.elapsed() < std::time::Duration::from_secs(4),
            "tool blocked for {:?}",
            start.elapsed()
        );
        assert_eq!(
            out,
            "Error: executing script \"slow.sh\": timed out after 1 seconds\nSTDOUT:\nstarted"
        );

        let pid = sandbox.read("pid.txt").trim().to_string();
        let poll_until = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while !is_gone(&pid) && std::time::Instant::now() < poll_until {
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        assert!(is_gone(&pid), "background process {pid} still running");
    }
}
