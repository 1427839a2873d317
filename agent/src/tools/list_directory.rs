//! `list_directory`: names of the entries in a sandbox directory.

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::instrument;

use crate::core::types::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
use crate::tools::{ToolContext, opt_str_arg, render};

pub const NAME: &str = "list_directory";

/// Returned for a directory with no entries.
pub const EMPTY_DIRECTORY: &str = "(empty directory)";

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "List the files and directories in a directory, relative to the working directory.",
        vec![ParamSpec::optional(
            "directory",
            ParamType::String,
            "Directory path to list, relative to the working directory (default: '.').",
        )],
    )
}

/// List `directory` as sorted entry names, one per line.
pub fn list_directory(ctx: &ToolContext, directory: &str) -> String {
    render(try_list_directory(ctx, directory))
}

pub(crate) fn handle(ctx: &ToolContext, args: &ToolArgs) -> Result<String> {
    let directory = opt_str_arg(args, "directory")?.unwrap_or(".");
    try_list_directory(ctx, directory)
}

#[instrument(skip(ctx))]
fn try_list_directory(ctx: &ToolContext, directory: &str) -> Result<String> {
    let target = ctx.resolve(directory, "list")?;
    if !target.is_dir() {
        bail!("\"{directory}\" is not a directory");
    }

    let mut names = Vec::new();
    for entry in
        fs::read_dir(&target).with_context(|| format!("list directory \"{directory}\""))?
    {
        let entry = entry.context("read directory entry")?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    if names.is_empty() {
        return Ok(EMPTY_DIRECTORY.to_string());
    }
    names.sort();
    Ok(names.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestSandbox;

    #[test]
    fn entries_are_sorted_lexicographically() {
        let sandbox = TestSandbox::new();
        sandbox.write("b.txt", "b");
        sandbox.write("a.py", "a");
        assert_eq!(list_directory(&sandbox.ctx, "."), "a.py\nb.txt");
    }

    #[test]
    fn subdirectories_are_listed_by_name() {
        let sandbox = TestSandbox::new();
        sandbox.write("pkg/render.py", "");
        sandbox.write("main.py", "");
        assert_eq!(list_directory(&sandbox.ctx, ""), "main.py\npkg");
        assert_eq!(list_directory(&sandbox.ctx, "pkg"), "render.py");
    }

    #[test]
    fn empty_directory_returns_sentinel() {
        let sandbox = TestSandbox::new();
        assert_eq!(list_directory(&sandbox.ctx, "."), EMPTY_DIRECTORY);
    }

    #[test]
    fn file_target_is_not_a_directory() {
        let sandbox = TestSandbox::new();
        sandbox.write("main.py", "print('x')");
        assert_eq!(
            list_directory(&sandbox.ctx, "main.py"),
            "Error: \"main.py\" is not a directory"
        );
    }

    #[test]
    fn escaping_directory_is_refused() {
        let sandbox = TestSandbox::new();
        assert_eq!(
            list_directory(&sandbox.ctx, "../"),
            "Error: Cannot list \"../\" as it is outside the permitted working directory"
        );
    }

    #[test]
    fn missing_directory_argument_defaults_to_root() {
        let sandbox = TestSandbox::new();
        sandbox.write("main.py", "");
        let out = handle(&sandbox.ctx, &ToolArgs::new()).expect("handle");
        assert_eq!(out, "main.py");
    }
}
