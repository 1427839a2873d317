//! `write_file`: create or fully replace a text file inside the sandbox.

use anyhow::{Context, Result, bail};
use tracing::instrument;

use crate::core::types::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
use crate::io::atomic::write_atomic;
use crate::tools::{ToolContext, render, str_arg};

pub const NAME: &str = "write_file";

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Write or overwrite a text file with the provided content, relative to the working directory.",
        vec![
            ParamSpec::required(
                "file_path",
                ParamType::String,
                "Relative path to the file to write (e.g., 'notes.txt').",
            ),
            ParamSpec::required(
                "content",
                ParamType::String,
                "Full text content to write to the file.",
            ),
        ],
    )
}

/// Replace `path` with `content`, creating parent directories as needed.
pub fn write_file(ctx: &ToolContext, path: &str, content: &str) -> String {
    render(try_write_file(ctx, path, content))
}

pub(crate) fn handle(ctx: &ToolContext, args: &ToolArgs) -> Result<String> {
    try_write_file(ctx, str_arg(args, "file_path")?, str_arg(args, "content")?)
}

#[instrument(skip(ctx, content), fields(content_chars = content.chars().count()))]
fn try_write_file(ctx: &ToolContext, path: &str, content: &str) -> Result<String> {
    let target = ctx.resolve(path, "write")?;
    // Includes the root itself; its temp sibling would sit outside the sandbox.
    if target.is_dir() {
        bail!("\"{path}\" is a directory");
    }
    write_atomic(&target, content.as_bytes()).with_context(|| format!("write \"{path}\""))?;
    Ok(format!(
        "Wrote {} chars to \"{path}\"",
        content.chars().count()
    ))
}
