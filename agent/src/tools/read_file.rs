//! `read_file`: text content of a sandbox file, bounded by a character budget.

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use crate::core::truncate::truncate_chars;
use crate::core::types::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
use crate::tools::{ToolContext, render, str_arg};

pub const NAME: &str = "read_file";

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Read the full text content of a file, relative to the working directory.",
        vec![ParamSpec::required(
            "file_path",
            ParamType::String,
            "Relative path to the file to read (e.g., 'main.py').",
        )],
    )
}

/// Read `path` as text.
///
/// Invalid UTF-8 is replaced rather than rejected. Content longer than
/// `ctx.max_chars` characters is cut and followed by a truncation marker.
pub fn read_file(ctx: &ToolContext, path: &str) -> String {
    render(try_read_file(ctx, path))
}

pub(crate) fn handle(ctx: &ToolContext, args: &ToolArgs) -> Result<String> {
    try_read_file(ctx, str_arg(args, "file_path")?)
}

/// Marker appended after truncated content.
pub fn truncation_marker(path: &str, max_chars: usize) -> String {
    format!("\n[...File \"{path}\" truncated at {max_chars} characters]")
}

#[instrument(skip(ctx))]
fn try_read_file(ctx: &ToolContext, path: &str) -> Result<String> {
    let target = ctx.resolve(path, "read")?;
    if !target.is_file() {
        bail!("File not found or is not a regular file: \"{path}\"");
    }

    let bytes = fs::read(&target).with_context(|| format!("read \"{path}\""))?;
    let content = String::from_utf8_lossy(&bytes);
    let (kept, truncated) = truncate_chars(&content, ctx.max_chars);
    if truncated {
        debug!(max_chars = ctx.max_chars, "file content truncated");
        return Ok(format!("{kept}{}", truncation_marker(path, ctx.max_chars)));
    }
    Ok(kept.to_string())
}
