//! Sandbox root and path resolution.
//!
//! Every tool resolves its path argument here before touching the
//! filesystem. Resolution is read-only: it may stat and canonicalize, but it
//! never creates, writes or executes anything.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use thiserror::Error;
use tracing::debug;

use crate::core::path::{is_within, lexical_join};

/// Failure to resolve a path inside the sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The path points outside the sandbox root.
    #[error("\"{requested}\" is outside the permitted working directory")]
    Outside { requested: String },
    /// The filesystem could not be inspected while resolving.
    #[error("resolve {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Canonical, absolute directory that bounds all tool operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// Canonicalize `dir` and use it as the sandbox root.
    pub fn new(dir: &Path) -> Result<Self> {
        let root = fs::canonicalize(dir)
            .with_context(|| format!("resolve working directory {}", dir.display()))?;
        if !root.is_dir() {
            bail!("working directory {} is not a directory", root.display());
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` to an absolute path inside the root.
    ///
    /// `""` and `"."` resolve to the root itself. Symlinks are followed for
    /// every component that exists, so a link pointing out of the root is an
    /// escape. Components that do not exist yet are appended as-is, which lets
    /// callers resolve files they are about to create.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let lexical = lexical_join(&self.root, Path::new(relative));
        let canonical = canonicalize_existing_prefix(&lexical, relative)?;
        if !is_within(&self.root, &canonical) {
            debug!(requested = relative, resolved = %canonical.display(), "path escapes sandbox");
            return Err(SandboxError::Outside {
                requested: relative.to_string(),
            });
        }
        Ok(canonical)
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// missing tail.
fn canonicalize_existing_prefix(path: &Path, requested: &str) -> Result<PathBuf, SandboxError> {
    let mut existing = path.to_path_buf();
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(&existing) {
            Ok(canonical) => {
                let mut out = canonical;
                for name in missing.iter().rev() {
                    out.push(name);
                }
                return Ok(out);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // A dangling symlink exists but cannot be canonicalized; its
                // target is unknown, so refuse it.
                if fs::symlink_metadata(&existing).is_ok() {
                    return Err(SandboxError::Outside {
                        requested: requested.to_string(),
                    });
                }
                let Some(name) = existing.file_name().map(|name| name.to_os_string()) else {
                    return Err(SandboxError::Io {
                        path: path.to_path_buf(),
                        source: err,
                    });
                };
                missing.push(name);
                existing.pop();
            }
            Err(err) => {
                return Err(SandboxError::Io {
                    path: existing,
                    source: err,
                });
            }
        }
    }
}
