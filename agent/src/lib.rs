//! Sandboxed coding agent.
//!
//! A generative model is asked, step after step, for its next action; the
//! tools it requests run against a single sandbox directory and their results
//! are fed back until the model answers or the step budget is spent. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (conversation model, tool
//!   contracts, path containment, truncation). No I/O.
//! - **[`io`]**: Side-effecting operations (sandbox resolution, processes,
//!   configuration, the remote model). Behind traits where tests need fakes.
//! - **[`tools`]**: The sandboxed tools and their registry.
//!
//! [`looping`] drives the loop on top of all three.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
