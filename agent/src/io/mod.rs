//! I/O helpers for the agent: filesystem, child processes, configuration and
//! the remote model.

pub mod atomic;
pub mod config;
pub mod credentials;
pub mod gemini;
pub mod model;
pub mod process;
pub mod sandbox;
