//! API credential loading.

use anyhow::{Result, bail};
use tracing::debug;

/// Environment variable holding the model API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Load `.env` (if any) and read the API key from the environment.
///
/// A missing or blank key is a configuration error; the caller must not start
/// the loop without one.
pub fn load_api_key() -> Result<String> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(err = %err, "no .env loaded"),
    }
    require_api_key(std::env::var(API_KEY_ENV).ok())
}

fn require_api_key(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => bail!("Missing {API_KEY_ENV} in environment variables."),
    }
}
