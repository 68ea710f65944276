//! Configuration management for audiodesk.
//!
//! Settings live in a TOML file in the user's config directory. The AI
//! credential is never stored there; it is read from the environment at
//! startup.

pub mod file;

pub use file::{config_path, AiSettings, AudioConfig, AudiodeskConfig};

/// Environment variables consulted for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Reads the API key from the environment. A missing key is not an error.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
