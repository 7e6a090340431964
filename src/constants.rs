//! Application-wide constants.
//!
//! Endpoint defaults, environment variable names, attachment rules and
//! filesystem locations live here instead of being scattered across modules.

use std::path::PathBuf;

// ── Playlab API ───────────────────────────────────────────────────
/// Default API root. Every endpoint path is appended to this.
pub const DEFAULT_BASE_URL: &str = "https://www.playlab.ai/api/v1";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "PLAYLAB_API_KEY";
/// Environment variable holding the project (app) identifier.
pub const ENV_PROJECT_ID: &str = "PLAYLAB_PROJECT_ID";
/// Prefix of a payload line in the streamed reply.
pub const SSE_DATA_PREFIX: &str = "data:";
/// Marker some streams send after the last delta.
pub const SSE_DONE_MARKER: &str = "[DONE]";
/// Maximum bytes of an error body echoed back in an error message.
pub const ERROR_BODY_PREVIEW_LEN: usize = 300;

// ── Messages ──────────────────────────────────────────────────────
/// Marker separating the human-readable system prompt from the app's rules.
pub const SYSTEM_RULES_MARKER: &str = "### System Rules";

// ── Attachments ───────────────────────────────────────────────────
/// Extensions accepted as attachments (matched case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "webp", "txt", "md", "csv", "doc", "docx", "pptx", "xlsx",
];

// ── CLI ───────────────────────────────────────────────────────────
/// Delay schedule for retried read-only fetches in the REPL (ms).
pub const RETRY_DELAYS_MS: &[u64] = &[500, 1000, 2000, 4000];
/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to /tmp.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Returns `~/.config/playlab/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("playlab")
}

/// Returns `~/.config/playlab/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns `~/.config/playlab/.env` (credentials, never committed).
pub fn env_file_path() -> PathBuf {
    config_dir().join(".env")
}
