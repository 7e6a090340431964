use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::api::InstructionVariables;
use crate::constants::*;
use crate::error::{PlaylabError, Result};

/// How replies are written to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Text exactly as received.
    Plain,
    /// Markdown-friendly: display math delimiters rewritten to `$`.
    Markdown,
}

/// Application configuration with sensible defaults.
///
/// Can be overridden via ~/.config/playlab/config.toml
#[derive(Debug, Clone)]
pub struct Config {
    /// API root, without trailing slash
    pub base_url: String,
    /// API key from the config file, if any (env and CLI take part in resolution)
    pub api_key: Option<String>,
    /// Project id from the config file, if any
    pub project_id: Option<String>,
    /// Reply rendering mode
    pub render: RenderMode,
    /// Print replies as they stream instead of after completion
    pub stream: bool,
    /// Wrap replies at this width (0 = no wrapping)
    pub wrap_width: usize,
    /// Connect timeout and longest silence between reads (None = wait forever)
    pub request_timeout: Option<Duration>,
    /// Variables sent whenever a new conversation is created
    pub instruction_variables: InstructionVariables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            project_id: None,
            render: RenderMode::Markdown,
            stream: true,
            wrap_width: 0,
            request_timeout: None,
            instruction_variables: InstructionVariables::new(),
        }
    }
}

/// TOML-deserializable config file format.
/// All fields are optional; missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    project_id: Option<String>,
    render: Option<RenderMode>,
    stream: Option<bool>,
    wrap_width: Option<usize>,
    request_timeout_secs: Option<u64>,
    instruction_variables: Option<InstructionVariables>,
}

impl Config {
    /// Load config from ~/.config/playlab/config.toml, falling back to defaults
    /// for any missing fields. If the file doesn't exist, returns pure defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let config = Config::default();

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return config, // No config file, use defaults
        };

        match toml::from_str::<FileConfig>(&content) {
            Ok(file_config) => config.merge(file_config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                config
            }
        }
    }

    fn merge(mut self, file: FileConfig) -> Self {
        if let Some(v) = file.base_url {
            let v = v.trim().trim_end_matches('/');
            if !v.is_empty() {
                self.base_url = v.to_string();
            }
        }
        self.api_key = non_empty(file.api_key);
        self.project_id = non_empty(file.project_id);
        if let Some(v) = file.render {
            self.render = v;
        }
        if let Some(v) = file.stream {
            self.stream = v;
        }
        if let Some(v) = file.wrap_width {
            self.wrap_width = v;
        }
        if let Some(v) = file.request_timeout_secs {
            // 0 = no timeout
            self.request_timeout = (v > 0).then(|| Duration::from_secs(v));
        }
        if let Some(v) = file.instruction_variables {
            self.instruction_variables = v;
        }
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// API key and project id. Immutable once built; both guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    project_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Result<Self> {
        Self::resolve(Some(api_key.into()), Some(project_id.into()), |_| None)
    }

    /// Resolve each field from its explicit value, falling back to `env`.
    ///
    /// `env` is looked up by variable name ([`ENV_API_KEY`], [`ENV_PROJECT_ID`]).
    /// Passing the lookup in keeps process environment access in the caller.
    pub fn resolve<F>(api_key: Option<String>, project_id: Option<String>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(api_key)
            .or_else(|| non_empty(env(ENV_API_KEY)))
            .ok_or_else(|| {
                PlaylabError::Configuration(format!(
                    "API key must be provided either as an argument or through the {} environment variable",
                    ENV_API_KEY
                ))
            })?;
        let project_id = non_empty(project_id)
            .or_else(|| non_empty(env(ENV_PROJECT_ID)))
            .ok_or_else(|| {
                PlaylabError::Configuration(format!(
                    "Project ID must be provided either as an argument or through the {} environment variable",
                    ENV_PROJECT_ID
                ))
            })?;

        Ok(Self {
            api_key,
            project_id,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}
