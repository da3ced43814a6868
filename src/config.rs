use anyhow::Result;
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub ai: AiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AiConfig {
    pub provider: Provider,
    pub max_tokens: u32,
    pub temperature: f32,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub api_url: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            max_tokens: 300,
            temperature: 0.3,
            anthropic_api_key: None,
            openai_api_key: None,
            api_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    /// Name of the environment variable holding this provider's API key.
    pub fn key_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-haiku-20240307",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        })
    }
}

impl AiConfig {
    /// Resolve the credential for a provider: an explicitly configured key
    /// wins, otherwise the provider's environment variable.
    pub fn credential_for(&self, provider: Provider) -> Option<String> {
        let configured = match provider {
            Provider::Anthropic => self.anthropic_api_key.clone(),
            Provider::OpenAi => self.openai_api_key.clone(),
        };
        configured
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(provider.key_env()).ok().filter(|key| !key.is_empty()))
    }
}

impl Config {
    pub fn create_default(path: &Path) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config file, creating a default one on first run.
    pub fn load_or_init() -> Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path)?;
            println!("Created default config at {:?}", config_path);
            return Ok(Self::default());
        }

        Self::load(&config_path)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "quill", "quill")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
