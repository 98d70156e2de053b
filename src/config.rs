use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE_URL: &str = "sqlite://~/.local/share/music-catalog/catalog.db?mode=rwc";
const DEFAULT_IMAGES_PATH: &str = "~/.local/share/music-catalog/images";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    database_url: String,
    images_path: String,
    pub environment: String,
    pub jwt_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub discogs_token: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,
    pub otlp_endpoint: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            images_path: DEFAULT_IMAGES_PATH.to_string(),
            environment: "Production".to_string(),
            jwt_secret: None,
            google_client_id: None,
            discogs_token: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            otlp_endpoint: None,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("music-catalog").join("config.toml"))
    }

    /// Load the given file, else the default location if it exists, else
    /// defaults. Environment variables override whatever was loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path().filter(|p| p.exists()) {
                Some(default_path) => Self::from_file(&default_path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| color_eyre::eyre::eyre!("No config directory on this platform"))?;
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var("DATABASE_URL") {
            self.database_url = value;
        }
        if let Some(value) = var("IMAGES_PATH") {
            self.images_path = value;
        }
        if let Some(value) = var("APP_ENVIRONMENT") {
            self.environment = value;
        }
        if let Some(value) = var("OLLAMA_URL") {
            self.ollama_url = value;
        }
        if let Some(value) = var("OLLAMA_MODEL") {
            self.ollama_model = value;
        }
        let optional = [
            ("JWT_SECRET", &mut self.jwt_secret),
            ("GOOGLE_CLIENT_ID", &mut self.google_client_id),
            ("DISCOGS_TOKEN", &mut self.discogs_token),
            ("OTLP_ENDPOINT", &mut self.otlp_endpoint),
        ];
        for (key, slot) in optional {
            if let Some(value) = var(key).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Database URL with a leading `~/` in a SQLite path expanded.
    pub fn database_url(&self) -> String {
        match self.database_url.strip_prefix("sqlite://~/") {
            Some(rest) => {
                let expanded = Self::expand_path(&format!("~/{rest}"));
                format!("sqlite://{}", expanded.display())
            }
            None => self.database_url.clone(),
        }
    }

    pub fn images_path(&self) -> PathBuf {
        Self::expand_path(&self.images_path)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}
