use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::{Result, ScoutError};

/// Catalog page the scraper starts from.
pub const DEFAULT_CATALOG_URL: &str = "https://catalog.northeastern.edu/graduate/university-interdisciplinary-programs/science-data-ms-bos/#programrequirementstext";

/// Environment variable holding the Gemini credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted index and metadata artifacts.
    pub data_dir: PathBuf,
    /// Catalog page to scrape.
    pub catalog_url: String,
    /// Address the HTTP server binds to.
    pub bind: String,
    /// HuggingFace id of the sentence embedding model.
    pub embed_model: String,
    /// Gemini model used for answer generation.
    pub gemini_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            bind: "127.0.0.1:8080".to_string(),
            embed_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating the default if it doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ScoutError::Config(format!("failed to parse config file: {e}")))?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ScoutError::Config(format!("failed to serialize config: {e}")))?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ScoutError::Config("could not determine home directory".to_string()))?;

        Ok(home.join(".coursescout").join("config.toml"))
    }

    /// Raw scraped corpus artifact.
    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join("raw_courses.json")
    }

    /// Ordered course metadata artifact (row i joins vector i).
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("courses.json")
    }

    /// Persisted vector index artifact.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("course_index.json")
    }

    /// Read the Gemini API key from the environment. Required at server
    /// startup; absence is fatal.
    pub fn gemini_api_key() -> Result<String> {
        std::env::var(API_KEY_ENV)
            .map_err(|_| ScoutError::Config(format!("{API_KEY_ENV} not set in environment")))
    }
}
