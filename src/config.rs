use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::parser::normalize;
use crate::parser::selectors::{CompiledSelectors, SelectorConfig};

pub const DEFAULT_CONFIG_FILE: &str = "scraper.toml";
const ENV_PREFIX: &str = "SCRAPER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub source: SourceSettings,
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub url: String,
    pub base_origin: String,
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: PathBuf::from("data/articles.sqlite"),
            source: SourceSettings::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            url: "http://comicsalliance.com/".into(),
            base_origin: "http://comicsalliance.com".into(),
            user_agent: None,
        }
    }
}

/// Everything one scrape run needs, validated.
#[derive(Debug, Clone)]
pub struct Source {
    pub url: String,
    pub base_origin: String,
    pub user_agent: Option<String>,
    pub selectors: CompiledSelectors,
}

impl Settings {
    /// Defaults, then `file` (optional; missing is fine), then `SCRAPER_*`
    /// environment variables with `__` between nested keys.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn source(&self) -> Result<Source> {
        let url = Url::parse(self.source.url.trim())
            .map_err(|e| Error::Config(format!("source url {:?}: {}", self.source.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "source url {:?} must be http(s)",
                self.source.url
            )));
        }

        Ok(Source {
            url: url.to_string(),
            base_origin: normalize::origin_of(&self.source.base_origin)?,
            user_agent: self.source.user_agent.clone(),
            selectors: self.selectors.compile()?,
        })
    }
}
