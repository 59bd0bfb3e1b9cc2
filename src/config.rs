//! Configuration file handling for the ledger.
//!
//! The configuration file is stored at `$PIGGY_HOME/config.json` and names the endpoint of the
//! remote store and, optionally, the endpoint of the AI extraction service. The local mirror of the
//! ledger is kept next to it.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "piggy-ledger";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const MIRROR_JSON: &str = "piggy_ledger_simple.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$PIGGY_HOME` and from there it loads `$PIGGY_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    sheet_url: Url,
    ai_url: Option<Url>,
}

impl Config {
    /// Creates the home directory and an initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the home directory, e.g. `$HOME/piggy-ledger`
    /// - `sheet_url` - The endpoint of the spreadsheet-backed remote store
    /// - `ai_url` - The endpoint of the AI extraction service, if there is one
    ///
    /// # Errors
    /// - Returns an error if a URL is invalid or any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        sheet_url: &str,
        ai_url: Option<&str>,
    ) -> Result<Self> {
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: sheet_url.trim().to_string(),
            ai_url: ai_url.map(|s| s.trim().to_string()),
        };
        let (sheet_url, ai_url) = config_file.urls()?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the piggy home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.is_file() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
            sheet_url,
            ai_url,
        })
    }

    /// Validates that `piggy_home` and its config file exist, then loads the config file.
    pub async fn load(piggy_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = piggy_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Piggy home is missing, run 'piggy init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let (sheet_url, ai_url) = config_file.urls()?;

        Ok(Self {
            root,
            config_path,
            config_file,
            sheet_url,
            ai_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_version(&self) -> u8 {
        self.config_file.config_version
    }

    pub fn sheet_url(&self) -> &Url {
        &self.sheet_url
    }

    pub fn ai_url(&self) -> Option<&Url> {
        self.ai_url.as_ref()
    }

    /// The file that holds the local mirror of the ledger.
    pub fn mirror_path(&self) -> PathBuf {
        self.root.join(MIRROR_JSON)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "piggy-ledger",
///   "config_version": 1,
///   "sheet_url": "https://script.google.com/macros/s/AKfycbx9Lq2/exec",
///   "ai_url": "https://piggy.example.com/api/analyze"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "piggy-ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Endpoint of the remote store
    sheet_url: String,

    /// Endpoint of the AI extraction service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ai_url: Option<String>,
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Parses both endpoints. Only http(s) URLs are accepted.
    fn urls(&self) -> Result<(Url, Option<Url>)> {
        let sheet_url = parse_url(&self.sheet_url).context("Invalid sheet_url")?;
        let ai_url = match self.ai_url.as_deref() {
            Some(s) if !s.is_empty() => Some(parse_url(s).context("Invalid ai_url")?),
            _ => None,
        };
        Ok((sheet_url, ai_url))
    }
}

fn parse_url(s: &str) -> Result<Url> {
    let url = Url::parse(s).with_context(|| format!("'{s}' is not a URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("'{s}' is not an http(s) URL");
    }
    Ok(url)
}
