//! Runtime settings.
//!
//! Read once at startup and handed to the dispatcher; nothing below `main`
//! looks at the environment for backend addresses.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DUNITER: &str = "https://g1v1.p2p.legal";
pub const DEFAULT_ESNODE: &str = "https://g1.data.e-is.pro";
const SETTINGS_TEMPLATE: &str = include_str!("../settings.template.toml");

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("could not access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
struct SettingsFile {
    duniter: Option<String>,
    esnode: Option<String>,
    dunikey: Option<PathBuf>,
    timeout_secs: Option<u64>,
    wallet_page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// GVA GraphQL endpoint.
    pub node: String,
    /// Cesium+ pod base URL.
    pub pod: String,
    pub dunikey: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub timeout_secs: u64,
    pub wallet_page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node: gva_endpoint(DEFAULT_DUNITER),
            pod: DEFAULT_ESNODE.to_string(),
            dunikey: None,
            home: None,
            timeout_secs: 60,
            wallet_page_size: 0,
        }
    }
}

impl Settings {
    /// Loads `$HOME/.config/jaklis/settings.toml`, creating it from the
    /// template on first run, then applies environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let raw = match &home {
            Some(h) => read_or_seed(&settings_path(h))?,
            None => SETTINGS_TEMPLATE.to_string(),
        };
        let path = home.as_deref().map(settings_path).unwrap_or_default();
        let file: SettingsFile =
            toml::from_str(&raw).map_err(|source| SettingsError::Parse { path, source })?;
        Ok(Self::from_sources(file, home, |k| std::env::var(k).ok()))
    }

    fn from_sources(
        file: SettingsFile,
        home: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::default();
        let non_empty = |k: &str| env(k).filter(|v| !v.trim().is_empty());
        let duniter = non_empty("DUNITER")
            .or(file.duniter)
            .unwrap_or_else(|| DEFAULT_DUNITER.to_string());
        Self {
            node: gva_endpoint(&duniter),
            pod: non_empty("ESNODE")
                .or(file.esnode)
                .unwrap_or(defaults.pod),
            dunikey: non_empty("DUNIKEY").map(PathBuf::from).or(file.dunikey),
            home,
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            wallet_page_size: file.wallet_page_size.unwrap_or(defaults.wallet_page_size),
        }
    }
}

pub fn settings_path(home: &Path) -> PathBuf {
    home.join(".config").join("jaklis").join("settings.toml")
}

fn read_or_seed(path: &Path) -> Result<String, SettingsError> {
    let io = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(path, SETTINGS_TEMPLATE).map_err(io)?;
        tracing::info!(path = %path.display(), "seeded settings file from template");
    }
    std::fs::read_to_string(path).map_err(io)
}

fn gva_endpoint(duniter: &str) -> String {
    format!("{}/gva", duniter.trim_end_matches('/'))
}
