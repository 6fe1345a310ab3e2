//! Backend settings loaded from earthcube.ini
//!
//! Search order is `~/.earthcube/earthcube.ini` then `./earthcube.ini`,
//! the working-directory file overriding the home one. When neither
//! exists the bundled template is used and copied into the backend home
//! so a fresh deployment starts from a skeleton it can edit.

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// Bundled default configuration
const DEFAULT_TEMPLATE: &str = include_str!("../resources/earthcube.ini");

/// Filesystem roots used by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct PathSettings {
    /// Backend home directory
    pub backend: PathBuf,
    /// SpatiaLite database with the coverage indexes
    pub geodb: PathBuf,
    /// Native SpatiaLite extension module
    pub libspatialite: PathBuf,
    /// Log output directory
    pub log_dir: PathBuf,
    /// Root of the ingested scene store
    pub data_dir: PathBuf,
    /// Static HTML root, reserved for future deployments
    pub documentroot: PathBuf,
}

/// HTTP bind settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Complete backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub path: PathSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Loads settings using the user's home directory as the search root
    pub fn load() -> Result<Self> {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| Error::Config("HOME is not set".to_string()))?;
        Self::load_with_home(&home)
    }

    /// Loads settings rooted at an explicit home directory
    pub fn load_with_home(home: &Path) -> Result<Self> {
        let candidates = [
            home.join(".earthcube").join("earthcube.ini"),
            PathBuf::from("earthcube.ini"),
        ];
        let found: Vec<&PathBuf> = candidates.iter().filter(|p| p.is_file()).collect();

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_TEMPLATE, FileFormat::Ini));
        for path in &found {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Ini));
        }
        let raw: Settings = builder.build()?.try_deserialize()?;
        let settings = raw.expand_home(home);

        if found.is_empty() {
            info!("no config file found, creating default skeleton");
            settings.write_skeleton()?;
        } else {
            for path in &found {
                info!(path = %path.display(), "loaded configuration");
            }
        }
        settings.ensure_directories()?;
        Ok(settings)
    }

    /// Parses the bundled template without touching the filesystem
    pub fn from_template(home: &Path) -> Result<Self> {
        let raw: Settings = Config::builder()
            .add_source(File::from_str(DEFAULT_TEMPLATE, FileFormat::Ini))
            .build()?
            .try_deserialize()?;
        Ok(raw.expand_home(home))
    }

    fn expand_home(mut self, home: &Path) -> Self {
        self.path.backend = expand(&self.path.backend, home);
        self.path.geodb = expand(&self.path.geodb, home);
        self.path.libspatialite = expand(&self.path.libspatialite, home);
        self.path.log_dir = expand(&self.path.log_dir, home);
        self.path.data_dir = expand(&self.path.data_dir, home);
        self.path.documentroot = expand(&self.path.documentroot, home);
        self
    }

    /// Copies the bundled template into the backend home
    fn write_skeleton(&self) -> Result<()> {
        fs::create_dir_all(&self.path.backend)?;
        fs::write(self.path.backend.join("earthcube.ini"), DEFAULT_TEMPLATE)?;
        Ok(())
    }

    /// Creates the backend, log and data directories when missing
    fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.path.backend, &self.path.log_dir, &self.path.data_dir] {
            if !dir.exists() {
                info!(dir = %dir.display(), "creating directory");
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// Expands a leading `~` to the home directory
fn expand(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
