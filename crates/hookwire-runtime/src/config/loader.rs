//! Layered configuration loading with figment.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Configurations passed to [`ConfigLoader::merge`], in call order
//! 3. The profile file next to the main file (`hookwire.<profile>.toml`)
//! 4. The main file (`hookwire.toml` or `config.toml`)
//! 5. `HOOKWIRE_*` environment variables
//!
//! File formats are compiled in by feature: `toml-config` (default) and
//! `yaml-config` (`.yaml` / `.yml`). Each enabled format is searched on its
//! own, so a TOML and a YAML file may both apply.
//!
//! Environment variables use `__` between sections:
//!
//! ```text
//! HOOKWIRE_LOGGING__LEVEL=debug                 logging.level = "debug"
//! HOOKWIRE_RUNTIME__MAX_CONCURRENT_EVENTS=8     runtime.max_concurrent_events = 8
//! HOOKWIRE_COMMANDS__PREFIX__LITERAL=!          commands.prefix = { literal = "!" }
//! ```
//!
//! `HOOKWIRE_PROFILE` selects the profile and is not part of the schema.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::HookwireConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "HOOKWIRE_";
const PROFILE_VAR: &str = "HOOKWIRE_PROFILE";
const APP_DIR: &str = "hookwire";
const FILE_STEMS: [&str; 2] = ["hookwire", "config"];

// =============================================================================
// Profile
// =============================================================================

/// Name selecting the `hookwire.<profile>.<ext>` overlay file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile(String);

impl Profile {
    pub const DEFAULT: &'static str = "development";

    /// Normalizes `name`; `dev` and `prod` expand to their long forms.
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self(match name.as_str() {
            "" | "dev" => Self::DEFAULT.to_owned(),
            "prod" => "production".to_owned(),
            _ => name,
        })
    }

    /// Reads `HOOKWIRE_PROFILE`.
    pub fn from_env() -> Self {
        Self::new(&std::env::var(PROFILE_VAR).unwrap_or_default())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// File formats
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [FileFormat] = &[
        #[cfg(feature = "toml-config")]
        FileFormat::Toml,
        #[cfg(feature = "yaml-config")]
        FileFormat::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    #[cfg_attr(
        not(any(feature = "toml-config", feature = "yaml-config")),
        allow(unused_variables)
    )]
    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Builds a [`HookwireConfig`] from defaults, files and the environment.
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .profile("production")
///     .search_path("/etc/hookwire")
///     .load()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    overrides: Vec<HookwireConfig>,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader using `HOOKWIRE_PROFILE` and the environment.
    ///
    /// Without search paths, the current directory and the user config
    /// directory are searched.
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            file: None,
            env: true,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::new(&profile.into());
        self
    }

    /// Adds a directory to search for config files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/hookwire`.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(APP_DIR)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers `config` over the defaults, below files and the environment.
    pub fn merge(mut self, config: HookwireConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<HookwireConfig> {
        let config: HookwireConfig = self
            .figment()?
            .extract()
            .map_err(Box::new)?;
        validate_config(&config)?;

        debug!(
            profile = %self.profile,
            level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(&self) -> ConfigResult<Figment> {
        let mut figment = self.overrides.iter().fold(
            Figment::from(Serialized::defaults(HookwireConfig::default())),
            |figment, config| figment.merge(Serialized::defaults(config)),
        );

        figment = match &self.file {
            Some(path) => Self::merge_file(figment, path)?,
            None => self.merge_discovered(figment),
        };

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }
        Ok(figment)
    }

    fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let format = FileFormat::of(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        info!(path = %path.display(), "Loading configuration file");
        Ok(format.merge(figment, path))
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(APP_DIR)))
            .collect()
    }

    /// For each format, merges the first main file found along with the
    /// profile files met on the way to it.
    fn merge_discovered(&self, mut figment: Figment) -> Figment {
        let dirs = self.search_dirs();
        let mut found = false;

        for &format in FileFormat::ENABLED {
            let candidates = dirs.iter().flat_map(|dir| {
                FILE_STEMS.iter().flat_map(move |stem| {
                    format.extensions().iter().map(move |ext| {
                        (
                            dir.join(format!("{stem}.{}.{ext}", self.profile)),
                            dir.join(format!("{stem}.{ext}")),
                        )
                    })
                })
            });
            for (profiled, main) in candidates {
                if profiled.is_file() {
                    debug!(path = %profiled.display(), "Loading profile configuration file");
                    figment = format.merge(figment, &profiled);
                }
                if main.is_file() {
                    info!(path = %main.display(), "Loading configuration file");
                    figment = format.merge(figment, &main);
                    found = true;
                    break;
                }
            }
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<HookwireConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<HookwireConfig> {
    ConfigLoader::new().file(path).load()
}
