use crate::config::schema::{SpliceConfig, ValidationError};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "splice.toml";

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SPLICE_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<SpliceConfig, ConfigError> {
    let config: SpliceConfig =
        toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SpliceConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load the effective configuration.
///
/// Lookup order:
/// 1. `explicit` (a `--config` flag)
/// 2. `$SPLICE_CONFIG`
/// 3. `./splice.toml`
/// 4. built-in defaults
pub fn discover(explicit: Option<&Path>) -> Result<SpliceConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return load_from_path(&path);
        }
        tracing::warn!(path = %env_path, "{CONFIG_ENV_VAR} is set but the file does not exist");
    }

    let local = Path::new(CONFIG_FILE_NAME);
    if local.exists() {
        return load_from_path(local);
    }

    tracing::debug!("no config file found, using defaults");
    Ok(SpliceConfig::default())
}
