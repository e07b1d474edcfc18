//! Application configuration, read from a TOML file at startup.
//!
//! Every key is optional. `DATABASE_URL` and `SECRET_KEY` in the environment
//! take precedence over the values in the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bind: String,
    pub database_url: String,
    /// At least 64 bytes. Without it an ephemeral key is generated, which
    /// logs every admin out on restart.
    pub secret_key: Option<String>,
    /// A TrueType font covering the secondary locale's script, embedded into
    /// PDF exports.
    pub pdf_font_path: Option<PathBuf>,
    pub site_name: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            database_url: "conclave.db".to_string(),
            secret_key: None,
            pdf_font_path: None,
            site_name: "Conference".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AppConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl AppConfig {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Loads the configuration file (if one was given) and applies the
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppConfigError> {
        let mut config = match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| {
                    AppConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                Self::from_toml(&source).map_err(|source| {
                    AppConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    }
                })?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(secret) = std::env::var("SECRET_KEY") {
            config.secret_key = Some(secret);
        }

        Ok(config)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            database_url = ":memory:"
            pdf_font_path = "fonts/NotoSansSinhala-Regular.ttf"
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url, ":memory:");
        assert_eq!(
            config.pdf_font_path.as_deref(),
            Some(Path::new("fonts/NotoSansSinhala-Regular.ttf"))
        );
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
        assert_eq!(config.bind, "0.0.0.0:8000");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AppConfig::from_toml("port = 80").is_err());
    }

    #[test]
    fn unparseable_log_level_falls_back_to_info() {
        let config = AppConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }
}
