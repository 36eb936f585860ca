use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for the transport-level middleware's request classifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Codec names accepted as RPC payloads (`application/<codec>`,
    /// `application/connect+<codec>`).
    pub codecs: Vec<String>,
    /// Treat Connect unary GET requests (`?encoding=<codec>`) as RPCs.
    pub connect_get: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            codecs: default_codecs(),
            connect_get: true,
        }
    }
}

fn default_codecs() -> Vec<String> {
    vec!["proto".to_string(), "json".to_string()]
}

impl AuthConfig {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
