mod authorization_line;

use std::path::Path;

use secrecy::SecretString;

pub use authorization_line::AUTHORIZATION_LINE_PREFIX;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid authorization line: {0}")]
    AuthorizationLine(#[source] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Gateway configuration, usually loaded from a TOML file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub enforcement: EnforcementConfig,
    /// Token verification settings. When absent, the schema's own authorization line is used.
    pub authentication: Option<AuthConfig>,
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }
}

#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnforcementConfig {
    pub mode: EnforcementMode,
}

/// What the caller sees when authorization removes every candidate entity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnforcementMode {
    /// Empty results and `numUids: 0`, no error.
    #[default]
    Silent,
    /// Rejections are reported as errors. Meant for development only.
    Diagnostic,
}

/// Token verification settings.
///
/// Accepts both the snake_case keys of the TOML configuration and the keys of the schema's
/// `# Dgraph.Authorization` line.
#[serde_with::serde_as]
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// The header carrying the token
    #[serde(default = "default_header", alias = "Header")]
    pub header: String,
    /// The claim holding the custom claims object
    #[serde(default, alias = "Namespace")]
    pub namespace: Option<String>,
    #[serde(default, alias = "Algo")]
    pub algorithm: JwtAlgorithm,
    /// The shared secret for HMAC algorithms, a PEM encoded public key for RSA
    #[serde(alias = "VerificationKey")]
    pub verification_key: SecretString,
    #[serde_as(deserialize_as = "serde_with::OneOrMany<_>")]
    #[serde(default, alias = "Audience")]
    pub audience: Vec<String>,
}

fn default_header() -> String {
    "Authorization".to_string()
}

impl AuthConfig {
    /// Reads the `# Dgraph.Authorization {...}` line of a schema document, if any.
    pub fn from_schema(sdl: &str) -> Result<Option<Self>, ConfigError> {
        authorization_line::parse(sdl)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, strum::Display, strum::EnumString)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
}

impl JwtAlgorithm {
    pub fn is_symmetric(self) -> bool {
        matches!(self, JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512)
    }
}
