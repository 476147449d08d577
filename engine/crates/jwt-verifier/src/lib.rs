use std::collections::{BTreeMap, HashSet};

use common_types::Claims;
use gateway_v2_auth_config::{AuthConfig, JwtAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

mod error;
#[cfg(test)]
mod tests;

pub use error::VerificationError;

const BEARER_PREFIX: &str = "Bearer ";

/// Verifies the tokens of one deployment. Built once per published configuration and shared by
/// every request.
pub struct Verifier {
    header: String,
    namespace: Option<String>,
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("header", &self.header)
            .field("namespace", &self.namespace)
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    pub fn new(config: &AuthConfig) -> Result<Self, VerificationError> {
        let algorithm = algorithm(config.algorithm);
        let material = config.verification_key.expose_secret().as_bytes();

        let key = if config.algorithm.is_symmetric() {
            DecodingKey::from_secret(material)
        } else {
            DecodingKey::from_rsa_pem(material).map_err(VerificationError::InvalidKey)?
        };

        let mut validation = Validation::new(algorithm);
        // exp and nbf are checked only when the token carries them
        validation.required_spec_claims = HashSet::new();
        validation.validate_nbf = true;
        if config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&config.audience);
        }

        Ok(Verifier {
            header: config.header.clone(),
            namespace: config.namespace.clone(),
            key,
            validation,
        })
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Claims of the caller. Requests without a valid token are anonymous.
    pub fn claims(&self, headers: &http::HeaderMap) -> Claims {
        match self.token(headers).and_then(|token| self.verify(token)) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(header = %self.header, "anonymous request: {err}");
                Claims::anonymous()
            }
        }
    }

    /// Verifies the signature and the registered claims, then reads the custom claims.
    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let token_data = jsonwebtoken::decode::<Map<String, Value>>(token, &self.key, &self.validation)?;
        let claims = token_data.claims;

        let custom = match self.namespace.as_deref() {
            Some(namespace) => match claims.get(namespace) {
                Some(value) => namespace_claims(namespace, value)?,
                None => claims.into_iter().collect(),
            },
            None => claims.into_iter().collect(),
        };

        Ok(Claims::authenticated(self.namespace.clone(), custom))
    }

    fn token<'a>(&self, headers: &'a http::HeaderMap) -> Result<&'a str, VerificationError> {
        let value = headers
            .get(self.header.as_str())
            .ok_or_else(|| VerificationError::MissingToken(self.header.clone()))?;

        let value = value
            .to_str()
            .map_err(|_| VerificationError::InvalidHeader(self.header.clone()))?
            .trim();

        let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
        if token.is_empty() {
            return Err(VerificationError::MissingToken(self.header.clone()));
        }

        Ok(token)
    }
}

/// Some issuers can only emit string claims and encode the namespace object as JSON.
fn namespace_claims(namespace: &str, value: &Value) -> Result<BTreeMap<String, Value>, VerificationError> {
    match value {
        Value::Object(object) => Ok(object.clone().into_iter().collect()),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(object)) => Ok(object.into_iter().collect()),
            _ => Err(VerificationError::InvalidNamespace(namespace.to_string())),
        },
        _ => Err(VerificationError::InvalidNamespace(namespace.to_string())),
    }
}

fn algorithm(algorithm: JwtAlgorithm) -> Algorithm {
    match algorithm {
        JwtAlgorithm::HS256 => Algorithm::HS256,
        JwtAlgorithm::HS384 => Algorithm::HS384,
        JwtAlgorithm::HS512 => Algorithm::HS512,
        JwtAlgorithm::RS256 => Algorithm::RS256,
        JwtAlgorithm::RS384 => Algorithm::RS384,
        JwtAlgorithm::RS512 => Algorithm::RS512,
    }
}
