use crate::{AuthConfig, ConfigError};

pub const AUTHORIZATION_LINE_PREFIX: &str = "# Dgraph.Authorization";

pub(crate) fn parse(sdl: &str) -> Result<Option<AuthConfig>, ConfigError> {
    let Some(line) = sdl
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(AUTHORIZATION_LINE_PREFIX))
    else {
        return Ok(None);
    };

    let json = line[AUTHORIZATION_LINE_PREFIX.len()..].trim();

    serde_json::from_str(json)
        .map(Some)
        .map_err(ConfigError::AuthorizationLine)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;
    use secrecy::ExposeSecret;

    use crate::{AuthConfig, ConfigError, JwtAlgorithm};

    #[test]
    fn reads_the_trailing_comment() {
        let sdl = indoc! {r#"
            type Todo {
                id: ID!
            }

            # Dgraph.Authorization {"VerificationKey":"secretkey","Header":"X-Test-Auth","Namespace":"https://xyz.io/jwt/claims","Algo":"HS256","Audience":["aud1","63do0q16n6ebjgkumu05kkeian","aud5"]}
        "#};

        let config = AuthConfig::from_schema(sdl).unwrap().unwrap();

        assert_eq!(config.header, "X-Test-Auth");
        assert_eq!(config.algorithm, JwtAlgorithm::HS256);
        assert_eq!(config.verification_key.expose_secret(), "secretkey");
        assert_eq!(config.audience.len(), 3);
    }

    #[test]
    fn absent_line() {
        assert!(AuthConfig::from_schema("type Todo { id: ID! }").unwrap().is_none());
    }

    #[test]
    fn malformed_line() {
        assert_matches!(
            AuthConfig::from_schema("# Dgraph.Authorization {\"Header\": 1}"),
            Err(ConfigError::AuthorizationLine(_))
        );
    }
}
