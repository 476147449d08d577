use std::time::{SystemTime, UNIX_EPOCH};

use assert_matches::assert_matches;
use gateway_v2_auth_config::{AuthConfig, JwtAlgorithm};
use jsonwebtoken::{EncodingKey, Header};
use rstest::rstest;
use secrecy::SecretString;
use serde_json::{json, Value};

use super::*;

const SECRET: &str = "secretkey";
const NAMESPACE: &str = "https://xyz.io/jwt/claims";
const HEADER: &str = "X-Test-Auth";

const RSA_PRIVATE_KEY: &str = include_str!("../testdata/rsa_private.pem");
const RSA_PUBLIC_KEY: &str = include_str!("../testdata/rsa_public.pem");

fn config(algorithm: JwtAlgorithm, audience: &[&str]) -> AuthConfig {
    let key = if algorithm.is_symmetric() { SECRET } else { RSA_PUBLIC_KEY };

    AuthConfig {
        header: HEADER.to_string(),
        namespace: Some(NAMESPACE.to_string()),
        algorithm,
        verification_key: SecretString::new(key.to_string()),
        audience: audience.iter().map(ToString::to_string).collect(),
    }
}

fn sign(algorithm: Algorithm, claims: &Value) -> String {
    let key = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => EncodingKey::from_secret(SECRET.as_bytes()),
        _ => EncodingKey::from_rsa_pem(RSA_PRIVATE_KEY.as_bytes()).unwrap(),
    };
    jsonwebtoken::encode(&Header::new(algorithm), claims, &key).unwrap()
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn headers(value: &str) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    headers.insert(HEADER, value.parse().unwrap());
    headers
}

fn user_claims() -> Value {
    json!({
        "exp": now() + 3600,
        NAMESPACE: { "USER": "user1", "ROLE": "ADMIN" },
    })
}

#[rstest]
#[case(JwtAlgorithm::HS256, Algorithm::HS256)]
#[case(JwtAlgorithm::HS384, Algorithm::HS384)]
#[case(JwtAlgorithm::HS512, Algorithm::HS512)]
#[case(JwtAlgorithm::RS256, Algorithm::RS256)]
#[case(JwtAlgorithm::RS512, Algorithm::RS512)]
fn verifies_supported_algorithms(#[case] configured: JwtAlgorithm, #[case] signed_with: Algorithm) {
    let verifier = Verifier::new(&config(configured, &[])).unwrap();
    let claims = verifier.verify(&sign(signed_with, &user_claims())).unwrap();

    assert!(claims.authenticated);
    assert_eq!(claims.namespace.as_deref(), Some(NAMESPACE));
    assert_eq!(claims.get("USER"), Some(&json!("user1")));
    assert_eq!(claims.get("ROLE"), Some(&json!("ADMIN")));
}

#[test]
fn reads_the_configured_header() {
    let verifier = Verifier::new(&config(JwtAlgorithm::HS256, &[])).unwrap();
    let token = sign(Algorithm::HS256, &user_claims());

    assert!(verifier.claims(&headers(&token)).authenticated);
    assert!(verifier.claims(&headers(&format!("Bearer {token}"))).authenticated);

    let mut other = http::HeaderMap::new();
    other.insert(http::header::AUTHORIZATION, token.parse().unwrap());
    assert_eq!(verifier.claims(&other), Claims::anonymous());
}

#[test]
fn invalid_tokens_are_anonymous() {
    let verifier = Verifier::new(&config(JwtAlgorithm::HS256, &[])).unwrap();

    let expired = sign(Algorithm::HS256, &json!({ "exp": now() - 3600, NAMESPACE: { "USER": "user1" } }));
    assert_matches!(verifier.verify(&expired), Err(VerificationError::Token(_)));
    assert_eq!(verifier.claims(&headers(&expired)), Claims::anonymous());

    let not_yet = sign(Algorithm::HS256, &json!({ "nbf": now() + 3600, NAMESPACE: { "USER": "user1" } }));
    assert_matches!(verifier.verify(&not_yet), Err(VerificationError::Token(_)));

    let other_secret = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &user_claims(),
        &EncodingKey::from_secret(b"anothersecret"),
    )
    .unwrap();
    assert_matches!(verifier.verify(&other_secret), Err(VerificationError::Token(_)));

    assert_matches!(verifier.verify("not.a.token"), Err(VerificationError::Token(_)));
    assert_eq!(verifier.claims(&http::HeaderMap::new()), Claims::anonymous());
}

#[test]
fn algorithm_must_match_the_configuration() {
    let verifier = Verifier::new(&config(JwtAlgorithm::HS256, &[])).unwrap();

    assert_matches!(
        verifier.verify(&sign(Algorithm::HS512, &user_claims())),
        Err(VerificationError::Token(_))
    );
}

#[test]
fn audience_is_checked_when_configured() {
    let verifier = Verifier::new(&config(JwtAlgorithm::HS256, &["aud1", "aud5"])).unwrap();

    let matching = sign(Algorithm::HS256, &json!({ "aud": ["aud5"], NAMESPACE: { "USER": "user1" } }));
    assert!(verifier.verify(&matching).is_ok());

    let other = sign(Algorithm::HS256, &json!({ "aud": "aud2", NAMESPACE: { "USER": "user1" } }));
    assert_matches!(verifier.verify(&other), Err(VerificationError::Token(_)));

    let unrestricted = Verifier::new(&config(JwtAlgorithm::HS256, &[])).unwrap();
    assert!(unrestricted.verify(&other).is_ok());
}

#[test]
fn namespace_claims() {
    let verifier = Verifier::new(&config(JwtAlgorithm::HS256, &[])).unwrap();

    let encoded = sign(Algorithm::HS256, &json!({ NAMESPACE: r#"{"USER": "user2"}"# }));
    assert_eq!(verifier.verify(&encoded).unwrap().get("USER"), Some(&json!("user2")));

    let top_level = sign(Algorithm::HS256, &json!({ "USER": "user3" }));
    assert_eq!(verifier.verify(&top_level).unwrap().get("USER"), Some(&json!("user3")));

    let malformed = sign(Algorithm::HS256, &json!({ NAMESPACE: 42 }));
    assert_matches!(verifier.verify(&malformed), Err(VerificationError::InvalidNamespace(_)));
}

#[test]
fn invalid_public_key() {
    let mut config = config(JwtAlgorithm::RS256, &[]);
    config.verification_key = SecretString::new("-----BEGIN PUBLIC KEY-----".to_string());

    assert_matches!(Verifier::new(&config), Err(VerificationError::InvalidKey(_)));
}
