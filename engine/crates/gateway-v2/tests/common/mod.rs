#![allow(dead_code)]

use common_types::Claims;
use gateway_v2::{Config, EnforcementMode, Gateway, Request, Response};
use gateway_v2_auth_config::EnforcementConfig;
use jsonwebtoken::{EncodingKey, Header};
use runtime::{Entity, NewEntity, Selection, Store, StoreInner, StoreResult, StoredValue, Transaction, Uid};
use runtime_local::InMemoryStore;
use serde_json::Value;

pub const SECRET: &str = "secretkey";
pub const HEADER: &str = "X-Test-Auth";
pub const NAMESPACE: &str = "https://xyz.io/jwt/claims";

pub fn authorization_line() -> String {
    format!(
        r#"# Dgraph.Authorization {{"VerificationKey":"{SECRET}","Header":"{HEADER}","Namespace":"{NAMESPACE}","Algo":"HS256"}}"#
    )
}

pub struct TestGateway {
    pub gateway: Gateway,
    pub memory: InMemoryStore,
}

impl TestGateway {
    pub fn new(mode: EnforcementMode, sdl: &str) -> Self {
        let memory = InMemoryStore::new();
        Self::with_store(mode, sdl, memory.clone(), Store::new(memory))
    }

    /// `store` must be backed by `memory`.
    pub fn with_store(mode: EnforcementMode, sdl: &str, memory: InMemoryStore, store: Store) -> Self {
        init_logging();

        let config = Config {
            enforcement: EnforcementConfig { mode },
            authentication: None,
        };
        let gateway = Gateway::new(config, store);
        gateway.submit(sdl).unwrap();

        TestGateway { gateway, memory }
    }

    pub fn silent(sdl: &str) -> Self {
        Self::new(EnforcementMode::Silent, sdl)
    }

    pub fn diagnostic(sdl: &str) -> Self {
        Self::new(EnforcementMode::Diagnostic, sdl)
    }

    pub async fn execute(&self, request: Request, claims: &Claims) -> Response {
        self.gateway.execute_with_claims(&request, claims).await
    }

    /// Executes the request and returns the result of its root field, failing on any error.
    pub async fn data(&self, request: Request, claims: &Claims) -> Value {
        let field = request.field.clone();
        let response = self.execute(request, claims).await;
        assert!(!response.has_errors(), "unexpected errors: {:?}", response.errors);
        response.field(&field).clone()
    }

    pub fn count(&self, type_name: &str) -> usize {
        self.memory.entities_of_type(type_name).len()
    }
}

/// Yields to the scheduler before every commit, so that concurrent requests interleave their
/// transactions.
pub struct YieldingStore(pub InMemoryStore);

#[async_trait::async_trait]
impl StoreInner for YieldingStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(YieldingTransaction(self.0.begin().await?)))
    }
}

struct YieldingTransaction(Box<dyn Transaction>);

#[async_trait::async_trait]
impl Transaction for YieldingTransaction {
    async fn query(&mut self, selection: &Selection) -> StoreResult<Vec<Entity>> {
        self.0.query(selection).await
    }

    async fn get(&mut self, uid: Uid) -> StoreResult<Option<Entity>> {
        self.0.get(uid).await
    }

    async fn insert(&mut self, entity: NewEntity) -> StoreResult<Uid> {
        self.0.insert(entity).await
    }

    async fn set(&mut self, uid: Uid, predicate: &str, value: StoredValue) -> StoreResult<()> {
        self.0.set(uid, predicate, value).await
    }

    async fn unset(&mut self, uid: Uid, predicate: &str) -> StoreResult<()> {
        self.0.unset(uid, predicate).await
    }

    async fn delete(&mut self, uid: Uid) -> StoreResult<()> {
        self.0.delete(uid).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.0.commit().await
    }
}

pub fn claims(custom: Value) -> Claims {
    let Value::Object(custom) = custom else {
        unreachable!("claims must be an object")
    };
    Claims::authenticated(None, custom.into_iter().collect())
}

pub fn token(custom: Value) -> String {
    let claims = serde_json::json!({ NAMESPACE: custom });
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

pub fn headers(token: &str) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::HeaderName::from_bytes(HEADER.as_bytes()).unwrap(), token.parse().unwrap());
    headers
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
