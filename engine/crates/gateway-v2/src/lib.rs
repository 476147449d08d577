//! Publishes compiled schemas and executes the operations they generate, enforcing their
//! `@auth` rules on every read and write.
//!
//! A [`Gateway`] holds at most one published [`SchemaSnapshot`]. Submissions are serialized and
//! swap the snapshot atomically: requests in flight keep the snapshot they started with, a
//! rejected submission leaves the current one untouched.

mod enforcer;
mod error;
mod execute;
mod filter;
mod request;
mod rules;
mod snapshot;

use std::sync::{Arc, Mutex, PoisonError};

use common_types::Claims;
use gateway_v2_auth_config::AuthConfig;
use jwt_verifier::Verifier;
use runtime::Store;
use tokio::sync::watch;
use tracing::Instrument;

pub use error::{Error, Result, SubmissionError};
pub use gateway_v2_auth_config::{Config, EnforcementMode};
pub use request::{Request, Response, ResponseError};
pub use snapshot::SchemaSnapshot;

use execute::Execution;

pub struct Gateway {
    config: Config,
    store: Store,
    /// Version of the last published snapshot. Held for the whole submission.
    submissions: Mutex<u64>,
    sender: watch::Sender<Option<Arc<SchemaSnapshot>>>,
}

impl Gateway {
    pub fn new(config: Config, store: Store) -> Self {
        let (sender, _) = watch::channel(None);

        Gateway {
            config,
            store,
            submissions: Mutex::new(0),
            sender,
        }
    }

    /// Compiles and publishes a schema. Nothing changes when it is rejected.
    pub fn submit(&self, sdl: &str) -> Result<Arc<SchemaSnapshot>, SubmissionError> {
        let mut version = self.submissions.lock().unwrap_or_else(PoisonError::into_inner);

        match self.prepare(sdl, *version + 1) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *version = snapshot.version;
                self.sender.send_replace(Some(Arc::clone(&snapshot)));

                tracing::info!(
                    version = snapshot.version,
                    types = snapshot.schema.types.len(),
                    rules = snapshot.auth.iter().count(),
                    "schema published"
                );
                Ok(snapshot)
            }
            Err(err) => {
                tracing::warn!(version = *version, "schema rejected: {err}");
                Err(err)
            }
        }
    }

    fn prepare(&self, sdl: &str, version: u64) -> Result<SchemaSnapshot, SubmissionError> {
        let parsed = parser_sdl::parse(sdl)?;

        // a malformed authorization line rejects the schema even when the configuration wins
        let declared = AuthConfig::from_schema(sdl)?;
        let verifier = self
            .config
            .authentication
            .as_ref()
            .or(declared.as_ref())
            .map(Verifier::new)
            .transpose()?;

        Ok(SchemaSnapshot::new(version, parsed, verifier))
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Option<Arc<SchemaSnapshot>> {
        self.sender.borrow().clone()
    }

    /// Notified on every publication.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<SchemaSnapshot>>> {
        self.sender.subscribe()
    }

    pub fn mode(&self) -> EnforcementMode {
        self.config.enforcement.mode
    }

    /// Executes a request, with the caller's claims read from the token in `headers`. A missing
    /// or invalid token makes the caller anonymous.
    pub async fn execute(&self, request: &Request, headers: &http::HeaderMap) -> Response {
        let Some(snapshot) = self.snapshot() else {
            return Response::error(&request.field, &Error::NoSchema);
        };
        let claims = snapshot
            .verifier
            .as_ref()
            .map_or_else(Claims::anonymous, |verifier| verifier.claims(headers));

        self.run(&snapshot, request, &claims).await
    }

    /// Executes a request on behalf of already verified claims.
    pub async fn execute_with_claims(&self, request: &Request, claims: &Claims) -> Response {
        let Some(snapshot) = self.snapshot() else {
            return Response::error(&request.field, &Error::NoSchema);
        };

        self.run(&snapshot, request, claims).await
    }

    async fn run(&self, snapshot: &SchemaSnapshot, request: &Request, claims: &Claims) -> Response {
        let span = tracing::info_span!(
            "execute",
            field = %request.field,
            version = snapshot.version,
            authenticated = claims.authenticated,
        );

        Execution::new(snapshot, claims, self.config.enforcement.mode, &self.store)
            .run(request)
            .instrument(span)
            .await
    }
}
