//! Execution of generated root fields against the storage engine.

mod mutation;
mod projection;
mod query;

use common_types::{auth::AuthOperation, Claims};
use gateway_v2_auth_config::EnforcementMode;
use parser_sdl::{
    model::ObjectType,
    registry::names::{
        INPUT_ARG_FIRST, INPUT_ARG_OFFSET, INPUT_ARG_ORDER, INPUT_FIELD_ORDER_ASC, INPUT_FIELD_ORDER_DESC,
        INPUT_FIELD_ORDER_THEN,
    },
    RootFieldKind,
};
use runtime::{Entity, Ordering, Predicate, Selection, Store, Transaction, Uid};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{enforcer::Enforcer, snapshot::SchemaSnapshot, Error, Request, Response, Result};

pub(crate) struct Execution<'a> {
    snapshot: &'a SchemaSnapshot,
    enforcer: Enforcer<'a>,
    store: &'a Store,
    /// Errors reported alongside the data.
    errors: Vec<Error>,
}

impl<'a> Execution<'a> {
    pub(crate) fn new(
        snapshot: &'a SchemaSnapshot,
        claims: &'a Claims,
        mode: EnforcementMode,
        store: &'a Store,
    ) -> Self {
        Execution {
            snapshot,
            enforcer: Enforcer::new(snapshot, claims, mode),
            store,
            errors: Vec::new(),
        }
    }

    pub(crate) async fn run(mut self, request: &Request) -> Response {
        match self.dispatch(request).await {
            Ok(value) => Response::new(&request.field, value, &self.errors),
            Err(error) => {
                tracing::debug!(field = %request.field, "request failed: {error}");
                self.errors.push(error);
                Response::new(&request.field, Value::Null, &self.errors)
            }
        }
    }

    async fn dispatch(&mut self, request: &Request) -> Result<Value> {
        let snapshot = self.snapshot;
        let root = snapshot
            .generated
            .root_field(&request.field)
            .ok_or_else(|| Error::UnknownField(request.field.clone()))?;
        let ty = snapshot
            .object_type(&root.type_name)
            .ok_or_else(|| Error::UnknownField(request.field.clone()))?;

        match root.kind {
            RootFieldKind::Get => self.get(ty, request).await,
            RootFieldKind::Query => self.query(ty, request).await,
            RootFieldKind::Aggregate => self.aggregate(ty, request).await,
            RootFieldKind::CheckPassword => self.check_password(ty, request).await,
            RootFieldKind::Add => self.add(ty, request).await,
            RootFieldKind::Update => self.update(ty, request).await,
            RootFieldKind::Delete => self.delete(ty, request).await,
        }
    }

    fn reject(&mut self, error: Error) {
        if let Some(error) = self.enforcer.reject(error) {
            self.errors.push(error);
        }
    }

    /// Entities of `ty` matching both the caller's predicate and the rule of `operation`.
    async fn find(
        &mut self,
        tx: &mut dyn Transaction,
        ty: &ObjectType,
        operation: AuthOperation,
        caller: Predicate,
        page: Page,
    ) -> Result<Vec<Entity>> {
        let selection = Selection {
            type_name: ty.storage_name().to_string(),
            predicate: Predicate::and([caller.clone(), self.enforcer.rule(ty, operation)]),
            order: page.order,
            first: page.first,
            offset: page.offset,
        };
        let found = tx.query(&selection).await?;

        // Only worth telling apart from "no such data" when the caller will be told.
        if found.is_empty()
            && self.enforcer.mode() == EnforcementMode::Diagnostic
            && self.enforcer.is_restricted(ty, operation)
            && !tx.query(&Selection::new(ty.storage_name(), caller)).await?.is_empty()
        {
            self.reject(Error::Unauthorized {
                type_name: ty.name.clone(),
                operation,
            });
        }

        Ok(found)
    }

    async fn is_visible(
        &self,
        tx: &mut dyn Transaction,
        ty: &ObjectType,
        uid: Uid,
        operation: AuthOperation,
    ) -> Result<bool> {
        let selection = Selection::new(
            ty.storage_name(),
            Predicate::and([Predicate::Uid(vec![uid]), self.enforcer.rule(ty, operation)]),
        );
        Ok(!tx.query(&selection).await?.is_empty())
    }

    /// Reads mutated entities back in a fresh transaction, through the `query` rule.
    async fn reload(&self, ty: &ObjectType, uids: Vec<Uid>) -> Result<Value> {
        if uids.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        let mut tx = self.store.begin().await?;
        let selection = Selection::new(
            ty.storage_name(),
            Predicate::and([Predicate::Uid(uids), self.enforcer.rule(ty, AuthOperation::Query)]),
        );
        let entities = tx.query(&selection).await?;
        self.project_all(tx.as_mut(), &entities).await
    }
}

/// Ordering and pagination of a collection query.
#[derive(Debug, Default)]
struct Page {
    order: Vec<Ordering>,
    first: Option<usize>,
    offset: usize,
}

impl Page {
    fn from_request(ty: &ObjectType, request: &Request) -> Result<Self> {
        let count = |name: &str| -> Result<Option<usize>> {
            request
                .get(name)
                .map(|value| {
                    value
                        .as_u64()
                        .and_then(|count| usize::try_from(count).ok())
                        .ok_or_else(|| Error::invalid_argument(name, "expected a non-negative Int"))
                })
                .transpose()
        };

        let mut order = Vec::new();
        let mut next = request.get(INPUT_ARG_ORDER);
        while let Some(value) = next {
            let object = value
                .as_object()
                .ok_or_else(|| Error::invalid_argument(INPUT_ARG_ORDER, "expected an object"))?;

            for (key, descending) in [(INPUT_FIELD_ORDER_ASC, false), (INPUT_FIELD_ORDER_DESC, true)] {
                let Some(name) = object.get(key).filter(|name| !name.is_null()) else {
                    continue;
                };
                let field = name
                    .as_str()
                    .and_then(|name| ty.field(name))
                    .filter(|field| !field.ty.is_list() && !field.is_custom())
                    .ok_or_else(|| {
                        Error::invalid_argument(INPUT_ARG_ORDER, format!("cannot order {} by {name}", ty.name))
                    })?;
                order.push(Ordering {
                    predicate: field.predicate.clone(),
                    descending,
                });
            }

            next = object.get(INPUT_FIELD_ORDER_THEN).filter(|then| !then.is_null());
        }

        Ok(Page {
            order,
            first: count(INPUT_ARG_FIRST)?,
            offset: count(INPUT_ARG_OFFSET)?.unwrap_or_default(),
        })
    }
}

/// Secrets are only ever stored and compared as digests.
fn digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Lists and single values are interchangeable in inputs.
fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
