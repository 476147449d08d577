//! `add`, `update` and `delete`.
//!
//! Every top-level input element of an `add` runs in its own transaction and either commits
//! completely or leaves nothing behind. `update` and `delete` are a single unit each.

use std::collections::BTreeMap;

use common_types::auth::AuthOperation;
use futures_util::{future::BoxFuture, FutureExt};
use parser_sdl::{
    model::{Field, ObjectType},
    registry::names::{
        MetaNames, DELETE_MESSAGE, INPUT_ARG_FILTER, INPUT_ARG_INPUT, INPUT_ARG_UPSERT, INPUT_FIELD_REMOVE,
        INPUT_FIELD_SET, OUTPUT_FIELD_MSG, OUTPUT_FIELD_NUM_UIDS,
    },
};
use runtime::{Entity, NewEntity, Predicate, Selection, StoreError, StoredValue, Transaction, Uid};
use serde_json::{Map, Value};

use super::{digest, one_or_many, Execution, Page};
use crate::{filter, snapshot::SchemaSnapshot, Error, Request, Result};

const COMMIT_ATTEMPTS: usize = 3;

/// What one unit of work wrote so far.
#[derive(Debug, Default)]
struct Changes {
    /// Entities created, nested ones included, with their concrete type.
    created: Vec<(String, Uid)>,
    affected: usize,
}

impl<'a> Execution<'a> {
    pub(super) async fn add(&mut self, ty: &'a ObjectType, request: &Request) -> Result<Value> {
        let inputs = request
            .get(INPUT_ARG_INPUT)
            .ok_or_else(|| Error::invalid_argument(INPUT_ARG_INPUT, "is required"))?;
        let upsert = request.get(INPUT_ARG_UPSERT).and_then(Value::as_bool).unwrap_or(false);

        let mut added = Vec::new();
        let mut num_uids = 0;

        for input in one_or_many(inputs) {
            match self.add_element(ty, input, upsert).await {
                Ok((uid, affected)) => {
                    num_uids += affected;
                    added.push(uid);
                }
                Err(err) if err.is_rejection() => self.reject(err),
                // earlier elements are committed and still reported in the payload
                Err(err) => {
                    tracing::debug!(type_name = %ty.name, "add element failed: {err}");
                    self.errors.push(err);
                }
            }
        }

        tracing::debug!(type_name = %ty.name, num_uids, "add");

        let entities = self.reload(ty, added).await?;
        Ok(payload(ty, entities, num_uids, None))
    }

    pub(super) async fn update(&mut self, ty: &'a ObjectType, request: &Request) -> Result<Value> {
        let input = request
            .get(INPUT_ARG_INPUT)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::invalid_argument(INPUT_ARG_INPUT, "expected an object"))?;
        let filter = input
            .get(INPUT_ARG_FILTER)
            .ok_or_else(|| Error::invalid_argument(INPUT_ARG_FILTER, "is required"))?;
        let patch = |name: &str| match input.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(patch)) => Ok(Some(patch)),
            Some(_) => Err(Error::invalid_argument(name, "expected an object")),
        };
        let (set, remove) = (patch(INPUT_FIELD_SET)?, patch(INPUT_FIELD_REMOVE)?);

        let caller = filter::lower(&self.snapshot.schema, ty, filter)?;

        let mut tx = self.store.begin().await?;
        let found = self
            .find(tx.as_mut(), ty, AuthOperation::Update, caller, Page::default())
            .await?;
        let uids: Vec<Uid> = found.iter().map(|entity| entity.uid).collect();

        match self.apply_patch(tx.as_mut(), ty, &uids, set, remove).await {
            Ok(()) => tx.commit().await?,
            Err(err) if err.is_rejection() => {
                self.reject(err);
                return Ok(payload(ty, Value::Array(Vec::new()), 0, None));
            }
            Err(err) => return Err(err),
        }

        tracing::debug!(type_name = %ty.name, num_uids = uids.len(), "update");

        let num_uids = uids.len();
        let entities = self.reload(ty, uids).await?;
        Ok(payload(ty, entities, num_uids, None))
    }

    pub(super) async fn delete(&mut self, ty: &'a ObjectType, request: &Request) -> Result<Value> {
        let filter = request
            .get(INPUT_ARG_FILTER)
            .ok_or_else(|| Error::invalid_argument(INPUT_ARG_FILTER, "is required"))?;
        let caller = filter::lower(&self.snapshot.schema, ty, filter)?;

        let mut tx = self.store.begin().await?;
        let found = self
            .find(tx.as_mut(), ty, AuthOperation::Delete, caller, Page::default())
            .await?;
        let uids: Vec<Uid> = found.iter().map(|entity| entity.uid).collect();

        // what the caller could see of the entities, read before they are gone
        let visible = if uids.is_empty() {
            Vec::new()
        } else {
            let selection = Selection::new(
                ty.storage_name(),
                Predicate::and([
                    Predicate::Uid(uids.clone()),
                    self.enforcer.rule(ty, AuthOperation::Query),
                ]),
            );
            tx.query(&selection).await?
        };
        let entities = self.project_all(tx.as_mut(), &visible).await?;

        for uid in &uids {
            tx.delete(*uid).await?;
        }
        tx.commit().await?;

        tracing::debug!(type_name = %ty.name, num_uids = uids.len(), "delete");

        Ok(payload(ty, entities, uids.len(), Some(DELETE_MESSAGE)))
    }

    async fn apply_patch(
        &self,
        tx: &mut dyn Transaction,
        ty: &'a ObjectType,
        uids: &[Uid],
        set: Option<&Map<String, Value>>,
        remove: Option<&Map<String, Value>>,
    ) -> Result<()> {
        let mut changes = Changes::default();
        for uid in uids {
            if let Some(set) = set {
                self.apply_set(tx, ty, *uid, set, &mut changes).await?;
            }
            if let Some(remove) = remove {
                self.apply_remove(tx, ty, *uid, remove).await?;
            }
        }
        // entities created through nested references
        self.check_created(tx, &changes).await
    }

    /// Adds one input element in its own transaction, retried when a concurrent commit
    /// invalidated what it read.
    async fn add_element(&self, ty: &'a ObjectType, input: &Value, upsert: bool) -> Result<(Uid, usize)> {
        let input = input
            .as_object()
            .ok_or_else(|| Error::invalid_argument(INPUT_ARG_INPUT, "expected a list of objects"))?;

        let mut attempt = 1;
        loop {
            let mut tx = self.store.begin().await?;
            let mut changes = Changes::default();
            let uid = self.add_one(tx.as_mut(), ty, input, upsert, &mut changes).await?;

            match tx.commit().await {
                Ok(()) => return Ok((uid, changes.affected)),
                Err(StoreError::Aborted(reason)) if attempt < COMMIT_ATTEMPTS => {
                    tracing::debug!(type_name = %ty.name, attempt, "retrying add: {reason}");
                    attempt += 1;
                }
                Err(StoreError::Aborted(_)) => {
                    return Err(Error::Contended {
                        type_name: ty.name.clone(),
                    })
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn add_one(
        &self,
        tx: &mut dyn Transaction,
        ty: &'a ObjectType,
        input: &Map<String, Value>,
        upsert: bool,
        changes: &mut Changes,
    ) -> Result<Uid> {
        let uid = self.create(tx, ty, input, upsert, changes).await?;
        self.check_created(tx, changes).await?;
        Ok(uid)
    }

    /// Creates the entity and everything it references that does not exist yet. With `upsert`,
    /// an existing entity with the same `@id` value is updated instead.
    fn create<'f>(
        &'f self,
        tx: &'f mut dyn Transaction,
        ty: &'a ObjectType,
        input: &'f Map<String, Value>,
        upsert: bool,
        changes: &'f mut Changes,
    ) -> BoxFuture<'f, Result<Uid>> {
        async move {
            for field in ty.xid_fields() {
                let Some(value) = input.get(&field.name).filter(|value| !value.is_null()) else {
                    continue;
                };
                if let Some(existing) = self.find_xid(tx, ty, field, value).await? {
                    if upsert && existing.concrete_type() == ty.storage_name() {
                        return self.upsert(tx, ty, existing.uid, input, changes).await;
                    }
                    return Err(Error::Conflict {
                        type_name: ty.name.clone(),
                        field: field.name.clone(),
                        value: value.clone(),
                    });
                }
            }

            self.check_required(ty, input)?;

            let mut values = BTreeMap::new();
            let mut edges = Vec::new();
            for (key, value) in input.iter().filter(|(_, value)| !value.is_null()) {
                if let Some(predicate) = secret_predicate(ty, key) {
                    values.insert(predicate, StoredValue::Scalar(hashed(key, value)?));
                    continue;
                }

                let field = input_field(ty, key)?;
                match self.snapshot.schema.get(&field.ty.name) {
                    Some(target) => edges.push((field, target, value)),
                    None => {
                        values.insert(field.predicate.clone(), StoredValue::Scalar(value.clone()));
                    }
                }
            }

            let uid = tx
                .insert(NewEntity {
                    types: self.type_names(ty),
                    values,
                })
                .await?;
            changes.created.push((ty.name.clone(), uid));
            changes.affected += 1;

            for (field, target, value) in edges {
                for reference in one_or_many(value) {
                    let linked = self.resolve(tx, target, reference, changes).await?;
                    self.link(tx, ty, uid, field, linked).await?;
                }
            }

            Ok(uid)
        }
        .boxed()
    }

    async fn upsert(
        &self,
        tx: &mut dyn Transaction,
        ty: &'a ObjectType,
        uid: Uid,
        input: &Map<String, Value>,
        changes: &mut Changes,
    ) -> Result<Uid> {
        if !self.is_visible(tx, ty, uid, AuthOperation::Update).await? {
            return Err(Error::Unauthorized {
                type_name: ty.name.clone(),
                operation: AuthOperation::Update,
            });
        }

        self.apply_set(tx, ty, uid, input, changes).await?;
        changes.affected += 1;
        Ok(uid)
    }

    /// The uid a `TRef` value designates, creating the entity when it does not exist.
    async fn resolve(
        &self,
        tx: &mut dyn Transaction,
        target: &'a ObjectType,
        reference: &Value,
        changes: &mut Changes,
    ) -> Result<Uid> {
        let reference = reference
            .as_object()
            .ok_or_else(|| Error::invalid_argument(&target.name, "references must be objects"))?;

        if let Some(uid) = self.lookup(tx, target, reference).await? {
            if self.is_visible(tx, target, uid, AuthOperation::Query).await? {
                return Ok(uid);
            }
            return Err(Error::DanglingReference {
                type_name: target.name.clone(),
                reference: Value::Object(reference.clone()),
            });
        }

        if target.is_interface() {
            return Err(Error::DanglingReference {
                type_name: target.name.clone(),
                reference: Value::Object(reference.clone()),
            });
        }

        self.create(tx, target, reference, false, changes).await
    }

    /// An existing entity designated by `id` or by one of its `@id` fields.
    async fn lookup(
        &self,
        tx: &mut dyn Transaction,
        target: &ObjectType,
        reference: &Map<String, Value>,
    ) -> Result<Option<Uid>> {
        if let Some(id) = target
            .id_field()
            .and_then(|field| reference.get(&field.name))
            .filter(|id| !id.is_null())
        {
            return filter::uids(target, id).map(|uids| uids.first().copied());
        }

        for field in target.xid_fields() {
            let Some(value) = reference.get(&field.name).filter(|value| !value.is_null()) else {
                continue;
            };
            if let Some(existing) = self.find_xid(tx, target, field, value).await? {
                return Ok(Some(existing.uid));
            }
        }

        Ok(None)
    }

    /// `@id` values are unique per concrete type, or across all implementers of the declaring
    /// interface with `@id(interface: true)`.
    async fn find_xid(
        &self,
        tx: &mut dyn Transaction,
        ty: &ObjectType,
        field: &Field,
        value: &Value,
    ) -> Result<Option<Entity>> {
        let interface_wide = field.id_directive().is_some_and(|id| id.interface);
        let scope = match self.snapshot.schema.get(&field.owner) {
            Some(owner) if interface_wide => owner.storage_name(),
            _ => ty.storage_name(),
        };

        let mut selection = Selection::new(scope, Predicate::eq(field.predicate.clone(), value.clone()));
        selection.first = Some(1);
        Ok(tx.query(&selection).await?.into_iter().next())
    }

    async fn apply_set(
        &self,
        tx: &mut dyn Transaction,
        ty: &'a ObjectType,
        uid: Uid,
        patch: &Map<String, Value>,
        changes: &mut Changes,
    ) -> Result<()> {
        for (key, value) in patch {
            if let Some(predicate) = secret_predicate(ty, key) {
                match value {
                    Value::Null => tx.unset(uid, &predicate).await?,
                    value => tx.set(uid, &predicate, StoredValue::Scalar(hashed(key, value)?)).await?,
                }
                continue;
            }

            let field = input_field(ty, key)?;
            match self.snapshot.schema.get(&field.ty.name) {
                Some(target) => {
                    for reference in one_or_many(value) {
                        let linked = self.resolve(tx, target, reference, changes).await?;
                        self.link(tx, ty, uid, field, linked).await?;
                    }
                }
                None if value.is_null() => tx.unset(uid, &field.predicate).await?,
                None => {
                    if field.is_xid() {
                        if let Some(existing) = self.find_xid(tx, ty, field, value).await? {
                            if existing.uid != uid {
                                return Err(Error::Conflict {
                                    type_name: ty.name.clone(),
                                    field: field.name.clone(),
                                    value: value.clone(),
                                });
                            }
                        }
                    }
                    tx.set(uid, &field.predicate, StoredValue::Scalar(value.clone())).await?;
                }
            }
        }

        Ok(())
    }

    /// Scalars are removed when the given value is `null` or the stored one, edges when they
    /// point to one of the given references.
    async fn apply_remove(
        &self,
        tx: &mut dyn Transaction,
        ty: &'a ObjectType,
        uid: Uid,
        patch: &Map<String, Value>,
    ) -> Result<()> {
        for (key, value) in patch {
            if let Some(predicate) = secret_predicate(ty, key) {
                tx.unset(uid, &predicate).await?;
                continue;
            }

            let field = input_field(ty, key)?;
            if let Some(target) = self.snapshot.schema.get(&field.ty.name) {
                for reference in one_or_many(value) {
                    let reference = reference
                        .as_object()
                        .ok_or_else(|| Error::invalid_argument(key, "references must be objects"))?;
                    if let Some(linked) = self.lookup(tx, target, reference).await? {
                        self.unlink(tx, ty, uid, field, linked).await?;
                    }
                }
                continue;
            }

            let entity = tx.get(uid).await?.ok_or(StoreError::NotFound(uid))?;
            match entity.scalar(&field.predicate) {
                Some(Value::Array(items)) if !value.is_null() => {
                    let removed = one_or_many(value);
                    let kept: Vec<Value> = items
                        .iter()
                        .filter(|item| !removed.contains(item))
                        .cloned()
                        .collect();
                    tx.set(uid, &field.predicate, StoredValue::Scalar(Value::Array(kept))).await?;
                }
                Some(current) if value.is_null() || current == value => tx.unset(uid, &field.predicate).await?,
                _ => {}
            }
        }

        Ok(())
    }

    /// Entities created by the unit must satisfy the `add` rule of their type, evaluated against
    /// the uncommitted data.
    async fn check_created(&self, tx: &mut dyn Transaction, changes: &Changes) -> Result<()> {
        for (type_name, uid) in &changes.created {
            let Some(ty) = self.snapshot.object_type(type_name) else {
                continue;
            };
            if !self.is_visible(tx, ty, *uid, AuthOperation::Add).await? {
                return Err(Error::Unauthorized {
                    type_name: type_name.clone(),
                    operation: AuthOperation::Add,
                });
            }
        }
        Ok(())
    }

    async fn link(
        &self,
        tx: &mut dyn Transaction,
        ty: &ObjectType,
        uid: Uid,
        field: &Field,
        target: Uid,
    ) -> Result<()> {
        add_edge(tx, uid, field, target).await?;
        if let Some(inverse) = self.inverse(ty, field) {
            add_edge(tx, target, inverse, uid).await?;
        }
        Ok(())
    }

    async fn unlink(
        &self,
        tx: &mut dyn Transaction,
        ty: &ObjectType,
        uid: Uid,
        field: &Field,
        target: Uid,
    ) -> Result<()> {
        remove_edge(tx, uid, field, target).await?;
        if let Some(inverse) = self.inverse(ty, field) {
            remove_edge(tx, target, inverse, uid).await?;
        }
        Ok(())
    }

    /// The field of the linked type holding the reverse edge, declared with `@hasInverse` on
    /// either side.
    fn inverse(&self, ty: &ObjectType, field: &Field) -> Option<&'a Field> {
        let snapshot: &'a SchemaSnapshot = self.snapshot;
        let schema = &snapshot.schema;
        let target = schema.get(&field.ty.name)?;

        if let Some(name) = field.has_inverse() {
            return target.field(name);
        }

        let lineage: Vec<&str> = std::iter::once(ty.name.as_str())
            .chain(schema.ancestors(&ty.name).into_iter().map(|ancestor| ancestor.name.as_str()))
            .collect();

        target.fields.iter().find(|candidate| {
            candidate.has_inverse() == Some(field.name.as_str()) && lineage.contains(&candidate.ty.name.as_str())
        })
    }

    fn check_required(&self, ty: &ObjectType, input: &Map<String, Value>) -> Result<()> {
        let present = |name: &str| input.get(name).is_some_and(|value| !value.is_null());

        for field in ty.stored_fields().filter(|field| !field.ty.nullable && !field.is_id()) {
            if !present(&field.name) {
                return Err(Error::invalid_argument(&field.name, format!("is required to add a {}", ty.name)));
            }
        }
        if let Some(secret) = ty.secret().filter(|secret| !present(&secret.field)) {
            return Err(Error::invalid_argument(&secret.field, format!("is required to add a {}", ty.name)));
        }

        Ok(())
    }

    /// The concrete type first, then every interface it implements.
    fn type_names(&self, ty: &ObjectType) -> Vec<String> {
        std::iter::once(ty.storage_name().to_string())
            .chain(
                self.snapshot
                    .schema
                    .ancestors(&ty.name)
                    .into_iter()
                    .map(|ancestor| ancestor.storage_name().to_string()),
            )
            .collect()
    }
}

fn input_field<'t>(ty: &'t ObjectType, name: &str) -> Result<&'t Field> {
    ty.field(name)
        .filter(|field| !field.is_id() && !field.is_custom())
        .ok_or_else(|| Error::invalid_argument(name, format!("is not an input field of {}", ty.name)))
}

fn secret_predicate(ty: &ObjectType, name: &str) -> Option<String> {
    ty.secret()
        .filter(|secret| secret.field == name)
        .and_then(|_| ty.secret_predicate())
}

fn hashed(name: &str, value: &Value) -> Result<Value> {
    value
        .as_str()
        .map(|secret| Value::String(digest(secret)))
        .ok_or_else(|| Error::invalid_argument(name, "expected a String"))
}

async fn add_edge(tx: &mut dyn Transaction, uid: Uid, field: &Field, target: Uid) -> Result<()> {
    let entity = tx.get(uid).await?.ok_or(StoreError::NotFound(uid))?;

    let edges = if field.ty.is_list() {
        let mut edges = entity.edges(&field.predicate).to_vec();
        if !edges.contains(&target) {
            edges.push(target);
        }
        edges
    } else {
        vec![target]
    };

    tx.set(uid, &field.predicate, StoredValue::Edges(edges)).await?;
    Ok(())
}

async fn remove_edge(tx: &mut dyn Transaction, uid: Uid, field: &Field, target: Uid) -> Result<()> {
    let Some(entity) = tx.get(uid).await? else {
        return Ok(());
    };

    let edges: Vec<Uid> = entity
        .edges(&field.predicate)
        .iter()
        .copied()
        .filter(|linked| *linked != target)
        .collect();

    tx.set(uid, &field.predicate, StoredValue::Edges(edges)).await?;
    Ok(())
}

fn payload(ty: &ObjectType, entities: Value, num_uids: usize, msg: Option<&str>) -> Value {
    let mut payload = Map::new();
    payload.insert(MetaNames::entity_field(&ty.name), entities);
    if let Some(msg) = msg {
        payload.insert(OUTPUT_FIELD_MSG.to_string(), msg.into());
    }
    payload.insert(OUTPUT_FIELD_NUM_UIDS.to_string(), num_uids.into());
    Value::Object(payload)
}
