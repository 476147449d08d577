use common_types::auth::AuthOperation;
use parser_sdl::model::Field;
use runtime::{Entity, Predicate, Selection, Transaction};
use serde_json::{Map, Value};

use super::Execution;
use crate::Result;

impl Execution<'_> {
    pub(super) async fn project_all(&self, tx: &mut dyn Transaction, entities: &[Entity]) -> Result<Value> {
        let mut projected = Vec::with_capacity(entities.len());
        for entity in entities {
            projected.push(self.project(tx, entity).await?);
        }
        Ok(Value::Array(projected))
    }

    /// Every stored field of the entity, plus one level of linked entities. Linked entities the
    /// caller may not query are left out.
    pub(super) async fn project(&self, tx: &mut dyn Transaction, entity: &Entity) -> Result<Value> {
        let Some(ty) = self.snapshot.type_of(entity) else {
            return Ok(Value::Null);
        };

        let mut object = Map::new();
        for field in ty.stored_fields() {
            let value = match self.snapshot.schema.get(&field.ty.name) {
                Some(target) => {
                    let uids = entity.edges(&field.predicate).to_vec();
                    let linked = if uids.is_empty() {
                        Vec::new()
                    } else {
                        let selection = Selection::new(
                            target.storage_name(),
                            Predicate::and([Predicate::Uid(uids), self.enforcer.rule(target, AuthOperation::Query)]),
                        );
                        tx.query(&selection).await?
                    };
                    let mut linked = linked.iter().map(|entity| self.shallow(entity));

                    if field.ty.is_list() {
                        Value::Array(linked.collect())
                    } else {
                        linked.next().unwrap_or(Value::Null)
                    }
                }
                None => scalar(entity, field),
            };
            object.insert(field.name.clone(), value);
        }

        Ok(Value::Object(object))
    }

    fn shallow(&self, entity: &Entity) -> Value {
        let Some(ty) = self.snapshot.type_of(entity) else {
            return Value::Null;
        };

        let schema = &self.snapshot.schema;
        Value::Object(
            ty.stored_fields()
                .filter(|field| schema.get(&field.ty.name).is_none())
                .map(|field| (field.name.clone(), scalar(entity, field)))
                .collect(),
        )
    }
}

fn scalar(entity: &Entity, field: &Field) -> Value {
    if field.is_id() {
        return Value::String(entity.uid.to_string());
    }

    match entity.scalar(&field.predicate) {
        Some(value) => value.clone(),
        None if field.ty.is_list() => Value::Array(Vec::new()),
        None => Value::Null,
    }
}
