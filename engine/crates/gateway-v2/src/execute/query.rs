use std::cmp::Ordering as CmpOrdering;

use common_types::auth::AuthOperation;
use parser_sdl::{
    model::{FieldClass, ObjectType},
    registry::names::{MetaNames, INPUT_ARG_FILTER, OUTPUT_FIELD_COUNT},
};
use runtime::Predicate;
use serde_json::{Map, Number, Value};

use super::{digest, Execution, Page};
use crate::{filter, Error, Request, Result};

impl Execution<'_> {
    pub(super) async fn get(&mut self, ty: &ObjectType, request: &Request) -> Result<Value> {
        let caller = identifiers(ty, request)?;

        let mut tx = self.store.begin().await?;
        let found = self
            .find(tx.as_mut(), ty, AuthOperation::Query, caller, Page::default())
            .await?;

        match found.first() {
            Some(entity) => self.project(tx.as_mut(), entity).await,
            None => Ok(Value::Null),
        }
    }

    pub(super) async fn query(&mut self, ty: &ObjectType, request: &Request) -> Result<Value> {
        let caller = self.caller_filter(ty, request)?;
        let page = Page::from_request(ty, request)?;

        let mut tx = self.store.begin().await?;
        let found = self.find(tx.as_mut(), ty, AuthOperation::Query, caller, page).await?;

        self.project_all(tx.as_mut(), &found).await
    }

    pub(super) async fn aggregate(&mut self, ty: &ObjectType, request: &Request) -> Result<Value> {
        let caller = self.caller_filter(ty, request)?;

        let mut tx = self.store.begin().await?;
        let found = self
            .find(tx.as_mut(), ty, AuthOperation::Query, caller, Page::default())
            .await?;

        let mut result = Map::new();
        result.insert(OUTPUT_FIELD_COUNT.to_string(), found.len().into());

        for field in ty.stored_fields().filter(|field| !field.ty.is_list()) {
            let class = self.snapshot.schema.classify(&field.ty);
            if !class.is_orderable() {
                continue;
            }

            let values: Vec<&Value> = found.iter().filter_map(|entity| entity.scalar(&field.predicate)).collect();

            let min = values.iter().copied().min_by(|left, right| compare(left, right));
            let max = values.iter().copied().max_by(|left, right| compare(left, right));
            result.insert(MetaNames::aggregate_min(&field.name), min.cloned().unwrap_or_default());
            result.insert(MetaNames::aggregate_max(&field.name), max.cloned().unwrap_or_default());

            if class.is_numeric() {
                let (sum, avg) = sum_and_avg(class, &values);
                result.insert(MetaNames::aggregate_sum(&field.name), sum);
                result.insert(MetaNames::aggregate_avg(&field.name), avg);
            }
        }

        Ok(Value::Object(result))
    }

    /// Returns the entity when the password matches, `null` otherwise.
    pub(super) async fn check_password(&mut self, ty: &ObjectType, request: &Request) -> Result<Value> {
        let (Some(secret), Some(predicate)) = (ty.secret(), ty.secret_predicate()) else {
            return Err(Error::UnknownField(request.field.clone()));
        };
        let password = request
            .get(&secret.field)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_argument(&secret.field, "expected a String"))?;
        let caller = identifiers(ty, request)?;

        let mut tx = self.store.begin().await?;
        let found = self
            .find(tx.as_mut(), ty, AuthOperation::Password, caller, Page::default())
            .await?;

        let digest = digest(password);
        let matching = found
            .iter()
            .find(|entity| entity.scalar(&predicate).and_then(Value::as_str) == Some(digest.as_str()));

        match matching {
            Some(entity) => self.project(tx.as_mut(), entity).await,
            None => Ok(Value::Null),
        }
    }

    fn caller_filter(&self, ty: &ObjectType, request: &Request) -> Result<Predicate> {
        filter::lower(
            &self.snapshot.schema,
            ty,
            request.get(INPUT_ARG_FILTER).unwrap_or(&Value::Null),
        )
    }
}

/// The `id` and `@id` arguments of `getT` and `checkTPassword`; all given ones must match.
fn identifiers(ty: &ObjectType, request: &Request) -> Result<Predicate> {
    let mut operands = Vec::new();

    if let Some(field) = ty.id_field() {
        if let Some(id) = request.get(&field.name) {
            operands.push(Predicate::Uid(filter::uids(ty, id)?));
        }
    }

    for field in ty.xid_fields() {
        if let Some(value) = request.get(&field.name) {
            operands.push(Predicate::eq(field.predicate.clone(), value.clone()));
        }
    }

    if operands.is_empty() {
        let names: Vec<&str> = ty
            .id_field()
            .into_iter()
            .chain(ty.xid_fields())
            .map(|field| field.name.as_str())
            .collect();
        return Err(Error::invalid_argument(
            &request.field,
            format!("one of {} is required", names.join(", ")),
        ));
    }

    Ok(Predicate::and(operands))
}

fn compare(left: &Value, right: &Value) -> CmpOrdering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        _ => CmpOrdering::Equal,
    }
}

/// Integer fields sum to integers, averages are always floats.
fn sum_and_avg(class: FieldClass, values: &[&Value]) -> (Value, Value) {
    if values.is_empty() {
        return (Value::Null, Value::Null);
    }

    let total: f64 = values.iter().filter_map(|value| value.as_f64()).sum();
    let avg = Number::from_f64(total / values.len() as f64).map_or(Value::Null, Value::Number);

    let sum = match class {
        FieldClass::Int | FieldClass::Int64 => values
            .iter()
            .filter_map(|value| value.as_i64())
            .try_fold(0_i64, i64::checked_add)
            .map_or(Value::Null, Value::from),
        _ => Number::from_f64(total).map_or(Value::Null, Value::Number),
    };

    (sum, avg)
}
